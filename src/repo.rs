mod leads;

pub use leads::*;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure talking to the backing submission store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}
