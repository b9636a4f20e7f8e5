use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

use serde::Serialize;

use thiserror::Error;

use crate::limiter::RateLimitDecision;
use crate::repo::StoreError;
use crate::settings::Runtime;

pub type RestResult<T> = Result<T, RestError>;

/// A single field-level validation failure, reported under its request key
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RestError {
    #[error("Invalid request")]
    Validation(Vec<FieldError>),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Too Many Requests")]
    RateLimited(RateLimitDecision),

    #[error("Internal Server Error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RestError {
    /// A validation failure on a single field
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }

    /// Convert a store failure into an internal error. The underlying detail
    /// is logged; it is surfaced to the caller only outside production.
    pub fn store(runtime: Runtime, err: StoreError) -> Self {
        tracing::error!("Store failure: {}", err);

        if runtime.expose_error_detail() {
            Self::Internal(err.to_string())
        } else {
            Self::Internal("Database error".into())
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<&'a [FieldError]>,
}

impl ResponseError for RestError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());

        if let Self::RateLimited(decision) = self {
            decision.apply_headers(&mut builder);
        }

        let fields = match self {
            Self::Validation(fields) => Some(fields.as_slice()),
            _ => None,
        };

        builder.json(ErrorBody {
            error: self.to_string(),
            fields,
        })
    }
}
