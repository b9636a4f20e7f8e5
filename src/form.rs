mod api;
mod controller;
mod draft;

pub use api::{HttpLeadApi, LeadApi};
pub use controller::{FormController, FormError, FormStep, ProfileField};
pub use draft::{DraftStore, LeadDraft, MemoryDraftStore, DRAFT_KEY};
