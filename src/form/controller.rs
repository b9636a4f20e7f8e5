use thiserror::Error;

use uuid::Uuid;

use crate::domain::EmailAddress;
use crate::error::FieldError;
use crate::model::LeadProfile;

use super::api::LeadApi;
use super::draft::{DraftStore, LeadDraft};

/// The visible step of the two-phase capture flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormStep {
    /// Collecting the email address
    Email,
    /// Collecting the full profile
    Details,
    /// Terminal; shown briefly before the flow closes
    Thanks,
}

/// A profile input the details step collects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileField {
    Revenue,
    Budget,
    Website,
    FirstName,
    LastName,
    Phone,
    ReferralSource,
}

#[derive(Debug, Error)]
pub enum FormError {
    #[error("Invalid form input")]
    Invalid(Vec<FieldError>),

    #[error("Request failed: {0}")]
    Request(anyhow::Error),

    #[error("Draft persistence failed: {0}")]
    Draft(anyhow::Error),
}

/// Drives the two-step capture/completion interaction.
///
/// Field values are persisted through the draft store on every change, so
/// closing the form mid-flow loses nothing; re-opening derives the starting
/// step purely from whether the draft already carries a submission id.
/// Validation mirrors the server-side rules exactly (the same domain types
/// are used on both sides); server validation stays authoritative.
///
/// Submissions are single-flight: `submit_email` and `submit_details` take
/// `&mut self`, so a second submission cannot start while one is awaited.
pub struct FormController<S, A> {
    drafts: S,
    api: A,
    draft: LeadDraft,
    step: FormStep,
}

impl<S, A> FormController<S, A>
where
    S: DraftStore,
    A: LeadApi,
{
    /// Open the form, resuming any persisted draft
    pub fn open(drafts: S, api: A) -> Result<Self, FormError> {
        let draft = drafts
            .load()
            .map_err(FormError::Draft)?
            .unwrap_or_default();

        let step = if draft.submission_id.is_some() {
            FormStep::Details
        } else {
            FormStep::Email
        };

        Ok(Self {
            drafts,
            api,
            draft,
            step,
        })
    }

    pub fn step(&self) -> FormStep {
        self.step
    }

    pub fn draft(&self) -> &LeadDraft {
        &self.draft
    }

    pub fn set_email(&mut self, value: impl Into<String>) -> Result<(), FormError> {
        self.draft.email = value.into();
        self.persist()
    }

    pub fn set_field(
        &mut self,
        field: ProfileField,
        value: impl Into<String>,
    ) -> Result<(), FormError> {
        let value = value.into();
        match field {
            ProfileField::Revenue => self.draft.revenue = value,
            ProfileField::Budget => self.draft.budget = value,
            ProfileField::Website => self.draft.website = value,
            ProfileField::FirstName => self.draft.first_name = value,
            ProfileField::LastName => self.draft.last_name = value,
            ProfileField::Phone => self.draft.phone = value,
            ProfileField::ReferralSource => self.draft.referral_source = value,
        }
        self.persist()
    }

    /// Step one: capture the email, remember the returned submission id,
    /// and advance to the details step
    pub async fn submit_email(&mut self) -> Result<(), FormError> {
        let email: EmailAddress = self
            .draft
            .email
            .parse()
            .map_err(|message: String| FormError::Invalid(vec![FieldError::new("email", message)]))?;

        let submission_id = self
            .api
            .capture_email(&email)
            .await
            .map_err(FormError::Request)?;

        self.draft.submission_id = Some(submission_id);
        self.persist()?;
        self.step = FormStep::Details;

        Ok(())
    }

    /// Step two: submit the full profile, then clear the persisted draft
    pub async fn submit_details(&mut self) -> Result<(), FormError> {
        let submission_id = self.draft.submission_id.ok_or_else(|| {
            FormError::Invalid(vec![FieldError::new(
                "submissionId",
                "No submission in progress",
            )])
        })?;

        let mut errors = Vec::new();

        let email = match self.draft.email.parse::<EmailAddress>() {
            Ok(email) => Some(email),
            Err(message) => {
                errors.push(FieldError::new("email", message));
                None
            }
        };

        let profile = match LeadProfile::from_fields(
            &self.draft.revenue,
            &self.draft.budget,
            &self.draft.website,
            &self.draft.first_name,
            &self.draft.last_name,
            &self.draft.phone,
            &self.draft.referral_source,
        ) {
            Ok(profile) => Some(profile),
            Err(mut field_errors) => {
                errors.append(&mut field_errors);
                None
            }
        };

        if !errors.is_empty() {
            return Err(FormError::Invalid(errors));
        }

        let email = email.unwrap();
        let profile = profile.unwrap();

        self.api
            .complete_submission(submission_id, &email, &profile)
            .await
            .map_err(FormError::Request)?;

        self.drafts.clear().map_err(FormError::Draft)?;
        self.draft = LeadDraft::default();
        self.step = FormStep::Thanks;

        Ok(())
    }

    fn persist(&self) -> Result<(), FormError> {
        self.drafts.save(&self.draft).map_err(FormError::Draft)
    }
}
