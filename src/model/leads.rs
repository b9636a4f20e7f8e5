use chrono::{DateTime, Duration, Utc};

use serde::Serialize;

use uuid::Uuid;

use crate::domain::{EmailAddress, RequiredField};
use crate::error::FieldError;

/// Total reminders ever sent for one submission
pub const REMINDER_CAP: i32 = 3;

/// Leads younger than this are still being filled in and are left alone
pub fn reminder_min_age() -> Duration {
    Duration::hours(1)
}

/// Leads older than this are considered abandoned
pub fn reminder_max_age() -> Duration {
    Duration::days(7)
}

/// Minimum spacing between two reminders to the same lead
pub fn reminder_spacing() -> Duration {
    Duration::hours(24)
}

/// Lifecycle of a lead submission. `Partial` transitions to `Complete`
/// exactly once; there are no other transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::Type)]
#[sqlx(type_name = "lead_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Partial,
    Complete,
}

/// Stored lead submission record
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LeadSubmission {
    /// ID of the submission, generated server-side on first creation
    pub id: Uuid,
    pub email: String,
    pub status: SubmissionStatus,
    /// Profile fields, absent until completion
    pub revenue: Option<String>,
    pub budget: Option<String>,
    pub website: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub referral_source: Option<String>,
    /// Reminder bookkeeping, advanced only by the sweep job
    pub reminders_count: i32,
    pub last_reminder_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Captured at creation for abuse tracking, never updated
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// New lead submission request
#[derive(Debug)]
pub struct NewLeadSubmission {
    pub email: EmailAddress,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Validated profile payload written at completion
#[derive(Debug, Clone)]
pub struct LeadProfile {
    pub revenue: String,
    pub budget: String,
    pub website: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub referral_source: String,
}

impl LeadProfile {
    /// Validate the raw profile fields, collecting one error per failing
    /// field rather than stopping at the first.
    #[allow(clippy::too_many_arguments)]
    pub fn from_fields(
        revenue: &str,
        budget: &str,
        website: &str,
        first_name: &str,
        last_name: &str,
        phone: &str,
        referral_source: &str,
    ) -> Result<Self, Vec<FieldError>> {
        let mut errors = Vec::new();

        let revenue = required("revenue", revenue, &mut errors);
        let budget = required("budget", budget, &mut errors);
        let website = required("website", website, &mut errors);
        let first_name = required("firstName", first_name, &mut errors);
        let last_name = required("lastName", last_name, &mut errors);
        let phone = required("phone", phone, &mut errors);
        let referral_source = required("referralSource", referral_source, &mut errors);

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Self {
            revenue: revenue.unwrap(),
            budget: budget.unwrap(),
            website: website.unwrap(),
            first_name: first_name.unwrap(),
            last_name: last_name.unwrap(),
            phone: phone.unwrap(),
            referral_source: referral_source.unwrap(),
        })
    }
}

fn required(field: &'static str, value: &str, errors: &mut Vec<FieldError>) -> Option<String> {
    match value.parse::<RequiredField>() {
        Ok(parsed) => Some(parsed.into_inner()),
        Err(message) => {
            errors.push(FieldError::new(field, message));
            None
        }
    }
}

/// Whether a submission is due a reminder at `now`.
/// Mirrored by the WHERE clause in the Postgres candidate query; the
/// in-memory store filters with this function directly.
pub fn reminder_due(lead: &LeadSubmission, now: DateTime<Utc>) -> bool {
    if lead.status != SubmissionStatus::Partial {
        return false;
    }

    let age = now - lead.created_at;
    if age < reminder_min_age() || age >= reminder_max_age() {
        return false;
    }

    if lead.reminders_count >= REMINDER_CAP {
        return false;
    }

    match lead.last_reminder_at {
        None => true,
        Some(last) => now - last > reminder_spacing(),
    }
}
