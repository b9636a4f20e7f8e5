use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use sqlx::PgPool;

use uuid::Uuid;

use crate::domain::EmailAddress;
use crate::model::{reminder_due, LeadProfile, LeadSubmission, NewLeadSubmission, SubmissionStatus};

use super::StoreResult;

/// Durable record of lead submissions.
/// NOTE: Object-safe so the application can run against either the Postgres
/// store or the in-memory store used by tests and local development.
/// TODO: Swap async-trait for std async traits when those become stable
#[async_trait::async_trait]
pub trait LeadStore: Send + Sync {
    /// Look up a partial-or-complete submission by its natural key
    async fn find_by_email(&self, email: &EmailAddress) -> StoreResult<Option<LeadSubmission>>;

    /// Fetch a submission by its generated id
    async fn fetch_by_id(&self, id: Uuid) -> StoreResult<Option<LeadSubmission>>;

    /// Insert a new partial submission, returning the generated id
    async fn insert(&self, new_lead: &NewLeadSubmission) -> StoreResult<Uuid>;

    /// Bump `updated_at` on a resumed submission
    async fn touch(&self, id: Uuid) -> StoreResult<()>;

    /// Write the full profile and transition the submission to complete
    async fn complete(&self, id: Uuid, profile: &LeadProfile) -> StoreResult<()>;

    /// Fetch all submissions due a reminder at `now`, oldest first
    async fn reminder_candidates(&self, now: DateTime<Utc>) -> StoreResult<Vec<LeadSubmission>>;

    /// Advance reminder bookkeeping for one submission
    async fn record_reminder(&self, id: Uuid, now: DateTime<Utc>) -> StoreResult<()>;
}

const LEAD_COLUMNS: &str = "id, email, status, revenue, budget, website, first_name, last_name, \
     phone, referral_source, reminders_count, last_reminder_at, created_at, updated_at, \
     completed_at, ip_address, user_agent";

/// Postgres lead store
#[derive(Debug, Clone)]
pub struct PgLeadStore {
    pool: PgPool,
}

impl PgLeadStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl LeadStore for PgLeadStore {
    #[tracing::instrument(name = "Find lead by email", skip(self))]
    async fn find_by_email(&self, email: &EmailAddress) -> StoreResult<Option<LeadSubmission>> {
        let lead = sqlx::query_as::<_, LeadSubmission>(&format!(
            "select {LEAD_COLUMNS} from lead_submissions where email = $1 \
             order by created_at desc limit 1"
        ))
        .bind(email.as_ref())
        .fetch_optional(&self.pool)
        .await?;

        Ok(lead)
    }

    #[tracing::instrument(name = "Fetch lead by id", skip(self))]
    async fn fetch_by_id(&self, id: Uuid) -> StoreResult<Option<LeadSubmission>> {
        let lead = sqlx::query_as::<_, LeadSubmission>(&format!(
            "select {LEAD_COLUMNS} from lead_submissions where id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(lead)
    }

    #[tracing::instrument(name = "Insert new lead", skip(self))]
    async fn insert(&self, new_lead: &NewLeadSubmission) -> StoreResult<Uuid> {
        let id = sqlx::query_scalar::<_, Uuid>(
            "insert into lead_submissions (email, ip_address, user_agent) \
             values ($1, $2, $3) returning id",
        )
        .bind(new_lead.email.as_ref())
        .bind(new_lead.ip_address.as_deref())
        .bind(new_lead.user_agent.as_deref())
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    #[tracing::instrument(name = "Touch lead", skip(self))]
    async fn touch(&self, id: Uuid) -> StoreResult<()> {
        sqlx::query("update lead_submissions set updated_at = now() where id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    #[tracing::instrument(name = "Complete lead", skip(self, profile))]
    async fn complete(&self, id: Uuid, profile: &LeadProfile) -> StoreResult<()> {
        sqlx::query(
            "update lead_submissions set \
                revenue = $2, budget = $3, website = $4, first_name = $5, last_name = $6, \
                phone = $7, referral_source = $8, \
                status = 'complete', completed_at = now(), updated_at = now() \
             where id = $1",
        )
        .bind(id)
        .bind(&profile.revenue)
        .bind(&profile.budget)
        .bind(&profile.website)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.phone)
        .bind(&profile.referral_source)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(name = "Fetch reminder candidates", skip(self))]
    async fn reminder_candidates(&self, now: DateTime<Utc>) -> StoreResult<Vec<LeadSubmission>> {
        // Mirrors `model::reminder_due`
        let leads = sqlx::query_as::<_, LeadSubmission>(&format!(
            "select {LEAD_COLUMNS} from lead_submissions \
             where status = 'partial' \
               and created_at <= $1 - interval '1 hour' \
               and created_at > $1 - interval '7 days' \
               and reminders_count < 3 \
               and (last_reminder_at is null or last_reminder_at < $1 - interval '24 hours') \
             order by created_at asc"
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(leads)
    }

    #[tracing::instrument(name = "Record reminder", skip(self))]
    async fn record_reminder(&self, id: Uuid, now: DateTime<Utc>) -> StoreResult<()> {
        sqlx::query(
            "update lead_submissions set \
                reminders_count = reminders_count + 1, last_reminder_at = $2, updated_at = $2 \
             where id = $1",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// In-memory lead store, scoped to a single process.
/// Backs the integration test suite and local development without Postgres.
#[derive(Debug, Default)]
pub struct MemLeadStore {
    leads: Mutex<HashMap<Uuid, LeadSubmission>>,
}

impl MemLeadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a fully-specified record, bypassing creation-time defaults.
    /// Tests use this to control timestamps and reminder bookkeeping.
    pub fn put(&self, lead: LeadSubmission) {
        self.lock().insert(lead.id, lead);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, LeadSubmission>> {
        self.leads.lock().expect("lead store lock poisoned")
    }
}

#[async_trait::async_trait]
impl LeadStore for MemLeadStore {
    async fn find_by_email(&self, email: &EmailAddress) -> StoreResult<Option<LeadSubmission>> {
        let leads = self.lock();
        let mut matches: Vec<&LeadSubmission> = leads
            .values()
            .filter(|lead| lead.email == email.as_ref())
            .collect();
        matches.sort_by_key(|lead| lead.created_at);

        Ok(matches.into_iter().last().cloned())
    }

    async fn fetch_by_id(&self, id: Uuid) -> StoreResult<Option<LeadSubmission>> {
        Ok(self.lock().get(&id).cloned())
    }

    async fn insert(&self, new_lead: &NewLeadSubmission) -> StoreResult<Uuid> {
        let now = Utc::now();
        let lead = LeadSubmission {
            id: Uuid::new_v4(),
            email: new_lead.email.as_ref().to_string(),
            status: SubmissionStatus::Partial,
            revenue: None,
            budget: None,
            website: None,
            first_name: None,
            last_name: None,
            phone: None,
            referral_source: None,
            reminders_count: 0,
            last_reminder_at: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
            ip_address: new_lead.ip_address.clone(),
            user_agent: new_lead.user_agent.clone(),
        };

        let id = lead.id;
        self.lock().insert(id, lead);

        Ok(id)
    }

    async fn touch(&self, id: Uuid) -> StoreResult<()> {
        if let Some(lead) = self.lock().get_mut(&id) {
            lead.updated_at = Utc::now();
        }

        Ok(())
    }

    async fn complete(&self, id: Uuid, profile: &LeadProfile) -> StoreResult<()> {
        if let Some(lead) = self.lock().get_mut(&id) {
            let now = Utc::now();
            lead.revenue = Some(profile.revenue.clone());
            lead.budget = Some(profile.budget.clone());
            lead.website = Some(profile.website.clone());
            lead.first_name = Some(profile.first_name.clone());
            lead.last_name = Some(profile.last_name.clone());
            lead.phone = Some(profile.phone.clone());
            lead.referral_source = Some(profile.referral_source.clone());
            lead.status = SubmissionStatus::Complete;
            lead.completed_at = Some(now);
            lead.updated_at = now;
        }

        Ok(())
    }

    async fn reminder_candidates(&self, now: DateTime<Utc>) -> StoreResult<Vec<LeadSubmission>> {
        let leads = self.lock();
        let mut candidates: Vec<LeadSubmission> = leads
            .values()
            .filter(|lead| reminder_due(lead, now))
            .cloned()
            .collect();
        candidates.sort_by_key(|lead| lead.created_at);

        Ok(candidates)
    }

    async fn record_reminder(&self, id: Uuid, now: DateTime<Utc>) -> StoreResult<()> {
        if let Some(lead) = self.lock().get_mut(&id) {
            lead.reminders_count += 1;
            lead.last_reminder_at = Some(now);
            lead.updated_at = now;
        }

        Ok(())
    }
}
