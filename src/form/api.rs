use std::time::Duration;

use anyhow::Context;

use reqwest::Client;

use serde::{Deserialize, Serialize};

use url::Url;

use uuid::Uuid;

use crate::domain::EmailAddress;
use crate::model::LeadProfile;

/// The two lead service calls the form controller drives, abstracted so the
/// controller can be tested without a live backend.
#[async_trait::async_trait]
pub trait LeadApi {
    /// Step one: create or resume a partial submission for an email
    async fn capture_email(&self, email: &EmailAddress) -> anyhow::Result<Uuid>;

    /// Step two: finalize the submission with the full profile
    async fn complete_submission(
        &self,
        submission_id: Uuid,
        email: &EmailAddress,
        profile: &LeadProfile,
    ) -> anyhow::Result<()>;
}

/// `LeadApi` over the live REST endpoints
#[derive(Debug)]
pub struct HttpLeadApi {
    client: Client,
    capture_url: Url,
    complete_url: Url,
}

impl HttpLeadApi {
    pub fn new(base_url: Url, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build http client")?;

        let capture_url = base_url
            .join("leads/capture-email")
            .context("Failed to create capture endpoint URL")?;
        let complete_url = base_url
            .join("leads/complete")
            .context("Failed to create completion endpoint URL")?;

        Ok(Self {
            client,
            capture_url,
            complete_url,
        })
    }
}

#[derive(Debug, Serialize)]
struct CaptureBody<'a> {
    email: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptureResponse {
    submission_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompleteBody<'a> {
    submission_id: Uuid,
    email: &'a str,
    revenue: &'a str,
    budget: &'a str,
    website: &'a str,
    first_name: &'a str,
    last_name: &'a str,
    phone: &'a str,
    referral_source: &'a str,
}

#[async_trait::async_trait]
impl LeadApi for HttpLeadApi {
    async fn capture_email(&self, email: &EmailAddress) -> anyhow::Result<Uuid> {
        let res = self
            .client
            .post(self.capture_url.clone())
            .json(&CaptureBody {
                email: email.as_ref(),
            })
            .send()
            .await?
            .error_for_status()?
            .json::<CaptureResponse>()
            .await
            .context("Failed to parse capture response")?;

        Ok(res.submission_id)
    }

    async fn complete_submission(
        &self,
        submission_id: Uuid,
        email: &EmailAddress,
        profile: &LeadProfile,
    ) -> anyhow::Result<()> {
        self.client
            .post(self.complete_url.clone())
            .json(&CompleteBody {
                submission_id,
                email: email.as_ref(),
                revenue: &profile.revenue,
                budget: &profile.budget,
                website: &profile.website,
                first_name: &profile.first_name,
                last_name: &profile.last_name,
                phone: &profile.phone,
                referral_source: &profile.referral_source,
            })
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}
