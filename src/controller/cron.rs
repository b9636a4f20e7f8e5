use std::future::Future;
use std::pin::Pin;

use actix_web::dev::HttpServiceFactory;
use actix_web::http::header::{self, HeaderMap};
use actix_web::{dev, get, web, FromRequest, HttpRequest, HttpResponse};

use anyhow::Context;

use chrono::Utc;

use secrecy::{ExposeSecret, Secret};

use serde::Serialize;

use uuid::Uuid;

use crate::client::EmailClient;
use crate::error::{RestError, RestResult};
use crate::repo::LeadStore;
use crate::settings::Runtime;

pub fn scope() -> impl HttpServiceFactory {
    web::scope("/cron").service(reminder_emails)
}

/// Shared secret expected from the external cron trigger
#[derive(Debug, Clone)]
pub struct CronSecret(Secret<String>);

impl CronSecret {
    pub fn new(secret: Secret<String>) -> Self {
        Self(secret)
    }
}

/// Proof that the request carried the cron shared secret.
/// Authorization fails before any store access.
#[derive(Debug)]
pub struct CronAuthorized;

impl FromRequest for CronAuthorized {
    type Error = RestError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            // NOTE: Must be registered with the application at startup
            let secret = req
                .app_data::<web::Data<CronSecret>>()
                .expect("CronSecret not registered for application");

            let token = bearer_token(req.headers())
                .map_err(|e| RestError::Unauthorized(e.to_string()))?;

            if token != secret.0.expose_secret() {
                return Err(RestError::Unauthorized("Invalid cron secret".into()));
            }

            Ok(CronAuthorized)
        })
    }
}

fn bearer_token(headers: &HeaderMap) -> anyhow::Result<&str> {
    headers
        .get(header::AUTHORIZATION)
        .context("Missing authorization header")?
        .to_str()
        .context("Malformed authorization header")?
        .strip_prefix("Bearer ")
        .context("Authorization scheme not bearer")
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcessedReminder {
    id: Uuid,
    email: String,
    reminder_count: i32,
}

#[derive(Debug, Serialize)]
struct SweepSummary {
    message: String,
    processed: Vec<ProcessedReminder>,
}

/// Sweep partial, stale, under-reminded submissions and advance their
/// reminder bookkeeping. Each candidate is handled independently: a dispatch
/// or store failure skips that candidate without aborting the batch.
#[tracing::instrument(name = "Reminder sweep", skip_all)]
#[get("/reminder-emails")]
async fn reminder_emails(
    _auth: CronAuthorized,
    store: web::Data<dyn LeadStore>,
    email_client: web::Data<EmailClient>,
    runtime: web::Data<Runtime>,
) -> RestResult<HttpResponse> {
    let runtime = *runtime.get_ref();
    let now = Utc::now();

    let candidates = store
        .reminder_candidates(now)
        .await
        .map_err(|e| RestError::store(runtime, e))?;

    if candidates.is_empty() {
        return Ok(HttpResponse::Ok().json(SweepSummary {
            message: "no reminder candidates".into(),
            processed: Vec::new(),
        }));
    }

    let mut processed = Vec::new();
    for lead in candidates {
        let recipient = match lead.email.parse() {
            Ok(email) => email,
            Err(e) => {
                tracing::warn!("Skipping lead {} with unparseable email: {}", lead.id, e);
                continue;
            }
        };

        let reminder_number = lead.reminders_count + 1;

        if let Err(e) = email_client.send_reminder(&recipient, reminder_number).await {
            tracing::warn!("Failed to send reminder for lead {}: {}", lead.id, e);
            continue;
        }

        if let Err(e) = store.record_reminder(lead.id, now).await {
            tracing::error!("Failed to record reminder for lead {}: {}", lead.id, e);
            continue;
        }

        processed.push(ProcessedReminder {
            id: lead.id,
            email: lead.email,
            reminder_count: reminder_number,
        });
    }

    tracing::info!("Reminder sweep processed {} lead(s)", processed.len());

    Ok(HttpResponse::Ok().json(SweepSummary {
        message: format!("processed {} reminder(s)", processed.len()),
        processed,
    }))
}
