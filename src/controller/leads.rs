use std::future::Future;
use std::pin::Pin;

use actix_web::dev::HttpServiceFactory;
use actix_web::http::header;
use actix_web::{dev, post, web, FromRequest, HttpRequest, HttpResponse};

use serde::{Deserialize, Serialize};

use uuid::Uuid;

use crate::domain::EmailAddress;
use crate::error::{FieldError, RestError, RestResult};
use crate::limiter::{RateLimitDecision, RateLimiter};
use crate::model::{LeadProfile, NewLeadSubmission, SubmissionStatus};
use crate::repo::LeadStore;
use crate::settings::Runtime;

pub fn scope() -> impl HttpServiceFactory {
    web::scope("/leads")
        .service(capture_email)
        .service(complete)
}

/// Admission ticket from the rate limiter, keyed on the client IP.
/// Handlers take the raw body bytes and parse JSON only after this guard
/// admits the request, so a throttled request is answered 429 even when its
/// body is malformed. (actix polls tuple extractors concurrently; a
/// `web::Json` argument could race its 400 ahead of the guard's 429.)
#[derive(Debug)]
pub struct RateLimitGuard {
    pub decision: RateLimitDecision,
}

impl FromRequest for RateLimitGuard {
    type Error = RestError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            // NOTE: Must be registered with the application at startup
            let limiter = req
                .app_data::<web::Data<dyn RateLimiter>>()
                .expect("RateLimiter not registered for application");

            let key = client_ip(&req).unwrap_or_else(|| "unknown".into());

            let decision = limiter.limit(&key).await;
            if decision.success {
                Ok(Self { decision })
            } else {
                Err(RestError::RateLimited(decision))
            }
        })
    }
}

/// The client identity used for rate limiting and abuse tracking.
/// Peer addresses carry a port, forwarded addresses usually do not.
pub(crate) fn client_ip(req: &HttpRequest) -> Option<String> {
    let info = req.connection_info();
    let addr = info.realip_remote_addr()?;

    let ip = addr
        .parse::<std::net::SocketAddr>()
        .map(|sock| sock.ip().to_string())
        .unwrap_or_else(|_| addr.to_string());

    Some(ip)
}

fn user_agent(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(String::from)
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &web::Bytes) -> RestResult<T> {
    serde_json::from_slice(body).map_err(|e| RestError::validation("body", e.to_string()))
}

#[derive(Debug, Deserialize)]
pub struct CaptureEmailRequest {
    email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CaptureEmailResponse {
    success: bool,
    submission_id: Uuid,
}

/// Create a partial submission for an email address, or resume the existing
/// one. Repeated calls with the same email converge to the same row.
#[tracing::instrument(name = "Capture lead email", skip(guard, req, store, runtime, body))]
#[post("/capture-email")]
async fn capture_email(
    guard: RateLimitGuard,
    req: HttpRequest,
    store: web::Data<dyn LeadStore>,
    runtime: web::Data<Runtime>,
    body: web::Bytes,
) -> RestResult<HttpResponse> {
    let runtime = *runtime.get_ref();
    let body: CaptureEmailRequest = parse_body(&body)?;

    let email: EmailAddress = body
        .email
        .parse()
        .map_err(|message: String| RestError::validation("email", message))?;

    let existing = store
        .find_by_email(&email)
        .await
        .map_err(|e| RestError::store(runtime, e))?;

    let submission_id = match existing {
        Some(lead) => {
            // Resume: no status reset, no cleared progress
            store
                .touch(lead.id)
                .await
                .map_err(|e| RestError::store(runtime, e))?;
            lead.id
        }
        None => {
            let new_lead = NewLeadSubmission {
                email,
                ip_address: client_ip(&req),
                user_agent: user_agent(&req),
            };
            store
                .insert(&new_lead)
                .await
                .map_err(|e| RestError::store(runtime, e))?
        }
    };

    let mut res = HttpResponse::Ok();
    guard.decision.apply_headers(&mut res);

    Ok(res.json(CaptureEmailResponse {
        success: true,
        submission_id,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRequest {
    submission_id: String,
    email: String,
    revenue: String,
    budget: String,
    website: String,
    first_name: String,
    last_name: String,
    phone: String,
    referral_source: String,
}

impl CompleteRequest {
    /// Field-level validation, reported before any store access
    fn validate(self) -> Result<(Uuid, EmailAddress, LeadProfile), Vec<FieldError>> {
        let mut errors = Vec::new();

        let submission_id = match self.submission_id.parse::<Uuid>() {
            Ok(id) => Some(id),
            Err(_) => {
                errors.push(FieldError::new("submissionId", "Invalid submission id"));
                None
            }
        };

        let email = match self.email.parse::<EmailAddress>() {
            Ok(email) => Some(email),
            Err(message) => {
                errors.push(FieldError::new("email", message));
                None
            }
        };

        let profile = match LeadProfile::from_fields(
            &self.revenue,
            &self.budget,
            &self.website,
            &self.first_name,
            &self.last_name,
            &self.phone,
            &self.referral_source,
        ) {
            Ok(profile) => Some(profile),
            Err(mut field_errors) => {
                errors.append(&mut field_errors);
                None
            }
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok((submission_id.unwrap(), email.unwrap(), profile.unwrap()))
    }
}

#[derive(Debug, Serialize)]
struct CompleteResponse {
    success: bool,
}

/// Finalize a submission: verify the id/email pairing, write the full
/// profile, and transition the record to complete. Completion is terminal;
/// repeat attempts are rejected rather than silently overwriting the profile.
#[tracing::instrument(name = "Complete lead submission", skip(guard, store, runtime, body))]
#[post("/complete")]
async fn complete(
    guard: RateLimitGuard,
    store: web::Data<dyn LeadStore>,
    runtime: web::Data<Runtime>,
    body: web::Bytes,
) -> RestResult<HttpResponse> {
    let runtime = *runtime.get_ref();
    let body: CompleteRequest = parse_body(&body)?;

    let (submission_id, email, profile) = body.validate().map_err(RestError::Validation)?;

    let lead = store
        .fetch_by_id(submission_id)
        .await
        .map_err(|e| RestError::store(runtime, e))?
        .ok_or_else(|| RestError::NotFound("Unknown submission id".into()))?;

    if lead.email != email.as_ref() {
        return Err(RestError::Conflict(
            "Email does not match this submission".into(),
        ));
    }

    if lead.status == SubmissionStatus::Complete {
        return Err(RestError::Conflict("Submission already completed".into()));
    }

    store
        .complete(lead.id, &profile)
        .await
        .map_err(|e| RestError::store(runtime, e))?;

    let mut res = HttpResponse::Ok();
    guard.decision.apply_headers(&mut res);

    Ok(res.json(CompleteResponse { success: true }))
}
