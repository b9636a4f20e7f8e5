use std::net::TcpListener;
use std::sync::Arc;

use anyhow::Context;

use sqlx::PgPool;

use leadflow::app;
use leadflow::client::EmailClient;
use leadflow::controller::cron::CronSecret;
use leadflow::limiter::{MemoryRateLimiter, RateLimiter, RedisRateLimiter};
use leadflow::repo::{LeadStore, PgLeadStore};
use leadflow::settings::{LimiterSettings, Runtime, Settings};
use leadflow::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = telemetry::create_subscriber("info".into(), std::io::stdout);
    telemetry::set_subscriber(subscriber)?;

    let runtime = Runtime::from_env()?;
    let settings = Settings::load(runtime).expect("Failed to load settings");

    let pool = PgPool::connect_with(settings.database.with_db()).await?;
    let store: Arc<dyn LeadStore> = Arc::new(PgLeadStore::new(pool));

    let limiter = build_limiter(&settings.limiter).await;

    let email_client = EmailClient::new(
        settings.email.sender(),
        settings.email.api_timeout(),
        settings.email.api_base_url(),
        settings.email.api_auth_token(),
    )?;

    let cron_secret = CronSecret::new(settings.cron.secret());

    let listener = TcpListener::bind(settings.app.addr())?;

    app::run(listener, store, limiter, email_client, cron_secret, runtime)?
        .await
        .context("Failed to run app")
}

/// Select the rate-limit backend at startup: the networked counter when one
/// is configured, otherwise the single-process fallback.
async fn build_limiter(settings: &LimiterSettings) -> Arc<dyn RateLimiter> {
    let window = settings.window();
    let max_requests = settings.max_requests();

    match settings.redis_url() {
        Some(url) => match RedisRateLimiter::connect(url, window, max_requests).await {
            Ok(limiter) => Arc::new(limiter),
            Err(e) => {
                tracing::warn!(
                    "Failed to reach rate-limit backend, falling back to in-process counter: {}",
                    e
                );
                Arc::new(MemoryRateLimiter::new(window, max_requests))
            }
        },
        None => Arc::new(MemoryRateLimiter::new(window, max_requests)),
    }
}
