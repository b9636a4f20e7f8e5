use std::net::TcpListener;
use std::sync::Arc;

use actix_web::dev::Server;
use actix_web::{get, HttpResponse, Responder};
use actix_web::{web, App, HttpServer};

use tracing_actix_web::TracingLogger;

use crate::client::EmailClient;
use crate::controller::cron::{self, CronSecret};
use crate::controller::leads;
use crate::limiter::RateLimiter;
use crate::repo::LeadStore;
use crate::settings::Runtime;

/// Simple health-check endpoint
#[tracing::instrument(name = "Health check")]
#[get("/health_check")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().body("I am alive")
}

/// Run the application on a specified TCP listener
pub fn run(
    listener: TcpListener,
    store: Arc<dyn LeadStore>,
    limiter: Arc<dyn RateLimiter>,
    email_client: EmailClient,
    cron_secret: CronSecret,
    runtime: Runtime,
) -> anyhow::Result<Server> {
    // Wrap application data
    let store = web::Data::from(store);
    let limiter = web::Data::from(limiter);
    let email_client = web::Data::new(email_client);
    let cron_secret = web::Data::new(cron_secret);
    let runtime = web::Data::new(runtime);

    // Start the server
    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(store.clone())
            .app_data(limiter.clone())
            .app_data(email_client.clone())
            .app_data(cron_secret.clone())
            .app_data(runtime.clone())
            .service(health_check)
            .service(leads::scope())
            .service(cron::scope())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
