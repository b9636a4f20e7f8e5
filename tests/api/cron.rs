use chrono::{Duration, Utc};

use reqwest::StatusCode;

use serde_json::Value;

use uuid::Uuid;

use wiremock::matchers::{any, method, path};
use wiremock::{Mock, ResponseTemplate};

use leadflow::model::{LeadSubmission, SubmissionStatus};
use leadflow::repo::LeadStore;

use crate::helpers::TestApp;

/// Seed a partial submission created `hours_ago`, never reminded
fn partial_lead(email: &str, hours_ago: i64) -> LeadSubmission {
    let created_at = Utc::now() - Duration::hours(hours_ago);

    LeadSubmission {
        id: Uuid::new_v4(),
        email: email.into(),
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
        created_at,
        updated_at: created_at,
        completed_at: None,
        ip_address: None,
        user_agent: None,
    }
}

#[tokio::test]
async fn sweep_rejects_a_missing_secret() {
    let app = TestApp::spawn().await;
    app.store.put(partial_lead("due@example.com", 2));

    let res = app
        .run_reminder_sweep(None)
        .await
        .expect("Failed to execute sweep request");

    assert_eq!(StatusCode::UNAUTHORIZED, res.status());
}

#[tokio::test]
async fn sweep_rejects_a_wrong_secret_without_touching_the_store() {
    let app = TestApp::spawn().await;
    let lead = partial_lead("due@example.com", 2);
    let id = lead.id;
    app.store.put(lead);

    let res = app
        .run_reminder_sweep(Some("not-the-secret"))
        .await
        .expect("Failed to execute sweep request");

    assert_eq!(StatusCode::UNAUTHORIZED, res.status());

    let lead = app.store.fetch_by_id(id).await.unwrap().unwrap();
    assert_eq!(0, lead.reminders_count);
    assert_eq!(None, lead.last_reminder_at);
}

#[tokio::test]
async fn sweep_with_no_candidates_reports_an_empty_batch() {
    let app = TestApp::spawn().await;

    let res = app
        .run_reminder_sweep(Some(app.cron_secret.as_str()))
        .await
        .expect("Failed to execute sweep request");
    assert!(res.status().is_success());

    let body: Value = res.json().await.expect("Failed to parse sweep response");
    assert_eq!("no reminder candidates", body["message"]);
    assert_eq!(0, body["processed"].as_array().unwrap().len());
}

#[tokio::test]
async fn sweep_advances_only_eligible_candidates() {
    let app = TestApp::spawn().await;

    Mock::given(method("POST"))
        .and(path("/email"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.email_server)
        .await;

    // Eligible: partial, two hours old, never reminded
    let due = partial_lead("due@example.com", 2);
    let due_id = due.id;
    app.store.put(due);

    // Ineligible: still being filled in
    app.store.put(partial_lead("fresh@example.com", 0));

    // Ineligible: abandoned
    app.store.put(partial_lead("stale@example.com", 24 * 8));

    // Ineligible: already complete
    let mut done = partial_lead("done@example.com", 2);
    done.status = SubmissionStatus::Complete;
    done.completed_at = Some(Utc::now());
    app.store.put(done);

    // Ineligible: reminder cap reached
    let mut capped = partial_lead("capped@example.com", 48);
    capped.reminders_count = 3;
    capped.last_reminder_at = Some(Utc::now() - Duration::hours(25));
    app.store.put(capped);

    let res = app
        .run_reminder_sweep(Some(app.cron_secret.as_str()))
        .await
        .expect("Failed to execute sweep request");
    assert!(res.status().is_success());

    let body: Value = res.json().await.expect("Failed to parse sweep response");
    let processed = body["processed"].as_array().unwrap();
    assert_eq!(1, processed.len());
    assert_eq!("due@example.com", processed[0]["email"]);
    assert_eq!(1, processed[0]["reminderCount"]);

    let lead = app.store.fetch_by_id(due_id).await.unwrap().unwrap();
    assert_eq!(1, lead.reminders_count);
    assert!(lead.last_reminder_at.is_some());

    // Reminded moments ago: a second sweep finds nothing
    let res = app
        .run_reminder_sweep(Some(app.cron_secret.as_str()))
        .await
        .expect("Failed to execute sweep request");
    let body: Value = res.json().await.expect("Failed to parse sweep response");
    assert_eq!("no reminder candidates", body["message"]);
}

#[tokio::test]
async fn sweep_skips_a_candidate_when_dispatch_fails() {
    let app = TestApp::spawn().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .mount(&app.email_server)
        .await;

    let due = partial_lead("due@example.com", 2);
    let due_id = due.id;
    app.store.put(due);

    let res = app
        .run_reminder_sweep(Some(app.cron_secret.as_str()))
        .await
        .expect("Failed to execute sweep request");
    assert!(res.status().is_success());

    let body: Value = res.json().await.expect("Failed to parse sweep response");
    assert_eq!(0, body["processed"].as_array().unwrap().len());

    // Bookkeeping is only advanced alongside a successful dispatch
    let lead = app.store.fetch_by_id(due_id).await.unwrap().unwrap();
    assert_eq!(0, lead.reminders_count);
    assert_eq!(None, lead.last_reminder_at);
}
