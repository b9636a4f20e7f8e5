use reqwest::{Method, StatusCode};

use serde_json::{json, Value};

use uuid::Uuid;

use leadflow::model::SubmissionStatus;
use leadflow::repo::LeadStore;

use crate::helpers::{capture_submission_id, complete_body, TestApp};

#[tokio::test]
async fn capture_returns_a_submission_id_for_a_valid_email() {
    let app = TestApp::spawn().await;

    let id = capture_submission_id(&app, "lead@example.com").await;

    let lead = app.store.fetch_by_id(id).await.unwrap().unwrap();
    assert_eq!("lead@example.com", lead.email);
    assert_eq!(SubmissionStatus::Partial, lead.status);
    assert_eq!(0, lead.reminders_count);
    assert_eq!(1, app.store.len());
}

#[tokio::test]
async fn capturing_the_same_email_twice_converges_to_one_row() {
    let app = TestApp::spawn().await;

    let first = capture_submission_id(&app, "lead@example.com").await;
    let second = capture_submission_id(&app, "lead@example.com").await;

    assert_eq!(first, second);
    assert_eq!(1, app.store.len());
}

#[tokio::test]
async fn capture_rejects_an_invalid_email_without_writing() {
    let app = TestApp::spawn().await;

    let res = app
        .capture_email(&json!({ "email": "definitely-not-an-email" }))
        .await
        .expect("Failed to execute capture request");

    assert_eq!(StatusCode::BAD_REQUEST, res.status());
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn capture_rejects_a_missing_email_field() {
    let app = TestApp::spawn().await;

    let res = app
        .capture_email(&json!({}))
        .await
        .expect("Failed to execute capture request");

    assert_eq!(StatusCode::BAD_REQUEST, res.status());
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn capture_rejects_a_malformed_body() {
    let app = TestApp::spawn().await;

    let res = app
        .request(Method::POST, "leads/capture-email")
        .header("Content-Type", "application/json")
        .body("{ not json")
        .send()
        .await
        .expect("Failed to execute capture request");

    assert_eq!(StatusCode::BAD_REQUEST, res.status());
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn completing_an_unknown_submission_returns_not_found() {
    let app = TestApp::spawn().await;

    let res = app
        .complete(&complete_body(Uuid::new_v4(), "lead@example.com"))
        .await
        .expect("Failed to execute complete request");

    assert_eq!(StatusCode::NOT_FOUND, res.status());
}

#[tokio::test]
async fn completing_with_a_mismatched_email_conflicts() {
    let app = TestApp::spawn().await;

    let id = capture_submission_id(&app, "lead@example.com").await;

    let res = app
        .complete(&complete_body(id, "hijacker@example.com"))
        .await
        .expect("Failed to execute complete request");

    assert_eq!(StatusCode::CONFLICT, res.status());

    // No write happened
    let lead = app.store.fetch_by_id(id).await.unwrap().unwrap();
    assert_eq!(SubmissionStatus::Partial, lead.status);
    assert_eq!(None, lead.first_name);
}

#[tokio::test]
async fn completion_transitions_the_submission_and_is_terminal() {
    let app = TestApp::spawn().await;

    let id = capture_submission_id(&app, "lead@example.com").await;

    let res = app
        .complete(&complete_body(id, "lead@example.com"))
        .await
        .expect("Failed to execute complete request");
    assert!(res.status().is_success());

    let lead = app.store.fetch_by_id(id).await.unwrap().unwrap();
    assert_eq!(SubmissionStatus::Complete, lead.status);
    assert!(lead.completed_at.is_some());
    assert_eq!(Some("Jane".into()), lead.first_name);

    // A second completion attempt must not silently overwrite the profile
    let res = app
        .complete(&complete_body(id, "lead@example.com"))
        .await
        .expect("Failed to execute complete request");
    assert_eq!(StatusCode::CONFLICT, res.status());
}

#[tokio::test]
async fn completion_reports_field_level_errors() {
    let app = TestApp::spawn().await;

    let id = capture_submission_id(&app, "lead@example.com").await;

    let mut body = complete_body(id, "lead@example.com");
    body["revenue"] = json!("");
    body["phone"] = json!("   ");

    let res = app
        .complete(&body)
        .await
        .expect("Failed to execute complete request");
    assert_eq!(StatusCode::BAD_REQUEST, res.status());

    let payload: Value = res.json().await.expect("Failed to parse error body");
    let fields: Vec<&str> = payload["fields"]
        .as_array()
        .expect("Missing fields in validation error")
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();

    assert_eq!(vec!["revenue", "phone"], fields);

    // Validation happens before any store write
    let lead = app.store.fetch_by_id(id).await.unwrap().unwrap();
    assert_eq!(SubmissionStatus::Partial, lead.status);
}

#[tokio::test]
async fn the_sixth_request_in_a_window_is_throttled() {
    let app = TestApp::spawn().await;

    for i in 1..=5 {
        let res = app
            .capture_email(&json!({ "email": "lead@example.com" }))
            .await
            .expect("Failed to execute capture request");
        assert!(res.status().is_success(), "request {} should pass", i);

        if i == 5 {
            let remaining = res
                .headers()
                .get("X-RateLimit-Remaining")
                .expect("Missing rate-limit header")
                .to_str()
                .unwrap();
            assert_eq!("0", remaining);
        }
    }

    let res = app
        .capture_email(&json!({ "email": "lead@example.com" }))
        .await
        .expect("Failed to execute capture request");

    assert_eq!(StatusCode::TOO_MANY_REQUESTS, res.status());
    assert_eq!(
        "5",
        res.headers()
            .get("X-RateLimit-Limit")
            .expect("Missing rate-limit header")
            .to_str()
            .unwrap()
    );
    assert_eq!(
        "0",
        res.headers()
            .get("X-RateLimit-Remaining")
            .expect("Missing rate-limit header")
            .to_str()
            .unwrap()
    );
    assert!(res.headers().get("X-RateLimit-Reset").is_some());
}

#[tokio::test]
async fn a_throttled_request_with_a_malformed_body_is_still_throttled() {
    let app = TestApp::spawn().await;

    for _ in 0..5 {
        app.capture_email(&json!({ "email": "lead@example.com" }))
            .await
            .expect("Failed to execute capture request");
    }

    // The throttle answers before the body is ever parsed
    let res = app
        .request(Method::POST, "leads/capture-email")
        .header("Content-Type", "application/json")
        .body("{ not json")
        .send()
        .await
        .expect("Failed to execute capture request");

    assert_eq!(StatusCode::TOO_MANY_REQUESTS, res.status());
}
