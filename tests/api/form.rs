use std::time::Duration;

use url::Url;

use leadflow::form::{
    DraftStore, FormController, FormStep, HttpLeadApi, MemoryDraftStore, ProfileField,
};
use leadflow::model::SubmissionStatus;
use leadflow::repo::LeadStore;

use crate::helpers::TestApp;

fn api(app: &TestApp) -> HttpLeadApi {
    let base_url = Url::parse(app.addr()).expect("Failed to parse app address");
    HttpLeadApi::new(base_url, Duration::from_secs(2)).expect("Failed to create lead api")
}

#[tokio::test]
async fn the_full_flow_completes_against_the_live_endpoints() {
    let app = TestApp::spawn().await;
    let drafts = MemoryDraftStore::new();

    let mut form = FormController::open(drafts.clone(), api(&app)).unwrap();
    assert_eq!(FormStep::Email, form.step());

    form.set_email("flow@example.com").unwrap();
    form.submit_email().await.expect("Email capture failed");
    assert_eq!(FormStep::Details, form.step());

    // Close without completing; the draft carries the flow across reopen
    drop(form);
    let mut form = FormController::open(drafts.clone(), api(&app)).unwrap();
    assert_eq!(FormStep::Details, form.step());
    assert_eq!("flow@example.com", form.draft().email);

    form.set_field(ProfileField::Revenue, "$50k-$100k").unwrap();
    form.set_field(ProfileField::Budget, "$10k").unwrap();
    form.set_field(ProfileField::Website, "https://flow.example.com").unwrap();
    form.set_field(ProfileField::FirstName, "Flo").unwrap();
    form.set_field(ProfileField::LastName, "Woods").unwrap();
    form.set_field(ProfileField::Phone, "555-0101").unwrap();
    form.set_field(ProfileField::ReferralSource, "podcast").unwrap();

    let id = form.draft().submission_id.unwrap();
    form.submit_details().await.expect("Completion failed");
    assert_eq!(FormStep::Thanks, form.step());

    // Draft cleared, server row completed
    assert!(drafts.load().unwrap().is_none());
    let lead = app.store.fetch_by_id(id).await.unwrap().unwrap();
    assert_eq!(SubmissionStatus::Complete, lead.status);
    assert_eq!(Some("Flo".into()), lead.first_name);
}
