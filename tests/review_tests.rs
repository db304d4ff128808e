mod common;

use common::{form, seed_document_type, seed_template, setup, TestEnv};
use chrono::Utc;
use serde_json::json;
use solardocs_server::db::Repository;
use solardocs_server::document::models::{
    ApprovalStatus, DocumentKind, GenerateDocumentRequest,
};
use uuid::Uuid;

async fn generate_financial(env: &TestEnv) -> Uuid {
    seed_document_type(env, "Net Metering Agreement", true).await;
    let template = seed_template(env, "NMA Template", "Net Metering Agreement").await;
    env.state
        .generator
        .generate(GenerateDocumentRequest {
            template_id: template.id,
            form_data: form(&[("Client Name", json!("Acme"))]),
            document_type: "Net Metering Agreement".to_string(),
            document_id_to_update: None,
        })
        .await
        .unwrap()
        .document_id
}

#[tokio::test]
async fn review_sets_status_reviewer_and_timestamp() {
    let env = setup();
    let document_id = generate_financial(&env).await;

    let before = Utc::now();
    let reviewed = env
        .repo
        .review_document(
            &document_id,
            ApprovalStatus::Approved,
            "admin@solardocs.io",
            Utc::now(),
        )
        .await
        .unwrap()
        .expect("review should apply");

    match reviewed.kind {
        DocumentKind::Financial { approval } => {
            assert_eq!(approval.status, ApprovalStatus::Approved);
            assert_eq!(approval.reviewed_by.as_deref(), Some("admin@solardocs.io"));
            assert!(approval.reviewed_at.unwrap() >= before);
        }
        DocumentKind::Standard => panic!("expected a financial document"),
    }
}

#[tokio::test]
async fn repeated_reviews_are_last_write_wins() {
    let env = setup();
    let document_id = generate_financial(&env).await;

    env.repo
        .review_document(
            &document_id,
            ApprovalStatus::Approved,
            "first@solardocs.io",
            Utc::now(),
        )
        .await
        .unwrap()
        .unwrap();

    let second_at = Utc::now();
    env.repo
        .review_document(
            &document_id,
            ApprovalStatus::Rejected,
            "second@solardocs.io",
            second_at,
        )
        .await
        .unwrap()
        .unwrap();

    let record = env.repo.get_document(&document_id).await.unwrap().unwrap();
    match record.kind {
        DocumentKind::Financial { approval } => {
            // No history: only the second review survives.
            assert_eq!(approval.status, ApprovalStatus::Rejected);
            assert_eq!(approval.reviewed_by.as_deref(), Some("second@solardocs.io"));
            assert_eq!(approval.reviewed_at, Some(second_at));
        }
        DocumentKind::Standard => panic!("expected a financial document"),
    }
}

#[tokio::test]
async fn reviewing_a_missing_document_matches_nothing() {
    let env = setup();
    let reviewed = env
        .repo
        .review_document(
            &Uuid::new_v4(),
            ApprovalStatus::Approved,
            "admin@solardocs.io",
            Utc::now(),
        )
        .await
        .unwrap();
    assert!(reviewed.is_none());
}

#[tokio::test]
async fn standard_documents_cannot_be_reviewed() {
    let env = setup();
    seed_document_type(&env, "Purchase Order", false).await;
    let template = seed_template(&env, "PO Template", "Purchase Order").await;
    let outcome = env
        .state
        .generator
        .generate(GenerateDocumentRequest {
            template_id: template.id,
            form_data: form(&[("Client Name", json!("Acme"))]),
            document_type: "Purchase Order".to_string(),
            document_id_to_update: None,
        })
        .await
        .unwrap();

    let reviewed = env
        .repo
        .review_document(
            &outcome.document_id,
            ApprovalStatus::Approved,
            "admin@solardocs.io",
            Utc::now(),
        )
        .await
        .unwrap();
    assert!(reviewed.is_none());

    // The record itself is untouched.
    let record = env
        .repo
        .get_document(&outcome.document_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.kind, DocumentKind::Standard);
}
