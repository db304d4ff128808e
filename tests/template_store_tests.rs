mod common;

use common::{seed_template, setup};
use solardocs_server::error::DocumentError;
use solardocs_server::storage::ObjectStorage;
use uuid::Uuid;

#[tokio::test]
async fn created_templates_are_listed_most_recently_updated_first() {
    let env = setup();
    let first = seed_template(&env, "Older", "Proposal").await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = seed_template(&env, "Newer", "Proposal").await;

    let listed = env.state.templates.list().await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, second.id);
    assert_eq!(listed[1].id, first.id);

    // Touching the older template moves it to the front.
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    env.state
        .templates
        .create_or_update(
            Some(first.id),
            "Older Renamed".to_string(),
            "Proposal".to_string(),
            None,
            None,
        )
        .await
        .unwrap();

    let listed = env.state.templates.list().await.unwrap();
    assert_eq!(listed[0].id, first.id);
    assert_eq!(listed[0].name, "Older Renamed");
}

#[tokio::test]
async fn get_returns_none_for_missing_id() {
    let env = setup();
    let found = env.state.templates.get(&Uuid::new_v4()).await.unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn update_with_new_blob_deletes_the_replaced_one() {
    let env = setup();
    let template = seed_template(&env, "PO Template", "Purchase Order").await;
    let old_key = template.blob_key.clone().unwrap();

    let new_key = "templates/replacement.docx".to_string();
    env.storage.upload_file(&new_key, b"v2").await.unwrap();

    let updated = env
        .state
        .templates
        .create_or_update(
            Some(template.id),
            template.name.clone(),
            template.category.clone(),
            Some(new_key.clone()),
            None,
        )
        .await
        .unwrap();

    assert_eq!(updated.blob_key.as_deref(), Some(new_key.as_str()));
    assert_eq!(updated.category, "Purchase Order");
    assert!(!env.storage.has_file(&old_key));
    assert!(env.storage.has_file(&new_key));
}

#[tokio::test]
async fn update_without_new_blob_keeps_the_existing_one() {
    let env = setup();
    let template = seed_template(&env, "PO Template", "Purchase Order").await;
    let blob_key = template.blob_key.clone().unwrap();

    let updated = env
        .state
        .templates
        .create_or_update(
            Some(template.id),
            "Renamed".to_string(),
            template.category.clone(),
            None,
            Some(vec!["client_name".to_string()]),
        )
        .await
        .unwrap();

    assert_eq!(updated.name, "Renamed");
    assert_eq!(updated.blob_key.as_deref(), Some(blob_key.as_str()));
    assert_eq!(updated.placeholders, Some(vec!["client_name".to_string()]));
    assert!(env.storage.has_file(&blob_key));
}

#[tokio::test]
async fn updating_a_missing_template_is_not_found() {
    let env = setup();
    let err = env
        .state
        .templates
        .create_or_update(
            Some(Uuid::new_v4()),
            "Ghost".to_string(),
            "Proposal".to_string(),
            None,
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DocumentError::NotFound(_)));
}

#[tokio::test]
async fn delete_removes_blob_then_record() {
    let env = setup();
    let template = seed_template(&env, "PO Template", "Purchase Order").await;
    let blob_key = template.blob_key.clone().unwrap();

    let deleted = env.state.templates.delete(&template.id).await.unwrap();
    assert!(deleted);
    assert!(!env.storage.has_file(&blob_key));
    assert!(env.state.templates.get(&template.id).await.unwrap().is_none());

    // Second delete reports false without erroring.
    let deleted_again = env.state.templates.delete(&template.id).await.unwrap();
    assert!(!deleted_again);
}
