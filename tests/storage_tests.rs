//! Storage and intent-record persistence tests (libsql, file and memory).

use acip::db::{KvStore, LibsqlStore, StoreProvider};
use acip::intent::{IntentField, IntentModel, IntentStore, INTENT_MODEL_KEY};
use acip::utils::credentials::resolve_credential;
use std::sync::Arc;
use tempfile::TempDir;

async fn memory_store() -> Arc<dyn KvStore> {
    StoreProvider::Memory.create_store().await.unwrap()
}

#[tokio::test]
async fn test_kv_roundtrip_and_overwrite() {
    let store = memory_store().await;

    assert_eq!(store.get("missing").await.unwrap(), None);
    store.set("b", "1").await.unwrap();
    store.set("a", "2").await.unwrap();
    store.set("b", "3").await.unwrap();

    assert_eq!(store.get("b").await.unwrap().as_deref(), Some("3"));
    assert_eq!(store.keys().await.unwrap(), vec!["a", "b"]);

    store.remove("a").await.unwrap();
    store.remove("never-existed").await.unwrap();
    assert_eq!(store.keys().await.unwrap(), vec!["b"]);
}

#[tokio::test]
async fn test_file_store_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("acip.db");
    let path = path.to_str().unwrap();

    {
        let store: Arc<dyn KvStore> = Arc::new(LibsqlStore::new_local(path).await.unwrap());
        let intents = IntentStore::new(store, "default");
        let mut model = IntentModel::default();
        intents
            .update(&mut model, IntentField::Goal, "월 100만원 부수입")
            .await
            .unwrap();
        intents.save_user_name("민수").await.unwrap();
    }

    let store = StoreProvider::SQLite {
        path: path.to_string(),
    }
    .create_store()
    .await
    .unwrap();
    let intents = IntentStore::new(store, "default");

    let model = intents.load().await;
    assert_eq!(model.goal.as_deref(), Some("월 100만원 부수입"));
    assert!(model.created_at.is_some());
    assert!(model.updated_at >= model.created_at);
    assert_eq!(intents.load_user_name().await.as_deref(), Some("민수"));
}

#[tokio::test]
async fn test_created_at_is_kept_across_updates() {
    let intents = IntentStore::new(memory_store().await, "default");
    let mut model = IntentModel::default();

    intents
        .update(&mut model, IntentField::Topic, "반려견")
        .await
        .unwrap();
    let created = model.created_at;

    intents
        .update(&mut model, IntentField::Purpose, "부업")
        .await
        .unwrap();
    assert_eq!(model.created_at, created);

    let loaded = intents.load().await;
    assert_eq!(loaded.topic.as_deref(), Some("반려견"));
    assert_eq!(loaded.purpose.as_deref(), Some("부업"));
}

#[tokio::test]
async fn test_version_mismatch_is_discarded() {
    let store = memory_store().await;
    store
        .set(
            INTENT_MODEL_KEY,
            r#"{"version":"0.9","topic":"오래된 기록"}"#,
        )
        .await
        .unwrap();

    let model = IntentStore::new(store.clone(), "default").load().await;
    assert_eq!(model, IntentModel::default());
    assert_eq!(store.get(INTENT_MODEL_KEY).await.unwrap(), None);
}

#[tokio::test]
async fn test_undecodable_record_is_discarded() {
    let store = memory_store().await;
    store.set(INTENT_MODEL_KEY, "{not json").await.unwrap();

    let model = IntentStore::new(store.clone(), "default").load().await;
    assert_eq!(model, IntentModel::default());
    assert_eq!(store.get(INTENT_MODEL_KEY).await.unwrap(), None);
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let store = memory_store().await;
    let work = IntentStore::new(store.clone(), "work");
    let home = IntentStore::new(store.clone(), "home");

    let mut model = IntentModel::default();
    work.update(&mut model, IntentField::Topic, "사내 툴")
        .await
        .unwrap();

    assert_eq!(home.load().await.topic, None);
    assert_eq!(work.load().await.topic.as_deref(), Some("사내 툴"));
    assert_eq!(
        store.keys().await.unwrap(),
        vec![format!("{}:work", INTENT_MODEL_KEY)]
    );
}

#[tokio::test]
async fn test_reset_then_clear_user_name() {
    let intents = IntentStore::new(memory_store().await, "default");
    let mut model = IntentModel::default();
    intents
        .update(&mut model, IntentField::Resources, "노트북 한 대")
        .await
        .unwrap();
    intents.save_user_name("지은").await.unwrap();

    intents.reset().await.unwrap();
    assert_eq!(intents.load().await, IntentModel::default());
    assert_eq!(intents.load_user_name().await.as_deref(), Some("지은"));

    intents.clear_user_name().await.unwrap();
    assert_eq!(intents.load_user_name().await, None);
}

#[tokio::test]
async fn test_stored_credential_resolves_when_env_is_unset() {
    let store = memory_store().await;
    assert_eq!(
        resolve_credential("ACIP_TEST_STORAGE_ONLY_KEY", store.as_ref()).await,
        None
    );

    store
        .set("ACIP_TEST_STORAGE_ONLY_KEY", "  secret  ")
        .await
        .unwrap();
    assert_eq!(
        resolve_credential("ACIP_TEST_STORAGE_ONLY_KEY", store.as_ref())
            .await
            .as_deref(),
        Some("secret")
    );
}

#[tokio::test]
async fn test_blank_update_is_rejected() {
    let store = memory_store().await;
    let intents = IntentStore::new(store.clone(), "default");
    let mut model = IntentModel::default();

    let err = intents
        .update(&mut model, IntentField::Constraints, "   ")
        .await
        .unwrap_err();
    assert!(matches!(err, acip::AppError::InvalidInput(_)));
    assert_eq!(model.constraints, None);
    assert_eq!(store.get(INTENT_MODEL_KEY).await.unwrap(), None);
}
