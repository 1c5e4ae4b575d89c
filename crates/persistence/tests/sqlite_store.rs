//! SqliteCallStore against real database files

use chrono::{Duration, Utc};

use cold_call_config::PersistenceConfig;
use cold_call_persistence::{CallOutcome, CallRecord, CallRecordStore, SqliteCallStore};

fn record(phone: &str, minutes_ago: i64) -> CallRecord {
    let mut record = CallRecord::new(phone);
    record.call_timestamp = Utc::now() - Duration::minutes(minutes_ago);
    record
}

#[tokio::test]
async fn test_save_and_get_full_record() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("calls.db");
    let store = SqliteCallStore::open(path.to_str().unwrap()).unwrap();

    let mut call = record("+79161234567", 0);
    call.duration_seconds = 185;
    call.secretary_name = Some("Ольга".to_string());
    call.decision_maker_name = Some("Иван".to_string());
    call.decision_maker_email = Some("ivan@firma.ru".to_string());
    call.directions = vec!["Гуанчжоу - Москва".to_string()];
    call.objections = vec!["busy".to_string(), "send_email".to_string()];
    call.outcome = CallOutcome::ContactObtained;
    call.notes = Some("Перезвонить после 15:00".to_string());

    let id = store.save_call(&call).await.unwrap();
    let loaded = store.get_call(id).await.unwrap().unwrap();

    assert_eq!(loaded.id, Some(id));
    assert_eq!(loaded.phone_number, "+79161234567");
    assert_eq!(loaded.duration_seconds, 185);
    assert_eq!(loaded.decision_maker_email.as_deref(), Some("ivan@firma.ru"));
    assert_eq!(loaded.objections, ["busy", "send_email"]);
    assert_eq!(loaded.directions, ["Гуанчжоу - Москва"]);
    assert!(loaded.pain_points.is_empty());
    assert_eq!(loaded.outcome, CallOutcome::ContactObtained);
    assert_eq!(loaded.call_timestamp.timestamp(), call.call_timestamp.timestamp());
}

#[tokio::test]
async fn test_ids_are_sequential_and_listing_is_newest_first() {
    let store = SqliteCallStore::open(":memory:").unwrap();

    let first = store.save_call(&record("+70000000001", 30)).await.unwrap();
    let second = store.save_call(&record("+70000000002", 10)).await.unwrap();
    let third = store.save_call(&record("+70000000003", 20)).await.unwrap();
    assert!(first < second && second < third);

    let phones: Vec<String> = store
        .list_calls(10)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.phone_number)
        .collect();
    assert_eq!(phones, ["+70000000002", "+70000000003", "+70000000001"]);

    assert_eq!(store.list_calls(1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_missing_call_is_none() {
    let store = SqliteCallStore::open(":memory:").unwrap();
    assert!(store.get_call(42).await.unwrap().is_none());
}

#[tokio::test]
async fn test_reopen_keeps_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/calls.db");
    let path = path.to_str().unwrap();

    let id = {
        let store = SqliteCallStore::open(path).unwrap();
        store.save_call(&record("+70000000001", 0)).await.unwrap()
    };

    let store = SqliteCallStore::open(path).unwrap();
    assert!(store.get_call(id).await.unwrap().is_some());
}

#[test]
fn test_init_respects_enabled_flag() {
    let disabled = PersistenceConfig {
        enabled: false,
        database_path: ":memory:".to_string(),
    };
    assert!(cold_call_persistence::init(&disabled).unwrap().is_none());

    let enabled = PersistenceConfig {
        enabled: true,
        database_path: ":memory:".to_string(),
    };
    assert!(cold_call_persistence::init(&enabled).unwrap().is_some());
}
