mod common;

use serde_json::json;
use shortlinks_storage::kv::{Item, KvStorage, KvTable, MemoryTable};
use shortlinks_storage::{ReadStorage, Storage, StorageError};
use std::sync::Arc;

fn storage() -> KvStorage<MemoryTable> {
    common::init_tracing();
    // small pages so listings cross page boundaries
    KvStorage::new(MemoryTable::with_page_size(3))
}

#[tokio::test]
async fn put_then_get() {
    common::put_then_get(&storage()).await;
}

#[tokio::test]
async fn empty_key_is_rejected() {
    common::empty_key_is_rejected(&storage()).await;
}

#[tokio::test]
async fn delete_moves_link_to_tombstones() {
    common::delete_moves_link_to_tombstones(&storage()).await;
}

#[tokio::test]
async fn history_records_saves_and_deletes() {
    common::history_records_saves_and_deletes(&storage()).await;
}

#[tokio::test]
async fn appended_history_keeps_given_time() {
    common::appended_history_keeps_given_time(&storage()).await;
}

#[tokio::test]
async fn appends_at_the_same_time_are_all_kept() {
    common::appends_at_the_same_time_are_all_kept(&storage()).await;
}

#[tokio::test]
async fn recreate_after_delete_keeps_stale_tombstone() {
    let storage = storage();
    let deleted = common::recreate_after_delete(&storage).await;

    // the tombstone still holds the pre-delete target
    assert_eq!(deleted, vec!["go"]);
    let tombstones = storage
        .deleted_links()
        .unwrap()
        .list_deleted()
        .await
        .unwrap();
    assert_eq!(tombstones[0], common::link("go"));
}

#[tokio::test]
async fn list_is_sorted_across_pages() {
    common::list_is_sorted(&storage(), 20).await;
}

#[tokio::test]
async fn history_pages_are_followed() {
    let storage = storage();
    for i in 0..8 {
        storage
            .save_link(common::link("go"), &format!("user{i}"))
            .await
            .unwrap();
    }

    let history = storage.list_history("go").await.unwrap();
    let who: Vec<String> = history.into_iter().map(|h| h.who).collect();
    let expected: Vec<String> = (0..8).map(|i| format!("user{i}")).collect();
    assert_eq!(who, expected);
}

#[tokio::test]
async fn repeated_delete_writes_history_but_no_new_tombstone() {
    let storage = storage();
    storage.put_link(common::link("go")).await.unwrap();

    storage.delete_link("go", "alice").await.unwrap();
    storage.delete_link("go", "bob").await.unwrap();

    assert_eq!(storage.list_history("go").await.unwrap().len(), 2);
    let tombstones = storage
        .deleted_links()
        .unwrap()
        .list_deleted()
        .await
        .unwrap();
    assert_eq!(tombstones, vec![common::link("go")]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_deletes_never_lose_the_link() {
    common::init_tracing();

    for round in 0..50 {
        let storage = Arc::new(KvStorage::new(MemoryTable::new()));
        let from = format!("race-{round}");
        storage.put_link(common::link(&from)).await.unwrap();

        let tasks: Vec<_> = (0..4)
            .map(|i| {
                let storage = Arc::clone(&storage);
                let from = from.clone();
                tokio::spawn(async move { storage.delete_link(&from, &format!("user{i}")).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let live = storage.get_link(&from).await.unwrap();
        let tombstoned = storage
            .deleted_links()
            .unwrap()
            .list_deleted()
            .await
            .unwrap()
            .iter()
            .any(|t| t.from == from);
        assert!(live.is_some() || tombstoned, "{from} vanished");
        assert_eq!(storage.list_history(&from).await.unwrap().len(), 4);
    }
}

fn raw_item(value: serde_json::Value) -> Item {
    value.as_object().cloned().unwrap()
}

#[tokio::test]
async fn malformed_live_item_is_fatal() {
    let storage = storage();
    storage.put_link(common::link("go")).await.unwrap();
    storage
        .table()
        .put_item(raw_item(json!({"pk": "s", "sk": "broken", "to": 42})))
        .await
        .unwrap();

    let err = storage.list_links().await.unwrap_err();
    assert!(matches!(err, StorageError::Marshaling(_)), "{err:?}");
    assert!(err.is_fatal());
    assert!(err.to_string().contains("list_links"));

    // single reads of intact items still work
    assert!(storage.get_link("go").await.unwrap().is_some());
}

#[tokio::test]
async fn malformed_history_item_is_fatal() {
    let storage = storage();
    storage.save_link(common::link("go"), "alice").await.unwrap();
    storage
        .table()
        .put_item(raw_item(
            json!({"pk": "hgo", "sk": "yesterday", "who": "mallory"}),
        ))
        .await
        .unwrap();

    let err = storage.list_history("go").await.unwrap_err();
    assert!(matches!(err, StorageError::Marshaling(_)), "{err:?}");
    assert!(err.is_fatal());
    assert!(err.to_string().contains("list_history(from=go)"));
}
