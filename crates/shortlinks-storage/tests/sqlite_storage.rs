mod common;

use shortlinks_storage::{ReadStorage, SqliteStorage, Storage};

async fn storage() -> SqliteStorage {
    common::init_tracing();
    SqliteStorage::connect("sqlite::memory:")
        .await
        .expect("open in-memory sqlite")
}

#[tokio::test]
async fn put_then_get() {
    common::put_then_get(&storage().await).await;
}

#[tokio::test]
async fn empty_key_is_rejected() {
    common::empty_key_is_rejected(&storage().await).await;
}

#[tokio::test]
async fn delete_moves_link_to_tombstones() {
    common::delete_moves_link_to_tombstones(&storage().await).await;
}

#[tokio::test]
async fn history_records_saves_and_deletes() {
    common::history_records_saves_and_deletes(&storage().await).await;
}

#[tokio::test]
async fn appended_history_keeps_given_time() {
    common::appended_history_keeps_given_time(&storage().await).await;
}

#[tokio::test]
async fn appends_at_the_same_time_are_all_kept() {
    common::appends_at_the_same_time_are_all_kept(&storage().await).await;
}

#[tokio::test]
async fn recreate_after_delete_leaves_no_tombstone() {
    let deleted = common::recreate_after_delete(&storage().await).await;
    assert!(deleted.is_empty(), "{deleted:?}");
}

#[tokio::test]
async fn list_is_sorted() {
    common::list_is_sorted(&storage().await, 25).await;
}

#[tokio::test]
async fn delete_of_unknown_name_still_records_history() {
    let storage = storage().await;
    storage.delete_link("ghost", "alice").await.unwrap();

    assert_eq!(storage.get_link("ghost").await.unwrap(), None);
    let history = storage.list_history("ghost").await.unwrap();
    assert_eq!(history.len(), 1);
    assert!(history[0].is_delete());
}

#[tokio::test]
async fn file_database_survives_reopen() {
    common::init_tracing();
    let path = std::env::temp_dir().join(format!("shortlinks-{}.db", std::process::id()));
    let url = format!("sqlite://{}?mode=rwc", path.display());

    {
        let storage = SqliteStorage::connect(&url).await.unwrap();
        storage
            .save_link(common::link("go"), "alice")
            .await
            .unwrap();
        storage.pool().close().await;
    }

    let reopened = SqliteStorage::connect(&url).await.unwrap();
    assert_eq!(
        reopened.get_link("go").await.unwrap(),
        Some(common::link("go"))
    );
    reopened.pool().close().await;
    let _ = std::fs::remove_file(&path);
}
