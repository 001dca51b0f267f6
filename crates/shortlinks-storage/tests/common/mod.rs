//! Behaviour every storage backend must share.
//!
//! Each integration test file builds its backend and calls these checks.

#![allow(dead_code)]

use shortlinks_storage::{History, ReadStorage, Shortlink, Storage, StorageError};
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

pub fn link(from: &str) -> Shortlink {
    Shortlink::new(from, format!("https://example.com/{from}"))
}

pub fn froms(links: &[Shortlink]) -> Vec<&str> {
    links.iter().map(|l| l.from.as_str()).collect()
}

async fn deleted_froms(storage: &dyn Storage) -> Vec<String> {
    let deleted = storage
        .deleted_links()
        .expect("backend should list deleted links")
        .list_deleted()
        .await
        .expect("list_deleted");
    deleted.into_iter().map(|l| l.from).collect()
}

pub async fn put_then_get(storage: &dyn Storage) {
    let frew = link("frew").with_description("Frew's blog");
    storage.put_link(frew.clone()).await.unwrap();

    assert_eq!(storage.get_link("frew").await.unwrap(), Some(frew));
    assert_eq!(storage.get_link("nope").await.unwrap(), None);

    // overwrite replaces the target
    let moved = Shortlink::new("frew", "https://frew.co");
    storage.put_link(moved.clone()).await.unwrap();
    assert_eq!(storage.get_link("frew").await.unwrap(), Some(moved));
    assert_eq!(storage.list_links().await.unwrap().len(), 1);
}

pub async fn empty_key_is_rejected(storage: &dyn Storage) {
    assert!(storage.put_link(link("")).await.is_err());
    assert!(storage.delete_link("", "alice").await.is_err());

    let err = storage
        .append_history(History::builder().from("").to("https://example.com").build())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidKey(_)), "{err:?}");
    assert!(storage.list_history("").await.unwrap().is_empty());
    assert!(storage.list_links().await.unwrap().is_empty());
}

pub async fn delete_moves_link_to_tombstones(storage: &dyn Storage) {
    storage.put_link(link("go")).await.unwrap();
    storage.put_link(link("docs")).await.unwrap();

    storage.delete_link("go", "alice").await.unwrap();

    assert_eq!(storage.get_link("go").await.unwrap(), None);
    assert_eq!(froms(&storage.list_links().await.unwrap()), vec!["docs"]);
    assert_eq!(deleted_froms(storage).await, vec!["go"]);
}

pub async fn history_records_saves_and_deletes(storage: &dyn Storage) {
    storage.save_link(link("frew"), "alice").await.unwrap();
    assert_eq!(storage.list_history("frew").await.unwrap().len(), 1);

    storage
        .save_link(Shortlink::new("frew", "https://frew.co"), "bob")
        .await
        .unwrap();
    storage.delete_link("frew", "carol").await.unwrap();

    let history = storage.list_history("frew").await.unwrap();
    assert_eq!(history.len(), 3);

    let who: Vec<&str> = history.iter().map(|h| h.who.as_str()).collect();
    assert_eq!(who, vec!["alice", "bob", "carol"]);
    assert_eq!(history[1].to, "https://frew.co");
    assert!(!history[1].is_delete());
    assert!(history[2].is_delete());

    let whens: Vec<_> = history.iter().map(|h| h.when.unwrap()).collect();
    assert!(whens.windows(2).all(|w| w[0] <= w[1]), "{whens:?}");

    // other names have their own history
    assert!(storage.list_history("fre").await.unwrap().is_empty());
}

pub async fn appended_history_keeps_given_time(storage: &dyn Storage) {
    let when = jiff::Timestamp::from_second(1_600_000_000).unwrap();
    let entry = History::builder()
        .from("frew")
        .to("https://frew.co")
        .who("importer")
        .when(when)
        .build();
    storage.append_history(entry).await.unwrap();

    let history = storage.list_history("frew").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].when, Some(when));
    assert_eq!(history[0].who, "importer");
}

pub async fn appends_at_the_same_time_are_all_kept(storage: &dyn Storage) {
    let when = jiff::Timestamp::from_second(1_600_000_000).unwrap();
    for who in ["alice", "bob", "carol"] {
        let entry = History::builder()
            .from("go")
            .to("https://go.dev")
            .who(who)
            .when(when)
            .build();
        storage.append_history(entry).await.unwrap();
    }

    let history = storage.list_history("go").await.unwrap();
    let who: Vec<&str> = history.iter().map(|h| h.who.as_str()).collect();
    assert_eq!(who, vec!["alice", "bob", "carol"]);
    assert!(history.iter().all(|h| h.when.unwrap() >= when));
}

/// Returns the tombstones left after recreating a deleted name so callers can
/// assert the backend-specific part.
pub async fn recreate_after_delete(storage: &dyn Storage) -> Vec<String> {
    storage.save_link(link("go"), "alice").await.unwrap();
    storage.delete_link("go", "alice").await.unwrap();

    let again = Shortlink::new("go", "https://go.dev");
    storage.save_link(again.clone(), "bob").await.unwrap();

    assert_eq!(storage.get_link("go").await.unwrap(), Some(again));
    assert_eq!(froms(&storage.list_links().await.unwrap()), vec!["go"]);
    assert_eq!(storage.list_history("go").await.unwrap().len(), 3);

    deleted_froms(storage).await
}

pub async fn list_is_sorted(storage: &dyn Storage, count: usize) {
    let mut names: Vec<String> = (0..count).map(|i| format!("link-{i:03}")).collect();
    // insert in a scrambled order
    names.sort_by_key(|n| n.bytes().rev().collect::<Vec<_>>());
    for name in &names {
        storage.put_link(link(name)).await.unwrap();
    }

    let listed = storage.list_links().await.unwrap();
    let listed = froms(&listed);
    let mut expected: Vec<&str> = names.iter().map(String::as_str).collect();
    expected.sort();
    assert_eq!(listed, expected);
}
