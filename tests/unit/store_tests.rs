use super::*;

use std::time::{SystemTime, UNIX_EPOCH};

struct TempDirGuard {
    path: PathBuf,
}

impl TempDirGuard {
    fn new(prefix: &str) -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock after epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!("caseforge-{prefix}-{nanos}"));
        std::fs::create_dir_all(&path).expect("temp dir should be creatable");
        Self { path }
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

fn card(title: &str, created_at: i64) -> ContextRule {
    ContextRule::new(title.to_string(), "content".to_string(), false, created_at)
}

#[test]
fn local_store_starts_empty_without_file() {
    let dir = TempDirGuard::new("local-empty");
    let store = LocalCardStore::open(&dir.path).expect("open");
    assert!(store.list().expect("list").is_empty());
    assert!(store.subscribe().is_none());
}

#[test]
fn local_store_round_trips_cards_through_disk() {
    let dir = TempDirGuard::new("local-roundtrip");
    let first = card("规范", 10);
    let second = card("边界", 5);
    {
        let store = LocalCardStore::open(&dir.path).expect("open");
        store.upsert(&first).expect("upsert first");
        store.upsert(&second).expect("upsert second");
    }

    let reopened = LocalCardStore::open(&dir.path).expect("reopen");
    let listed = reopened.list().expect("list");
    assert_eq!(listed.len(), 2);
    // Sorted by creation time, not insertion order.
    assert_eq!(listed[0].title, "边界");
    assert_eq!(listed[1].title, "规范");
}

#[test]
fn local_store_upsert_replaces_by_id() {
    let dir = TempDirGuard::new("local-upsert");
    let store = LocalCardStore::open(&dir.path).expect("open");
    let mut rule = card("原标题", 1);
    store.upsert(&rule).expect("insert");
    rule.title = "改后标题".to_string();
    rule.is_active = true;
    store.upsert(&rule).expect("update");

    let listed = store.list().expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].title, "改后标题");
    assert!(listed[0].is_active);
}

#[test]
fn local_store_remove_is_idempotent() {
    let dir = TempDirGuard::new("local-remove");
    let store = LocalCardStore::open(&dir.path).expect("open");
    let rule = card("删除我", 1);
    store.upsert(&rule).expect("insert");
    store.remove(&rule.id).expect("remove");
    store.remove(&rule.id).expect("second remove is a no-op");
    assert!(store.list().expect("list").is_empty());
}

#[test]
fn local_store_rejects_malformed_file() {
    let dir = TempDirGuard::new("local-malformed");
    std::fs::write(dir.path.join("qa_cards.json"), "{broken").expect("write");
    match LocalCardStore::open(&dir.path) {
        Err(StoreError::Format(_)) => {}
        other => panic!("expected format error, got {:?}", other.err()),
    }
}

#[test]
fn device_user_id_is_minted_once_and_stable() {
    let dir = TempDirGuard::new("user-id");
    let first = device_user_id(&dir.path).expect("mint");
    let second = device_user_id(&dir.path).expect("reuse");
    assert_eq!(first, second);
    assert!(!first.is_empty());
}

#[test]
fn remote_store_builds_per_user_collection_url() {
    let store = RemoteCardStore::new("https://sync.example.com/api/", "user-1");
    assert_eq!(
        store.collection_url,
        "https://sync.example.com/api/users/user-1/cards"
    );
}

#[test]
fn select_card_store_honors_offline_flag() {
    let dir = TempDirGuard::new("select-offline");
    // Offline forces the local store even with a sync URL.
    let store = select_card_store(true, Some("https://sync.example.com"), &dir.path)
        .expect("local store");
    assert!(store.subscribe().is_none());

    let store = select_card_store(false, None, &dir.path).expect("local store");
    assert!(store.subscribe().is_none());

    let store = select_card_store(false, Some("https://sync.example.com"), &dir.path)
        .expect("remote store");
    assert!(store.subscribe().is_some());
}

#[test]
fn store_error_display_is_descriptive() {
    let err = StoreError::Remote("connection refused".to_string());
    assert_eq!(err.to_string(), "sync backend unavailable: connection refused");
    assert!(StoreError::Format("bad".to_string()).to_string().contains("malformed"));
}
