// Tests for complete sync runs against a recording store

use crate::common::{path_str, write_file, RecordingStore};
use bucketsync::sync::{identity_of, inventory_key, IdentityFailurePolicy};
use bucketsync::{FileIdentity, FileInventory, SyncConfig, SyncEngine, SyncError};
use std::sync::Arc;

fn engine(store: Arc<RecordingStore>) -> SyncEngine {
    let config = SyncConfig {
        upload_concurrency: 2,
        hash_threads: 2,
        identity_failure: IdentityFailurePolicy::Abort,
    };
    SyncEngine::new(store, config)
}

#[tokio::test]
async fn test_run_uploads_only_new_files() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.txt");
    let b = dir.path().join("sub/b.txt");
    write_file(&a, "hello");
    write_file(&b, "world");

    let mut remote = FileInventory::new();
    remote.insert(
        inventory_key(&path_str(&a)),
        FileIdentity::new(5, 0.0, "5d41402abc4b2a76b9719d911017c592"),
    );
    let store = Arc::new(RecordingStore::with_remote(remote));

    let stats = engine(store.clone()).run(&[path_str(dir.path())]).await.unwrap();

    assert_eq!(store.uploads(), vec![path_str(&b)]);
    assert_eq!(stats.total_files(), 2);
    assert_eq!(stats.files_to_upload(), 1);
    assert_eq!(stats.total_size_bytes(), 10);
    assert_eq!(stats.uploaded_size_bytes(), 5);
    assert!(stats.errors().is_empty());
    assert!(stats.is_success());
}

#[tokio::test]
async fn test_run_with_empty_remote_uploads_everything() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["one.txt", "two.txt", "nested/three.txt", "nested/four.txt"] {
        write_file(&dir.path().join(name), name);
    }
    let store = Arc::new(RecordingStore::default());

    let stats = engine(store.clone()).run(&[path_str(dir.path())]).await.unwrap();

    assert_eq!(store.uploads().len(), 4);
    assert_eq!(stats.files_to_upload(), 4);
    assert_eq!(stats.uploaded_size_bytes(), stats.total_size_bytes());
}

#[tokio::test]
async fn test_run_uploads_changed_content() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.txt");
    write_file(&a, "hello, again");

    let mut remote = FileInventory::new();
    remote.insert(
        inventory_key(&path_str(&a)),
        FileIdentity::new(5, 0.0, "5d41402abc4b2a76b9719d911017c592"),
    );
    let store = Arc::new(RecordingStore::with_remote(remote));

    let stats = engine(store.clone()).run(&[path_str(&a)]).await.unwrap();

    assert_eq!(store.uploads(), vec![path_str(&a)]);
    assert_eq!(stats.files_to_upload(), 1);
}

#[tokio::test]
async fn test_second_run_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.txt");
    let b = dir.path().join("b.txt");
    write_file(&a, "alpha");
    write_file(&b, "beta");

    let mut remote = FileInventory::new();
    for path in [&a, &b] {
        remote.insert(inventory_key(&path_str(path)), identity_of(path).unwrap());
    }
    let store = Arc::new(RecordingStore::with_remote(remote));

    let stats = engine(store.clone()).run(&[path_str(dir.path())]).await.unwrap();

    assert!(store.uploads().is_empty());
    assert_eq!(stats.total_files(), 2);
    assert_eq!(stats.files_to_upload(), 0);
    assert_eq!(stats.uploaded_size_bytes(), 0);
}

#[tokio::test]
async fn test_upload_failure_is_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let names = ["a.txt", "b.txt", "c.txt", "d.txt"];
    for name in names {
        write_file(&dir.path().join(name), "data");
    }
    let bad = path_str(&dir.path().join("b.txt"));
    let store = Arc::new(RecordingStore::default().failing_on(&bad));

    let stats = engine(store.clone()).run(&[path_str(dir.path())]).await.unwrap();

    assert_eq!(stats.errors(), &[bad]);
    assert_eq!(store.uploads().len(), 3);
    assert_eq!(stats.files_to_upload(), 4);
    assert_eq!(stats.uploaded_size_bytes(), 12);
    assert!(!stats.is_success());
}

#[tokio::test]
async fn test_failed_listing_aborts_run() {
    let dir = tempfile::tempdir().unwrap();
    write_file(&dir.path().join("a.txt"), "a");
    let store = Arc::new(RecordingStore::default().failing_listing());

    let err = engine(store.clone()).run(&[path_str(dir.path())]).await.unwrap_err();

    assert!(matches!(err, SyncError::Backend(_)));
    assert!(store.uploads().is_empty());
}

#[tokio::test]
async fn test_missing_inputs_produce_empty_run() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(RecordingStore::default());

    let stats = engine(store.clone())
        .run(&[path_str(&dir.path().join("nothing-here"))])
        .await
        .unwrap();

    assert_eq!(stats.total_files(), 0);
    assert_eq!(stats.files_to_upload(), 0);
    assert!(stats.is_success());
    assert!(stats.summary().contains("0 discovered"));
}

#[tokio::test]
async fn test_checkpoints_are_ordered() {
    let dir = tempfile::tempdir().unwrap();
    write_file(&dir.path().join("a.txt"), "a");
    let store = Arc::new(RecordingStore::default());

    let stats = engine(store).run(&[path_str(dir.path())]).await.unwrap();

    let c = stats.checkpoints();
    assert!(c.start <= c.enumerated);
    assert!(c.enumerated <= c.identified);
    assert!(c.identified <= c.queried);
    assert!(c.queried <= c.planned);
    assert!(c.planned <= c.uploaded);
    assert!(c.uploaded <= c.end);
}
