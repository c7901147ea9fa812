// Tests for the OpenDAL-backed store, using the in-memory service

use crate::common::{path_str, write_file};
use bucketsync::sync::{identity_of, inventory_key};
use bucketsync::{ObjectStore, RemoteStore, StoreConfig, SyncConfig, SyncEngine};
use std::sync::Arc;

#[tokio::test]
async fn test_put_then_list_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("notes/today.txt");
    write_file(&file, "hello");
    let identity = identity_of(&file).unwrap();

    let store = ObjectStore::memory(StoreConfig::new("test").with_prefix(Some("backup"))).unwrap();
    store.put_file(&path_str(&file), &identity).await.unwrap();

    let listed = store.list_files().await.unwrap();

    let key = inventory_key(&path_str(&file));
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[&key].content_hash, "5d41402abc4b2a76b9719d911017c592");
    assert_eq!(listed[&key].size_bytes, 5);
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    write_file(&dir.path().join("a.txt"), "hello");
    write_file(&dir.path().join("b.txt"), "world!");

    let config = StoreConfig::new("test").with_dry_run(true);
    let store = Arc::new(ObjectStore::memory(config).unwrap());
    let engine = SyncEngine::new(store.clone(), SyncConfig::default());

    let stats = engine.run(&[path_str(dir.path())]).await.unwrap();

    assert_eq!(stats.files_to_upload(), 2);
    assert_eq!(stats.uploaded_size_bytes(), 11);
    assert!(stats.errors().is_empty());
    assert!(store.list_files().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_engine_against_memory_store_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    write_file(&dir.path().join("a.txt"), "hello");
    write_file(&dir.path().join("sub/b.txt"), "world");

    let store = Arc::new(ObjectStore::memory(StoreConfig::new("test")).unwrap());
    let engine = SyncEngine::new(store.clone(), SyncConfig::default());

    let first = engine.run(&[path_str(dir.path())]).await.unwrap();
    assert_eq!(first.files_to_upload(), 2);
    assert!(first.is_success());

    let second = engine.run(&[path_str(dir.path())]).await.unwrap();
    assert_eq!(second.total_files(), 2);
    assert_eq!(second.files_to_upload(), 0);

    write_file(&dir.path().join("sub/b.txt"), "world, changed");
    let third = engine.run(&[path_str(dir.path())]).await.unwrap();
    assert_eq!(third.files_to_upload(), 1);
}

#[tokio::test]
async fn test_missing_local_file_fails_upload() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("a.txt");
    write_file(&file, "hello");
    let identity = identity_of(&file).unwrap();
    std::fs::remove_file(&file).unwrap();

    let store = ObjectStore::memory(StoreConfig::new("test")).unwrap();
    let err = store.put_file(&path_str(&file), &identity).await.unwrap_err();

    assert!(matches!(err, bucketsync::BackendError::Io { .. }));
}

#[tokio::test]
async fn test_rerun_with_doubled_separators_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    write_file(&dir.path().join("sub/a.txt"), "hello");
    write_file(&dir.path().join("sub/inner/b.txt"), "world");
    let input = format!("{}//sub/./", path_str(dir.path()));

    let store = Arc::new(ObjectStore::memory(StoreConfig::new("test")).unwrap());
    let engine = SyncEngine::new(store.clone(), SyncConfig::default());

    let first = engine.run(&[input.clone()]).await.unwrap();
    assert_eq!(first.files_to_upload(), 2);

    let listed = store.list_files().await.unwrap();
    assert!(listed.contains_key(&inventory_key(&path_str(&dir.path().join("sub/a.txt")))));

    let second = engine.run(&[input]).await.unwrap();
    assert_eq!(second.total_files(), 2);
    assert_eq!(second.files_to_upload(), 0);
}

#[tokio::test]
async fn test_put_large_file_streams_whole_content() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("large.bin");
    let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
    std::fs::write(&file, &data).unwrap();
    let identity = identity_of(&file).unwrap();

    let store = ObjectStore::memory(StoreConfig::new("test")).unwrap();
    store.put_file(&path_str(&file), &identity).await.unwrap();

    let key = inventory_key(&path_str(&file));
    let stored = store.operator().read(&key).await.unwrap().to_vec();
    assert_eq!(stored, data);

    let listed = store.list_files().await.unwrap();
    assert_eq!(listed[&key].content_hash, identity.content_hash);
    assert_eq!(listed[&key].size_bytes, 200_000);
}

#[tokio::test]
async fn test_list_many_objects() {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..40 {
        write_file(&dir.path().join(format!("d{}/f{}.txt", i % 4, i)), &format!("content {}", i));
    }

    let store = Arc::new(ObjectStore::memory(StoreConfig::new("test").with_prefix(Some("many"))).unwrap());
    let engine = SyncEngine::new(store.clone(), SyncConfig::default());
    engine.run(&[path_str(dir.path())]).await.unwrap();

    let listed = store.list_files().await.unwrap();

    assert_eq!(listed.len(), 40);
    let key = inventory_key(&path_str(&dir.path().join("d1/f5.txt")));
    assert_eq!(listed[&key].size_bytes, "content 5".len() as u64);
}
