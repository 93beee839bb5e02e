use crate::suite::{symbol, write_at, T0};
use boot_cache::{
    CacheKey, DependencyGraph, FileTimestamp, LocalFs, SymbolStore, TimestampStore, VoidStore,
};
use std::sync::Arc;

#[test]
fn timestamp_store_skips_missing_files_and_drops_old_versions() {
    let tmp = tempfile::tempdir().unwrap();
    let a = write_at(&tmp.path().join("A.java"), "", T0);
    let missing = tmp.path().join("Missing.java");
    let store = TimestampStore::new(Arc::new(LocalFs));
    let v1 = CacheKey::new("demo-java", "1").unwrap();
    let v2 = CacheKey::new("demo-java", "2").unwrap();

    store
        .store(&v1, &[a.clone(), missing.clone()], &[], &DependencyGraph::new())
        .unwrap();
    assert_eq!(store.timestamps(&v1).len(), 1);
    assert_eq!(store.modification_timestamp(&v1, &missing), 0);

    store
        .store(&v2, &[a.clone()], &[], &DependencyGraph::new())
        .unwrap();
    assert!(store.timestamps(&v1).is_empty());
    assert_eq!(store.modification_timestamp(&v2, &a), T0);
}

#[test]
fn timestamp_store_validates_batches() {
    let tmp = tempfile::tempdir().unwrap();
    let a = write_at(&tmp.path().join("A.java"), "", T0);
    let b = write_at(&tmp.path().join("B.java"), "", T0);
    let store = TimestampStore::new(Arc::new(LocalFs));
    let key = CacheKey::new("demo-java", "1").unwrap();

    assert!(store
        .update_files(
            &key,
            &[FileTimestamp::new(&a, T0 + 1)],
            &[symbol(&b, "B", 1)],
            &DependencyGraph::new(),
        )
        .is_err());
    assert_eq!(store.modification_timestamp(&key, &a), 0);
}

#[test]
fn void_store_never_remembers_anything() {
    let tmp = tempfile::tempdir().unwrap();
    let a = write_at(&tmp.path().join("A.java"), "", T0);
    let store = VoidStore;
    let key = CacheKey::new("demo-java", "1").unwrap();

    store
        .store(&key, &[a.clone()], &[symbol(&a, "A", 1)], &DependencyGraph::new())
        .unwrap();
    assert!(store.retrieve(&key, &[a.clone()]).is_none());
    assert_eq!(store.modification_timestamp(&key, &a), 0);
    store.remove_file(&key, &a).unwrap();
    store.remove(&key).unwrap();
}
