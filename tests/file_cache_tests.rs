//! Integration Tests for the File Cache
//!
//! Exercises the on-disk behavior end to end: overwrites, interrupted
//! writes, self-triggered garbage collection and concurrent writers.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use kv_cache::{Cache, CacheError, Context, FileCache, FileCacheOptions, JsonCodec, RawCodec};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

// == Helper Functions ==

fn open(dir: &TempDir) -> FileCache<String, RawCodec> {
    FileCache::new(FileCacheOptions::new(dir.path()), RawCodec).unwrap()
}

fn shard_entries(file: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(file.parent().unwrap())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

const HOUR: Duration = Duration::from_secs(3600);

// == Overwrite Tests ==

#[tokio::test]
async fn test_overwrite_leaves_single_file_with_latest_value() {
    let dir = TempDir::new().unwrap();
    let cache = open(&dir);
    let ctx = Context::background();
    let key = "config".to_string();

    cache.set(&ctx, key.clone(), "v1".to_string(), HOUR).await.unwrap();
    cache.set(&ctx, key.clone(), "v2".to_string(), HOUR).await.unwrap();

    assert_eq!(cache.get(&ctx, &key).await.unwrap(), "v2");

    let path = cache.path_for(&key);
    let names = shard_entries(&path);
    assert_eq!(names.len(), 1, "unexpected files: {names:?}");
    assert!(names[0].ends_with(".cache"));
}

#[tokio::test]
async fn test_structured_values_roundtrip() {
    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Session {
        user: String,
        roles: Vec<String>,
    }

    let dir = TempDir::new().unwrap();
    let cache: FileCache<Session, JsonCodec> =
        FileCache::new(FileCacheOptions::new(dir.path()), JsonCodec).unwrap();
    let ctx = Context::background();

    let session = Session {
        user: "ada".to_string(),
        roles: vec!["admin".to_string()],
    };
    cache.set(&ctx, 42u64, session, HOUR).await.unwrap();

    let loaded = cache.get(&ctx, &42u64).await.unwrap();
    assert_eq!(loaded.user, "ada");
    assert_eq!(loaded.roles, vec!["admin".to_string()]);
}

// == Crash Safety Tests ==

#[tokio::test]
async fn test_interrupted_write_keeps_previous_value() {
    let dir = TempDir::new().unwrap();
    let cache = open(&dir);
    let ctx = Context::background();
    let key = "ledger".to_string();

    cache.set(&ctx, key.clone(), "committed".to_string(), HOUR).await.unwrap();

    // A writer that died mid-write leaves only its temp file behind.
    let path = cache.path_for(&key);
    let orphan = path.parent().unwrap().join(".tmp-crashed.partial");
    fs::write(&orphan, b"etime=99999999999999").unwrap();

    assert_eq!(cache.get(&ctx, &key).await.unwrap(), "committed");

    // The collector only considers finished cache files.
    cache.collect_garbage().await.unwrap();
    assert!(orphan.exists());
    assert!(cache.take_gc_error().is_none());

    cache.set(&ctx, key.clone(), "next".to_string(), HOUR).await.unwrap();
    assert_eq!(cache.get(&ctx, &key).await.unwrap(), "next");
}

#[tokio::test]
async fn test_reopen_sees_previous_entries() {
    let dir = TempDir::new().unwrap();
    let ctx = Context::background();

    {
        let cache = open(&dir);
        cache.set(&ctx, "k".to_string(), "persisted".to_string(), HOUR).await.unwrap();
    }

    let cache = open(&dir);
    assert_eq!(cache.get(&ctx, &"k".to_string()).await.unwrap(), "persisted");
}

// == Garbage Collection Tests ==

#[tokio::test]
async fn test_traffic_triggers_background_gc() {
    let dir = TempDir::new().unwrap();
    let cache = FileCache::<String, RawCodec>::new(
        FileCacheOptions::new(dir.path()).gc_interval(Duration::from_secs(1)),
        RawCodec,
    )
    .unwrap();
    let ctx = Context::background();

    let short = "short".to_string();
    let long = "long".to_string();
    cache.set(&ctx, short.clone(), "a".to_string(), Duration::from_millis(50)).await.unwrap();
    cache.set(&ctx, long.clone(), "b".to_string(), HOUR).await.unwrap();

    tokio::time::sleep(Duration::from_millis(1100)).await;

    // Reading an unrelated key is enough to start a sweep.
    assert_eq!(cache.get(&ctx, &long).await.unwrap(), "b");

    let short_path = cache.path_for(&short);
    let mut removed = false;
    for _ in 0..50 {
        if !short_path.exists() {
            removed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    assert!(removed, "expired file should have been collected");
    assert!(cache.path_for(&long).exists());
}

#[tokio::test]
async fn test_gc_keeps_live_and_foreign_files() {
    let dir = TempDir::new().unwrap();
    let cache = open(&dir);
    let ctx = Context::background();

    cache.set(&ctx, "live".to_string(), "x".to_string(), HOUR).await.unwrap();
    cache.set(&ctx, "dead".to_string(), "y".to_string(), Duration::ZERO).await.unwrap();
    let foreign = dir.path().join("README.txt");
    fs::write(&foreign, b"not a cache file").unwrap();

    let removed = cache.collect_garbage().await.unwrap();

    assert_eq!(removed, Some(1));
    assert!(cache.path_for(&"live").exists());
    assert!(!cache.path_for(&"dead").exists());
    assert!(foreign.exists());
}

#[tokio::test]
async fn test_expired_entry_reads_as_miss() {
    let dir = TempDir::new().unwrap();
    let cache = open(&dir);
    let ctx = Context::background();
    let key = "gone".to_string();

    cache.set(&ctx, key.clone(), "v".to_string(), Duration::ZERO).await.unwrap();

    let result = cache.get(&ctx, &key).await;
    assert!(matches!(result, Err(CacheError::NotFound(_))));
    assert!(!cache.path_for(&key).exists());
}

// == Concurrency Tests ==

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_same_key() {
    let dir = TempDir::new().unwrap();
    let cache = Arc::new(open(&dir));
    let key = "contended".to_string();

    let mut handles = Vec::new();
    for i in 0..16 {
        let cache = Arc::clone(&cache);
        let key = key.clone();
        handles.push(tokio::spawn(async move {
            let ctx = Context::background();
            cache.set(&ctx, key, format!("value-{i}"), HOUR).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let value = cache.get(&Context::background(), &key).await.unwrap();
    assert!(value.starts_with("value-"), "torn value: {value}");

    let names = shard_entries(&cache.path_for(&key));
    assert_eq!(names.len(), 1, "leftover temp files: {names:?}");
}

#[tokio::test]
async fn test_cancelled_context_touches_nothing() {
    let dir = TempDir::new().unwrap();
    let cache = open(&dir);
    let ctx = Context::background();
    ctx.cancel();

    let result = cache.set(&ctx, "k".to_string(), "v".to_string(), HOUR).await;
    assert!(matches!(result, Err(CacheError::Cancelled)));
    assert!(!cache.path_for(&"k").exists());
}
