//! Integration tests for treasure-cache

use std::fs::File;
use std::path::Path;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, UNIX_EPOCH};
use treasure_cache::*;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

async fn seeded_counter(dir: &Path, key: &str) -> FilesystemCache {
    let cache = FilesystemCache::with_dir(dir).await.unwrap();
    assert!(cache.add(key, 0i64.into(), None).await.unwrap());
    cache
}

#[test]
fn test_two_adjusters_never_lose_an_update() {
    for _ in 0..25 {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = temp_dir.path().to_path_buf();
        runtime().block_on(seeded_counter(&dir, "ns:version:blog"));

        let barrier = Arc::new(Barrier::new(2));
        let workers: Vec<_> = (0..2)
            .map(|_| {
                let dir = dir.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    // Each worker owns its own handle, like a separate process would
                    runtime().block_on(async move {
                        let cache = FilesystemCache::with_dir(&dir).await.unwrap();
                        barrier.wait();
                        cache.increment("ns:version:blog", 1).await.unwrap()
                    })
                })
            })
            .collect();

        let mut results: Vec<i64> = workers.into_iter().map(|w| w.join().unwrap()).collect();
        results.sort();
        assert_eq!(results, vec![1, 2]);

        let value = runtime().block_on(async {
            let cache = FilesystemCache::with_dir(&dir).await.unwrap();
            cache.fetch("ns:version:blog").await.unwrap()
        });
        assert_eq!(value.and_then(|v| v.as_int()), Some(2));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_concurrent_adjusters() {
    let temp_dir = tempfile::tempdir().unwrap();
    seeded_counter(temp_dir.path(), "hits").await;

    let mut handles = Vec::new();
    for worker in 0..8 {
        let dir = temp_dir.path().to_path_buf();
        handles.push(tokio::spawn(async move {
            let cache = FilesystemCache::with_dir(&dir).await.unwrap();
            for _ in 0..25 {
                if worker % 2 == 0 {
                    cache.increment("hits", 2).await.unwrap();
                } else {
                    cache.decrement("hits", 1).await.unwrap();
                }
            }
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    let cache = FilesystemCache::with_dir(temp_dir.path()).await.unwrap();
    // 4 workers add 2 * 25, 4 workers subtract 1 * 25
    assert_eq!(cache.fetch("hits").await.unwrap(), Some(CacheValue::from(100i64)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_add_has_one_winner() {
    let temp_dir = tempfile::tempdir().unwrap();

    let mut handles = Vec::new();
    for seed in 0..8i64 {
        let dir = temp_dir.path().to_path_buf();
        handles.push(tokio::spawn(async move {
            let cache = FilesystemCache::with_dir(&dir).await.unwrap();
            let won = cache.add("ns:version:shop", seed.into(), None).await.unwrap();
            (seed, won)
        }));
    }

    let mut winners = Vec::new();
    for handle in handles {
        let (seed, won) = handle.await.unwrap();
        if won {
            winners.push(seed);
        }
    }
    assert_eq!(winners.len(), 1);

    let cache = FilesystemCache::with_dir(temp_dir.path()).await.unwrap();
    let stored = cache.fetch("ns:version:shop").await.unwrap().unwrap();
    assert_eq!(stored.as_int(), Some(winners[0]));
}

#[test]
fn test_concurrent_add_over_expired_entry_has_one_winner() {
    for _ in 0..25 {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = temp_dir.path().to_path_buf();
        runtime().block_on(async {
            let cache = FilesystemCache::with_dir(&dir).await.unwrap();
            cache.store("session", "stale".into(), None).await.unwrap();
            File::options()
                .write(true)
                .open(cache.path_for("session"))
                .unwrap()
                .set_modified(UNIX_EPOCH + Duration::from_secs(1))
                .unwrap();
        });

        let barrier = Arc::new(Barrier::new(4));
        let workers: Vec<_> = (0..4i64)
            .map(|seed| {
                let dir = dir.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    runtime().block_on(async move {
                        let cache = FilesystemCache::with_dir(&dir).await.unwrap();
                        barrier.wait();
                        let won = cache.add("session", seed.into(), None).await.unwrap();
                        (seed, won)
                    })
                })
            })
            .collect();

        let winners: Vec<i64> = workers
            .into_iter()
            .map(|w| w.join().unwrap())
            .filter(|(_, won)| *won)
            .map(|(seed, _)| seed)
            .collect();
        assert_eq!(winners.len(), 1);

        let stored = runtime().block_on(async {
            let cache = FilesystemCache::with_dir(&dir).await.unwrap();
            cache.fetch("session").await.unwrap()
        });
        assert_eq!(stored.and_then(|v| v.as_int()), Some(winners[0]));
    }
}

#[tokio::test]
async fn test_filesystem_ttl_expires() {
    let temp_dir = tempfile::tempdir().unwrap();
    let cache = FilesystemCache::with_dir(temp_dir.path()).await.unwrap();

    cache
        .store("surname", "baggins".into(), Some(Duration::from_secs(2)))
        .await
        .unwrap();

    assert!(cache.exists("surname").await.unwrap());
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(cache.exists("surname").await.unwrap());
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(!cache.exists("surname").await.unwrap());
    assert_eq!(cache.fetch("surname").await.unwrap(), None);
}

#[tokio::test]
async fn test_unwritable_directory() {
    let result = FilesystemCache::with_dir("/sdfsdf/324/af/334/sadas/pp/q/xc/j").await;
    assert!(matches!(result, Err(CacheError::Config(_))));
}

#[tokio::test]
async fn test_backends_behave_alike() {
    let temp_dir = tempfile::tempdir().unwrap();
    let backends: Vec<Arc<dyn CacheBackend>> = vec![
        open_backend(&CacheConfig::memory()).await.unwrap(),
        open_backend(&CacheConfig::filesystem(temp_dir.path())).await.unwrap(),
    ];

    for backend in backends {
        assert!(backend.add("fruit", "apple".into(), None).await.unwrap());
        assert!(!backend.add("fruit", "pear".into(), None).await.unwrap());
        assert!(backend.replace("fruit", "pear".into(), None).await.unwrap());
        assert_eq!(backend.fetch("fruit").await.unwrap(), Some(CacheValue::from("pear")));

        let fruits = CacheValue::structured(&vec!["apple", "pear"]).unwrap();
        backend.store("fruits", fruits, None).await.unwrap();
        let hydrated: Option<Vec<String>> = fetch_as(backend.as_ref(), "fruits").await.unwrap();
        assert_eq!(hydrated, Some(vec!["apple".to_string(), "pear".to_string()]));

        backend.store("count", 10i64.into(), None).await.unwrap();
        assert_eq!(backend.decrement("count", 3).await.unwrap(), 7);
        assert!(backend.increment("fruit", 1).await.is_err());

        let deleted = backend.delete_many(&["fruit", "missing"]).await.unwrap();
        assert_eq!(deleted, vec![true, false]);

        backend.clear().await.unwrap();
        assert!(!backend.exists("count").await.unwrap());
    }
}
