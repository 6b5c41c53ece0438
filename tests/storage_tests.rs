//! Storage contract tests
//!
//! The same behaviours are checked against the memory, file-log and
//! SQLite backends.

use std::collections::HashMap;

use linkvault::errors::LinkVaultError;
use linkvault::storage::{
    DatabaseStorage, FileStorage, MemoryStorage, RequestContext, Stats, StorageBackend,
    UrlRecord,
};
use tempfile::TempDir;

// =============================================================================
// Test Setup
// =============================================================================

async fn memory_backend() -> (StorageBackend, Option<TempDir>) {
    (MemoryStorage::new().into(), None)
}

async fn file_backend() -> (StorageBackend, Option<TempDir>) {
    let dir = TempDir::new().unwrap();
    let storage = FileStorage::new(dir.path().join("links.jsonl")).await.unwrap();
    (storage.into(), Some(dir))
}

async fn sqlite_backend() -> (StorageBackend, Option<TempDir>) {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("links.db").display());
    let storage = DatabaseStorage::new(&url).await.unwrap();
    (storage.into(), Some(dir))
}

async fn all_backends() -> Vec<(StorageBackend, Option<TempDir>)> {
    vec![
        memory_backend().await,
        file_backend().await,
        sqlite_backend().await,
    ]
}

fn ctx() -> RequestContext {
    RequestContext::background()
}

fn count_lines(dir: &TempDir) -> usize {
    std::fs::read_to_string(dir.path().join("links.jsonl"))
        .unwrap()
        .lines()
        .filter(|l| !l.trim().is_empty())
        .count()
}

// =============================================================================
// Store
// =============================================================================

mod store_tests {
    use super::*;

    #[tokio::test]
    async fn test_store_twice_yields_conflict_with_original() {
        for (backend, _dir) in all_backends().await {
            let storage = backend.storage();
            let stored = storage
                .store(&ctx(), UrlRecord::new("u1", "http://a.com", "X"))
                .await
                .unwrap();
            assert_eq!(stored.short, "X");

            let err = storage
                .store(&ctx(), UrlRecord::new("u2", "http://a.com", "Y"))
                .await
                .unwrap_err();
            let existing = err.conflicting_record().unwrap();
            assert_eq!(existing.short, "X", "backend {}", storage.backend_name());
            assert_eq!(existing.user_id, "u1");
        }
    }

    #[tokio::test]
    async fn test_store_rejects_empty_full() {
        for (backend, _dir) in all_backends().await {
            let result = backend
                .storage()
                .store(&ctx(), UrlRecord::new("u1", "", "X"))
                .await;
            assert!(matches!(result, Err(LinkVaultError::Validation(_))));
        }
    }

    #[tokio::test]
    async fn test_empty_backend_lookups_return_zero_values() {
        for (backend, _dir) in all_backends().await {
            let storage = backend.storage();
            assert!(storage.get_by_full(&ctx(), "http://none.com").await.unwrap().is_empty());
            assert!(storage.get_by_short(&ctx(), "none").await.unwrap().is_empty());
            assert!(storage.get_user_urls(&ctx(), "nobody").await.unwrap().is_empty());
            assert_eq!(storage.get_stats(&ctx()).await.unwrap(), Stats::default());
            storage.ping(&ctx()).await.unwrap();
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_store_yields_single_insert() {
        for (backend, _dir) in all_backends().await {
            let mut handles = Vec::new();
            for i in 0..16 {
                let backend = backend.clone();
                handles.push(tokio::spawn(async move {
                    backend
                        .storage()
                        .store(&ctx(), UrlRecord::new("u", "http://race.com", format!("k{}", i)))
                        .await
                }));
            }

            let mut stored = Vec::new();
            let mut conflicts = Vec::new();
            for handle in handles {
                match handle.await.unwrap() {
                    Ok(record) => stored.push(record),
                    Err(e) => match e.conflicting_record() {
                        Some(existing) => conflicts.push(existing.clone()),
                        None => panic!(
                            "backend {}: unexpected error {}",
                            backend.storage().backend_name(),
                            e
                        ),
                    },
                }
            }

            assert_eq!(stored.len(), 1, "backend {}", backend.storage().backend_name());
            assert_eq!(conflicts.len(), 15);
            assert!(conflicts.iter().all(|c| c.short == stored[0].short));
            assert_eq!(backend.storage().get_stats(&ctx()).await.unwrap().urls, 1);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_batches_agree_on_one_record() {
        for (backend, _dir) in all_backends().await {
            let mut handles = Vec::new();
            for i in 0..8 {
                let backend = backend.clone();
                handles.push(tokio::spawn(async move {
                    let candidates = HashMap::from([(
                        "1".to_string(),
                        UrlRecord::new("u", "http://race.com", format!("b{}", i)),
                    )]);
                    backend.storage().store_batch(&ctx(), candidates).await
                }));
            }

            let mut shorts = Vec::new();
            for handle in handles {
                let result = handle.await.unwrap().unwrap_or_else(|e| {
                    panic!("backend {}: {}", backend.storage().backend_name(), e)
                });
                shorts.push(result["1"].short.clone());
            }

            shorts.dedup();
            assert_eq!(shorts.len(), 1, "backend {}", backend.storage().backend_name());
            assert_eq!(backend.storage().get_user_urls(&ctx(), "u").await.unwrap().len(), 1);
        }
    }

    #[tokio::test]
    async fn test_expired_deadline_rejected_before_work() {
        for (backend, _dir) in all_backends().await {
            let expired = RequestContext::background().with_timeout(std::time::Duration::ZERO);
            let result = backend
                .storage()
                .store(&expired, UrlRecord::new("u1", "http://a.com", "X"))
                .await;
            assert!(matches!(result, Err(LinkVaultError::DeadlineExceeded)));
        }
    }
}

// =============================================================================
// StoreBatch
// =============================================================================

mod batch_tests {
    use super::*;

    fn batch(items: &[(&str, &str, &str)]) -> HashMap<String, UrlRecord> {
        items
            .iter()
            .map(|(id, full, short)| (id.to_string(), UrlRecord::new("u1", *full, *short)))
            .collect()
    }

    #[tokio::test]
    async fn test_batch_reuses_preexisting_record() {
        for (backend, _dir) in all_backends().await {
            let storage = backend.storage();
            storage
                .store(&ctx(), UrlRecord::new("u0", "http://a.com", "X"))
                .await
                .unwrap();

            let result = storage
                .store_batch(&ctx(), batch(&[("1", "http://a.com", "NEW")]))
                .await
                .unwrap();
            assert_eq!(result["1"].short, "X");
            assert_eq!(storage.get_stats(&ctx()).await.unwrap().urls, 1);
            assert!(storage.get_by_short(&ctx(), "NEW").await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_batch_is_idempotent() {
        for (backend, dir) in all_backends().await {
            let storage = backend.storage();
            let items = [("1", "http://a.com", "A1"), ("2", "http://b.com", "B1")];

            let first = storage.store_batch(&ctx(), batch(&items)).await.unwrap();
            let log_dir = match (&backend, dir.as_ref()) {
                (StorageBackend::File(_), Some(dir)) => Some(dir),
                _ => None,
            };
            let lines_after_first = log_dir.map(count_lines);

            let second_items = [("1", "http://a.com", "A2"), ("2", "http://b.com", "B2")];
            let second = storage
                .store_batch(&ctx(), batch(&second_items))
                .await
                .unwrap();

            assert_eq!(first["1"].short, second["1"].short);
            assert_eq!(first["2"].short, second["2"].short);
            assert_eq!(storage.get_user_urls(&ctx(), "u1").await.unwrap().len(), 2);
            assert_eq!(log_dir.map(count_lines), lines_after_first);
        }
    }

    #[tokio::test]
    async fn test_batch_mixes_existing_and_new() {
        for (backend, _dir) in all_backends().await {
            let storage = backend.storage();
            storage
                .store(&ctx(), UrlRecord::new("u1", "http://a.com", "X"))
                .await
                .unwrap();

            let result = storage
                .store_batch(
                    &ctx(),
                    batch(&[("1", "http://a.com", "S1"), ("2", "http://c.com", "S2")]),
                )
                .await
                .unwrap();
            assert_eq!(result.len(), 2);
            assert_eq!(result["1"].short, "X");
            assert_eq!(result["2"].short, "S2");
            assert_eq!(storage.get_by_short(&ctx(), "S2").await.unwrap().full, "http://c.com");
        }
    }

    #[tokio::test]
    async fn test_batch_with_empty_url_rejected() {
        for (backend, _dir) in all_backends().await {
            let result = backend
                .storage()
                .store_batch(&ctx(), batch(&[("1", "", "S1")]))
                .await;
            assert!(matches!(result, Err(LinkVaultError::Validation(_))));
        }
    }
}

// =============================================================================
// Soft delete and stats
// =============================================================================

mod delete_tests {
    use super::*;

    #[tokio::test]
    async fn test_delete_marks_record_as_tombstone() {
        for (backend, _dir) in [memory_backend().await, sqlite_backend().await] {
            let storage = backend.storage();
            storage
                .store(&ctx(), UrlRecord::new("DoomGuy", "http://a.com", "short1"))
                .await
                .unwrap();

            let deleter = backend.deleter().unwrap();
            deleter
                .delete_batch(&ctx(), "DoomGuy", &["short1".to_string()])
                .await
                .unwrap();

            let record = storage.get_by_short(&ctx(), "short1").await.unwrap();
            assert!(record.deleted);
            assert_eq!(record.full, "http://a.com");
        }
    }

    #[tokio::test]
    async fn test_delete_ignores_foreign_keys() {
        for (backend, _dir) in [memory_backend().await, sqlite_backend().await] {
            let storage = backend.storage();
            storage
                .store(&ctx(), UrlRecord::new("owner", "http://a.com", "k1"))
                .await
                .unwrap();

            backend
                .deleter()
                .unwrap()
                .delete_batch(&ctx(), "intruder", &["k1".to_string(), "nope".to_string()])
                .await
                .unwrap();

            assert!(!storage.get_by_short(&ctx(), "k1").await.unwrap().deleted);
        }
    }

    #[tokio::test]
    async fn test_full_url_reusable_after_delete() {
        for (backend, _dir) in [memory_backend().await, sqlite_backend().await] {
            let storage = backend.storage();
            storage
                .store(&ctx(), UrlRecord::new("u1", "http://a.com", "old"))
                .await
                .unwrap();
            backend
                .deleter()
                .unwrap()
                .delete_batch(&ctx(), "u1", &["old".to_string()])
                .await
                .unwrap();

            assert!(storage.get_by_full(&ctx(), "http://a.com").await.unwrap().is_empty());
            storage
                .store(&ctx(), UrlRecord::new("u1", "http://a.com", "new"))
                .await
                .unwrap();
            assert_eq!(
                storage.get_stats(&ctx()).await.unwrap(),
                Stats { urls: 1, users: 1 }
            );
        }
    }

    #[tokio::test]
    async fn test_file_backend_has_no_deleter() {
        let (backend, _dir) = file_backend().await;
        assert!(backend.deleter().is_none());
        assert!(!backend.supports_delete());
    }

    #[tokio::test]
    async fn test_stats_count_distinct_urls_and_users() {
        for (backend, _dir) in all_backends().await {
            let storage = backend.storage();
            storage
                .store(&ctx(), UrlRecord::new("u1", "http://a.com", "k1"))
                .await
                .unwrap();
            storage
                .store(&ctx(), UrlRecord::new("u1", "http://b.com", "k2"))
                .await
                .unwrap();
            storage
                .store(&ctx(), UrlRecord::new("u2", "http://c.com", "k3"))
                .await
                .unwrap();
            assert_eq!(
                storage.get_stats(&ctx()).await.unwrap(),
                Stats { urls: 3, users: 2 }
            );
        }
    }
}

// =============================================================================
// File log format
// =============================================================================

mod file_log_tests {
    use super::*;

    #[tokio::test]
    async fn test_single_record_log_stats() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("links.jsonl");
        std::fs::write(
            &path,
            r#"{"uuid":"1","user_id":"u1","short_url":"X","original_url":"http://a.com"}
"#,
        )
        .unwrap();

        let storage = FileStorage::new(&path).await.unwrap();
        let backend: StorageBackend = storage.into();
        assert_eq!(
            backend.storage().get_stats(&ctx()).await.unwrap(),
            Stats { urls: 1, users: 1 }
        );
        assert_eq!(
            backend.storage().get_by_short(&ctx(), "X").await.unwrap().full,
            "http://a.com"
        );
    }

    #[tokio::test]
    async fn test_corrupted_log_fails_stats() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("links.jsonl");
        std::fs::write(
            &path,
            "{\"uuid\":\"1\",\"user_id\":\"u1\",\"short_url\":\"X\",\"original_url\":\"http://a.com\"}\nnot json\n",
        )
        .unwrap();

        let backend: StorageBackend = FileStorage::new(&path).await.unwrap().into();
        assert!(matches!(
            backend.storage().get_stats(&ctx()).await,
            Err(LinkVaultError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn test_deleted_flag_read_from_log() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("links.jsonl");
        std::fs::write(
            &path,
            "{\"uuid\":\"1\",\"user_id\":\"u1\",\"short_url\":\"X\",\"original_url\":\"http://a.com\",\"is_deleted\":true}\n",
        )
        .unwrap();

        let backend: StorageBackend = FileStorage::new(&path).await.unwrap().into();
        let storage = backend.storage();
        assert!(storage.get_by_short(&ctx(), "X").await.unwrap().deleted);
        assert!(storage.get_by_full(&ctx(), "http://a.com").await.unwrap().is_empty());
        assert_eq!(
            storage.get_stats(&ctx()).await.unwrap(),
            Stats { urls: 0, users: 1 }
        );
    }
}
