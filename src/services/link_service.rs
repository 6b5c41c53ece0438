//! Link management service
//!
//! Business logic shared by the HTTP handlers: short key allocation,
//! batch shortening, lookups and background soft deletion.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::StaticConfig;
use crate::errors::{LinkVaultError, Result};
use crate::storage::{RequestContext, Stats, StorageBackend, UrlRecord};

/// One member of a batch shorten request.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub correlation_id: String,
    pub original_url: String,
}

/// Trimmed URL, or `None` when empty or not usable as a `Location` value.
fn checked_url(full: &str) -> Option<&str> {
    let full = full.trim();
    (!full.is_empty() && !full.chars().any(char::is_control)).then_some(full)
}

pub struct LinkService {
    storage: StorageBackend,
    key_length: usize,
    key_attempts: usize,
    base_url: String,
    request_timeout: Duration,
}

impl LinkService {
    pub fn new(storage: StorageBackend, config: &StaticConfig) -> Self {
        Self {
            storage,
            key_length: config.features.random_code_length,
            key_attempts: config.features.key_attempts,
            base_url: config.server.base_url.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(config.storage.request_timeout_secs),
        }
    }

    pub fn storage(&self) -> &StorageBackend {
        &self.storage
    }

    /// Context for one request, bounded by the configured timeout.
    pub fn request_context(&self, user_id: Option<&str>) -> RequestContext {
        let ctx = RequestContext::background().with_timeout(self.request_timeout);
        match user_id {
            Some(user_id) => ctx.with_user(user_id),
            None => ctx,
        }
    }

    pub fn short_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }

    /// Pick a key unused by the backend and absent from `taken`.
    async fn allocate_key(&self, ctx: &RequestContext, taken: &HashSet<String>) -> Result<String> {
        let storage = self.storage.storage();
        for attempt in 1..=self.key_attempts {
            let key = storage.get_randkey(self.key_length);
            if taken.contains(&key) {
                continue;
            }
            if storage.get_by_short(ctx, &key).await?.is_empty() {
                return Ok(key);
            }
            debug!("Short key collision on attempt {}: {}", attempt, key);
        }

        warn!("No free short key after {} attempts", self.key_attempts);
        Err(LinkVaultError::key_exhausted(format!(
            "could not allocate a short key after {} attempts",
            self.key_attempts
        )))
    }

    /// Shorten one URL. A URL that is already stored comes back as
    /// `Conflict` carrying the existing record.
    pub async fn shorten(&self, ctx: &RequestContext, user_id: &str, full: &str) -> Result<UrlRecord> {
        let full = checked_url(full).ok_or_else(|| {
            LinkVaultError::validation("URL must be non-empty and free of control characters")
        })?;

        let key = self.allocate_key(ctx, &HashSet::new()).await?;
        let record = self
            .storage
            .storage()
            .store(ctx, UrlRecord::new(user_id, full, key))
            .await?;
        info!("Link created: {} -> {}", record.short, record.full);
        Ok(record)
    }

    /// Shorten a batch keyed by correlation id. URLs already stored keep
    /// their existing short key.
    pub async fn shorten_batch(
        &self,
        ctx: &RequestContext,
        user_id: &str,
        items: Vec<BatchItem>,
    ) -> Result<HashMap<String, UrlRecord>> {
        if items.is_empty() {
            return Err(LinkVaultError::validation("batch must not be empty"));
        }

        let mut taken = HashSet::with_capacity(items.len());
        let mut candidates = HashMap::with_capacity(items.len());
        for item in items {
            let Some(full) = checked_url(&item.original_url) else {
                return Err(LinkVaultError::validation(format!(
                    "invalid URL for correlation id '{}'",
                    item.correlation_id
                )));
            };
            let key = self.allocate_key(ctx, &taken).await?;
            taken.insert(key.clone());
            candidates.insert(item.correlation_id, UrlRecord::new(user_id, full, key));
        }

        let result = self.storage.storage().store_batch(ctx, candidates).await?;
        debug!("Batch of {} links reconciled", result.len());
        Ok(result)
    }

    /// Record for `short`, tombstones included. `None` when unknown.
    pub async fn resolve(&self, ctx: &RequestContext, short: &str) -> Result<Option<UrlRecord>> {
        let record = self.storage.storage().get_by_short(ctx, short).await?;
        Ok((!record.is_empty()).then_some(record))
    }

    /// Live links owned by `user_id`.
    pub async fn user_urls(&self, ctx: &RequestContext, user_id: &str) -> Result<Vec<UrlRecord>> {
        let mut urls = self.storage.storage().get_user_urls(ctx, user_id).await?;
        urls.retain(|u| !u.deleted);
        Ok(urls)
    }

    /// Schedule soft deletion and return without waiting for it.
    ///
    /// The task runs on a background context so it outlives the request.
    pub fn delete_urls(&self, user_id: &str, shorts: Vec<String>) -> Result<JoinHandle<()>> {
        if !self.storage.supports_delete() {
            return Err(LinkVaultError::unsupported(format!(
                "{} storage does not support deletion",
                self.storage.storage().backend_name()
            )));
        }

        let storage = self.storage.clone();
        let user_id = user_id.to_string();
        Ok(tokio::spawn(async move {
            let Some(deleter) = storage.deleter() else {
                return;
            };
            let ctx = RequestContext::background().with_user(user_id.clone());
            match deleter.delete_batch(&ctx, &user_id, &shorts).await {
                Ok(()) => debug!("Deleted {} keys for {}", shorts.len(), user_id),
                Err(e) => error!("Batch delete for {} failed: {}", user_id, e),
            }
        }))
    }

    pub async fn stats(&self, ctx: &RequestContext) -> Result<Stats> {
        self.storage.storage().get_stats(ctx).await
    }

    pub async fn ping(&self, ctx: &RequestContext) -> Result<()> {
        self.storage.storage().ping(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStorage, MemoryStorage};

    fn memory_service() -> LinkService {
        LinkService::new(MemoryStorage::new().into(), &StaticConfig::default())
    }

    #[tokio::test]
    async fn test_shorten_and_resolve() {
        let service = memory_service();
        let ctx = service.request_context(Some("u1"));
        let record = service.shorten(&ctx, "u1", "http://a.com").await.unwrap();
        assert_eq!(record.short.len(), 8);

        let found = service.resolve(&ctx, &record.short).await.unwrap().unwrap();
        assert_eq!(found.full, "http://a.com");
        assert!(service.resolve(&ctx, "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_shorten_rejects_empty_url() {
        let service = memory_service();
        let ctx = service.request_context(None);
        assert!(matches!(
            service.shorten(&ctx, "u1", "   ").await,
            Err(LinkVaultError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_shorten_conflict_carries_existing() {
        let service = memory_service();
        let ctx = service.request_context(None);
        let first = service.shorten(&ctx, "u1", "http://a.com").await.unwrap();
        let err = service.shorten(&ctx, "u2", "http://a.com").await.unwrap_err();
        assert_eq!(err.conflicting_record().unwrap().short, first.short);
    }

    #[tokio::test]
    async fn test_batch_keys_are_distinct() {
        let service = memory_service();
        let ctx = service.request_context(None);
        let items = (0..20)
            .map(|i| BatchItem {
                correlation_id: i.to_string(),
                original_url: format!("http://site{}.com", i),
            })
            .collect();
        let result = service.shorten_batch(&ctx, "u1", items).await.unwrap();
        let keys: HashSet<_> = result.values().map(|r| r.short.clone()).collect();
        assert_eq!(keys.len(), 20);
    }

    #[tokio::test]
    async fn test_empty_batch_rejected() {
        let service = memory_service();
        let ctx = service.request_context(None);
        assert!(matches!(
            service.shorten_batch(&ctx, "u1", Vec::new()).await,
            Err(LinkVaultError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_control_characters_rejected() {
        let service = memory_service();
        let ctx = service.request_context(None);
        assert!(matches!(
            service.shorten(&ctx, "u1", "http://a.com/\r\nSet-Cookie: x=1").await,
            Err(LinkVaultError::Validation(_))
        ));

        let items = vec![BatchItem {
            correlation_id: "1".into(),
            original_url: "http://a.com/\u{7f}".into(),
        }];
        assert!(matches!(
            service.shorten_batch(&ctx, "u1", items).await,
            Err(LinkVaultError::Validation(_))
        ));
        assert_eq!(service.stats(&ctx).await.unwrap().urls, 0);
    }

    #[tokio::test]
    async fn test_key_exhaustion() {
        let mut config = StaticConfig::default();
        // 单字符短码空间只有 62 个
        config.features.random_code_length = 1;
        config.features.key_attempts = 1;
        let service = LinkService::new(MemoryStorage::new().into(), &config);
        let ctx = service.request_context(None);

        let mut exhausted = false;
        for i in 0..500 {
            match service.shorten(&ctx, "u1", &format!("http://{}.com", i)).await {
                Ok(_) => {}
                Err(LinkVaultError::KeyExhausted(_)) => {
                    exhausted = true;
                    break;
                }
                Err(e) => panic!("unexpected error: {}", e),
            }
        }
        assert!(exhausted);
    }

    #[tokio::test]
    async fn test_delete_runs_in_background() {
        let service = memory_service();
        let ctx = service.request_context(None);
        let record = service.shorten(&ctx, "u1", "http://a.com").await.unwrap();

        service
            .delete_urls("u1", vec![record.short.clone()])
            .unwrap()
            .await
            .unwrap();

        let found = service.resolve(&ctx, &record.short).await.unwrap().unwrap();
        assert!(found.deleted);
        assert!(service.user_urls(&ctx, "u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_unsupported_on_file_backend() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("links.jsonl");
        let storage = FileStorage::new(path.to_str().unwrap()).await.unwrap();
        let service = LinkService::new(storage.into(), &StaticConfig::default());
        assert!(matches!(
            service.delete_urls("u1", vec!["abc".into()]),
            Err(LinkVaultError::Unsupported(_))
        ));
    }

    #[test]
    fn test_short_url_trims_trailing_slash() {
        let mut config = StaticConfig::default();
        config.server.base_url = "http://sho.rt/".into();
        let service = LinkService::new(MemoryStorage::new().into(), &config);
        assert_eq!(service.short_url("abc"), "http://sho.rt/abc");
    }
}
