use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::{LinkVaultError, Result};
use crate::storage::{BatchDelete, BatchPlan, RequestContext, Stats, Storage, UrlRecord};

/// Process-local storage. Lookups are linear scans over the values.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    records: RwLock<HashMap<Uuid, UrlRecord>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn store(&self, ctx: &RequestContext, url: UrlRecord) -> Result<UrlRecord> {
        ctx.ensure_active()?;
        if url.full.is_empty() {
            return Err(LinkVaultError::validation("full URL must not be empty"));
        }

        // 检查与插入在同一把写锁内完成
        let mut records = self.records.write();
        if let Some(existing) = records.values().find(|r| !r.deleted && r.full == url.full) {
            debug!("URL already stored: {}", url.full);
            return Err(LinkVaultError::conflict(existing.clone()));
        }

        records.insert(Uuid::new_v4(), url.clone());
        Ok(url)
    }

    async fn get_by_full(&self, ctx: &RequestContext, full: &str) -> Result<UrlRecord> {
        ctx.ensure_active()?;
        let records = self.records.read();
        Ok(records
            .values()
            .find(|r| !r.deleted && r.full == full)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_by_short(&self, ctx: &RequestContext, short: &str) -> Result<UrlRecord> {
        ctx.ensure_active()?;
        let records = self.records.read();
        Ok(records
            .values()
            .find(|r| r.short == short)
            .cloned()
            .unwrap_or_default())
    }

    async fn store_batch(
        &self,
        ctx: &RequestContext,
        candidates: HashMap<String, UrlRecord>,
    ) -> Result<HashMap<String, UrlRecord>> {
        ctx.ensure_active()?;
        let mut plan = BatchPlan::new(candidates)?;

        let mut records = self.records.write();
        for existing in records.values() {
            plan.absorb(existing);
            if plan.is_settled() {
                break;
            }
        }

        if plan.is_settled() {
            debug!("Batch fully reconciled against existing records");
            return Ok(plan.into_result());
        }

        let (mut result, inserts) = plan.split();
        let written = inserts.len();
        for (key, candidate) in inserts {
            records.insert(Uuid::new_v4(), candidate.clone());
            result.insert(key, candidate);
        }

        info!("Batch inserted {} links", written);
        Ok(result)
    }

    async fn get_user_urls(&self, ctx: &RequestContext, user_id: &str) -> Result<Vec<UrlRecord>> {
        ctx.ensure_active()?;
        let records = self.records.read();
        Ok(records
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn ping(&self, ctx: &RequestContext) -> Result<()> {
        ctx.ensure_active()
    }

    async fn get_stats(&self, ctx: &RequestContext) -> Result<Stats> {
        ctx.ensure_active()?;
        let records = self.records.read();

        let mut urls = HashSet::new();
        let mut users = HashSet::new();
        for record in records.values() {
            if !record.deleted {
                urls.insert(record.full.as_str());
            }
            users.insert(record.user_id.as_str());
        }

        Ok(Stats {
            urls: urls.len(),
            users: users.len(),
        })
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[async_trait]
impl BatchDelete for MemoryStorage {
    async fn delete_batch(
        &self,
        ctx: &RequestContext,
        user_id: &str,
        shorts: &[String],
    ) -> Result<()> {
        ctx.ensure_active()?;
        let wanted: HashSet<&str> = shorts.iter().map(String::as_str).collect();

        let mut records = self.records.write();
        let mut deleted = 0usize;
        for record in records.values_mut() {
            if record.user_id == user_id && !record.deleted && wanted.contains(record.short.as_str())
            {
                record.deleted = true;
                deleted += 1;
            }
        }

        info!("Soft-deleted {} links for user {}", deleted, user_id);
        Ok(())
    }
}
