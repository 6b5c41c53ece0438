//! Storage contract and backends
//!
//! Every backend implements [`Storage`]. Soft deletion is a separate
//! capability ([`BatchDelete`]) that only some variants of
//! [`StorageBackend`] provide; the file log does not.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::config::{BackendKind, StorageConfig};
use crate::errors::Result;
use crate::utils::generate_random_code;

pub mod backends;
pub mod context;
pub mod models;
pub mod reconcile;

pub use backends::{DatabaseStorage, FileStorage, MemoryStorage};
pub use context::RequestContext;
pub use models::{Stats, StoredRecord, UrlRecord};
pub use reconcile::BatchPlan;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Persist `url` unless a non-deleted record with the same full URL
    /// exists, in which case `Conflict` carries that record.
    async fn store(&self, ctx: &RequestContext, url: UrlRecord) -> Result<UrlRecord>;

    /// Non-deleted record for `full`, or the zero value.
    async fn get_by_full(&self, ctx: &RequestContext, full: &str) -> Result<UrlRecord>;

    /// Record for `short` (tombstones included), or the zero value.
    async fn get_by_short(&self, ctx: &RequestContext, short: &str) -> Result<UrlRecord>;

    async fn store_batch(
        &self,
        ctx: &RequestContext,
        candidates: HashMap<String, UrlRecord>,
    ) -> Result<HashMap<String, UrlRecord>>;

    async fn get_user_urls(&self, ctx: &RequestContext, user_id: &str) -> Result<Vec<UrlRecord>>;

    async fn ping(&self, ctx: &RequestContext) -> Result<()>;

    async fn get_stats(&self, ctx: &RequestContext) -> Result<Stats>;

    fn get_randkey(&self, n: usize) -> String {
        generate_random_code(n)
    }

    fn backend_name(&self) -> &'static str;
}

/// Soft deletion capability.
#[async_trait]
pub trait BatchDelete: Send + Sync {
    /// Mark the records among `shorts` owned by `user_id` as deleted.
    /// Keys owned by someone else, or unknown, are ignored.
    async fn delete_batch(&self, ctx: &RequestContext, user_id: &str, shorts: &[String])
    -> Result<()>;
}

/// The closed set of backends. Capability support is fixed per variant.
#[derive(Clone)]
pub enum StorageBackend {
    Memory(Arc<MemoryStorage>),
    File(Arc<FileStorage>),
    Database(Arc<DatabaseStorage>),
}

impl StorageBackend {
    pub fn storage(&self) -> &dyn Storage {
        match self {
            StorageBackend::Memory(s) => s.as_ref(),
            StorageBackend::File(s) => s.as_ref(),
            StorageBackend::Database(s) => s.as_ref(),
        }
    }

    pub fn deleter(&self) -> Option<&dyn BatchDelete> {
        match self {
            StorageBackend::Memory(s) => Some(s.as_ref()),
            StorageBackend::File(_) => None,
            StorageBackend::Database(s) => Some(s.as_ref()),
        }
    }

    pub fn supports_delete(&self) -> bool {
        self.deleter().is_some()
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            StorageBackend::Memory(_) => BackendKind::Memory,
            StorageBackend::File(_) => BackendKind::File,
            StorageBackend::Database(_) => BackendKind::Database,
        }
    }
}

impl From<MemoryStorage> for StorageBackend {
    fn from(storage: MemoryStorage) -> Self {
        StorageBackend::Memory(Arc::new(storage))
    }
}

impl From<FileStorage> for StorageBackend {
    fn from(storage: FileStorage) -> Self {
        StorageBackend::File(Arc::new(storage))
    }
}

impl From<DatabaseStorage> for StorageBackend {
    fn from(storage: DatabaseStorage) -> Self {
        StorageBackend::Database(Arc::new(storage))
    }
}

pub struct StorageFactory;

impl StorageFactory {
    pub async fn create(config: &StorageConfig) -> Result<StorageBackend> {
        let backend: StorageBackend = match config.backend {
            BackendKind::Memory => MemoryStorage::new().into(),
            BackendKind::File => FileStorage::new(&config.file_path).await?.into(),
            BackendKind::Database => DatabaseStorage::new(&config.database_url).await?.into(),
        };

        if !backend.supports_delete() {
            warn!(
                "{} storage does not support batch deletion",
                backend.storage().backend_name().to_uppercase()
            );
        }
        Ok(backend)
    }
}
