use std::collections::{HashMap, HashSet};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info};

use crate::errors::{LinkVaultError, Result};
use crate::storage::{BatchPlan, RequestContext, Stats, Storage, StoredRecord, UrlRecord};

/// Append-only JSON-lines log.
///
/// Lines are never rewritten, so this backend has no soft-delete support.
/// Every lookup re-reads the file from the start.
pub struct FileStorage {
    file_path: PathBuf,
    /// 串行化 Store/StoreBatch 的"读-判断-写"区间
    write_lock: Arc<Mutex<()>>,
}

impl FileStorage {
    pub async fn new(file_path: impl AsRef<Path>) -> Result<Self> {
        let file_path = file_path.as_ref().to_path_buf();

        if let Some(parent) = file_path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                LinkVaultError::file_operation(format!(
                    "Failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        // 如果不存在就初始化
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file_path)
            .await
            .map_err(|e| {
                error!("Failed to create link file: {}", e);
                LinkVaultError::file_operation(format!(
                    "Failed to open link file {}: {}",
                    file_path.display(),
                    e
                ))
            })?;

        info!("File storage initialized at {}", file_path.display());
        Ok(FileStorage {
            file_path,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    async fn open_reader(&self) -> Result<BufReader<File>> {
        let file = File::open(&self.file_path).await.map_err(|e| {
            LinkVaultError::file_operation(format!(
                "Failed to open link file {}: {}",
                self.file_path.display(),
                e
            ))
        })?;
        Ok(BufReader::new(file))
    }

    /// Decode the log line by line until `visit` breaks or the file ends.
    /// A line that fails to decode aborts the scan.
    async fn scan<F>(&self, mut visit: F) -> Result<()>
    where
        F: FnMut(StoredRecord) -> ControlFlow<()> + Send,
    {
        let mut lines = self.open_reader().await?.lines();
        let mut line_no = 0usize;

        while let Some(line) = lines.next_line().await? {
            line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            let stored: StoredRecord = serde_json::from_str(&line).map_err(|e| {
                error!("Corrupted line {} in {}: {}", line_no, self.file_path.display(), e);
                LinkVaultError::serialization(format!(
                    "Failed to decode line {} of {}: {}",
                    line_no,
                    self.file_path.display(),
                    e
                ))
            })?;
            if visit(stored).is_break() {
                break;
            }
        }
        Ok(())
    }

    async fn find<P>(&self, predicate: P) -> Result<UrlRecord>
    where
        P: Fn(&StoredRecord) -> bool + Send + Sync,
    {
        let mut found = None;
        self.scan(|stored| {
            if predicate(&stored) {
                found = Some(stored.into_record());
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .await?;
        Ok(found.unwrap_or_default())
    }

    /// Append one line per record on a detached task, so a dropped request
    /// cannot interrupt a line halfway. The guard is released when the
    /// task finishes.
    async fn append(&self, guard: OwnedMutexGuard<()>, records: Vec<UrlRecord>) -> Result<()> {
        let file_path = self.file_path.clone();

        let task = tokio::spawn(async move {
            let _guard = guard;
            let mut file = OpenOptions::new()
                .append(true)
                .open(&file_path)
                .await
                .map_err(|e| {
                    LinkVaultError::file_operation(format!(
                        "Failed to open link file {} for append: {}",
                        file_path.display(),
                        e
                    ))
                })?;

            for record in &records {
                let mut line = serde_json::to_vec(&StoredRecord::from_record(record))?;
                line.push(b'\n');
                file.write_all(&line).await?;
                file.flush().await?;
            }
            Ok::<_, LinkVaultError>(records.len())
        });

        let written = task.await.map_err(|e| {
            LinkVaultError::file_operation(format!("Append task failed: {}", e))
        })??;
        debug!("Appended {} records to {}", written, self.file_path.display());
        Ok(())
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn store(&self, ctx: &RequestContext, url: UrlRecord) -> Result<UrlRecord> {
        ctx.ensure_active()?;
        if url.full.is_empty() {
            return Err(LinkVaultError::validation("full URL must not be empty"));
        }

        let guard = self.write_lock.clone().lock_owned().await;
        let existing = self.find(|stored| stored.matches_full(&url.full)).await?;
        if !existing.is_empty() {
            debug!("URL already stored: {}", url.full);
            return Err(LinkVaultError::conflict(existing));
        }

        self.append(guard, vec![url.clone()]).await?;
        Ok(url)
    }

    async fn get_by_full(&self, ctx: &RequestContext, full: &str) -> Result<UrlRecord> {
        ctx.ensure_active()?;
        self.find(|stored| stored.matches_full(full)).await
    }

    async fn get_by_short(&self, ctx: &RequestContext, short: &str) -> Result<UrlRecord> {
        ctx.ensure_active()?;
        self.find(|stored| stored.matches_short(short)).await
    }

    async fn store_batch(
        &self,
        ctx: &RequestContext,
        candidates: HashMap<String, UrlRecord>,
    ) -> Result<HashMap<String, UrlRecord>> {
        ctx.ensure_active()?;
        let mut plan = BatchPlan::new(candidates)?;

        let guard = self.write_lock.clone().lock_owned().await;
        self.scan(|stored| {
            plan.absorb(&stored.into_record());
            if plan.is_settled() {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .await?;

        if plan.is_settled() {
            debug!("Batch fully reconciled against existing records");
            return Ok(plan.into_result());
        }

        let (mut result, inserts) = plan.split();
        let records: Vec<UrlRecord> = inserts.iter().map(|(_, r)| r.clone()).collect();
        self.append(guard, records).await?;

        info!("Batch inserted {} links", inserts.len());
        result.extend(inserts);
        Ok(result)
    }

    async fn get_user_urls(&self, ctx: &RequestContext, user_id: &str) -> Result<Vec<UrlRecord>> {
        ctx.ensure_active()?;
        let mut owned = Vec::new();
        self.scan(|stored| {
            if stored.owned_by(user_id) {
                owned.push(stored.into_record());
            }
            ControlFlow::Continue(())
        })
        .await?;
        Ok(owned)
    }

    async fn ping(&self, ctx: &RequestContext) -> Result<()> {
        ctx.ensure_active()?;
        if tokio::fs::try_exists(&self.file_path).await? {
            Ok(())
        } else {
            Err(LinkVaultError::file_operation(format!(
                "Link file {} does not exist",
                self.file_path.display()
            )))
        }
    }

    async fn get_stats(&self, ctx: &RequestContext) -> Result<Stats> {
        ctx.ensure_active()?;
        let mut urls = HashSet::new();
        let mut users = HashSet::new();
        self.scan(|stored| {
            if !stored.is_deleted {
                urls.insert(stored.original_url);
            }
            users.insert(stored.user_id);
            ControlFlow::Continue(())
        })
        .await?;

        Ok(Stats {
            urls: urls.len(),
            users: users.len(),
        })
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}
