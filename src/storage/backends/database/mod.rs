//! SeaORM storage backend
//!
//! Relational variant of the storage contract for SQLite and PostgreSQL.
//! Uniqueness of active full URLs is enforced by a partial unique index,
//! soft delete is an in-place `UPDATE`, and stats come from one query.

mod connection;
pub mod entity;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    FromQueryResult, QueryFilter, SqlErr, Statement, TransactionTrait, sea_query::Expr,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::{LinkVaultError, Result};
use crate::storage::{BatchDelete, BatchPlan, RequestContext, Stats, Storage, UrlRecord};

pub use connection::{bootstrap_schema, connect_postgres, connect_sqlite, infer_backend_from_url};
use entity as url_record;

const STATS_SQL: &str = "SELECT \
    COUNT(DISTINCT CASE WHEN is_deleted THEN NULL ELSE original_url END) AS urls, \
    COUNT(DISTINCT user_id) AS users \
    FROM url_records";

/// 用于统计查询的结果结构体
#[derive(Debug, FromQueryResult)]
struct StatsRow {
    urls: i64,
    users: i64,
}

fn model_to_record(model: url_record::Model) -> UrlRecord {
    UrlRecord {
        user_id: model.user_id,
        full: model.original_url,
        short: model.short_url,
        deleted: model.is_deleted,
    }
}

fn record_to_active_model(record: &UrlRecord) -> url_record::ActiveModel {
    url_record::ActiveModel {
        uuid: Set(Uuid::new_v4().to_string()),
        user_id: Set(record.user_id.clone()),
        short_url: Set(record.short.clone()),
        original_url: Set(record.full.clone()),
        is_deleted: Set(record.deleted),
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// SeaORM-based storage backend
#[derive(Clone)]
pub struct DatabaseStorage {
    db: DatabaseConnection,
    backend_name: &'static str,
    /// 序列化本实例的写事务（SQLite 延迟事务在读后升级写锁时会直接 BUSY）
    write_lock: Arc<Mutex<()>>,
}

impl DatabaseStorage {
    pub async fn new(database_url: &str) -> Result<Self> {
        if database_url.is_empty() {
            return Err(LinkVaultError::database_config("database_url is not set"));
        }

        let backend_name = infer_backend_from_url(database_url)?;
        let db = if backend_name == "sqlite" {
            connect_sqlite(database_url).await?
        } else {
            connect_postgres(database_url).await?
        };

        bootstrap_schema(&db).await?;

        info!("{} storage initialized.", backend_name.to_uppercase());
        Ok(DatabaseStorage {
            db,
            backend_name,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// 获取数据库连接
    pub fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }

    async fn find_active_by_full<C: ConnectionTrait>(
        conn: &C,
        full: &str,
    ) -> std::result::Result<Option<url_record::Model>, DbErr> {
        url_record::Entity::find()
            .filter(url_record::Column::OriginalUrl.eq(full))
            .filter(url_record::Column::IsDeleted.eq(false))
            .one(conn)
            .await
    }
}

#[async_trait]
impl Storage for DatabaseStorage {
    async fn store(&self, ctx: &RequestContext, url: UrlRecord) -> Result<UrlRecord> {
        ctx.ensure_active()?;
        if url.full.is_empty() {
            return Err(LinkVaultError::validation("full URL must not be empty"));
        }

        let _guard = self.write_lock.lock().await;
        let txn = self.db.begin().await.map_err(|e| {
            LinkVaultError::database_operation(format!("Failed to begin transaction: {}", e))
        })?;

        if let Some(existing) = Self::find_active_by_full(&txn, &url.full).await? {
            txn.rollback().await?;
            debug!("URL already stored: {}", url.full);
            return Err(LinkVaultError::conflict(model_to_record(existing)));
        }

        let insert = url_record::Entity::insert(record_to_active_model(&url))
            .exec_without_returning(&txn)
            .await;

        match insert {
            Ok(_) => {
                txn.commit().await.map_err(|e| {
                    LinkVaultError::database_operation(format!("Failed to commit: {}", e))
                })?;
                Ok(url)
            }
            // 并发写入时由唯一索引兜底
            Err(e) if is_unique_violation(&e) => {
                txn.rollback().await?;
                warn!("Concurrent insert detected for {}", url.full);
                let winner = Self::find_active_by_full(&self.db, &url.full)
                    .await?
                    .map(model_to_record)
                    .unwrap_or_default();
                Err(LinkVaultError::conflict(winner))
            }
            Err(e) => Err(LinkVaultError::database_operation(format!(
                "Failed to insert '{}': {}",
                url.short, e
            ))),
        }
    }

    async fn get_by_full(&self, ctx: &RequestContext, full: &str) -> Result<UrlRecord> {
        ctx.ensure_active()?;
        Ok(Self::find_active_by_full(&self.db, full)
            .await?
            .map(model_to_record)
            .unwrap_or_default())
    }

    async fn get_by_short(&self, ctx: &RequestContext, short: &str) -> Result<UrlRecord> {
        ctx.ensure_active()?;
        Ok(url_record::Entity::find()
            .filter(url_record::Column::ShortUrl.eq(short))
            .one(&self.db)
            .await?
            .map(model_to_record)
            .unwrap_or_default())
    }

    async fn store_batch(
        &self,
        ctx: &RequestContext,
        candidates: HashMap<String, UrlRecord>,
    ) -> Result<HashMap<String, UrlRecord>> {
        ctx.ensure_active()?;
        let mut plan = BatchPlan::new(candidates)?;

        let _guard = self.write_lock.lock().await;
        let txn = self.db.begin().await.map_err(|e| {
            LinkVaultError::database_operation(format!("Failed to begin transaction: {}", e))
        })?;

        let existing = url_record::Entity::find()
            .filter(url_record::Column::OriginalUrl.is_in(plan.pending_urls()))
            .filter(url_record::Column::IsDeleted.eq(false))
            .all(&txn)
            .await?;
        for model in existing {
            plan.absorb(&model_to_record(model));
            if plan.is_settled() {
                break;
            }
        }

        if plan.is_settled() {
            txn.rollback().await?;
            return Ok(plan.into_result());
        }

        // 唯一索引不允许同批次重复的 URL，重复项共享第一条记录
        let (mut result, inserts) = plan.split();
        let mut first_by_full: HashMap<String, UrlRecord> = HashMap::new();
        let mut models = Vec::new();
        for (key, candidate) in inserts {
            let record = first_by_full
                .entry(candidate.full.clone())
                .or_insert_with(|| {
                    models.push(record_to_active_model(&candidate));
                    candidate
                })
                .clone();
            result.insert(key, record);
        }

        let written = models.len();
        url_record::Entity::insert_many(models)
            .exec_without_returning(&txn)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    LinkVaultError::database_operation(format!(
                        "Batch raced with a concurrent insert: {}",
                        e
                    ))
                } else {
                    LinkVaultError::database_operation(format!("Batch insert failed: {}", e))
                }
            })?;

        txn.commit()
            .await
            .map_err(|e| LinkVaultError::database_operation(format!("Failed to commit: {}", e)))?;

        info!("Batch inserted {} links", written);
        Ok(result)
    }

    async fn get_user_urls(&self, ctx: &RequestContext, user_id: &str) -> Result<Vec<UrlRecord>> {
        ctx.ensure_active()?;
        let models = url_record::Entity::find()
            .filter(url_record::Column::UserId.eq(user_id))
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(model_to_record).collect())
    }

    async fn ping(&self, ctx: &RequestContext) -> Result<()> {
        ctx.ensure_active()?;
        self.db.ping().await.map_err(|e| {
            LinkVaultError::database_connection(format!("Database ping failed: {}", e))
        })
    }

    async fn get_stats(&self, ctx: &RequestContext) -> Result<Stats> {
        ctx.ensure_active()?;
        let stmt = Statement::from_string(self.db.get_database_backend(), STATS_SQL);
        let row = StatsRow::find_by_statement(stmt)
            .one(&self.db)
            .await?
            .ok_or_else(|| LinkVaultError::database_operation("Stats query returned no rows"))?;

        Ok(Stats {
            urls: row.urls.max(0) as usize,
            users: row.users.max(0) as usize,
        })
    }

    fn backend_name(&self) -> &'static str {
        self.backend_name
    }
}

#[async_trait]
impl BatchDelete for DatabaseStorage {
    async fn delete_batch(
        &self,
        ctx: &RequestContext,
        user_id: &str,
        shorts: &[String],
    ) -> Result<()> {
        ctx.ensure_active()?;
        if shorts.is_empty() {
            return Ok(());
        }

        let _guard = self.write_lock.lock().await;
        let result = url_record::Entity::update_many()
            .col_expr(url_record::Column::IsDeleted, Expr::value(true))
            .filter(url_record::Column::UserId.eq(user_id))
            .filter(url_record::Column::ShortUrl.is_in(shorts.iter().cloned()))
            .filter(url_record::Column::IsDeleted.eq(false))
            .exec(&self.db)
            .await
            .map_err(|e| LinkVaultError::database_operation(format!("Batch delete failed: {}", e)))?;

        info!(
            "Soft-deleted {} links for user {}",
            result.rows_affected, user_id
        );
        Ok(())
    }
}
