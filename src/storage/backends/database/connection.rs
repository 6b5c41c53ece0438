use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use tracing::info;

use crate::errors::{LinkVaultError, Result};

/// 表结构（非迁移，仅在缺失时创建）
const BOOTSTRAP_SQL: [&str; 4] = [
    "CREATE TABLE IF NOT EXISTS url_records (
        uuid VARCHAR(36) PRIMARY KEY,
        user_id VARCHAR(255) NOT NULL,
        short_url VARCHAR(255) NOT NULL,
        original_url TEXT NOT NULL,
        is_deleted BOOLEAN NOT NULL DEFAULT FALSE
    )",
    // 未删除记录的 original_url 唯一
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_url_records_active_original
        ON url_records (original_url) WHERE is_deleted = FALSE",
    "CREATE INDEX IF NOT EXISTS idx_url_records_short_url ON url_records (short_url)",
    "CREATE INDEX IF NOT EXISTS idx_url_records_user_id ON url_records (user_id)",
];

/// 从数据库 URL 推断数据库类型
pub fn infer_backend_from_url(database_url: &str) -> Result<&'static str> {
    if database_url.starts_with("sqlite:")
        || database_url.ends_with(".db")
        || database_url.ends_with(".sqlite")
    {
        Ok("sqlite")
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Ok("postgres")
    } else {
        Err(LinkVaultError::database_config(format!(
            "Cannot infer database type from URL: {}. Supported: sqlite://, postgres://",
            database_url
        )))
    }
}

/// 连接 SQLite 数据库（带自动创建）
pub async fn connect_sqlite(database_url: &str) -> Result<DatabaseConnection> {
    use sea_orm::SqlxSqliteConnector;
    use sea_orm::sqlx::SqlitePool;
    use sea_orm::sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteSynchronous};
    use std::str::FromStr;

    // 允许直接传文件路径
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite://{}?mode=rwc", database_url)
    };

    let opt = SqliteConnectOptions::from_str(&url)
        .map_err(|e| LinkVaultError::database_config(format!("Invalid SQLite URL: {}", e)))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(5));

    let pool = SqlitePool::connect_with(opt).await.map_err(|e| {
        LinkVaultError::database_connection(format!("Cannot connect to SQLite database: {}", e))
    })?;

    Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
}

/// 连接 PostgreSQL
pub async fn connect_postgres(database_url: &str) -> Result<DatabaseConnection> {
    let mut opt = ConnectOptions::new(database_url.to_owned());
    opt.connect_timeout(std::time::Duration::from_secs(8))
        .acquire_timeout(std::time::Duration::from_secs(8))
        .sqlx_logging(false);

    Database::connect(opt).await.map_err(|e| {
        LinkVaultError::database_connection(format!("Cannot connect to POSTGRES database: {}", e))
    })
}

/// Create the table and indexes when they are missing.
pub async fn bootstrap_schema(db: &DatabaseConnection) -> Result<()> {
    for sql in BOOTSTRAP_SQL {
        db.execute_unprepared(sql).await.map_err(|e| {
            LinkVaultError::database_operation(format!("Schema bootstrap failed: {}", e))
        })?;
    }
    info!("Database schema ready");
    Ok(())
}
