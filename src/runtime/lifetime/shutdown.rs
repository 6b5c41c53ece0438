use tokio::signal;
use tracing::{error, info, warn};

use crate::storage::StorageBackend;

/// Wait for Ctrl+C, then release storage resources.
pub async fn listen_for_shutdown(storage: &StorageBackend) {
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received");
        }
        Err(e) => {
            warn!(
                "Failed to listen for Ctrl+C: {}. Proceeding with shutdown anyway.",
                e
            );
        }
    }

    if let StorageBackend::Database(db) = storage {
        // 关闭连接池
        match db.get_db().clone().close().await {
            Ok(()) => info!("Database connections closed"),
            Err(e) => error!("Failed to close database connections: {}", e),
        }
    }
}
