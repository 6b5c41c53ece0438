//! Server startup
//!
//! Builds the shared components once, before workers are spawned.

use std::sync::Arc;

use tracing::{info, warn};

use crate::auth::{DEFAULT_JWT_SECRET, IdentityResolver, JwtService};
use crate::config::StaticConfig;
use crate::errors::Result;
use crate::services::LinkService;
use crate::storage::{StorageBackend, StorageFactory};

/// Everything the HTTP workers share.
#[derive(Clone)]
pub struct StartupContext {
    pub storage: StorageBackend,
    pub link_service: Arc<LinkService>,
    pub resolver: Arc<IdentityResolver>,
}

pub async fn prepare_server_startup(config: &StaticConfig) -> Result<StartupContext> {
    let storage = StorageFactory::create(&config.storage).await?;
    info!(
        "Using storage backend: {}",
        storage.storage().backend_name()
    );

    if config.auth.jwt_secret == DEFAULT_JWT_SECRET {
        warn!("auth.jwt_secret is the built-in default; set LV__AUTH__JWT_SECRET in production");
    }

    let resolver = Arc::new(IdentityResolver::new(JwtService::from_config(&config.auth)));
    let link_service = Arc::new(LinkService::new(storage.clone(), config));

    Ok(StartupContext {
        storage,
        link_service,
        resolver,
    })
}
