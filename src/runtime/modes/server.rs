//! Server mode
//!
//! Configures and starts the HTTP server with all routes.

use actix_web::{App, HttpServer, middleware::DefaultHeaders, web};
use anyhow::Result;
use tracing::{error, warn};

use crate::api::{self, constants};
use crate::config::StaticConfig;
use crate::runtime::lifetime;

/// Run the HTTP server until it stops or Ctrl+C arrives.
///
/// **Note**: Logging system must be initialized before calling this function
pub async fn run_server(config: StaticConfig) -> Result<()> {
    let startup = lifetime::startup::prepare_server_startup(&config)
        .await
        .map_err(|e| {
            error!("Server startup failed: {}", e);
            e
        })?;

    let storage = startup.storage.clone();
    let link_service = startup.link_service.clone();
    let resolver = startup.resolver.clone();
    let auth = config.auth.clone();

    let bind_address = format!("{}:{}", config.server.host, config.server.port);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(link_service.clone()))
            .app_data(web::PayloadConfig::new(constants::PAYLOAD_LIMIT))
            .app_data(web::JsonConfig::default().limit(constants::PAYLOAD_LIMIT))
            .wrap(DefaultHeaders::new().add(("Cache-Control", "no-store")))
            .configure(|cfg| api::configure(cfg, &resolver, &auth))
    })
    .keep_alive(std::time::Duration::from_secs(30))
    .bind(&bind_address)?;

    warn!("Starting server at http://{}", bind_address);
    let server = server.run();

    tokio::select! {
        res = server => {
            res?;
        }
        _ = lifetime::shutdown::listen_for_shutdown(&storage) => {
            warn!("Graceful shutdown complete");
        }
    }

    Ok(())
}
