use clap::Parser;
use tracing::info;

use linkvault::config::{Args, StaticConfig};
use linkvault::{runtime, system};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.generate_config {
        println!("{}", StaticConfig::generate_sample_config());
        return Ok(());
    }

    dotenvy::dotenv().ok();

    let config = match StaticConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e.format_colored());
            std::process::exit(1);
        }
    };

    let _guard = system::init_logging(&config.logging)?;
    info!(
        "LinkVault {} starting with {} storage",
        env!("CARGO_PKG_VERSION"),
        config.storage.backend
    );

    runtime::run_server(config).await
}
