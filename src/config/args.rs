//! Command-line arguments
//!
//! Only the configuration file path and a sample-config generator are
//! exposed; everything else comes from `config.toml` or `LV__*` variables.

use clap::Parser;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "linkvault", version, about = "URL shortener with anonymous sessions")]
pub struct Args {
    /// Path to the TOML configuration file
    #[arg(short = 'c', long = "config")]
    pub config: Option<String>,

    /// Print a sample configuration and exit
    #[arg(long = "generate-config")]
    pub generate_config: bool,
}
