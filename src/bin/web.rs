#![cfg(not(tarpaulin_include))]

use calcsite::{Config, app};

/// Main entry point for the web application
///
/// Reads configuration from the environment (see [`Config::from_env`]),
/// sets up logging from `RUST_LOG` (default `info`) and serves until killed.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env()?;
    if config.mail.is_none() {
        log::warn!("SMTP_HOST is not set; password reset and subscription mail are disabled");
    }

    app::run(config).await
}
