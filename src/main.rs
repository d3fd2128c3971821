//! minnow - line-oriented IRC bot.
//!
//! Loads the configuration, connects, and keeps the session alive under
//! the bounded-retry reconnection policy.

use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use minnow::{Config, Session};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "minnow.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    info!(
        server = %config.server.host,
        port = config.server.port,
        nick = %config.identity.nick,
        "Starting minnow"
    );

    let mut retries = config.reconnect.retries;
    loop {
        match Session::connect(&config).await {
            Ok(mut session) => {
                let outcome = session.run().await;
                if session.state().is_quitting() {
                    info!("deliberate quit, not reconnecting");
                    break;
                }
                match outcome {
                    Ok(()) => warn!("connection closed by peer"),
                    Err(e) => warn!(error = %e, "session ended on transport fault"),
                }
            }
            Err(e) => warn!(error = %e, "connection failed"),
        }

        if !config.reconnect.enabled {
            info!("reconnect disabled, shutting down");
            break;
        }
        if retries == 0 {
            info!("retry budget exhausted, shutting down");
            break;
        }
        retries -= 1;
        info!(remaining = retries, "reconnecting");
        tokio::time::sleep(Duration::from_secs(5)).await;
    }

    Ok(())
}
