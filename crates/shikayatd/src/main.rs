//! Shikayat daemon.
//!
//! Loads config, opens the complaint store, wires the classifier pipeline
//! and serves the HTTP API.

use anyhow::Result;
use shikayat_common::auth::hash_password;
use shikayat_common::config::ShikayatConfig;
use shikayatd::server::AppState;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("shikayatd v{} starting", env!("CARGO_PKG_VERSION"));

    let config = ShikayatConfig::load();
    let bind_addr = config.server.bind_addr.clone();

    let state = AppState::from_config(&config)?;
    bootstrap_admin(&state);

    shikayatd::server::run(state, &bind_addr).await
}

/// Seed the first admin account from the environment so a fresh install
/// can log in. Does nothing once an `admin` user exists.
fn bootstrap_admin(state: &AppState) {
    let password = match std::env::var("SHIKAYAT_ADMIN_PASSWORD") {
        Ok(p) if !p.is_empty() => p,
        _ => return,
    };
    match state.store.find_admin("admin") {
        Ok(Some(_)) => {}
        Ok(None) => {
            match state
                .store
                .insert_admin("admin", &hash_password(&password), "Administrator", "admin")
            {
                Ok(()) => info!("Bootstrapped admin account from environment"),
                Err(e) => warn!("Failed to bootstrap admin account: {}", e),
            }
        }
        Err(e) => warn!("Failed to check for admin account: {}", e),
    }
}
