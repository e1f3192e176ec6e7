//! PolyLab API server.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────────┐
//!                      │                     POLYLAB API                      │
//!                      │                                                      │
//!   Browser request    │  ┌──────────┐  ┌───────────┐  ┌──────┐  ┌─────────┐  │
//!   ───────────────────┼─▶│ security │─▶│ request   │─▶│ CORS │─▶│pipeline │  │
//!                      │  │ headers  │  │ id/trace  │  │      │  │         │  │
//!                      │  └──────────┘  └───────────┘  └──────┘  └────┬────┘  │
//!                      │                                              │       │
//!                      │        rate limit → session → CSRF           ▼       │
//!                      │                                        ┌──────────┐  │
//!   ◀──────────────────┼────────────────────────────────────────│  routes  │  │
//!   Response           │                                        └──────────┘  │
//!                      └──────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use polylab_api::clock::SystemClock;
use polylab_api::config::load_config;
use polylab_api::lifecycle::{wait_for_signal, Shutdown};
use polylab_api::observability::{logging, metrics};
use polylab_api::users::{seed::ensure_seed_admin, InMemoryUserStore, UserStore};
use polylab_api::HttpServer;

#[derive(Parser)]
#[command(name = "polylab-api")]
#[command(about = "PolyLab educational platform API", long_about = None)]
struct Cli {
    /// Optional TOML configuration file; environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    logging::init_tracing(&config.observability);
    tracing::info!(app = %config.app_name, "polylab-api v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        session_ttl_minutes = config.session.ttl_minutes,
        rate_limit_per_minute = config.rate_limit.requests_per_minute,
        hsts = config.security.hsts_enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let users: Arc<dyn UserStore> = Arc::new(InMemoryUserStore::new());
    let outcome =
        ensure_seed_admin(users.as_ref(), &config.admin, config.security.bcrypt_cost).await?;
    tracing::debug!(?outcome, "Seed admin check finished");

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, users, Arc::new(SystemClock));

    let trigger = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        trigger.trigger();
    });

    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
