//! Danmu Daemon
//!
//! Caption server for danmu overlays. Resolves caption sets through the
//! aggregator (cache, optional upstream, fallback) and serves them over HTTP.
//!
//! # Usage
//!
//! ```bash
//! # Defaults: 127.0.0.1:3000, no upstream (fallback captions only)
//! danmu-daemon
//!
//! # With an upstream aggregator
//! DANMU_AGGREGATOR_BASE=https://aggregator.example.com danmu-daemon
//!
//! # Custom bind address and verbose logging
//! RUST_LOG=debug danmu-daemon --bind 0.0.0.0:8080
//! ```
//!
//! # Environment Variables
//!
//! - `DANMU_CONFIG`: Path to the TOML config file
//! - `DANMU_BIND`: Listen address
//! - `DANMU_AGGREGATOR_BASE`: Upstream aggregator base URL
//! - `DANMU_UPSTREAM_TIMEOUT_SECS`: Upstream timeout (unset or 0: none)
//! - `DANMU_CACHE_TTL_SECS`: Cache TTL
//! - `RUST_LOG`: Log level (trace, debug, info, warn, error)
//!
//! # Signals
//!
//! - SIGTERM/SIGINT: Graceful shutdown (in-flight requests finish)

mod server;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};

use danmu_core::config::{default_config_path, load_config_from_path, ConfigOverrides};
use danmu_core::upstream::{CaptionUpstream, HttpAggregator};
use danmu_core::{system_clock, CaptionAggregator, TtlCache};

use crate::server::AppState;

/// Caption server for danmu overlays
#[derive(Debug, Parser)]
#[command(name = "danmu-daemon", version, about)]
struct Args {
    /// TOML config file (default: ~/.config/danmu/danmu.toml)
    #[arg(long, env = "DANMU_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, host:port
    #[arg(long)]
    bind: Option<String>,

    /// Upstream aggregator base URL
    #[arg(long)]
    aggregator_base: Option<String>,

    /// Upstream request timeout in seconds (0: none)
    #[arg(long)]
    upstream_timeout_secs: Option<u64>,

    /// Cache entry lifetime in seconds
    #[arg(long)]
    cache_ttl_secs: Option<u64>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            bind: self.bind.clone(),
            aggregator_base: self.aggregator_base.clone(),
            upstream_timeout_secs: self.upstream_timeout_secs,
            cache_ttl_secs: self.cache_ttl_secs,
            server_url: None,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("danmu_daemon=info".parse()?)
                .add_directive("danmu_core=info".parse()?),
        )
        .with_target(true)
        .init();

    let args = Args::parse();

    info!("Starting Danmu Daemon");

    let mut config = load_config_from_path(args.config.clone().or_else(default_config_path))
        .await
        .context("Failed to load configuration")?;
    args.overrides()
        .apply(&mut config)
        .context("Invalid command-line overrides")?;
    info!(
        source = %config.source(),
        bind = %config.bind,
        ttl_secs = config.cache_ttl.as_secs(),
        "Configuration loaded"
    );

    let upstream: Option<Arc<dyn CaptionUpstream>> = match &config.aggregator_base {
        Some(base) => {
            let aggregator = HttpAggregator::new(base, config.upstream_timeout)
                .context("Failed to build upstream aggregator client")?;
            info!(base = %aggregator.base_url(), "Upstream aggregator configured");
            Some(Arc::new(aggregator))
        }
        None => {
            warn!("No upstream aggregator configured, serving fallback captions only");
            None
        }
    };

    let aggregator = CaptionAggregator::new(TtlCache::new(config.cache_ttl, system_clock()), upstream);
    let state = AppState::new(
        Arc::new(aggregator),
        config.default_provider.clone(),
        config.default_limit,
    );

    server::serve(&config.bind, state, shutdown_signal()).await?;

    info!("Danmu Daemon stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        () = terminate => {
            info!("Received SIGTERM, shutting down");
        }
    }
}
