//! mirrorfs Daemon - Background mirroring service
//!
//! This binary keeps a local directory tree in sync with a remote
//! hierarchical file store:
//! - Loads and validates the YAML configuration
//! - Builds the pooled remote store and the configured caching strategy
//! - Hands shutdown signals (SIGTERM/SIGINT) to the strategy so in-flight
//!   transfers drain before exit
//!
//! # Architecture
//!
//! All ongoing work lives inside the caching strategy: the full strategy
//! runs its own listing, keepalive, and transfer loops, while the minimal
//! strategy acts only when operations arrive. The daemon therefore wires
//! the pieces together, then parks on a `CancellationToken` that is
//! triggered on receipt of SIGTERM or SIGINT.

use std::sync::Arc;

use anyhow::{Context, Result};
use mirrorfs_cache::{FullCache, ICacheStrategy, MinimalCache};
use mirrorfs_core::{config::Config, ports::IRemoteStore, tree::NamespaceTree};
use mirrorfs_remote::{DirectoryConnector, IConnector, PooledRemoteStore};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Main daemon service tying configuration, remote store, and strategy
/// together.
struct DaemonService {
    config: Config,
    strategy: Arc<dyn ICacheStrategy>,
    shutdown: CancellationToken,
}

impl DaemonService {
    /// Builds the service from configuration.
    ///
    /// Creates the local root and cache directories, connects the remote
    /// store pools, and instantiates the strategy named by
    /// `cache.strategy`. Pool construction fails fast when the first
    /// connection cannot be established.
    async fn new(config: Config, shutdown: CancellationToken) -> Result<Self> {
        tokio::fs::create_dir_all(&config.local.root_dir)
            .await
            .with_context(|| {
                format!(
                    "Failed to create local root {}",
                    config.local.root_dir.display()
                )
            })?;
        tokio::fs::create_dir_all(&config.local.cache_dir)
            .await
            .with_context(|| {
                format!(
                    "Failed to create cache directory {}",
                    config.local.cache_dir.display()
                )
            })?;

        let tree = Arc::new(NamespaceTree::new());

        // The connector is the protocol seam. The directory-backed
        // connector serves `remote.store_root` straight from the local
        // filesystem; a wire-protocol connector slots in here unchanged.
        let connector: Arc<dyn IConnector> = Arc::new(DirectoryConnector::new(
            config.remote.store_root.clone().into(),
        ));

        let store = PooledRemoteStore::new(
            connector,
            config.pool.capacity,
            "/",
            config.local.root_dir.clone(),
            Arc::clone(&tree),
        )
        .await
        .context("Failed to connect to the remote store")?;
        let store: Arc<dyn IRemoteStore> = Arc::new(store);

        let strategy: Arc<dyn ICacheStrategy> = match config.cache.strategy.as_str() {
            "minimal" => Arc::new(MinimalCache::new(tree, store, &config)),
            _ => Arc::new(FullCache::new(tree, store, &config)),
        };

        Ok(Self {
            config,
            strategy,
            shutdown,
        })
    }

    /// Parks until shutdown is requested, then drains the strategy.
    async fn run(&self) -> Result<()> {
        info!(
            strategy = %self.config.cache.strategy,
            root = %self.config.local.root_dir.display(),
            store_root = %self.config.remote.store_root,
            pool_capacity = self.config.pool.capacity,
            "Daemon running"
        );

        self.shutdown.cancelled().await;

        info!("Draining caching strategy");
        self.strategy.shutdown().await;
        Ok(())
    }
}

/// Waits for SIGTERM or SIGINT and triggers the cancellation token
///
/// This function is spawned as a task that listens for OS signals and
/// cancels the provided token when a shutdown signal is received.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = Config::default_path();
    let config = Config::load_or_default(&config_path);

    // RUST_LOG wins; the configured level is the fallback.
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();

    info!(config_path = %config_path.display(), "mirrorfs daemon starting (mirrorfsd)");

    let validation_errors = config.validate();
    if !validation_errors.is_empty() {
        for err in &validation_errors {
            warn!(field = %err.field, message = %err.message, "Invalid configuration value");
        }
        anyhow::bail!(
            "Configuration is invalid ({} error(s)); see log for details",
            validation_errors.len()
        );
    }

    let shutdown_token = CancellationToken::new();

    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal(signal_token).await;
    });

    let service = DaemonService::new(config, shutdown_token.clone()).await?;

    let result = service.run().await;

    match &result {
        Ok(()) => info!("mirrorfs daemon shut down gracefully"),
        Err(e) => error!(error = %e, "mirrorfs daemon exiting with error"),
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirrorfs_core::config::ConfigBuilder;

    fn test_config(remote_root: &std::path::Path, local: &std::path::Path) -> Config {
        ConfigBuilder::new()
            .local_root_dir(local.join("root"))
            .local_cache_dir(local.join("cache"))
            .remote_store_root(remote_root.to_string_lossy().into_owned())
            .pool_capacity(1)
            .cache_strategy("minimal")
            .build()
    }

    #[test]
    fn cancellation_token_propagates_to_children() {
        let token = CancellationToken::new();
        let child = token.child_token();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
        assert!(child.is_cancelled());
    }

    #[tokio::test]
    async fn service_builds_against_a_directory_store() {
        let remote = tempfile::tempdir().unwrap();
        let local = tempfile::tempdir().unwrap();
        std::fs::write(remote.path().join("seed"), b"x").unwrap();

        let config = test_config(remote.path(), local.path());
        let service = DaemonService::new(config, CancellationToken::new())
            .await
            .unwrap();

        assert!(local.path().join("root").is_dir());
        assert!(local.path().join("cache").is_dir());
        assert_eq!(service.config.cache.strategy, "minimal");
    }

    #[tokio::test]
    async fn service_fails_when_store_root_is_missing() {
        let local = tempfile::tempdir().unwrap();
        let missing = local.path().join("no-such-store");
        let config = test_config(&missing, local.path());

        let result = DaemonService::new(config, CancellationToken::new()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn run_returns_once_cancelled() {
        let remote = tempfile::tempdir().unwrap();
        let local = tempfile::tempdir().unwrap();

        let token = CancellationToken::new();
        let config = test_config(remote.path(), local.path());
        let service = DaemonService::new(config, token.clone()).await.unwrap();

        token.cancel();
        service.run().await.unwrap();
    }
}
