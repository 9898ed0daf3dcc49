//! HTTP server bootstrap for the BaseProof API.
//!
//! This module wires together:
//! - configuration
//! - the proof type definitions file
//! - the ProofRegistry reader
//! - the Axum router

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use axum::http::{HeaderValue, Method};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

use crate::domain::ProofDefinitions;
use crate::infra::{RetryConfig, StalePolicy};
use crate::reader::{ChainProfile, ProofRegistryReader, ReaderConfig};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server listen address.
    pub listen_addr: SocketAddr,
    /// Reader configuration (chain, RPC, caching, timeouts).
    pub reader: ReaderConfig,
    /// Optional proof type definitions file.
    pub definitions_path: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let chain = match std::env::var("NETWORK") {
            Ok(name) => ChainProfile::from_network_name(&name)
                .map_err(|e| anyhow::anyhow!(e.to_string()))?,
            Err(_) => ChainProfile::default(),
        };

        let rpc_url = match chain {
            ChainProfile::BaseMainnet => std::env::var("BASE_MAINNET_RPC").ok(),
            ChainProfile::BaseSepolia => std::env::var("BASE_SEPOLIA_RPC").ok(),
        };

        // Absent address means an unconfigured reader (503s), but a present
        // malformed address is a hard startup error.
        let registry_address: Option<Address> = match std::env::var("PROOF_REGISTRY_ADDRESS") {
            Ok(raw) if !raw.trim().is_empty() => Some(
                raw.trim()
                    .parse()
                    .map_err(|e| anyhow::anyhow!("Invalid PROOF_REGISTRY_ADDRESS: {e}"))?,
            ),
            _ => None,
        };

        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3001);
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let listen_addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid listen address: {e}"))?;

        let mut reader = ReaderConfig {
            chain,
            rpc_url,
            registry_address,
            ..ReaderConfig::default()
        };

        if let Some(secs) = env_parse::<u64>("CACHE_TTL_SECS") {
            reader.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(ms) = env_parse::<u64>("RPC_TIMEOUT_MS") {
            reader.call_timeout = Duration::from_millis(ms);
        }
        if let Some(cap) = env_parse::<usize>("MAX_CONCURRENT_FETCHES") {
            reader.max_concurrent_fetches = cap.max(1);
        }
        if env_flag("SERVE_STALE_ON_ERROR") {
            reader.stale_policy = StalePolicy::ServeStale;
        }
        if let Some(retries) = env_parse::<u32>("RPC_MAX_RETRIES") {
            if retries > 0 {
                reader.rpc_retry = Some(RetryConfig::rpc().with_max_retries(retries));
            }
        }

        let definitions_path = std::env::var("PROOF_DEFINITIONS_PATH").ok();

        Ok(Self {
            listen_addr,
            reader,
            definitions_path,
        })
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "on"))
        .unwrap_or(false)
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub reader: Arc<ProofRegistryReader>,
    pub network: String,
    pub registry_address: Option<Address>,
}

impl AppState {
    /// Build state from configuration: construct the reader and seed the
    /// type registry from the definitions file when one is present.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let reader = Arc::new(ProofRegistryReader::connect(config.reader.clone()));

        if let Some(path) = &config.definitions_path {
            let definitions = ProofDefinitions::from_path(path)
                .map_err(|e| anyhow::anyhow!(e.to_string()))?;
            definitions.seed_registry(reader.types());
            info!(
                "Loaded {} proof type definitions from {path}",
                definitions.proofs.len()
            );
        } else {
            warn!("No PROOF_DEFINITIONS_PATH set; proof type hashes will not reverse-map");
        }

        Ok(Self {
            reader,
            network: config.reader.chain.name().to_string(),
            registry_address: config.reader.registry_address,
        })
    }
}

/// Start the HTTP server.
pub async fn run() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting BaseProof API v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    info!("Configuration loaded");
    info!("  Listen address: {}", config.listen_addr);
    info!("  Network: {}", config.reader.chain.name());
    info!("  RPC URL: {}", config.reader.effective_rpc_url());
    match config.reader.registry_address {
        Some(address) => info!("  ProofRegistry: {address}"),
        None => warn!("  ProofRegistry: not configured (set PROOF_REGISTRY_ADDRESS)"),
    }

    let state = AppState::from_config(&config)?;
    let app = build_router()?.with_state(state);

    info!("Starting HTTP server on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;

    info!("BaseProof API is ready to accept connections");
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();
}

/// Build the router with tracing and optional CORS.
pub fn build_router() -> anyhow::Result<Router<AppState>> {
    let mut router = crate::api::router().layer(TraceLayer::new_for_http());

    if let Some(cors_layer) = cors_layer_from_env()? {
        router = router.layer(cors_layer);
    }

    Ok(router)
}

fn cors_layer_from_env() -> anyhow::Result<Option<CorsLayer>> {
    let origins = match std::env::var("CORS_ALLOW_ORIGINS") {
        Ok(v) => v,
        Err(_) => return Ok(None),
    };

    let origins = origins.trim();
    if origins.is_empty() {
        return Ok(None);
    }

    let allow_origin = if origins == "*" {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = origins
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<HeaderValue>()
                    .map_err(|e| anyhow::anyhow!("Invalid CORS origin {s:?}: {e}"))
            })
            .collect::<anyhow::Result<_>>()?;
        AllowOrigin::list(origins)
    };

    Ok(Some(
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([axum::http::header::CONTENT_TYPE]),
    ))
}
