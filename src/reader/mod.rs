//! ProofRegistryReader: the read model over the ProofRegistry contract
//!
//! Batched, cached, revocation-aware access to contract state. All consumers
//! (the HTTP API and library users) go through this one abstraction; they
//! differ only in transport.

pub mod contract;
pub mod singleflight;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, B256, U256};
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::debug;

use crate::domain::{parse_address, Proof, Snapshot, TypeName};
use crate::infra::{ReaderError, Result, RetryConfig, StalePolicy, TtlCache};
use crate::registry::ProofTypeRegistry;

pub use contract::{AlloyRegistryRpc, ChainProfile, RawProof, RegistryRpc, RpcConfig};
pub use singleflight::Singleflight;

/// Reader configuration. Mirrors the SDK construction surface:
/// `{ registry_address, rpc_url?, chain? }` plus read-model tuning.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Target chain (Base Sepolia by default, mainnet opt-in)
    pub chain: ChainProfile,
    /// RPC endpoint override; falls back to the chain default
    pub rpc_url: Option<String>,
    /// Deployed ProofRegistry address; without it the reader is unconfigured
    /// and fails fast on every lookup
    pub registry_address: Option<Address>,
    /// Explicit timeout applied to every network call
    pub call_timeout: Duration,
    /// TTL for cached read results
    pub cache_ttl: Duration,
    /// Capacity per operation cache
    pub cache_capacity: usize,
    /// Cap on parallel per-id proof fetches
    pub max_concurrent_fetches: usize,
    /// Behavior when the RPC fails and a stale cache entry exists
    pub stale_policy: StalePolicy,
    /// Opt-in bounded retry at the transport
    pub rpc_retry: Option<RetryConfig>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            chain: ChainProfile::default(),
            rpc_url: None,
            registry_address: None,
            call_timeout: Duration::from_secs(10),
            cache_ttl: Duration::from_secs(30),
            cache_capacity: 1024,
            max_concurrent_fetches: 8,
            stale_policy: StalePolicy::FailClosed,
            rpc_retry: None,
        }
    }
}

impl ReaderConfig {
    pub fn with_registry_address(mut self, address: Address) -> Self {
        self.registry_address = Some(address);
        self
    }

    pub fn with_chain(mut self, chain: ChainProfile) -> Self {
        self.chain = chain;
        self
    }

    pub fn with_rpc_url(mut self, url: impl Into<String>) -> Self {
        self.rpc_url = Some(url.into());
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_stale_policy(mut self, policy: StalePolicy) -> Self {
        self.stale_policy = policy;
        self
    }

    pub fn with_max_concurrent_fetches(mut self, cap: usize) -> Self {
        self.max_concurrent_fetches = cap.max(1);
        self
    }

    /// The RPC URL to use, after applying the chain default.
    pub fn effective_rpc_url(&self) -> String {
        self.rpc_url
            .clone()
            .unwrap_or_else(|| self.chain.default_rpc_url().to_string())
    }
}

/// Per-operation caches, keyed by the operation's arguments.
struct ReadCaches {
    proofs: TtlCache<Address, Vec<Proof>>,
    flags: TtlCache<(Address, B256), bool>,
    holders: TtlCache<B256, Vec<Address>>,
    total: TtlCache<(), u64>,
}

impl ReadCaches {
    fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            proofs: TtlCache::new(capacity, ttl),
            flags: TtlCache::new(capacity, ttl),
            holders: TtlCache::new(capacity, ttl),
            total: TtlCache::new(4, ttl),
        }
    }
}

/// Per-operation in-flight deduplication tables.
struct Inflight {
    proofs: Singleflight<Address, Vec<Proof>>,
    flags: Singleflight<(Address, B256), bool>,
    holders: Singleflight<B256, Vec<Address>>,
    total: Singleflight<(), u64>,
}

impl Inflight {
    fn new() -> Self {
        Self {
            proofs: Singleflight::new(),
            flags: Singleflight::new(),
            holders: Singleflight::new(),
            total: Singleflight::new(),
        }
    }
}

/// Read-model client for the ProofRegistry contract.
///
/// Explicitly constructed and explicitly passed; there is no process-wide
/// instance. All caches and dedup tables live and die with the reader.
pub struct ProofRegistryReader {
    rpc: Option<Arc<dyn RegistryRpc>>,
    types: Arc<ProofTypeRegistry>,
    caches: ReadCaches,
    inflight: Inflight,
    config: ReaderConfig,
    /// High-water mark for `totalProofs`: the counter is issuance-only, so a
    /// value once observed is never understated.
    total_seen: AtomicU64,
}

impl ProofRegistryReader {
    /// Connect over HTTP JSON-RPC. With no registry address configured the
    /// reader comes up unconfigured and every lookup fails with
    /// [`ReaderError::NotConfigured`] before any network activity.
    pub fn connect(config: ReaderConfig) -> Self {
        let rpc: Option<Arc<dyn RegistryRpc>> = config.registry_address.map(|address| {
            Arc::new(AlloyRegistryRpc::new(RpcConfig {
                rpc_url: config.effective_rpc_url(),
                registry_address: address,
                retry: config.rpc_retry.clone(),
            })) as Arc<dyn RegistryRpc>
        });
        Self::build(config, rpc)
    }

    /// Construct against an injected transport (tests, custom clients).
    pub fn with_rpc(config: ReaderConfig, rpc: Arc<dyn RegistryRpc>) -> Self {
        Self::build(config, Some(rpc))
    }

    /// Construct an unconfigured reader regardless of the config's address.
    pub fn unconfigured(config: ReaderConfig) -> Self {
        Self::build(config, None)
    }

    fn build(config: ReaderConfig, rpc: Option<Arc<dyn RegistryRpc>>) -> Self {
        Self {
            rpc,
            types: Arc::new(ProofTypeRegistry::new()),
            caches: ReadCaches::new(config.cache_capacity, config.cache_ttl),
            inflight: Inflight::new(),
            config,
            total_seen: AtomicU64::new(0),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.rpc.is_some()
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// The local proof type registry backing reverse lookups.
    pub fn types(&self) -> &ProofTypeRegistry {
        &self.types
    }

    /// Register a known proof type name so on-chain hashes reverse-map to it.
    pub fn register_known_type(&self, name: &str) -> B256 {
        self.types.register(name)
    }

    fn rpc(&self) -> Result<Arc<dyn RegistryRpc>> {
        self.rpc.clone().ok_or(ReaderError::NotConfigured)
    }

    /// All non-revoked proofs for a subject, in on-chain insertion order.
    ///
    /// One round trip for the id list, then per-id fetches with bounded
    /// parallelism. Concurrent calls for the same subject share one upstream
    /// batch.
    pub async fn get_proofs(&self, subject: Address) -> Result<Snapshot<Vec<Proof>>> {
        let rpc = self.rpc()?;

        if let Some(hit) = self.caches.proofs.get(&subject).await {
            return Ok(Snapshot::fresh(hit));
        }

        let types = self.types.clone();
        let timeout = self.config.call_timeout;
        let cap = self.config.max_concurrent_fetches.max(1);

        let fetched = self
            .inflight
            .proofs
            .run(subject, async move {
                fetch_proofs(rpc, types, subject, timeout, cap).await
            })
            .await;

        match fetched {
            Ok(proofs) => {
                self.caches.proofs.insert(subject, proofs.clone()).await;
                Ok(Snapshot::fresh(proofs))
            }
            Err(err) => {
                self.stale_or(err, || self.caches.proofs.get_stale(&subject))
                    .await
            }
        }
    }

    /// Whether the subject holds a live proof of the named type.
    ///
    /// The contract's own `hasProof` accounts for revocation, so the result
    /// is passed through without double-filtering. The name is registered as
    /// a known type as a side effect, so later reverse lookups resolve it.
    pub async fn has_proof(&self, subject: Address, proof_type: &str) -> Result<Snapshot<bool>> {
        let rpc = self.rpc()?;
        if proof_type.trim().is_empty() {
            return Err(ReaderError::validation("proofType", "must not be empty"));
        }

        let type_hash = self.types.register(proof_type);
        let key = (subject, type_hash);

        if let Some(hit) = self.caches.flags.get(&key).await {
            return Ok(Snapshot::fresh(hit));
        }

        let timeout = self.config.call_timeout;
        let fetched = self
            .inflight
            .flags
            .run(key, async move {
                with_timeout("hasProof", timeout, rpc.has_proof(subject, type_hash)).await
            })
            .await;

        match fetched {
            Ok(flag) => {
                self.caches.flags.insert(key, flag).await;
                Ok(Snapshot::fresh(flag))
            }
            Err(err) => {
                self.stale_or(err, || self.caches.flags.get_stale(&key))
                    .await
            }
        }
    }

    /// Holder addresses for a named proof type.
    pub async fn get_proof_type_holders(
        &self,
        proof_type: &str,
    ) -> Result<Snapshot<Vec<Address>>> {
        if proof_type.trim().is_empty() {
            return Err(ReaderError::validation("proofType", "must not be empty"));
        }
        let type_hash = self.types.register(proof_type);
        self.get_holders_by_hash(type_hash).await
    }

    /// Holder addresses for a proof type given its on-chain hash directly.
    pub async fn get_holders_by_hash(&self, type_hash: B256) -> Result<Snapshot<Vec<Address>>> {
        let rpc = self.rpc()?;

        if let Some(hit) = self.caches.holders.get(&type_hash).await {
            return Ok(Snapshot::fresh(hit));
        }

        let timeout = self.config.call_timeout;
        let fetched = self
            .inflight
            .holders
            .run(type_hash, async move {
                with_timeout("getProofTypeHolders", timeout, rpc.holders(type_hash)).await
            })
            .await;

        match fetched {
            Ok(holders) => {
                self.caches.holders.insert(type_hash, holders.clone()).await;
                Ok(Snapshot::fresh(holders))
            }
            Err(err) => {
                self.stale_or(err, || self.caches.holders.get_stale(&type_hash))
                    .await
            }
        }
    }

    /// Total number of proofs ever issued.
    ///
    /// Returned values are monotonically non-decreasing within the process:
    /// a cached or freshly fetched count is floored at the high-water mark
    /// already observed.
    pub async fn get_total_proofs(&self) -> Result<Snapshot<u64>> {
        let rpc = self.rpc()?;

        if let Some(hit) = self.caches.total.get(&()).await {
            return Ok(Snapshot::fresh(self.observe_total(hit)));
        }

        let timeout = self.config.call_timeout;
        let fetched = self
            .inflight
            .total
            .run((), async move {
                let total = with_timeout("totalProofs", timeout, rpc.total_proofs()).await?;
                Ok(u64::try_from(total).unwrap_or(u64::MAX))
            })
            .await;

        match fetched {
            Ok(count) => {
                let count = self.observe_total(count);
                self.caches.total.insert((), count).await;
                Ok(Snapshot::fresh(count))
            }
            Err(err) => {
                self.stale_or(err, || async {
                    self.caches
                        .total
                        .get_stale(&())
                        .await
                        .map(|v| self.observe_total(v))
                })
                .await
            }
        }
    }

    /// Validate both inputs, then check for a live proof. Returns a
    /// validation error before any network call when either is missing or
    /// malformed.
    pub async fn verify(&self, address: &str, proof_type: &str) -> Result<Snapshot<bool>> {
        let subject = parse_address("address", address)?;
        if proof_type.trim().is_empty() {
            return Err(ReaderError::validation("proofType", "must not be empty"));
        }
        self.has_proof(subject, proof_type).await
    }

    /// Drop every cached read result. The totalProofs high-water mark is not
    /// reset: it tracks what this process has observed, not what is cached.
    pub async fn invalidate_all(&self) {
        self.caches.proofs.clear().await;
        self.caches.flags.clear().await;
        self.caches.holders.clear().await;
        self.caches.total.clear().await;
    }

    /// Cache statistics for the `/stats` endpoint.
    pub fn cache_stats_json(&self) -> serde_json::Value {
        serde_json::json!({
            "proofs": self.caches.proofs.stats_json(),
            "has_proof": self.caches.flags.stats_json(),
            "holders": self.caches.holders.stats_json(),
            "total_proofs": self.caches.total.stats_json(),
        })
    }

    fn observe_total(&self, count: u64) -> u64 {
        let prior = self.total_seen.fetch_max(count, Ordering::SeqCst);
        prior.max(count)
    }

    /// Fall back to a stale cache entry after an upstream failure. The stale
    /// lookup runs only under the opt-in policy, so discarded entries never
    /// count as stale serves in the stats.
    async fn stale_or<T, F, Fut>(&self, err: ReaderError, lookup: F) -> Result<Snapshot<T>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Option<T>>,
    {
        match self.config.stale_policy {
            StalePolicy::FailClosed => Err(err),
            StalePolicy::ServeStale => match lookup().await {
                Some(value) => {
                    debug!(error = %err, "Serving stale cache entry after RPC failure");
                    Ok(Snapshot::stale(value))
                }
                None => Err(err),
            },
        }
    }
}

/// The fan-out half of `get_proofs`, shared by all deduplicated waiters: one
/// id-list read, then per-id fetches capped at `max_concurrency`, preserving
/// the id-list order and dropping revoked records.
async fn fetch_proofs(
    rpc: Arc<dyn RegistryRpc>,
    types: Arc<ProofTypeRegistry>,
    subject: Address,
    timeout: Duration,
    max_concurrency: usize,
) -> Result<Vec<Proof>> {
    let ids = with_timeout("getProofs", timeout, rpc.proof_ids(subject)).await?;
    debug!(subject = %subject, count = ids.len(), "Fetched proof id list");

    let records: Vec<(U256, RawProof)> = stream::iter(ids.into_iter().map(|id| {
        let rpc = rpc.clone();
        async move {
            let raw = with_timeout("getProof", timeout, rpc.proof(id)).await?;
            Ok((id, raw))
        }
    }))
    .buffered(max_concurrency)
    .try_collect()
    .await?;

    Ok(records
        .into_iter()
        .filter(|(_, raw)| !raw.revoked)
        .map(|(id, raw)| Proof {
            id,
            proof_type: types.reverse_lookup(raw.proof_type),
            subject: raw.subject,
            metadata_hash: raw.metadata_hash,
            timestamp: u64::try_from(raw.timestamp).unwrap_or(u64::MAX),
            issuer: raw.issuer,
            revoked: raw.revoked,
        })
        .collect())
}

/// Bound a network call with the configured timeout; on expiry the operation
/// fails with a `Timeout` kind instead of hanging.
async fn with_timeout<T>(
    operation: &str,
    timeout: Duration,
    fut: impl std::future::Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(ReaderError::Timeout(operation.to_string())),
    }
}
