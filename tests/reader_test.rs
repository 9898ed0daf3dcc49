//! Behavior tests for the ProofRegistry reader against a call-counting
//! stub RPC.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;

use baseproof_reader::infra::{ReaderError, Result, StalePolicy};
use baseproof_reader::reader::{ProofRegistryReader, RawProof, ReaderConfig, RegistryRpc};
use baseproof_reader::registry::ProofTypeRegistry;

// ============================================================================
// Stub RPC
// ============================================================================

/// In-memory registry state with call counting and fault injection.
#[derive(Default)]
struct StubRpc {
    ids_by_subject: HashMap<Address, Vec<U256>>,
    records: HashMap<U256, RawProof>,
    holders_by_type: HashMap<B256, Vec<Address>>,
    has_proof_by_key: HashMap<(Address, B256), bool>,
    /// Successive totals returned by `total_proofs`, last one repeating
    totals: Mutex<Vec<u64>>,

    id_list_calls: AtomicU32,
    proof_calls: AtomicU32,
    total_calls: AtomicU32,

    /// Sleep applied to `proof_ids` on the first call only
    first_id_list_delay: Option<Duration>,
    /// When set, every call fails with an RPC error
    fail_all: AtomicBool,

    /// Concurrency watermark for `proof`
    current_proof_fetches: AtomicUsize,
    max_proof_fetches: AtomicUsize,
}

impl StubRpc {
    fn new() -> Self {
        Self::default()
    }

    fn with_subject(mut self, subject: Address, proofs: Vec<(u64, &str, bool)>) -> Self {
        let mut ids = Vec::new();
        for (id, type_name, revoked) in proofs {
            let id = U256::from(id);
            ids.push(id);
            self.records.insert(
                id,
                RawProof {
                    proof_type: ProofTypeRegistry::canonical_hash(type_name),
                    subject,
                    metadata_hash: B256::repeat_byte(0x11),
                    timestamp: U256::from(1_700_000_000u64),
                    issuer: Address::repeat_byte(0x99),
                    revoked,
                },
            );
        }
        self.ids_by_subject.insert(subject, ids);
        self
    }

    fn with_totals(self, totals: Vec<u64>) -> Self {
        *self.totals.lock().unwrap() = totals;
        self
    }

    fn fail_from_now_on(&self) {
        self.fail_all.store(true, Ordering::SeqCst);
    }

    fn check_fault(&self) -> Result<()> {
        if self.fail_all.load(Ordering::SeqCst) {
            Err(ReaderError::Rpc("injected failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RegistryRpc for StubRpc {
    async fn proof_ids(&self, subject: Address) -> Result<Vec<U256>> {
        let call = self.id_list_calls.fetch_add(1, Ordering::SeqCst);
        if call == 0 {
            if let Some(delay) = self.first_id_list_delay {
                tokio::time::sleep(delay).await;
            }
        }
        self.check_fault()?;
        Ok(self.ids_by_subject.get(&subject).cloned().unwrap_or_default())
    }

    async fn proof(&self, proof_id: U256) -> Result<RawProof> {
        self.proof_calls.fetch_add(1, Ordering::SeqCst);
        let current = self.current_proof_fetches.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_proof_fetches.fetch_max(current, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.current_proof_fetches.fetch_sub(1, Ordering::SeqCst);

        self.check_fault()?;
        self.records
            .get(&proof_id)
            .cloned()
            .ok_or_else(|| ReaderError::Rpc(format!("unknown proof id {proof_id}")))
    }

    async fn has_proof(&self, subject: Address, proof_type: B256) -> Result<bool> {
        self.check_fault()?;
        Ok(self
            .has_proof_by_key
            .get(&(subject, proof_type))
            .copied()
            .unwrap_or(false))
    }

    async fn holders(&self, proof_type: B256) -> Result<Vec<Address>> {
        self.check_fault()?;
        Ok(self
            .holders_by_type
            .get(&proof_type)
            .cloned()
            .unwrap_or_default())
    }

    async fn total_proofs(&self) -> Result<U256> {
        self.total_calls.fetch_add(1, Ordering::SeqCst);
        self.check_fault()?;
        let mut totals = self.totals.lock().unwrap();
        let value = if totals.len() > 1 {
            totals.remove(0)
        } else {
            totals.first().copied().unwrap_or(0)
        };
        Ok(U256::from(value))
    }
}

fn reader_with(stub: Arc<StubRpc>, config: ReaderConfig) -> ProofRegistryReader {
    ProofRegistryReader::with_rpc(config, stub)
}

fn fast_config() -> ReaderConfig {
    ReaderConfig::default().with_call_timeout(Duration::from_millis(500))
}

fn subject_a() -> Address {
    Address::repeat_byte(0xAA)
}

// ============================================================================
// Revocation filtering
// ============================================================================

#[tokio::test]
async fn test_get_proofs_filters_revoked() {
    let stub = Arc::new(StubRpc::new().with_subject(
        subject_a(),
        vec![
            (1, "BASE_CONTRACT_DEPLOYER", false),
            (2, "BASE_CONTRACT_DEPLOYER", true),
        ],
    ));
    let reader = reader_with(stub, fast_config());
    reader.register_known_type("BASE_CONTRACT_DEPLOYER");

    let snapshot = reader.get_proofs(subject_a()).await.unwrap();
    assert_eq!(snapshot.value.len(), 1);
    assert_eq!(snapshot.value[0].id, U256::from(1));
    assert!(snapshot.value.iter().all(|p| !p.revoked));
    assert_eq!(
        snapshot.value[0].proof_type.name(),
        Some("BASE_CONTRACT_DEPLOYER")
    );
}

#[tokio::test]
async fn test_get_proofs_preserves_id_list_order() {
    let stub = Arc::new(StubRpc::new().with_subject(
        subject_a(),
        vec![(5, "T", false), (1, "T", false), (3, "T", false)],
    ));
    let reader = reader_with(stub, fast_config());

    let snapshot = reader.get_proofs(subject_a()).await.unwrap();
    let ids: Vec<U256> = snapshot.value.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![U256::from(5), U256::from(1), U256::from(3)]);
}

#[tokio::test]
async fn test_unknown_type_hash_surfaces_as_unknown() {
    let stub = Arc::new(StubRpc::new().with_subject(subject_a(), vec![(1, "NEVER_SEEN", false)]));
    let reader = reader_with(stub, fast_config());

    let snapshot = reader.get_proofs(subject_a()).await.unwrap();
    let proof_type = &snapshot.value[0].proof_type;
    assert!(proof_type.name().is_none());
    assert_eq!(
        proof_type.hash(),
        ProofTypeRegistry::canonical_hash("NEVER_SEEN")
    );
}

// ============================================================================
// Deduplication and bounded fan-out
// ============================================================================

#[tokio::test]
async fn test_concurrent_get_proofs_share_one_fetch() {
    let mut stub = StubRpc::new().with_subject(subject_a(), vec![(1, "T", false)]);
    stub.first_id_list_delay = Some(Duration::from_millis(40));
    let stub = Arc::new(stub);
    let reader = Arc::new(reader_with(stub.clone(), fast_config()));

    let first = {
        let reader = reader.clone();
        tokio::spawn(async move { reader.get_proofs(subject_a()).await })
    };
    let second = {
        let reader = reader.clone();
        tokio::spawn(async move { reader.get_proofs(subject_a()).await })
    };

    assert!(first.await.unwrap().is_ok());
    assert!(second.await.unwrap().is_ok());

    // Both callers shared a single upstream batch
    assert_eq!(stub.id_list_calls.load(Ordering::SeqCst), 1);
    assert_eq!(stub.proof_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_per_id_fetches_are_capped() {
    let proofs: Vec<(u64, &str, bool)> = (1..=20).map(|id| (id, "T", false)).collect();
    let stub = Arc::new(StubRpc::new().with_subject(subject_a(), proofs));
    let reader = reader_with(
        stub.clone(),
        fast_config().with_max_concurrent_fetches(4),
    );

    let snapshot = reader.get_proofs(subject_a()).await.unwrap();
    assert_eq!(snapshot.value.len(), 20);
    assert_eq!(stub.proof_calls.load(Ordering::SeqCst), 20);
    assert!(stub.max_proof_fetches.load(Ordering::SeqCst) <= 4);
}

// ============================================================================
// totalProofs monotonicity
// ============================================================================

#[tokio::test]
async fn test_total_proofs_is_monotonically_non_decreasing() {
    let stub = Arc::new(StubRpc::new().with_totals(vec![10, 5]));
    let reader = reader_with(stub.clone(), fast_config());

    assert_eq!(reader.get_total_proofs().await.unwrap().value, 10);

    // Force a refetch; the chain client now reports a lower (lagging) count
    reader.invalidate_all().await;
    assert_eq!(reader.get_total_proofs().await.unwrap().value, 10);
    assert_eq!(stub.total_calls.load(Ordering::SeqCst), 2);

    // Cached reads keep the high-water mark too
    assert_eq!(reader.get_total_proofs().await.unwrap().value, 10);
}

// ============================================================================
// hasProof
// ============================================================================

#[tokio::test]
async fn test_has_proof_unknown_type_on_empty_subject_is_false() {
    let stub = Arc::new(StubRpc::new());
    let reader = reader_with(stub, fast_config());
    let subject = Address::repeat_byte(0xBB);

    let snapshot = reader.has_proof(subject, "UNKNOWN_TYPE").await.unwrap();
    assert!(!snapshot.value);
}

#[tokio::test]
async fn test_verify_composes_has_proof() {
    let subject = Address::repeat_byte(0xBB);
    let type_hash = ProofTypeRegistry::canonical_hash("BASE_CONTRACT_DEPLOYER");
    let mut stub = StubRpc::new();
    stub.has_proof_by_key.insert((subject, type_hash), true);
    let reader = reader_with(Arc::new(stub), fast_config());

    let snapshot = reader
        .verify(&format!("{subject:#x}"), "BASE_CONTRACT_DEPLOYER")
        .await
        .unwrap();
    assert!(snapshot.value);
}

// ============================================================================
// Timeout and cache poisoning
// ============================================================================

#[tokio::test]
async fn test_timeout_fails_and_leaves_cache_unset() {
    let mut stub = StubRpc::new().with_subject(subject_a(), vec![(1, "T", false)]);
    stub.first_id_list_delay = Some(Duration::from_millis(200));
    let stub = Arc::new(stub);
    let reader = reader_with(
        stub.clone(),
        ReaderConfig::default().with_call_timeout(Duration::from_millis(30)),
    );

    let err = reader.get_proofs(subject_a()).await.unwrap_err();
    assert_eq!(err, ReaderError::Timeout("getProofs".to_string()));

    // The second call goes upstream again: nothing partial was cached
    let snapshot = reader.get_proofs(subject_a()).await.unwrap();
    assert_eq!(snapshot.value.len(), 1);
    assert_eq!(stub.id_list_calls.load(Ordering::SeqCst), 2);
}

// ============================================================================
// Stale serving policy
// ============================================================================

#[tokio::test]
async fn test_fail_closed_propagates_rpc_error() {
    let stub = Arc::new(StubRpc::new().with_totals(vec![7]));
    let reader = reader_with(
        stub.clone(),
        fast_config().with_cache_ttl(Duration::from_millis(20)),
    );

    assert_eq!(reader.get_total_proofs().await.unwrap().value, 7);

    tokio::time::sleep(Duration::from_millis(40)).await;
    stub.fail_from_now_on();

    let err = reader.get_total_proofs().await.unwrap_err();
    assert_eq!(err, ReaderError::Rpc("injected failure".to_string()));
}

#[tokio::test]
async fn test_fail_closed_records_no_stale_serves() {
    let subject = subject_a();
    let stub = Arc::new(StubRpc::new().with_subject(subject, vec![(1, "T", false)]));
    let reader = reader_with(
        stub.clone(),
        fast_config().with_cache_ttl(Duration::from_millis(20)),
    );

    reader.get_proofs(subject).await.unwrap();
    tokio::time::sleep(Duration::from_millis(40)).await;
    stub.fail_from_now_on();

    // Fail-closed: the expired entry is never consulted, so the stats
    // report zero stale serves
    assert!(reader.get_proofs(subject).await.is_err());
    let stats = reader.cache_stats_json();
    assert_eq!(stats["proofs"]["stale_serves"], serde_json::json!(0));
}

#[tokio::test]
async fn test_opt_in_stale_serving_flags_the_result() {
    let subject = subject_a();
    let stub = Arc::new(StubRpc::new().with_subject(subject, vec![(1, "T", false)]));
    let reader = reader_with(
        stub.clone(),
        fast_config()
            .with_cache_ttl(Duration::from_millis(20))
            .with_stale_policy(StalePolicy::ServeStale),
    );

    let fresh = reader.get_proofs(subject).await.unwrap();
    assert!(!fresh.stale);

    tokio::time::sleep(Duration::from_millis(40)).await;
    stub.fail_from_now_on();

    let stale = reader.get_proofs(subject).await.unwrap();
    assert!(stale.stale);
    assert_eq!(stale.value, fresh.value);
}

// ============================================================================
// Holders
// ============================================================================

#[tokio::test]
async fn test_holders_by_name_and_by_hash_agree() {
    let type_hash = ProofTypeRegistry::canonical_hash("BASE_OG");
    let holders = vec![Address::repeat_byte(0x01), Address::repeat_byte(0x02)];
    let mut stub = StubRpc::new();
    stub.holders_by_type.insert(type_hash, holders.clone());
    let reader = reader_with(Arc::new(stub), fast_config());

    let by_name = reader.get_proof_type_holders("BASE_OG").await.unwrap();
    let by_hash = reader.get_holders_by_hash(type_hash).await.unwrap();
    assert_eq!(by_name.value, holders);
    assert_eq!(by_name.value, by_hash.value);
}
