//! ProofRegistry contract boundary
//!
//! alloy bindings for the fixed ProofRegistry ABI plus the `RegistryRpc`
//! trait seam the reader is built against, so tests inject call-counting
//! doubles instead of a live endpoint.

use alloy::primitives::{Address, B256, U256};
use alloy::providers::ProviderBuilder;
use alloy::sol;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::infra::{ReaderError, Result, Retry, RetryConfig};

// Generate contract bindings
sol! {
    #[sol(rpc)]
    interface IProofRegistry {
        function getProofs(address subject) external view returns (uint256[] memory);

        function getProof(uint256 proofId)
            external
            view
            returns (bytes32, address, bytes32, uint256, address, bool);

        function hasProof(address subject, bytes32 proofType) external view returns (bool);

        function getProofTypeHolders(bytes32 proofType) external view returns (address[] memory);

        function totalProofs() external view returns (uint256);
    }
}

/// Supported chains: Base Sepolia by default, Base mainnet opt-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChainProfile {
    #[default]
    BaseSepolia,
    BaseMainnet,
}

impl ChainProfile {
    pub fn chain_id(&self) -> u64 {
        match self {
            ChainProfile::BaseSepolia => 84532,
            ChainProfile::BaseMainnet => 8453,
        }
    }

    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            ChainProfile::BaseSepolia => "https://sepolia.base.org",
            ChainProfile::BaseMainnet => "https://mainnet.base.org",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ChainProfile::BaseSepolia => "base-sepolia",
            ChainProfile::BaseMainnet => "base",
        }
    }

    pub fn from_chain_id(chain_id: u64) -> Option<Self> {
        match chain_id {
            84532 => Some(ChainProfile::BaseSepolia),
            8453 => Some(ChainProfile::BaseMainnet),
            _ => None,
        }
    }

    /// Parse the `NETWORK` environment value.
    pub fn from_network_name(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "mainnet" | "base" => Ok(ChainProfile::BaseMainnet),
            "sepolia" | "base-sepolia" | "testnet" => Ok(ChainProfile::BaseSepolia),
            other => Err(ReaderError::Config(format!("unknown network: {other}"))),
        }
    }
}

/// A proof record exactly as the contract returns it, before reverse-mapping
/// the type hash or filtering revocations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawProof {
    pub proof_type: B256,
    pub subject: Address,
    pub metadata_hash: B256,
    pub timestamp: U256,
    pub issuer: Address,
    pub revoked: bool,
}

/// Read-only calls against the ProofRegistry contract.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RegistryRpc: Send + Sync {
    /// `getProofs(subject)`: the subject's proof id list, in on-chain
    /// insertion order.
    async fn proof_ids(&self, subject: Address) -> Result<Vec<U256>>;

    /// `getProof(proofId)`: a single proof record.
    async fn proof(&self, proof_id: U256) -> Result<RawProof>;

    /// `hasProof(subject, proofType)`: true only for a live (non-revoked)
    /// proof; the contract accounts for revocation itself.
    async fn has_proof(&self, subject: Address, proof_type: B256) -> Result<bool>;

    /// `getProofTypeHolders(proofType)`: holder addresses for a type.
    async fn holders(&self, proof_type: B256) -> Result<Vec<Address>>;

    /// `totalProofs()`: issuance-only counter.
    async fn total_proofs(&self) -> Result<U256>;
}

/// Transport configuration for the live RPC client.
#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// JSON-RPC endpoint URL
    pub rpc_url: String,
    /// Deployed ProofRegistry contract address
    pub registry_address: Address,
    /// Opt-in bounded retry for transient transport failures
    pub retry: Option<RetryConfig>,
}

/// Live ProofRegistry client over HTTP JSON-RPC.
pub struct AlloyRegistryRpc {
    config: RpcConfig,
}

impl AlloyRegistryRpc {
    pub fn new(config: RpcConfig) -> Self {
        Self { config }
    }

    pub fn registry_address(&self) -> Address {
        self.config.registry_address
    }

    fn parse_url(&self) -> Result<alloy::transports::http::reqwest::Url> {
        self.config
            .rpc_url
            .parse()
            .map_err(|e| ReaderError::Config(format!("invalid RPC URL: {e}")))
    }

    /// Run a contract call, applying the opted-in retry policy to transient
    /// failures only.
    async fn call<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        match &self.config.retry {
            Some(retry_config) => {
                Retry::new(retry_config.clone())
                    .run_with_predicate(operation, |e: &ReaderError| e.is_transient())
                    .await
            }
            None => operation().await,
        }
    }
}

#[async_trait]
impl RegistryRpc for AlloyRegistryRpc {
    async fn proof_ids(&self, subject: Address) -> Result<Vec<U256>> {
        let url = self.parse_url()?;
        self.call(|| async {
            let provider = ProviderBuilder::new().on_http(url.clone());
            let contract = IProofRegistry::new(self.config.registry_address, &provider);
            let ids = contract
                .getProofs(subject)
                .call()
                .await
                .map_err(|e| ReaderError::Rpc(e.to_string()))?;
            Ok(ids._0)
        })
        .await
    }

    async fn proof(&self, proof_id: U256) -> Result<RawProof> {
        let url = self.parse_url()?;
        self.call(|| async {
            let provider = ProviderBuilder::new().on_http(url.clone());
            let contract = IProofRegistry::new(self.config.registry_address, &provider);
            let record = contract
                .getProof(proof_id)
                .call()
                .await
                .map_err(|e| ReaderError::Rpc(e.to_string()))?;
            Ok(RawProof {
                proof_type: record._0,
                subject: record._1,
                metadata_hash: record._2,
                timestamp: record._3,
                issuer: record._4,
                revoked: record._5,
            })
        })
        .await
    }

    async fn has_proof(&self, subject: Address, proof_type: B256) -> Result<bool> {
        let url = self.parse_url()?;
        self.call(|| async {
            let provider = ProviderBuilder::new().on_http(url.clone());
            let contract = IProofRegistry::new(self.config.registry_address, &provider);
            let result = contract
                .hasProof(subject, proof_type)
                .call()
                .await
                .map_err(|e| ReaderError::Rpc(e.to_string()))?;
            Ok(result._0)
        })
        .await
    }

    async fn holders(&self, proof_type: B256) -> Result<Vec<Address>> {
        let url = self.parse_url()?;
        self.call(|| async {
            let provider = ProviderBuilder::new().on_http(url.clone());
            let contract = IProofRegistry::new(self.config.registry_address, &provider);
            let result = contract
                .getProofTypeHolders(proof_type)
                .call()
                .await
                .map_err(|e| ReaderError::Rpc(e.to_string()))?;
            Ok(result._0)
        })
        .await
    }

    async fn total_proofs(&self) -> Result<U256> {
        let url = self.parse_url()?;
        self.call(|| async {
            let provider = ProviderBuilder::new().on_http(url.clone());
            let contract = IProofRegistry::new(self.config.registry_address, &provider);
            let result = contract
                .totalProofs()
                .call()
                .await
                .map_err(|e| ReaderError::Rpc(e.to_string()))?;
            Ok(result._0)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_profile_ids() {
        assert_eq!(ChainProfile::BaseSepolia.chain_id(), 84532);
        assert_eq!(ChainProfile::BaseMainnet.chain_id(), 8453);
        assert_eq!(
            ChainProfile::from_chain_id(8453),
            Some(ChainProfile::BaseMainnet)
        );
        assert_eq!(ChainProfile::from_chain_id(1), None);
    }

    #[test]
    fn test_chain_profile_from_network_name() {
        assert_eq!(
            ChainProfile::from_network_name("mainnet").unwrap(),
            ChainProfile::BaseMainnet
        );
        assert_eq!(
            ChainProfile::from_network_name("sepolia").unwrap(),
            ChainProfile::BaseSepolia
        );
        assert!(ChainProfile::from_network_name("goerli").is_err());
    }

    #[test]
    fn test_invalid_rpc_url_is_config_error() {
        let rpc = AlloyRegistryRpc::new(RpcConfig {
            rpc_url: "not a url".to_string(),
            registry_address: Address::ZERO,
            retry: None,
        });
        assert!(matches!(rpc.parse_url(), Err(ReaderError::Config(_))));
    }
}
