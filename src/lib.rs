//! BaseProof ProofRegistry reader
//!
//! Read-model client and HTTP API for the on-chain ProofRegistry contract.
//! The core abstraction is [`reader::ProofRegistryReader`]: batched, cached,
//! revocation-aware reads with canonical proof-type hashing. The HTTP layer
//! is a thin translation of the reader's methods; library consumers construct
//! the reader directly.
//!
//! ## Modules
//!
//! - [`domain`] - Core domain types (proofs, type names, definitions file)
//! - [`registry`] - Canonical name/hash mapping for proof types
//! - [`reader`] - The read-model client and contract bindings
//! - [`infra`] - Errors, TTL caching, bounded retry
//! - [`api`] - REST API routes
//! - [`server`] - HTTP server bootstrap
//!
//! ## Example
//!
//! ```no_run
//! use baseproof_reader::reader::{ProofRegistryReader, ReaderConfig, ChainProfile};
//!
//! # async fn example() -> baseproof_reader::infra::Result<()> {
//! let reader = ProofRegistryReader::connect(
//!     ReaderConfig::default()
//!         .with_chain(ChainProfile::BaseSepolia)
//!         .with_registry_address("0x0000000000000000000000000000000000000001".parse().unwrap()),
//! );
//! reader.register_known_type("BASE_CONTRACT_DEPLOYER");
//!
//! let verified = reader
//!     .verify("0x000000000000000000000000000000000000dead", "BASE_CONTRACT_DEPLOYER")
//!     .await?;
//! println!("has proof: {}", verified.value);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod domain;
pub mod infra;
pub mod reader;
pub mod registry;
pub mod server;

// Re-export commonly used types
pub use domain::{Proof, ProofDefinitions, Snapshot, TypeName};
pub use infra::{ReaderError, Result, RetryConfig, StalePolicy};
pub use reader::{ChainProfile, ProofRegistryReader, ReaderConfig, RegistryRpc};
pub use registry::ProofTypeRegistry;
