//! Core domain types for ProofRegistry reads.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::{Address, B256, U256};

use crate::infra::{ReaderError, Result};

/// A proof type as seen by consumers: either a registered human-readable name
/// or an on-chain hash with no known reverse mapping.
///
/// The contract stores only the 32-byte hash, so `Unknown` is a representable
/// value, not an error. The raw hash is never silently passed off as a name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeName {
    /// A name registered in the local type registry
    Known { name: String, hash: B256 },
    /// A hash observed on-chain with no registered name
    Unknown(B256),
}

impl TypeName {
    /// The canonical on-chain hash, always available.
    pub fn hash(&self) -> B256 {
        match self {
            TypeName::Known { hash, .. } => *hash,
            TypeName::Unknown(hash) => *hash,
        }
    }

    /// The registered name, if one exists.
    pub fn name(&self) -> Option<&str> {
        match self {
            TypeName::Known { name, .. } => Some(name),
            TypeName::Unknown(_) => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, TypeName::Known { .. })
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeName::Known { name, .. } => write!(f, "{name}"),
            TypeName::Unknown(hash) => write!(f, "unknown({hash})"),
        }
    }
}

/// An on-chain proof record: immutable once issued, mutable only via the
/// `revoked` flag. The reader never mutates proofs, only snapshots them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proof {
    /// Sequential on-chain proof id
    pub id: U256,
    /// Proof type, reverse-mapped through the local registry
    pub proof_type: TypeName,
    /// The address the proof is about
    pub subject: Address,
    /// Hash of off-chain metadata
    pub metadata_hash: B256,
    /// Issuance timestamp (seconds)
    pub timestamp: u64,
    /// Authorized issuer address
    pub issuer: Address,
    /// One-way revocation flag
    pub revoked: bool,
}

/// A read result together with its freshness.
///
/// `stale` is only ever true when the fail-open policy served a cached entry
/// past its TTL after an upstream failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot<T> {
    pub value: T,
    pub stale: bool,
}

impl<T> Snapshot<T> {
    pub fn fresh(value: T) -> Self {
        Self {
            value,
            stale: false,
        }
    }

    pub fn stale(value: T) -> Self {
        Self { value, stale: true }
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

/// Parse a subject/holder address, failing with a validation error that names
/// the offending field.
pub fn parse_address(field: &str, input: &str) -> Result<Address> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ReaderError::validation(field, "must not be empty"));
    }
    Address::from_str(trimmed)
        .map_err(|e| ReaderError::validation(field, format!("invalid address: {e}")))
}

/// Parse a `0x`-prefixed textual type hash, distinguishing wrong byte width
/// (`MalformedHash`) from other malformed input.
pub fn parse_type_hash(input: &str) -> Result<B256> {
    let stripped = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input);
    let bytes = hex::decode(stripped)
        .map_err(|e| ReaderError::validation("proofType", format!("invalid hex: {e}")))?;
    if bytes.len() != 32 {
        return Err(ReaderError::MalformedHash(bytes.len()));
    }
    Ok(B256::from_slice(&bytes))
}

/// Canonical lowercase hex rendering for addresses, so holder-set equality
/// checks are deterministic across calls.
pub fn format_address(addr: &Address) -> String {
    format!("{addr:#x}")
}
