//! Canonical proof type naming
//!
//! The contract stores proof types as 32-byte hashes; the hash alone is not
//! invertible. This registry keeps the deterministic name-to-hash mapping and
//! an in-memory reverse table for every name it has been told about, so
//! on-chain hashes can be rendered back as names.

use std::collections::HashMap;
use std::sync::RwLock;

use alloy::primitives::{keccak256, B256};

use crate::domain::TypeName;

/// Bidirectional mapping between proof type names and their canonical
/// on-chain hash.
#[derive(Debug, Default)]
pub struct ProofTypeRegistry {
    by_name: RwLock<HashMap<String, B256>>,
    by_hash: RwLock<HashMap<B256, String>>,
}

impl ProofTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The canonical hash of a proof type name: keccak-256 over the raw name
    /// bytes, matching Solidity `keccak256(abi.encodePacked(name))`.
    ///
    /// Pure function over bytes; never fails.
    pub fn canonical_hash(name: &str) -> B256 {
        keccak256(name.as_bytes())
    }

    /// Register a known type name. Idempotent: repeated registration of the
    /// same name is a no-op and returns the same hash.
    pub fn register(&self, name: &str) -> B256 {
        let hash = Self::canonical_hash(name);
        {
            let by_name = self.by_name.read().unwrap_or_else(|e| e.into_inner());
            if by_name.contains_key(name) {
                return hash;
            }
        }
        self.by_name
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.to_string(), hash);
        self.by_hash
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(hash, name.to_string());
        hash
    }

    /// Map an on-chain hash back to its name. Unregistered hashes come back
    /// as [`TypeName::Unknown`], never as a raw hash posing as a name.
    pub fn reverse_lookup(&self, hash: B256) -> TypeName {
        let by_hash = self.by_hash.read().unwrap_or_else(|e| e.into_inner());
        match by_hash.get(&hash) {
            Some(name) => TypeName::Known {
                name: name.clone(),
                hash,
            },
            None => TypeName::Unknown(hash),
        }
    }

    /// Look up the hash for a registered name without registering it.
    pub fn lookup(&self, name: &str) -> Option<B256> {
        self.by_name
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .copied()
    }

    /// Names currently registered.
    pub fn known_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .by_name
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.by_name
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
