//! Proof type definitions file
//!
//! An external YAML document enumerates the proof types the deployment knows
//! about. It is read-only input: the reader uses it to seed the type registry
//! so on-chain hashes reverse-map to human-readable names.

use std::path::Path;

use serde::Deserialize;

use crate::infra::{ReaderError, Result};
use crate::registry::ProofTypeRegistry;

/// Metadata for a single proof type.
#[derive(Debug, Clone, Deserialize)]
pub struct ProofDefinition {
    /// Domain identifier, e.g. `BASE_CONTRACT_DEPLOYER`
    #[serde(rename = "type")]
    pub type_id: String,
    /// Display name
    pub name: String,
    /// What the proof attests
    pub description: String,
    /// How issuance is verified
    pub verification_method: String,
    /// Where the underlying fact lives
    pub source_of_truth: String,
    /// Metadata fields recorded at issuance
    #[serde(default)]
    pub metadata_fields: Vec<String>,
}

/// The parsed definitions document.
#[derive(Debug, Clone, Deserialize)]
pub struct ProofDefinitions {
    pub proofs: Vec<ProofDefinition>,
}

impl ProofDefinitions {
    /// Parse a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| ReaderError::Definitions(e.to_string()))
    }

    /// Read and parse a definitions file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            ReaderError::Definitions(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_yaml(&yaml)
    }

    /// Register every defined type id with the registry. Idempotent.
    pub fn seed_registry(&self, registry: &ProofTypeRegistry) {
        for def in &self.proofs {
            registry.register(&def.type_id);
        }
    }
}
