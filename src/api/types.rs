//! Shared request and response types for REST API handlers.

use serde::{Deserialize, Serialize};

use crate::domain::{format_address, Proof, TypeName};

// ============================================================================
// Proof listing
// ============================================================================

/// One proof record as rendered over HTTP.
///
/// `proof_type` is the registered name when the hash reverse-maps; the hash
/// itself is always present so an unknown type is never passed off as a name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofResponse {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof_type: Option<String>,
    pub proof_type_hash: String,
    pub subject: String,
    pub metadata_hash: String,
    pub timestamp: u64,
    pub issuer: String,
    pub revoked: bool,
}

impl From<&Proof> for ProofResponse {
    fn from(proof: &Proof) -> Self {
        let (proof_type, proof_type_hash) = match &proof.proof_type {
            TypeName::Known { name, hash } => (Some(name.clone()), hash.to_string()),
            TypeName::Unknown(hash) => (None, hash.to_string()),
        };
        Self {
            id: proof.id.to_string(),
            proof_type,
            proof_type_hash,
            subject: format_address(&proof.subject),
            metadata_hash: proof.metadata_hash.to_string(),
            timestamp: proof.timestamp,
            issuer: format_address(&proof.issuer),
            revoked: proof.revoked,
        }
    }
}

/// Response for `GET /address/:addr/proofs`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofsResponse {
    pub address: String,
    pub proofs: Vec<ProofResponse>,
    pub total: usize,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub stale: bool,
}

// ============================================================================
// Holders
// ============================================================================

/// Response for `GET /proof/:type/holders`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldersResponse {
    pub proof_type: String,
    pub proof_type_hash: String,
    /// Lowercase hex, one canonical case so set comparisons are deterministic
    pub holders: Vec<String>,
    pub count: usize,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub stale: bool,
}

// ============================================================================
// Verify
// ============================================================================

/// Request body for `POST /verify`. Fields are optional so missing ones can
/// be reported as 400s instead of body-rejection noise.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub address: Option<String>,
    pub proof_type: Option<String>,
}

/// Response for `POST /verify`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub address: String,
    pub proof_type: String,
    pub has_proof: bool,
    pub verified: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub stale: bool,
}

// ============================================================================
// Stats and health
// ============================================================================

/// Response for `GET /stats`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_proofs: String,
    pub network: String,
    pub contract_address: Option<String>,
    pub known_types: Vec<String>,
    pub cache: serde_json::Value,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub stale: bool,
}

/// Response for `GET /health`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub timestamp: String,
    pub registry_configured: bool,
}
