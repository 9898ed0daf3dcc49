//! REST API endpoints for the ProofRegistry reader.
//!
//! Each route is a direct translation of one reader method; status mapping
//! and error codes live in [`crate::api::error`].

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::error::{missing_field, ApiError};
use crate::api::types::{
    HealthResponse, HoldersResponse, ProofResponse, ProofsResponse, StatsResponse, VerifyRequest,
    VerifyResponse,
};
use crate::domain::{format_address, parse_address, parse_type_hash};
use crate::server::AppState;

/// Build the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/address/:addr/proofs", get(get_address_proofs))
        .route("/proof/:type/holders", get(get_proof_type_holders))
        .route("/stats", get(get_stats))
        .route("/verify", post(verify_proof))
        .route("/health", get(health_check))
}

/// GET /address/:addr/proofs - All non-revoked proofs for an address.
async fn get_address_proofs(
    State(state): State<AppState>,
    Path(addr): Path<String>,
) -> Result<Json<ProofsResponse>, ApiError> {
    let subject = parse_address("address", &addr)?;

    let snapshot = state.reader.get_proofs(subject).await?;
    let proofs: Vec<ProofResponse> = snapshot.value.iter().map(ProofResponse::from).collect();

    Ok(Json(ProofsResponse {
        address: format_address(&subject),
        total: proofs.len(),
        proofs,
        stale: snapshot.stale,
    }))
}

/// GET /proof/:type/holders - Holders of a proof type, by name or 0x-hash.
async fn get_proof_type_holders(
    State(state): State<AppState>,
    Path(proof_type): Path<String>,
) -> Result<Json<HoldersResponse>, ApiError> {
    if proof_type.trim().is_empty() {
        return Err(missing_field("proofType"));
    }

    let type_hash = if proof_type.starts_with("0x") || proof_type.starts_with("0X") {
        parse_type_hash(&proof_type)?
    } else {
        state.reader.register_known_type(&proof_type)
    };
    let snapshot = state.reader.get_holders_by_hash(type_hash).await?;

    let holders: Vec<String> = snapshot.value.iter().map(format_address).collect();

    Ok(Json(HoldersResponse {
        proof_type,
        proof_type_hash: type_hash.to_string(),
        count: holders.len(),
        holders,
        stale: snapshot.stale,
    }))
}

/// GET /stats - Overall registry statistics.
async fn get_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    let snapshot = state.reader.get_total_proofs().await?;

    Ok(Json(StatsResponse {
        total_proofs: snapshot.value.to_string(),
        network: state.network.clone(),
        contract_address: state.registry_address.as_ref().map(format_address),
        known_types: state.reader.types().known_names(),
        cache: state.reader.cache_stats_json(),
        stale: snapshot.stale,
    }))
}

/// POST /verify - Check whether an address holds a proof type.
async fn verify_proof(
    State(state): State<AppState>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let address = request.address.ok_or_else(|| missing_field("address"))?;
    let proof_type = request
        .proof_type
        .ok_or_else(|| missing_field("proofType"))?;

    let snapshot = state.reader.verify(&address, &proof_type).await?;

    Ok(Json(VerifyResponse {
        address,
        proof_type,
        has_proof: snapshot.value,
        verified: snapshot.value,
        stale: snapshot.stale,
    }))
}

/// GET /health - Liveness check.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "baseproof-api",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
        registry_configured: state.reader.is_configured(),
    })
}
