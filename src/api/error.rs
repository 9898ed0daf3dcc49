//! Structured API error responses with error codes
//!
//! Reader errors map to stable machine-readable codes and HTTP statuses; the
//! underlying message is always passed through for observability.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::infra::ReaderError;

// ============================================================================
// Error Codes
// ============================================================================

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (3xxx)
    /// Required field is missing
    MissingRequiredField,
    /// Field value is invalid
    InvalidFieldValue,
    /// Type hash has the wrong byte width
    MalformedTypeHash,

    // Infrastructure errors (8xxx)
    /// Operation timed out
    Timeout,
    /// Underlying RPC or contract call failed
    RpcFailure,
    /// Internal server error
    InternalError,

    // Registry errors (9xxx)
    /// ProofRegistry contract address not configured
    RegistryNotConfigured,
}

impl ErrorCode {
    /// Get the numeric code for this error.
    pub fn numeric_code(&self) -> u32 {
        match self {
            ErrorCode::MissingRequiredField => 3002,
            ErrorCode::InvalidFieldValue => 3003,
            ErrorCode::MalformedTypeHash => 3004,
            ErrorCode::Timeout => 8003,
            ErrorCode::RpcFailure => 8004,
            ErrorCode::InternalError => 8999,
            ErrorCode::RegistryNotConfigured => 9001,
        }
    }

    /// Get the HTTP status code for this error.
    pub fn http_status(&self) -> StatusCode {
        match self {
            ErrorCode::MissingRequiredField => StatusCode::BAD_REQUEST,
            ErrorCode::InvalidFieldValue => StatusCode::BAD_REQUEST,
            ErrorCode::MalformedTypeHash => StatusCode::BAD_REQUEST,
            ErrorCode::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorCode::RpcFailure => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::RegistryNotConfigured => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code_str = match self {
            ErrorCode::MissingRequiredField => "MISSING_REQUIRED_FIELD",
            ErrorCode::InvalidFieldValue => "INVALID_FIELD_VALUE",
            ErrorCode::MalformedTypeHash => "MALFORMED_TYPE_HASH",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::RpcFailure => "RPC_FAILURE",
            ErrorCode::InternalError => "INTERNAL_ERROR",
            ErrorCode::RegistryNotConfigured => "REGISTRY_NOT_CONFIGURED",
        };
        write!(f, "{}", code_str)
    }
}

// ============================================================================
// Structured Error Response
// ============================================================================

/// Structured error response for API endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ErrorDetails,
}

/// Detailed error information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Numeric error code for easy categorization
    pub numeric_code: u32,

    /// Human-readable error message
    pub message: String,

    /// Additional error details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetails {
                code,
                numeric_code: code.numeric_code(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.error.details = Some(details);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.error.code.http_status()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code_str = self.error.code.to_string();
        let mut response = (status, Json(self)).into_response();

        if let Ok(code_value) = axum::http::HeaderValue::from_str(&code_str) {
            response.headers_mut().insert(
                axum::http::header::HeaderName::from_static("x-error-code"),
                code_value,
            );
        }

        response
    }
}

// ============================================================================
// Conversion from ReaderError
// ============================================================================

impl From<ReaderError> for ApiError {
    fn from(err: ReaderError) -> Self {
        match err {
            ReaderError::NotConfigured => {
                ApiError::new(ErrorCode::RegistryNotConfigured, err.to_string())
            }
            ReaderError::Validation { ref field, .. } => {
                let field = field.clone();
                ApiError::new(ErrorCode::InvalidFieldValue, err.to_string())
                    .with_details(serde_json::json!({ "field": field }))
            }
            ReaderError::Timeout(_) => ApiError::new(ErrorCode::Timeout, err.to_string()),
            ReaderError::Rpc(message) => ApiError::new(ErrorCode::RpcFailure, message),
            ReaderError::MalformedHash(_) => {
                ApiError::new(ErrorCode::MalformedTypeHash, err.to_string())
            }
            ReaderError::Definitions(_) | ReaderError::Config(_) => {
                ApiError::new(ErrorCode::InternalError, err.to_string())
            }
        }
    }
}

/// A missing-required-field error for request bodies.
pub fn missing_field(field: &str) -> ApiError {
    ApiError::new(
        ErrorCode::MissingRequiredField,
        format!("{field} is required"),
    )
    .with_details(serde_json::json!({ "field": field }))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_numeric() {
        assert_eq!(ErrorCode::MissingRequiredField.numeric_code(), 3002);
        assert_eq!(ErrorCode::Timeout.numeric_code(), 8003);
        assert_eq!(ErrorCode::RegistryNotConfigured.numeric_code(), 9001);
        assert_eq!(ErrorCode::InternalError.numeric_code(), 8999);
    }

    #[test]
    fn test_error_code_http_status() {
        assert_eq!(
            ErrorCode::RegistryNotConfigured.http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ErrorCode::MissingRequiredField.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCode::MalformedTypeHash.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ErrorCode::Timeout.http_status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            ErrorCode::RpcFailure.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_reader_error_mapping() {
        let not_configured: ApiError = ReaderError::NotConfigured.into();
        assert_eq!(not_configured.status(), StatusCode::SERVICE_UNAVAILABLE);

        let validation: ApiError = ReaderError::validation("address", "bad").into();
        assert_eq!(validation.status(), StatusCode::BAD_REQUEST);
        assert!(validation.error.details.is_some());

        // Underlying message is passed through, never swallowed
        let rpc: ApiError = ReaderError::Rpc("connection refused".into()).into();
        assert_eq!(rpc.error.message, "connection refused");
        assert_eq!(rpc.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_serialization() {
        let error = ApiError::new(ErrorCode::RegistryNotConfigured, "ProofRegistry not configured");
        let json = serde_json::to_string(&error).unwrap();

        assert!(json.contains("REGISTRY_NOT_CONFIGURED"));
        assert!(json.contains("ProofRegistry not configured"));
        assert!(json.contains("9001"));
    }

    #[test]
    fn test_missing_field() {
        let error = missing_field("proofType");
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error.error.message, "proofType is required");
    }
}
