use axum::{http::StatusCode, response::Json};
use serde::Serialize;

use ledgerlink_vault::errors::VaultError;

/// JSON body returned on every failed request.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

pub fn error_response(status: StatusCode, error: impl Into<String>) -> (StatusCode, Json<ApiError>) {
    (status, Json(ApiError { error: error.into() }))
}

/// Each vault failure maps to exactly one status so callers can branch on it:
/// `NotConnected` and `RefreshFailed` ask the user to (re)authorize,
/// `ProviderUnavailable` is retryable, the rest are operator problems.
pub fn vault_error_status(error: &VaultError) -> StatusCode {
    match error {
        VaultError::ConfigMissing { .. } => StatusCode::SERVICE_UNAVAILABLE,
        VaultError::ExchangeFailed { .. } => StatusCode::BAD_REQUEST,
        VaultError::NotConnected { .. } => StatusCode::NOT_FOUND,
        VaultError::RefreshFailed { .. } => StatusCode::UNAUTHORIZED,
        VaultError::ProviderUnavailable { .. } => StatusCode::BAD_GATEWAY,
        VaultError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn vault_error(error: VaultError) -> (StatusCode, Json<ApiError>) {
    error_response(vault_error_status(&error), error.to_string())
}
