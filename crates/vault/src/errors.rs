use thiserror::Error;

use ledgerlink_core::domain::connection::Provider;
use ledgerlink_db::repositories::RepositoryError;

/// Failure taxonomy of the token vault. The vault never swallows errors;
/// the routing layer maps each variant to an HTTP status and user-facing
/// message.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Required client id/secret/redirect URI absent. Not retryable.
    #[error("oauth configuration missing for {provider}: {detail}")]
    ConfigMissing { provider: Provider, detail: &'static str },
    /// Authorization code invalid, expired, or already used. The caller
    /// must restart the authorization flow.
    #[error("{provider} rejected the authorization code: {reason}")]
    ExchangeFailed { provider: Provider, reason: String },
    /// No stored connection. Surfaced as "please authorize", not a server
    /// error.
    #[error("no {provider} connection exists for user `{user_id}`")]
    NotConnected { provider: Provider, user_id: String },
    /// Refresh token revoked or expired at the provider. The stored
    /// connection is left intact for diagnostics but is unusable until a
    /// fresh authorization-code exchange.
    #[error("{provider} rejected the stored refresh token: {reason}")]
    RefreshFailed { provider: Provider, reason: String },
    /// Network failure or provider 5xx. Retryable by the caller; the vault
    /// does not retry internally to avoid hidden latency spikes.
    #[error("{provider} is unavailable: {reason}")]
    ProviderUnavailable { provider: Provider, reason: String },
    #[error("connection store failure: {0}")]
    Store(#[from] RepositoryError),
}
