use async_trait::async_trait;
use secrecy::SecretString;

use ledgerlink_core::config::OAuthConfig;
use ledgerlink_core::domain::connection::Provider;

use crate::errors::VaultError;

pub mod quickbooks;
pub mod slack;

pub use quickbooks::QuickbooksTokenClient;
pub use slack::SlackTokenClient;

/// Tokens returned by a provider token endpoint after code exchange or
/// refresh. `refresh_token` is absent when the provider does not rotate it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    /// Provider tenant identifier when the token response carries one
    /// (Slack team id). QuickBooks reports its realm id on the callback
    /// query instead.
    pub external_account_id: Option<String>,
    pub scope: Option<String>,
}

/// Which grant flow produced a provider rejection. Decides whether a 4xx
/// becomes `ExchangeFailed` or `RefreshFailed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrantKind {
    Exchange,
    Refresh,
}

impl GrantKind {
    pub fn rejection(self, provider: Provider, reason: impl Into<String>) -> VaultError {
        match self {
            Self::Exchange => VaultError::ExchangeFailed { provider, reason: reason.into() },
            Self::Refresh => VaultError::RefreshFailed { provider, reason: reason.into() },
        }
    }
}

/// Provider-specific token endpoint access. One implementation per
/// provider handles its OAuth quirks (endpoint URLs, auth style, response
/// envelope); the vault stays provider-agnostic.
#[async_trait]
pub trait ProviderTokenClient: Send + Sync {
    fn provider(&self) -> Provider;

    /// Consent URL embedding client id, scopes, redirect URI, and the
    /// caller-supplied CSRF state. Pure construction, no network call.
    fn authorization_url(&self, state: &str) -> String;

    /// `grant_type=authorization_code` exchange.
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, VaultError>;

    /// `grant_type=refresh_token` refresh.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, VaultError>;
}

/// Fully resolved OAuth client settings for one provider. Unlike the raw
/// config section, every field here is present; construction fails with
/// `ConfigMissing` otherwise.
#[derive(Clone, Debug)]
pub struct ProviderSettings {
    pub client_id: String,
    pub client_secret: SecretString,
    pub redirect_uri: String,
    pub authorize_endpoint: String,
    pub token_endpoint: String,
    pub scope: String,
}

impl ProviderSettings {
    pub fn from_config(provider: Provider, oauth: &OAuthConfig) -> Result<Self, VaultError> {
        let defaults = ProviderDefaults::for_provider(provider);
        let creds = oauth.credentials(provider);

        let client_id = creds
            .client_id
            .clone()
            .filter(|value| !value.trim().is_empty())
            .ok_or(VaultError::ConfigMissing { provider, detail: "client_id" })?;
        let client_secret = creds
            .client_secret
            .clone()
            .ok_or(VaultError::ConfigMissing { provider, detail: "client_secret" })?;

        let redirect_uri = match &creds.redirect_uri {
            Some(value) => value.clone(),
            None => match &oauth.callback_base_url {
                Some(base) => {
                    format!("{}/{}/callback", base.trim_end_matches('/'), provider.as_str())
                }
                None => {
                    return Err(VaultError::ConfigMissing {
                        provider,
                        detail: "redirect_uri (or oauth.callback_base_url)",
                    })
                }
            },
        };

        Ok(Self {
            client_id,
            client_secret,
            redirect_uri,
            authorize_endpoint: creds
                .authorize_endpoint
                .clone()
                .unwrap_or_else(|| defaults.authorize_endpoint.to_string()),
            token_endpoint: creds
                .token_endpoint
                .clone()
                .unwrap_or_else(|| defaults.token_endpoint.to_string()),
            scope: defaults.scope.to_string(),
        })
    }
}

struct ProviderDefaults {
    authorize_endpoint: &'static str,
    token_endpoint: &'static str,
    scope: &'static str,
}

impl ProviderDefaults {
    fn for_provider(provider: Provider) -> Self {
        match provider {
            Provider::Slack => Self {
                authorize_endpoint: "https://slack.com/oauth/v2/authorize",
                token_endpoint: "https://slack.com/api/oauth.v2.access",
                // Slack scopes are comma-separated, not space-separated.
                scope: "chat:write,commands,channels:read",
            },
            Provider::Quickbooks => Self {
                authorize_endpoint: "https://appcenter.intuit.com/connect/oauth2",
                token_endpoint: "https://oauth.platform.intuit.com/oauth2/v1/tokens/bearer",
                scope: "com.intuit.quickbooks.accounting",
            },
        }
    }
}

pub(crate) fn encode_query(value: &str) -> String {
    value.replace('+', "%2B").replace(' ', "%20").replace('/', "%2F").replace(':', "%3A")
}

#[cfg(test)]
mod tests {
    use ledgerlink_core::config::{AppConfig, ConfigOverrides, LoadOptions};
    use ledgerlink_core::domain::connection::Provider;

    use super::{encode_query, ProviderSettings};
    use crate::errors::VaultError;

    fn oauth_config(overrides: ConfigOverrides) -> ledgerlink_core::config::OAuthConfig {
        AppConfig::load(LoadOptions { overrides, ..LoadOptions::default() })
            .expect("config should load")
            .oauth
    }

    #[test]
    fn missing_client_id_is_config_missing() {
        let oauth = oauth_config(ConfigOverrides::default());
        let result = ProviderSettings::from_config(Provider::Quickbooks, &oauth);
        assert!(matches!(
            result,
            Err(VaultError::ConfigMissing { provider: Provider::Quickbooks, detail: "client_id" })
        ));
    }

    #[test]
    fn redirect_uri_derives_from_callback_base_url() {
        let oauth = oauth_config(ConfigOverrides {
            quickbooks_client_id: Some("ABC".to_string()),
            quickbooks_client_secret: Some("shhh".to_string()),
            callback_base_url: Some("https://host".to_string()),
            ..ConfigOverrides::default()
        });

        let settings = ProviderSettings::from_config(Provider::Quickbooks, &oauth)
            .expect("settings should resolve");
        assert_eq!(settings.redirect_uri, "https://host/quickbooks/callback");
        assert_eq!(settings.scope, "com.intuit.quickbooks.accounting");
        assert_eq!(
            settings.token_endpoint,
            "https://oauth.platform.intuit.com/oauth2/v1/tokens/bearer"
        );
    }

    #[test]
    fn missing_redirect_context_is_config_missing() {
        let oauth = oauth_config(ConfigOverrides {
            slack_client_id: Some("id".to_string()),
            slack_client_secret: Some("secret".to_string()),
            ..ConfigOverrides::default()
        });

        let result = ProviderSettings::from_config(Provider::Slack, &oauth);
        assert!(matches!(result, Err(VaultError::ConfigMissing { provider: Provider::Slack, .. })));
    }

    #[test]
    fn encode_query_escapes_url_characters() {
        assert_eq!(encode_query("https://host/cb"), "https%3A%2F%2Fhost%2Fcb");
        assert_eq!(encode_query("a b+c"), "a%20b%2Bc");
    }
}
