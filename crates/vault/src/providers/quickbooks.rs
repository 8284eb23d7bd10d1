use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Deserialize;

use ledgerlink_core::domain::connection::Provider;

use super::{encode_query, GrantKind, ProviderSettings, ProviderTokenClient, TokenGrant};
use crate::errors::VaultError;

/// QuickBooks Online token endpoint client.
///
/// Quirks: the bearer endpoint wants HTTP Basic auth with the client
/// credentials rather than form fields, rejections arrive as plain 4xx
/// responses, and the realm id is reported on the OAuth callback query
/// instead of the token response.
pub struct QuickbooksTokenClient {
    settings: ProviderSettings,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct QuickbooksTokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

impl QuickbooksTokenClient {
    pub fn new(settings: ProviderSettings, http: reqwest::Client) -> Self {
        Self { settings, http }
    }

    async fn request_grant(
        &self,
        form: &[(&str, &str)],
        kind: GrantKind,
    ) -> Result<TokenGrant, VaultError> {
        let response = self
            .http
            .post(&self.settings.token_endpoint)
            .basic_auth(
                &self.settings.client_id,
                Some(self.settings.client_secret.expose_secret()),
            )
            .form(form)
            .send()
            .await
            .map_err(|error| VaultError::ProviderUnavailable {
                provider: Provider::Quickbooks,
                reason: format!("token endpoint request failed: {error}"),
            })?;

        let status = response.status();
        if status.is_server_error() {
            return Err(VaultError::ProviderUnavailable {
                provider: Provider::Quickbooks,
                reason: format!("token endpoint returned {status}"),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(kind.rejection(
                Provider::Quickbooks,
                format!("token endpoint returned {status}: {}", truncate(&body, 200)),
            ));
        }

        let payload: QuickbooksTokenResponse = response.json().await.map_err(|error| {
            kind.rejection(
                Provider::Quickbooks,
                format!("could not decode token response: {error}"),
            )
        })?;
        decode_grant(payload, kind)
    }
}

fn decode_grant(
    payload: QuickbooksTokenResponse,
    kind: GrantKind,
) -> Result<TokenGrant, VaultError> {
    let access_token = payload
        .access_token
        .filter(|token| !token.is_empty())
        .ok_or_else(|| kind.rejection(Provider::Quickbooks, "response carried no access token"))?;

    Ok(TokenGrant {
        access_token,
        refresh_token: payload.refresh_token,
        expires_in: payload.expires_in,
        external_account_id: None,
        scope: None,
    })
}

fn truncate(value: &str, limit: usize) -> &str {
    match value.char_indices().nth(limit) {
        Some((index, _)) => &value[..index],
        None => value,
    }
}

#[async_trait]
impl ProviderTokenClient for QuickbooksTokenClient {
    fn provider(&self) -> Provider {
        Provider::Quickbooks
    }

    fn authorization_url(&self, state: &str) -> String {
        format!(
            "{authorize}?client_id={client_id}&response_type=code&scope={scope}&redirect_uri={redirect_uri}&state={state}",
            authorize = self.settings.authorize_endpoint,
            client_id = encode_query(&self.settings.client_id),
            scope = encode_query(&self.settings.scope),
            redirect_uri = encode_query(&self.settings.redirect_uri),
            state = encode_query(state),
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, VaultError> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.settings.redirect_uri.as_str()),
        ];
        self.request_grant(&form, GrantKind::Exchange).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, VaultError> {
        let form = [("grant_type", "refresh_token"), ("refresh_token", refresh_token)];
        self.request_grant(&form, GrantKind::Refresh).await
    }
}

#[cfg(test)]
mod tests {
    use ledgerlink_core::domain::connection::Provider;

    use super::{decode_grant, QuickbooksTokenResponse};
    use crate::errors::VaultError;
    use crate::providers::GrantKind;

    #[test]
    fn grant_decodes_token_fields() {
        let payload = QuickbooksTokenResponse {
            access_token: Some("AT1".to_string()),
            refresh_token: Some("RT1".to_string()),
            expires_in: Some(3600),
        };

        let grant = decode_grant(payload, GrantKind::Exchange).expect("grant should decode");
        assert_eq!(grant.access_token, "AT1");
        assert_eq!(grant.refresh_token.as_deref(), Some("RT1"));
        assert_eq!(grant.expires_in, Some(3600));
        assert!(grant.external_account_id.is_none(), "realm id never rides the token response");
    }

    #[test]
    fn missing_access_token_is_an_exchange_rejection() {
        let payload = QuickbooksTokenResponse {
            access_token: None,
            refresh_token: Some("RT1".to_string()),
            expires_in: None,
        };

        let error = decode_grant(payload, GrantKind::Exchange).err().expect("should fail");
        assert!(matches!(error, VaultError::ExchangeFailed { provider: Provider::Quickbooks, .. }));
    }

    #[test]
    fn missing_access_token_during_refresh_is_a_refresh_rejection() {
        let payload =
            QuickbooksTokenResponse { access_token: None, refresh_token: None, expires_in: None };

        let error = decode_grant(payload, GrantKind::Refresh).err().expect("should fail");
        assert!(matches!(error, VaultError::RefreshFailed { provider: Provider::Quickbooks, .. }));
    }
}
