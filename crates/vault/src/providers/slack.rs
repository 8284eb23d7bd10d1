use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Deserialize;

use ledgerlink_core::domain::connection::Provider;

use super::{encode_query, GrantKind, ProviderSettings, ProviderTokenClient, TokenGrant};
use crate::errors::VaultError;

/// Slack token endpoint client.
///
/// Quirks: `oauth.v2.access` answers HTTP 200 with an `ok`/`error` envelope
/// for both success and rejection, the team id rides inside the response,
/// and `refresh_token`/`expires_in` only appear when token rotation is
/// enabled for the app.
pub struct SlackTokenClient {
    settings: ProviderSettings,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SlackTokenResponse {
    ok: bool,
    error: Option<String>,
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    scope: Option<String>,
    team: Option<SlackTeam>,
}

#[derive(Debug, Deserialize)]
struct SlackTeam {
    id: Option<String>,
}

impl SlackTokenClient {
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
            .form(form)
            .send()
            .await
            .map_err(|error| VaultError::ProviderUnavailable {
                provider: Provider::Slack,
                reason: format!("token endpoint request failed: {error}"),
            })?;

        let status = response.status();
        if status.is_server_error() {
            return Err(VaultError::ProviderUnavailable {
                provider: Provider::Slack,
                reason: format!("token endpoint returned {status}"),
            });
        }
        if !status.is_success() {
            return Err(kind.rejection(Provider::Slack, format!("token endpoint returned {status}")));
        }

        let payload: SlackTokenResponse = response.json().await.map_err(|error| {
            kind.rejection(Provider::Slack, format!("could not decode token response: {error}"))
        })?;
        decode_grant(payload, kind)
    }
}

fn decode_grant(payload: SlackTokenResponse, kind: GrantKind) -> Result<TokenGrant, VaultError> {
    if !payload.ok {
        let reason =
            payload.error.unwrap_or_else(|| "unspecified slack api error".to_string());
        return Err(kind.rejection(Provider::Slack, reason));
    }

    let access_token = payload
        .access_token
        .filter(|token| !token.is_empty())
        .ok_or_else(|| kind.rejection(Provider::Slack, "response carried no access token"))?;

    Ok(TokenGrant {
        access_token,
        refresh_token: payload.refresh_token,
        expires_in: payload.expires_in,
        external_account_id: payload.team.and_then(|team| team.id),
        scope: payload.scope,
    })
}

#[async_trait]
impl ProviderTokenClient for SlackTokenClient {
    fn provider(&self) -> Provider {
        Provider::Slack
    }

    fn authorization_url(&self, state: &str) -> String {
        format!(
            "{authorize}?client_id={client_id}&scope={scope}&redirect_uri={redirect_uri}&state={state}",
            authorize = self.settings.authorize_endpoint,
            client_id = encode_query(&self.settings.client_id),
            scope = encode_query(&self.settings.scope),
            redirect_uri = encode_query(&self.settings.redirect_uri),
            state = encode_query(state),
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, VaultError> {
        let form = [
            ("code", code),
            ("client_id", self.settings.client_id.as_str()),
            ("client_secret", self.settings.client_secret.expose_secret()),
            ("redirect_uri", self.settings.redirect_uri.as_str()),
        ];
        self.request_grant(&form, GrantKind::Exchange).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, VaultError> {
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.settings.client_id.as_str()),
            ("client_secret", self.settings.client_secret.expose_secret()),
        ];
        self.request_grant(&form, GrantKind::Refresh).await
    }
}
