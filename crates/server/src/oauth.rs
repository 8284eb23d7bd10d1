//! OAuth authorize/callback routes shared by every provider.
//!
//! `GET /{provider}/authorize` mints a single-use CSRF state token, persists
//! it, and redirects the browser to the provider consent page. The provider
//! sends the user back to `GET /{provider}/callback`, which consumes the
//! state token and hands the authorization code to the vault.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Json, Redirect},
    routing::get,
    Router,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use ledgerlink_core::domain::connection::{Connection, Provider};
use ledgerlink_db::repositories::{OAuthStateRecord, OAuthStateRepository};
use ledgerlink_slack::api::SlackWebClient;
use ledgerlink_slack::blocks::{Block, SlackMessage};
use ledgerlink_vault::{CallbackContext, TokenVault};

use crate::responses::{error_response, vault_error, ApiError};

/// Identity used when no `user_id` query parameter is supplied. Single-tenant
/// deployments run everything under this user.
pub const DEFAULT_USER_ID: &str = "demo";

const STATE_TTL_MINUTES: i64 = 10;

/// Posts a short confirmation to a Slack channel once a connection lands.
/// Failures are logged and swallowed; notification is never on the critical
/// path of the OAuth flow.
pub struct ConnectionNotifier {
    client: SlackWebClient,
    channel: String,
}

impl ConnectionNotifier {
    pub fn new(client: SlackWebClient, channel: impl Into<String>) -> Self {
        Self { client, channel: channel.into() }
    }

    pub async fn announce(&self, connection: &Connection) {
        let text = format!(
            "{} connected for user `{}`",
            connection.provider, connection.user_id
        );
        let message = SlackMessage::new(text.clone()).block(Block::section(text));

        if let Err(error) = self.client.post_message(&self.channel, &message).await {
            warn!(
                event_name = "oauth.notify.failed",
                provider = connection.provider.as_str(),
                user_id = %connection.user_id,
                error = %error,
                "connection notification could not be delivered"
            );
        }
    }
}

#[derive(Clone)]
pub struct OAuthRoutesState {
    pub vault: Arc<TokenVault>,
    pub states: Arc<dyn OAuthStateRepository>,
    pub notifier: Option<Arc<ConnectionNotifier>>,
}

pub fn router(state: OAuthRoutesState) -> Router {
    Router::new()
        .route("/{provider}/authorize", get(authorize))
        .route("/{provider}/callback", get(callback))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct AuthorizeQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    /// QuickBooks appends the company id to the callback under this name.
    #[serde(rename = "realmId")]
    pub realm_id: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CallbackResponse {
    pub connected: bool,
    pub provider: &'static str,
    pub user_id: String,
    pub external_account_id: Option<String>,
    pub scope: Option<String>,
    pub expires_at: Option<String>,
}

fn parse_provider(raw: &str) -> Result<Provider, (StatusCode, Json<ApiError>)> {
    Provider::parse(raw).ok_or_else(|| {
        error_response(StatusCode::NOT_FOUND, format!("unknown provider `{raw}`"))
    })
}

pub async fn authorize(
    Path(provider): Path<String>,
    Query(query): Query<AuthorizeQuery>,
    State(state): State<OAuthRoutesState>,
) -> Result<Redirect, (StatusCode, Json<ApiError>)> {
    let provider = parse_provider(&provider)?;
    let user_id = query.user_id.unwrap_or_else(|| DEFAULT_USER_ID.to_string());

    let now = Utc::now();
    let record = OAuthStateRecord {
        state_token: Uuid::new_v4().simple().to_string(),
        provider,
        user_id: user_id.clone(),
        requested_at: now,
        expires_at: now + Duration::minutes(STATE_TTL_MINUTES),
    };
    state.states.insert(&record).await.map_err(|error| {
        error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("state store failure: {error}"))
    })?;

    let url = state
        .vault
        .authorization_url(provider, &record.state_token)
        .map_err(vault_error)?;

    info!(
        event_name = "oauth.authorize.redirect",
        provider = provider.as_str(),
        user_id = %user_id,
        "authorization flow started"
    );
    Ok(Redirect::temporary(&url))
}

pub async fn callback(
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
    State(state): State<OAuthRoutesState>,
) -> Result<Json<CallbackResponse>, (StatusCode, Json<ApiError>)> {
    let provider = parse_provider(&provider)?;

    if let Some(error) = query.error {
        let detail = query.error_description.unwrap_or_default();
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            format!("provider denied authorization: {error} {detail}").trim_end().to_string(),
        ));
    }

    let code = query.code.ok_or_else(|| {
        error_response(StatusCode::BAD_REQUEST, "missing `code` query parameter")
    })?;
    let state_token = query.state.ok_or_else(|| {
        error_response(StatusCode::BAD_REQUEST, "missing `state` query parameter")
    })?;

    let record = state
        .states
        .reserve(&state_token, Utc::now())
        .await
        .map_err(|error| {
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("state store failure: {error}"),
            )
        })?
        .ok_or_else(|| {
            error_response(
                StatusCode::BAD_REQUEST,
                "state token is unknown, expired, or already used",
            )
        })?;

    if record.provider != provider {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "state token was issued for a different provider",
        ));
    }

    let connection = state
        .vault
        .exchange_code(
            &record.user_id,
            provider,
            &code,
            CallbackContext { external_account_id: query.realm_id },
        )
        .await
        .map_err(vault_error)?;

    if provider == Provider::Quickbooks {
        if let Some(notifier) = &state.notifier {
            notifier.announce(&connection).await;
        }
    }

    Ok(Json(CallbackResponse {
        connected: true,
        provider: provider.as_str(),
        user_id: connection.user_id,
        external_account_id: connection.external_account_id,
        scope: connection.scope,
        expires_at: connection.expires_at.map(|at| at.to_rfc3339()),
    }))
}
