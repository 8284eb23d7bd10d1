//! QuickBooks Online pass-through endpoints.
//!
//! Every request resolves a fresh access token through the vault first, so
//! handlers never see a stale credential. The company (realm) id comes from
//! the stored connection; QuickBooks delivers it on the OAuth callback.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::info;

use ledgerlink_core::domain::connection::Provider;
use ledgerlink_slack::blocks::AccountSummary;
use ledgerlink_vault::{TokenVault, VaultError};

use crate::oauth::DEFAULT_USER_ID;
use crate::responses::{error_response, vault_error_status, ApiError};

const ACCOUNT_QUERY: &str = "select * from Account maxresults 50";
const MINOR_VERSION: &str = "65";

#[derive(Debug, Error)]
pub enum QuickBooksError {
    #[error(transparent)]
    Vault(#[from] VaultError),
    #[error("quickbooks connection carries no company id; reauthorization required")]
    MissingRealm,
    #[error("quickbooks request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("quickbooks api returned {status}: {body}")]
    Api { status: u16, body: String },
}

impl QuickBooksError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Vault(error) => vault_error_status(error),
            Self::MissingRealm => StatusCode::CONFLICT,
            Self::Transport(_) | Self::Api { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}

/// Thin client over the QuickBooks v3 company API. Token acquisition goes
/// through the vault on every call.
#[derive(Clone)]
pub struct QuickBooksApi {
    vault: Arc<TokenVault>,
    http: reqwest::Client,
    base_url: String,
}

impl QuickBooksApi {
    pub fn new(vault: Arc<TokenVault>, http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self { vault, http, base_url: base_url.trim_end_matches('/').to_string() }
    }

    async fn credentials(&self, user_id: &str) -> Result<(String, String), QuickBooksError> {
        let access_token =
            self.vault.get_valid_access_token(user_id, Provider::Quickbooks).await?;
        let realm = self
            .vault
            .connection(user_id, Provider::Quickbooks)
            .await?
            .and_then(|connection| connection.external_account_id)
            .ok_or(QuickBooksError::MissingRealm)?;
        Ok((access_token, realm))
    }

    pub async fn query_accounts(
        &self,
        user_id: &str,
    ) -> Result<Vec<AccountSummary>, QuickBooksError> {
        let (token, realm) = self.credentials(user_id).await?;
        let response = self
            .http
            .get(format!("{}/{realm}/query", self.base_url))
            .query(&[("query", ACCOUNT_QUERY), ("minorversion", MINOR_VERSION)])
            .bearer_auth(&token)
            .header("Accept", "application/json")
            .send()
            .await?;

        let body = decode_response(response).await?;
        Ok(extract_accounts(&body))
    }

    pub async fn create_account(
        &self,
        user_id: &str,
        request: &CreateAccountRequest,
    ) -> Result<Value, QuickBooksError> {
        let (token, realm) = self.credentials(user_id).await?;
        let mut payload = json!({
            "Name": request.name,
            "AccountType": request.account_type,
        });
        if let Some(sub_type) = &request.account_sub_type {
            payload["AccountSubType"] = Value::String(sub_type.clone());
        }

        let response = self
            .http
            .post(format!("{}/{realm}/account", self.base_url))
            .query(&[("minorversion", MINOR_VERSION)])
            .bearer_auth(&token)
            .header("Accept", "application/json")
            .json(&payload)
            .send()
            .await?;

        decode_response(response).await
    }

    pub async fn profit_and_loss(
        &self,
        user_id: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<Value, QuickBooksError> {
        let (token, realm) = self.credentials(user_id).await?;
        let response = self
            .http
            .get(format!("{}/{realm}/reports/ProfitAndLoss", self.base_url))
            .query(&[
                ("start_date", start_date),
                ("end_date", end_date),
                ("minorversion", MINOR_VERSION),
            ])
            .bearer_auth(&token)
            .header("Accept", "application/json")
            .send()
            .await?;

        decode_response(response).await
    }
}

async fn decode_response(response: reqwest::Response) -> Result<Value, QuickBooksError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(QuickBooksError::Api { status: status.as_u16(), body: truncate(&body, 512) });
    }
    Ok(response.json::<Value>().await?)
}

fn truncate(body: &str, limit: usize) -> String {
    if body.len() <= limit {
        return body.to_string();
    }
    let mut end = limit;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

/// Flattens the `QueryResponse.Account` array into summaries for rendering.
/// Unexpected shapes produce an empty list rather than an error.
pub fn extract_accounts(body: &Value) -> Vec<AccountSummary> {
    let Some(accounts) = body["QueryResponse"]["Account"].as_array() else {
        return Vec::new();
    };

    accounts
        .iter()
        .filter_map(|account| {
            let name = account["Name"].as_str()?.to_string();
            let account_type =
                account["AccountType"].as_str().unwrap_or("Unknown").to_string();
            let balance = match &account["CurrentBalance"] {
                Value::Number(number) => Some(format!("{number}")),
                Value::String(raw) => Some(raw.clone()),
                _ => None,
            };
            let currency = account["CurrencyRef"]["value"].as_str().map(str::to_string);
            Some(AccountSummary { name, account_type, balance, currency })
        })
        .collect()
}

/// Pulls the "Net Income" summary line out of a ProfitAndLoss report. The
/// report nests row groups arbitrarily deep, so this walks recursively.
pub fn extract_net_income(report: &Value) -> Option<String> {
    fn walk(rows: &Value) -> Option<String> {
        let rows = rows["Row"].as_array()?;
        for row in rows {
            if let Some(columns) = row["Summary"]["ColData"].as_array() {
                let label = columns.first().and_then(|col| col["value"].as_str());
                if label == Some("Net Income") {
                    if let Some(value) =
                        columns.get(1).and_then(|col| col["value"].as_str())
                    {
                        return Some(value.to_string());
                    }
                }
            }
            if let Some(found) = walk(&row["Rows"]) {
                return Some(found);
            }
        }
        None
    }

    walk(&report["Rows"])
}

/// Default report window when the caller supplies no dates: the current
/// calendar year to date.
pub fn default_report_period() -> (String, String) {
    let today = Utc::now().date_naive();
    (today.format("%Y-01-01").to_string(), today.format("%Y-%m-%d").to_string())
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub user_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub name: String,
    pub account_type: String,
    pub account_sub_type: Option<String>,
}

pub fn router(api: QuickBooksApi) -> Router {
    Router::new()
        .route("/quickbooks/accounts", get(list_accounts).post(create_account))
        .route("/quickbooks/pnl", get(profit_and_loss))
        .with_state(api)
}

type ApiResult = Result<Json<Value>, (StatusCode, Json<ApiError>)>;

fn quickbooks_error(error: QuickBooksError) -> (StatusCode, Json<ApiError>) {
    error_response(error.status_code(), error.to_string())
}

async fn list_accounts(State(api): State<QuickBooksApi>, Query(query): Query<UserQuery>) -> ApiResult {
    let user_id = query.user_id.as_deref().unwrap_or(DEFAULT_USER_ID);
    let accounts = api.query_accounts(user_id).await.map_err(quickbooks_error)?;

    let listing: Vec<Value> = accounts
        .iter()
        .map(|account| {
            json!({
                "name": account.name,
                "account_type": account.account_type,
                "balance": account.balance,
                "currency": account.currency,
            })
        })
        .collect();
    Ok(Json(json!({ "accounts": listing, "count": listing.len() })))
}

async fn create_account(
    State(api): State<QuickBooksApi>,
    Query(query): Query<UserQuery>,
    Json(request): Json<CreateAccountRequest>,
) -> ApiResult {
    let user_id = query.user_id.as_deref().unwrap_or(DEFAULT_USER_ID);
    if request.name.trim().is_empty() {
        return Err(error_response(StatusCode::BAD_REQUEST, "account name must not be empty"));
    }

    let created = api.create_account(user_id, &request).await.map_err(quickbooks_error)?;
    info!(
        event_name = "quickbooks.account.created",
        user_id,
        account_name = %request.name,
        "quickbooks account created"
    );
    Ok(Json(created))
}

async fn profit_and_loss(
    State(api): State<QuickBooksApi>,
    Query(query): Query<ReportQuery>,
) -> ApiResult {
    let user_id = query.user_id.as_deref().unwrap_or(DEFAULT_USER_ID);
    let (default_start, default_end) = default_report_period();
    let start_date = query.start_date.as_deref().unwrap_or(&default_start);
    let end_date = query.end_date.as_deref().unwrap_or(&default_end);

    let report =
        api.profit_and_loss(user_id, start_date, end_date).await.map_err(quickbooks_error)?;
    Ok(Json(report))
}
