//! `/finance` slash-command endpoint.
//!
//! Slack expects a `200 OK` with a renderable body for every delivery, so
//! failures come back as ephemeral error messages rather than HTTP errors.
//! The Slack user id doubles as the vault user id.

use axum::{extract::State, response::Json, routing::post, Form, Router};
use serde_json::{json, Value};
use tracing::{info, warn};

use ledgerlink_slack::blocks::{
    connect_prompt, error_message, help_message, accounts_message, profit_and_loss_message,
    SlackMessage,
};
use ledgerlink_slack::commands::{
    parse_finance_command, CommandParseError, FinanceCommand, SlashCommandPayload,
};
use ledgerlink_vault::VaultError;

use crate::quickbooks::{default_report_period, extract_net_income, QuickBooksApi, QuickBooksError};

#[derive(Clone)]
pub struct SlackCommandState {
    pub quickbooks: QuickBooksApi,
    /// Externally reachable base URL used to build the connect button link.
    pub connect_base_url: Option<String>,
}

pub fn router(state: SlackCommandState) -> Router {
    Router::new().route("/slack/commands", post(handle_command)).with_state(state)
}

pub async fn handle_command(
    State(state): State<SlackCommandState>,
    Form(payload): Form<SlashCommandPayload>,
) -> Json<Value> {
    let command = match parse_finance_command(&payload) {
        Ok(command) => command,
        Err(CommandParseError::UnsupportedCommand(command)) => {
            return ephemeral(error_message(format!("Unsupported command `{command}`")));
        }
        Err(error @ CommandParseError::InvalidDate { .. }) => {
            return ephemeral(error_message(error.to_string()));
        }
    };

    info!(
        event_name = "slack.command.received",
        user_id = %payload.user_id,
        text = %payload.text,
        "slash command dispatched"
    );

    let message = match command {
        FinanceCommand::Accounts => accounts(&state, &payload.user_id).await,
        FinanceCommand::ProfitAndLoss { start_date, end_date } => {
            profit_and_loss(&state, &payload.user_id, start_date, end_date).await
        }
        FinanceCommand::Connect => connect_prompt(&connect_url(&state, &payload.user_id)),
        FinanceCommand::Help => help_message(),
        FinanceCommand::Unknown { verb } => error_message(format!(
            "Unknown subcommand `{verb}`. Try `/finance help`."
        )),
    };

    ephemeral(message)
}

async fn accounts(state: &SlackCommandState, user_id: &str) -> SlackMessage {
    match state.quickbooks.query_accounts(user_id).await {
        Ok(accounts) => accounts_message(&accounts),
        Err(error) => failure_message(state, user_id, error),
    }
}

async fn profit_and_loss(
    state: &SlackCommandState,
    user_id: &str,
    start_date: Option<String>,
    end_date: Option<String>,
) -> SlackMessage {
    let (default_start, default_end) = default_report_period();
    let start_date = start_date.unwrap_or(default_start);
    let end_date = end_date.unwrap_or(default_end);

    match state.quickbooks.profit_and_loss(user_id, &start_date, &end_date).await {
        Ok(report) => {
            let net_income = extract_net_income(&report);
            profit_and_loss_message(&start_date, &end_date, net_income.as_deref())
        }
        Err(error) => failure_message(state, user_id, error),
    }
}

/// Missing or dead connections become a connect prompt; everything else is
/// reported as a plain failure.
fn failure_message(state: &SlackCommandState, user_id: &str, error: QuickBooksError) -> SlackMessage {
    match &error {
        QuickBooksError::Vault(
            VaultError::NotConnected { .. } | VaultError::RefreshFailed { .. },
        )
        | QuickBooksError::MissingRealm => connect_prompt(&connect_url(state, user_id)),
        _ => {
            warn!(
                event_name = "slack.command.failed",
                user_id,
                error = %error,
                "finance command could not be served"
            );
            error_message(format!("QuickBooks request failed: {error}"))
        }
    }
}

fn connect_url(state: &SlackCommandState, user_id: &str) -> String {
    let base = state.connect_base_url.as_deref().unwrap_or_default().trim_end_matches('/');
    format!("{base}/quickbooks/authorize?user_id={user_id}")
}

fn ephemeral(message: SlackMessage) -> Json<Value> {
    Json(json!({
        "response_type": "ephemeral",
        "text": message.text,
        "blocks": message.blocks,
    }))
}
