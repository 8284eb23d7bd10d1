use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;

/// Form payload Slack posts to the slash-command endpoint. Only the fields
/// the dispatch table needs; Slack sends more.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct SlashCommandPayload {
    pub command: String,
    #[serde(default)]
    pub text: String,
    pub user_id: String,
    pub channel_id: String,
    #[serde(default)]
    pub response_url: Option<String>,
}

/// Parsed `/finance` command verbs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FinanceCommand {
    Accounts,
    ProfitAndLoss { start_date: Option<String>, end_date: Option<String> },
    Connect,
    Help,
    Unknown { verb: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("unsupported slash command: {0}")]
    UnsupportedCommand(String),
    #[error("invalid date `{value}` (expected YYYY-MM-DD)")]
    InvalidDate { value: String },
}

pub fn parse_finance_command(payload: &SlashCommandPayload) -> Result<FinanceCommand, CommandParseError> {
    if payload.command != "/finance" {
        return Err(CommandParseError::UnsupportedCommand(payload.command.clone()));
    }

    let mut parts = payload.text.split_whitespace();
    let verb = parts.next().unwrap_or("help").to_ascii_lowercase();

    match verb.as_str() {
        "accounts" => Ok(FinanceCommand::Accounts),
        "pnl" => {
            let start_date = parts.next().map(parse_date).transpose()?;
            let end_date = parts.next().map(parse_date).transpose()?;
            Ok(FinanceCommand::ProfitAndLoss { start_date, end_date })
        }
        "connect" => Ok(FinanceCommand::Connect),
        "help" => Ok(FinanceCommand::Help),
        other => Ok(FinanceCommand::Unknown { verb: other.to_string() }),
    }
}

fn parse_date(raw: &str) -> Result<String, CommandParseError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|_| raw.to_string())
        .map_err(|_| CommandParseError::InvalidDate { value: raw.to_string() })
}
