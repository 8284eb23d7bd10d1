//! Slack interface for ledgerlink:
//! - **Slash Commands** (`commands`) - `/finance accounts`, `/finance pnl`, etc.
//! - **Block Kit** (`blocks`) - rich message builders for command responses
//! - **Web API** (`api`) - outbound `chat.postMessage` calls
//!
//! Slash commands arrive over HTTP at the server's `/slack/commands` route;
//! this crate owns parsing and rendering but not routing, so it stays free
//! of web-framework types.

pub mod api;
pub mod blocks;
pub mod commands;
