//! OAuth token lifecycle management for the Slack and QuickBooks
//! integrations.
//!
//! The [`TokenVault`] hides token staleness from callers: any caller asking
//! for a usable credential receives one that was valid at the moment of
//! return, or an explicit typed failure. Provider token endpoints sit behind
//! the [`providers::ProviderTokenClient`] trait so the vault is testable
//! without network access.

pub mod errors;
pub mod providers;
pub mod vault;

pub use errors::VaultError;
pub use providers::{ProviderSettings, ProviderTokenClient, TokenGrant};
pub use vault::{CallbackContext, RefreshPolicy, TokenVault};
