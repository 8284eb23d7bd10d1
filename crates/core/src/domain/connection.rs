use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// External OAuth-issuing service the backend integrates with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Slack,
    Quickbooks,
}

impl Provider {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "slack" => Some(Self::Slack),
            "quickbooks" => Some(Self::Quickbooks),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Slack => "slack",
            Self::Quickbooks => "quickbooks",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Persisted OAuth credential set for one user/provider pair.
///
/// At most one row exists per `(user_id, provider)`; updates are upserts.
/// `access_token` is never empty once the row exists, and `refresh_token`,
/// once set, is never replaced with an empty value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub user_id: String,
    pub provider: Provider,
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Provider tenant identifier: QuickBooks realm id, Slack team id.
    pub external_account_id: Option<String>,
    pub scope: Option<String>,
    pub obtained_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Connection {
    /// Whether the access token is expired or expires within `margin` of
    /// `now`. An absent `expires_at` counts as due: the provider did not
    /// report a lifetime, so freshness cannot be assumed.
    pub fn refresh_due(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at - margin <= now,
            None => true,
        }
    }
}
