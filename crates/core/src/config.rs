use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::connection::Provider;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub oauth: OAuthConfig,
    pub slack: SlackConfig,
    pub quickbooks: QuickbooksConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

/// OAuth client credentials and endpoints for one provider.
///
/// Endpoints default to the real provider URLs; overriding them is intended
/// for tests pointed at a local stub.
#[derive(Clone, Debug, Default)]
pub struct ProviderCredentials {
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
    pub redirect_uri: Option<String>,
    pub authorize_endpoint: Option<String>,
    pub token_endpoint: Option<String>,
}

#[derive(Clone, Debug)]
pub struct OAuthConfig {
    /// Base URL used to derive callback redirect URIs when a provider does
    /// not set an explicit `redirect_uri`.
    pub callback_base_url: Option<String>,
    /// Outbound timeout for token-endpoint calls. Bounded so a slow provider
    /// cannot hold request resources.
    pub http_timeout_secs: u64,
    /// Refresh before every token hand-out instead of trusting `expires_at`.
    /// Costs one extra provider round trip per call.
    pub always_refresh: bool,
    /// Safety margin applied to `expires_at` when `always_refresh` is off.
    pub refresh_margin_secs: u64,
    pub slack: ProviderCredentials,
    pub quickbooks: ProviderCredentials,
}

impl OAuthConfig {
    pub fn credentials(&self, provider: Provider) -> &ProviderCredentials {
        match provider {
            Provider::Slack => &self.slack,
            Provider::Quickbooks => &self.quickbooks,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SlackConfig {
    /// Bot token for Web API calls (`chat.postMessage`). Optional: the OAuth
    /// flows work without it, only outbound notifications are skipped.
    pub bot_token: Option<SecretString>,
    pub notify_channel: Option<String>,
}

#[derive(Clone, Debug)]
pub struct QuickbooksConfig {
    pub api_base_url: String,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub callback_base_url: Option<String>,
    pub always_refresh: Option<bool>,
    pub slack_client_id: Option<String>,
    pub slack_client_secret: Option<String>,
    pub slack_redirect_uri: Option<String>,
    pub slack_token_endpoint: Option<String>,
    pub quickbooks_client_id: Option<String>,
    pub quickbooks_client_secret: Option<String>,
    pub quickbooks_redirect_uri: Option<String>,
    pub quickbooks_token_endpoint: Option<String>,
    pub quickbooks_api_base_url: Option<String>,
    pub slack_bot_token: Option<String>,
    pub slack_notify_channel: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://ledgerlink.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 3000,
                graceful_shutdown_secs: 15,
            },
            oauth: OAuthConfig {
                callback_base_url: None,
                http_timeout_secs: 10,
                always_refresh: true,
                refresh_margin_secs: 60,
                slack: ProviderCredentials::default(),
                quickbooks: ProviderCredentials::default(),
            },
            slack: SlackConfig { bot_token: None, notify_channel: None },
            quickbooks: QuickbooksConfig {
                api_base_url: "https://sandbox-quickbooks.api.intuit.com/v3/company".to_string(),
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    server: Option<ServerPatch>,
    oauth: Option<OAuthPatch>,
    slack: Option<SlackPatch>,
    quickbooks: Option<QuickbooksPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderCredentialsPatch {
    client_id: Option<String>,
    client_secret: Option<String>,
    redirect_uri: Option<String>,
    authorize_endpoint: Option<String>,
    token_endpoint: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OAuthPatch {
    callback_base_url: Option<String>,
    http_timeout_secs: Option<u64>,
    always_refresh: Option<bool>,
    refresh_margin_secs: Option<u64>,
    slack: Option<ProviderCredentialsPatch>,
    quickbooks: Option<ProviderCredentialsPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct SlackPatch {
    bot_token: Option<String>,
    notify_channel: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct QuickbooksPatch {
    api_base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("ledgerlink.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(oauth) = patch.oauth {
            if let Some(callback_base_url) = oauth.callback_base_url {
                self.oauth.callback_base_url = Some(callback_base_url);
            }
            if let Some(http_timeout_secs) = oauth.http_timeout_secs {
                self.oauth.http_timeout_secs = http_timeout_secs;
            }
            if let Some(always_refresh) = oauth.always_refresh {
                self.oauth.always_refresh = always_refresh;
            }
            if let Some(refresh_margin_secs) = oauth.refresh_margin_secs {
                self.oauth.refresh_margin_secs = refresh_margin_secs;
            }
            if let Some(slack) = oauth.slack {
                apply_credentials_patch(&mut self.oauth.slack, slack);
            }
            if let Some(quickbooks) = oauth.quickbooks {
                apply_credentials_patch(&mut self.oauth.quickbooks, quickbooks);
            }
        }

        if let Some(slack) = patch.slack {
            if let Some(bot_token) = slack.bot_token {
                self.slack.bot_token = Some(secret_value(bot_token));
            }
            if let Some(notify_channel) = slack.notify_channel {
                self.slack.notify_channel = Some(notify_channel);
            }
        }

        if let Some(quickbooks) = patch.quickbooks {
            if let Some(api_base_url) = quickbooks.api_base_url {
                self.quickbooks.api_base_url = api_base_url;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("LEDGERLINK_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("LEDGERLINK_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("LEDGERLINK_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("LEDGERLINK_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("LEDGERLINK_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("LEDGERLINK_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("LEDGERLINK_SERVER_PORT") {
            self.server.port = parse_u16("LEDGERLINK_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("LEDGERLINK_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("LEDGERLINK_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("LEDGERLINK_OAUTH_CALLBACK_BASE_URL") {
            self.oauth.callback_base_url = Some(value);
        }
        if let Some(value) = read_env("LEDGERLINK_OAUTH_HTTP_TIMEOUT_SECS") {
            self.oauth.http_timeout_secs =
                parse_u64("LEDGERLINK_OAUTH_HTTP_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("LEDGERLINK_OAUTH_ALWAYS_REFRESH") {
            self.oauth.always_refresh = parse_bool("LEDGERLINK_OAUTH_ALWAYS_REFRESH", &value)?;
        }
        if let Some(value) = read_env("LEDGERLINK_OAUTH_REFRESH_MARGIN_SECS") {
            self.oauth.refresh_margin_secs =
                parse_u64("LEDGERLINK_OAUTH_REFRESH_MARGIN_SECS", &value)?;
        }

        if let Some(value) = read_env("LEDGERLINK_OAUTH_SLACK_CLIENT_ID") {
            self.oauth.slack.client_id = Some(value);
        }
        if let Some(value) = read_env("LEDGERLINK_OAUTH_SLACK_CLIENT_SECRET") {
            self.oauth.slack.client_secret = Some(secret_value(value));
        }
        if let Some(value) = read_env("LEDGERLINK_OAUTH_SLACK_REDIRECT_URI") {
            self.oauth.slack.redirect_uri = Some(value);
        }
        if let Some(value) = read_env("LEDGERLINK_OAUTH_QUICKBOOKS_CLIENT_ID") {
            self.oauth.quickbooks.client_id = Some(value);
        }
        if let Some(value) = read_env("LEDGERLINK_OAUTH_QUICKBOOKS_CLIENT_SECRET") {
            self.oauth.quickbooks.client_secret = Some(secret_value(value));
        }
        if let Some(value) = read_env("LEDGERLINK_OAUTH_QUICKBOOKS_REDIRECT_URI") {
            self.oauth.quickbooks.redirect_uri = Some(value);
        }

        if let Some(value) = read_env("LEDGERLINK_SLACK_BOT_TOKEN") {
            self.slack.bot_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("LEDGERLINK_SLACK_NOTIFY_CHANNEL") {
            self.slack.notify_channel = Some(value);
        }

        if let Some(value) = read_env("LEDGERLINK_QUICKBOOKS_API_BASE_URL") {
            self.quickbooks.api_base_url = value;
        }

        let log_level =
            read_env("LEDGERLINK_LOGGING_LEVEL").or_else(|| read_env("LEDGERLINK_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("LEDGERLINK_LOGGING_FORMAT").or_else(|| read_env("LEDGERLINK_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(callback_base_url) = overrides.callback_base_url {
            self.oauth.callback_base_url = Some(callback_base_url);
        }
        if let Some(always_refresh) = overrides.always_refresh {
            self.oauth.always_refresh = always_refresh;
        }
        if let Some(client_id) = overrides.slack_client_id {
            self.oauth.slack.client_id = Some(client_id);
        }
        if let Some(client_secret) = overrides.slack_client_secret {
            self.oauth.slack.client_secret = Some(secret_value(client_secret));
        }
        if let Some(redirect_uri) = overrides.slack_redirect_uri {
            self.oauth.slack.redirect_uri = Some(redirect_uri);
        }
        if let Some(token_endpoint) = overrides.slack_token_endpoint {
            self.oauth.slack.token_endpoint = Some(token_endpoint);
        }
        if let Some(client_id) = overrides.quickbooks_client_id {
            self.oauth.quickbooks.client_id = Some(client_id);
        }
        if let Some(client_secret) = overrides.quickbooks_client_secret {
            self.oauth.quickbooks.client_secret = Some(secret_value(client_secret));
        }
        if let Some(redirect_uri) = overrides.quickbooks_redirect_uri {
            self.oauth.quickbooks.redirect_uri = Some(redirect_uri);
        }
        if let Some(token_endpoint) = overrides.quickbooks_token_endpoint {
            self.oauth.quickbooks.token_endpoint = Some(token_endpoint);
        }
        if let Some(api_base_url) = overrides.quickbooks_api_base_url {
            self.quickbooks.api_base_url = api_base_url;
        }
        if let Some(bot_token) = overrides.slack_bot_token {
            self.slack.bot_token = Some(secret_value(bot_token));
        }
        if let Some(notify_channel) = overrides.slack_notify_channel {
            self.slack.notify_channel = Some(notify_channel);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_server(&self.server)?;
        validate_oauth(&self.oauth)?;
        validate_slack(&self.slack)?;
        validate_quickbooks(&self.quickbooks)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn apply_credentials_patch(target: &mut ProviderCredentials, patch: ProviderCredentialsPatch) {
    if let Some(client_id) = patch.client_id {
        target.client_id = Some(client_id);
    }
    if let Some(client_secret) = patch.client_secret {
        target.client_secret = Some(secret_value(client_secret));
    }
    if let Some(redirect_uri) = patch.redirect_uri {
        target.redirect_uri = Some(redirect_uri);
    }
    if let Some(authorize_endpoint) = patch.authorize_endpoint {
        target.authorize_endpoint = Some(authorize_endpoint);
    }
    if let Some(token_endpoint) = patch.token_endpoint {
        target.token_endpoint = Some(token_endpoint);
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("ledgerlink.toml"), PathBuf::from("config/ledgerlink.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_oauth(oauth: &OAuthConfig) -> Result<(), ConfigError> {
    if oauth.http_timeout_secs == 0 || oauth.http_timeout_secs > 30 {
        return Err(ConfigError::Validation(
            "oauth.http_timeout_secs must be in range 1..=30".to_string(),
        ));
    }

    if oauth.refresh_margin_secs > 3600 {
        return Err(ConfigError::Validation(
            "oauth.refresh_margin_secs must be at most 3600".to_string(),
        ));
    }

    if let Some(base_url) = &oauth.callback_base_url {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "oauth.callback_base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    validate_credentials("oauth.slack", &oauth.slack)?;
    validate_credentials("oauth.quickbooks", &oauth.quickbooks)?;

    Ok(())
}

// Credentials may be absent entirely (the provider is simply not connected),
// but a half-configured pair is always a mistake.
fn validate_credentials(section: &str, creds: &ProviderCredentials) -> Result<(), ConfigError> {
    let has_id = creds.client_id.as_ref().map(|value| !value.trim().is_empty()).unwrap_or(false);
    let has_secret = creds
        .client_secret
        .as_ref()
        .map(|value| !value.expose_secret().trim().is_empty())
        .unwrap_or(false);

    if has_id != has_secret {
        return Err(ConfigError::Validation(format!(
            "{section}.client_id and {section}.client_secret must be configured together"
        )));
    }

    if let Some(redirect_uri) = &creds.redirect_uri {
        if !redirect_uri.starts_with("http://") && !redirect_uri.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "{section}.redirect_uri must start with http:// or https://"
            )));
        }
    }

    Ok(())
}

fn validate_slack(slack: &SlackConfig) -> Result<(), ConfigError> {
    if let Some(bot_token) = &slack.bot_token {
        if !bot_token.expose_secret().starts_with("xoxb-") {
            return Err(ConfigError::Validation(
                "slack.bot_token must start with `xoxb-`. Get it from https://api.slack.com/apps > Your App > OAuth & Permissions > Bot User OAuth Token".to_string()
            ));
        }
    }

    Ok(())
}

fn validate_quickbooks(quickbooks: &QuickbooksConfig) -> Result<(), ConfigError> {
    if !quickbooks.api_base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "quickbooks.api_base_url must start with https://".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnvOverride {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use secrecy::ExposeSecret;

    use super::{AppConfig, ConfigOverrides, LoadOptions};

    fn load_with(overrides: ConfigOverrides) -> Result<AppConfig, super::ConfigError> {
        AppConfig::load(LoadOptions { overrides, ..LoadOptions::default() })
    }

    #[test]
    fn defaults_pass_validation() {
        let config = load_with(ConfigOverrides::default()).expect("defaults should load");
        assert!(config.oauth.always_refresh);
        assert_eq!(config.oauth.refresh_margin_secs, 60);
        assert!(config.oauth.slack.client_id.is_none());
    }

    #[test]
    fn overrides_take_precedence() {
        let config = load_with(ConfigOverrides {
            database_url: Some("sqlite::memory:".to_string()),
            quickbooks_client_id: Some("ABC".to_string()),
            quickbooks_client_secret: Some("shhh".to_string()),
            always_refresh: Some(false),
            ..ConfigOverrides::default()
        })
        .expect("overrides should load");

        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.oauth.quickbooks.client_id.as_deref(), Some("ABC"));
        assert_eq!(
            config.oauth.quickbooks.client_secret.as_ref().map(|s| s.expose_secret().to_string()),
            Some("shhh".to_string())
        );
        assert!(!config.oauth.always_refresh);
    }

    #[test]
    fn half_configured_credentials_are_rejected() {
        let result = load_with(ConfigOverrides {
            quickbooks_client_id: Some("ABC".to_string()),
            ..ConfigOverrides::default()
        });

        let message = result.err().expect("validation should fail").to_string();
        assert!(message.contains("oauth.quickbooks.client_id"));
    }

    #[test]
    fn malformed_bot_token_is_rejected() {
        let result = load_with(ConfigOverrides {
            slack_bot_token: Some("xapp-wrong-kind".to_string()),
            ..ConfigOverrides::default()
        });

        let message = result.err().expect("validation should fail").to_string();
        assert!(message.contains("xoxb-"));
    }

    #[test]
    fn config_file_patch_is_applied() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            "[oauth]\ncallback_base_url = \"https://example.test\"\n\n\
             [oauth.slack]\nclient_id = \"slack-id\"\nclient_secret = \"slack-secret\"\n"
        )
        .expect("write config");

        let config = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            require_file: true,
            overrides: ConfigOverrides::default(),
        })
        .expect("file should load");

        assert_eq!(config.oauth.callback_base_url.as_deref(), Some("https://example.test"));
        assert_eq!(config.oauth.slack.client_id.as_deref(), Some("slack-id"));
    }
}
