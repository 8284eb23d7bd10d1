use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use thiserror::Error;
use tracing::info;

use ledgerlink_core::config::{AppConfig, ConfigError, LoadOptions};
use ledgerlink_db::repositories::{
    ConnectionRepository, OAuthStateRepository, SqlConnectionRepository, SqlOAuthStateRepository,
};
use ledgerlink_db::{connect, migrations, DbPool};
use ledgerlink_slack::api::SlackWebClient;
use ledgerlink_vault::TokenVault;

use crate::health;
use crate::oauth::{self, ConnectionNotifier, OAuthRoutesState};
use crate::quickbooks::{self, QuickBooksApi};
use crate::slack_commands::{self, SlackCommandState};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub vault: Arc<TokenVault>,
    pub oauth_states: Arc<dyn OAuthStateRepository>,
    pub quickbooks: QuickBooksApi,
    pub notifier: Option<Arc<ConnectionNotifier>>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("http client construction failed: {0}")]
    HttpClient(#[source] reqwest::Error),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool = connect(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    // One outbound client shared by the vault, the QuickBooks API layer,
    // and Slack notifications.
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.oauth.http_timeout_secs))
        .build()
        .map_err(BootstrapError::HttpClient)?;

    let connections: Arc<dyn ConnectionRepository> =
        Arc::new(SqlConnectionRepository::new(db_pool.clone()));
    let oauth_states: Arc<dyn OAuthStateRepository> =
        Arc::new(SqlOAuthStateRepository::new(db_pool.clone()));

    let vault = Arc::new(TokenVault::from_config(&config.oauth, connections, http.clone()));
    let quickbooks =
        QuickBooksApi::new(vault.clone(), http.clone(), config.quickbooks.api_base_url.clone());

    let notifier = match (&config.slack.bot_token, &config.slack.notify_channel) {
        (Some(bot_token), Some(channel)) => Some(Arc::new(ConnectionNotifier::new(
            SlackWebClient::new(bot_token.clone(), http),
            channel.clone(),
        ))),
        _ => None,
    };

    info!(
        event_name = "system.bootstrap.ready",
        notifications = notifier.is_some(),
        "application bootstrap complete"
    );
    Ok(Application { config, db_pool, vault, oauth_states, quickbooks, notifier })
}

/// Single router serving health, OAuth, QuickBooks, and Slack routes.
pub fn app_router(app: &Application) -> Router {
    Router::new()
        .merge(health::router(app.db_pool.clone()))
        .merge(oauth::router(OAuthRoutesState {
            vault: app.vault.clone(),
            states: app.oauth_states.clone(),
            notifier: app.notifier.clone(),
        }))
        .merge(quickbooks::router(app.quickbooks.clone()))
        .merge(slack_commands::router(SlackCommandState {
            quickbooks: app.quickbooks.clone(),
            connect_base_url: app.config.oauth.callback_base_url.clone(),
        }))
}
