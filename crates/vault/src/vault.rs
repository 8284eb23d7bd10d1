use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use chrono::{Duration, Utc};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use ledgerlink_core::config::OAuthConfig;
use ledgerlink_core::domain::connection::{Connection, Provider};
use ledgerlink_db::repositories::ConnectionRepository;

use crate::errors::VaultError;
use crate::providers::{
    ProviderSettings, ProviderTokenClient, QuickbooksTokenClient, SlackTokenClient,
};

/// When a stored access token is refreshed before being handed out.
///
/// `always_refresh = true` refreshes on every hand-out regardless of
/// `expires_at`. It trades an extra provider round trip for guaranteed
/// freshness even when the advertised lifetime is wrong or absent. The expiry-aware alternative refreshes only within
/// `refresh_margin` of expiry, cutting request volume to the provider.
#[derive(Clone, Copy, Debug)]
pub struct RefreshPolicy {
    pub always_refresh: bool,
    pub refresh_margin: Duration,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self { always_refresh: true, refresh_margin: Duration::seconds(60) }
    }
}

impl RefreshPolicy {
    pub fn from_config(config: &OAuthConfig) -> Self {
        Self {
            always_refresh: config.always_refresh,
            refresh_margin: Duration::seconds(config.refresh_margin_secs as i64),
        }
    }

    pub fn expiry_aware(margin: Duration) -> Self {
        Self { always_refresh: false, refresh_margin: margin }
    }
}

/// Extra values delivered on the OAuth callback rather than in the token
/// response. QuickBooks reports its realm id this way.
#[derive(Clone, Debug, Default)]
pub struct CallbackContext {
    pub external_account_id: Option<String>,
}

type RefreshLockKey = (String, Provider);

/// Owns the lifecycle of OAuth credentials per `(user, provider)` pair:
/// authorization URL construction, code exchange, persistence, and
/// refresh-on-demand.
pub struct TokenVault {
    providers: HashMap<Provider, Arc<dyn ProviderTokenClient>>,
    store: Arc<dyn ConnectionRepository>,
    policy: RefreshPolicy,
    // Serializes refreshes per (user, provider) so two concurrent refreshes
    // cannot race each other's writes and orphan a live token pair.
    refresh_locks: StdMutex<HashMap<RefreshLockKey, Arc<AsyncMutex<()>>>>,
}

impl TokenVault {
    pub fn new(store: Arc<dyn ConnectionRepository>, policy: RefreshPolicy) -> Self {
        Self {
            providers: HashMap::new(),
            store,
            policy,
            refresh_locks: StdMutex::new(HashMap::new()),
        }
    }

    pub fn with_provider(mut self, client: Arc<dyn ProviderTokenClient>) -> Self {
        self.providers.insert(client.provider(), client);
        self
    }

    /// Registers a real token client for every provider whose credentials
    /// are configured. Unconfigured providers stay unregistered and surface
    /// `ConfigMissing` on first use.
    pub fn from_config(
        config: &OAuthConfig,
        store: Arc<dyn ConnectionRepository>,
        http: reqwest::Client,
    ) -> Self {
        let mut vault = Self::new(store, RefreshPolicy::from_config(config));

        for provider in [Provider::Slack, Provider::Quickbooks] {
            match ProviderSettings::from_config(provider, config) {
                Ok(settings) => {
                    let client: Arc<dyn ProviderTokenClient> = match provider {
                        Provider::Slack => {
                            Arc::new(SlackTokenClient::new(settings, http.clone()))
                        }
                        Provider::Quickbooks => {
                            Arc::new(QuickbooksTokenClient::new(settings, http.clone()))
                        }
                    };
                    vault.providers.insert(provider, client);
                }
                Err(error) => {
                    debug!(
                        event_name = "vault.provider.unconfigured",
                        provider = provider.as_str(),
                        reason = %error,
                        "provider not registered"
                    );
                }
            }
        }

        vault
    }

    fn client(&self, provider: Provider) -> Result<&Arc<dyn ProviderTokenClient>, VaultError> {
        self.providers
            .get(&provider)
            .ok_or(VaultError::ConfigMissing { provider, detail: "client credentials" })
    }

    /// Consent URL for the provider with the caller-supplied CSRF state.
    /// Pure construction; the only failure mode is missing configuration.
    pub fn authorization_url(
        &self,
        provider: Provider,
        state: &str,
    ) -> Result<String, VaultError> {
        Ok(self.client(provider)?.authorization_url(state))
    }

    pub async fn connection(
        &self,
        user_id: &str,
        provider: Provider,
    ) -> Result<Option<Connection>, VaultError> {
        Ok(self.store.find(user_id, provider).await?)
    }

    /// Exchanges an authorization code and upserts the resulting connection,
    /// keyed by `(user_id, provider)`. Returns the record as stored.
    pub async fn exchange_code(
        &self,
        user_id: &str,
        provider: Provider,
        code: &str,
        callback: CallbackContext,
    ) -> Result<Connection, VaultError> {
        let client = self.client(provider)?;
        let grant = client.exchange_code(code).await?;

        let now = Utc::now();
        let connection = Connection {
            user_id: user_id.to_string(),
            provider,
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            external_account_id: grant.external_account_id.or(callback.external_account_id),
            scope: grant.scope,
            obtained_at: now,
            expires_at: grant.expires_in.map(|secs| now + Duration::seconds(secs)),
        };

        let stored = self.store.upsert(&connection).await?;
        info!(
            event_name = "vault.exchange.connected",
            provider = provider.as_str(),
            user_id,
            external_account_id = stored.external_account_id.as_deref().unwrap_or("unknown"),
            "authorization code exchanged and connection stored"
        );
        Ok(stored)
    }

    /// Hands out an access token valid at the moment of return, refreshing
    /// first according to the configured policy. Fails with `NotConnected`
    /// before any network call when no connection exists.
    pub async fn get_valid_access_token(
        &self,
        user_id: &str,
        provider: Provider,
    ) -> Result<String, VaultError> {
        let connection = self.store.find(user_id, provider).await?.ok_or_else(|| {
            VaultError::NotConnected { provider, user_id: user_id.to_string() }
        })?;

        // Non-rotating grants (Slack apps without token rotation) carry no
        // refresh token; the issued access token is long-lived and handed
        // out as-is.
        if connection.refresh_token.is_none() {
            return Ok(connection.access_token);
        }

        if self.policy.always_refresh
            || connection.refresh_due(Utc::now(), self.policy.refresh_margin)
        {
            return self.refresh(user_id, provider).await;
        }

        Ok(connection.access_token)
    }

    /// Refreshes the stored connection in place and returns the new access
    /// token. A rejected refresh leaves the stored connection unchanged.
    pub async fn refresh(&self, user_id: &str, provider: Provider) -> Result<String, VaultError> {
        let lock = self.refresh_lock(user_id, provider);
        let guard = lock.lock().await;
        let result = self.refresh_locked(user_id, provider).await;
        drop(guard);
        drop(lock);
        self.prune_refresh_lock(user_id, provider);
        result
    }

    async fn refresh_locked(
        &self,
        user_id: &str,
        provider: Provider,
    ) -> Result<String, VaultError> {
        let connection = self.store.find(user_id, provider).await?.ok_or_else(|| {
            VaultError::NotConnected { provider, user_id: user_id.to_string() }
        })?;
        let refresh_token = connection.refresh_token.clone().ok_or_else(|| {
            VaultError::RefreshFailed {
                provider,
                reason: "no refresh token on record; reauthorization required".to_string(),
            }
        })?;

        let client = self.client(provider)?;
        let grant = match client.refresh(&refresh_token).await {
            Ok(grant) => grant,
            Err(error) => {
                warn!(
                    event_name = "vault.refresh.failed",
                    provider = provider.as_str(),
                    user_id,
                    error = %error,
                    "token refresh rejected; stored connection left untouched"
                );
                return Err(error);
            }
        };

        let now = Utc::now();
        let updated = Connection {
            access_token: grant.access_token,
            // Providers may omit the refresh token on refresh responses;
            // the prior value must survive.
            refresh_token: grant.refresh_token.or(connection.refresh_token.clone()),
            scope: grant.scope.or(connection.scope.clone()),
            obtained_at: now,
            expires_at: grant.expires_in.map(|secs| now + Duration::seconds(secs)),
            ..connection
        };

        let stored = self.store.upsert(&updated).await?;
        info!(
            event_name = "vault.refresh.success",
            provider = provider.as_str(),
            user_id,
            "access token refreshed"
        );
        Ok(stored.access_token)
    }

    fn refresh_lock(&self, user_id: &str, provider: Provider) -> Arc<AsyncMutex<()>> {
        let mut locks = self.refresh_locks.lock().expect("refresh lock map poisoned");
        locks.entry((user_id.to_string(), provider)).or_default().clone()
    }

    // Drops the map entry once no refresh holds or awaits it, so the map
    // does not grow unboundedly with one entry per (user, provider) seen.
    fn prune_refresh_lock(&self, user_id: &str, provider: Provider) {
        let mut locks = self.refresh_locks.lock().expect("refresh lock map poisoned");
        let key = (user_id.to_string(), provider);
        if locks.get(&key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{Duration, Utc};

    use ledgerlink_core::domain::connection::{Connection, Provider};
    use ledgerlink_db::repositories::{ConnectionRepository, InMemoryConnectionRepository};
    use secrecy::SecretString;

    use super::{CallbackContext, RefreshPolicy, TokenVault};
    use crate::errors::VaultError;
    use crate::providers::{
        ProviderSettings, ProviderTokenClient, QuickbooksTokenClient, TokenGrant,
    };

    struct ScriptedTokenClient {
        provider: Provider,
        exchanges: Mutex<VecDeque<Result<TokenGrant, VaultError>>>,
        refreshes: Mutex<VecDeque<Result<TokenGrant, VaultError>>>,
        exchange_calls: AtomicUsize,
        refresh_calls: AtomicUsize,
    }

    impl ScriptedTokenClient {
        fn new(provider: Provider) -> Arc<Self> {
            Arc::new(Self {
                provider,
                exchanges: Mutex::new(VecDeque::new()),
                refreshes: Mutex::new(VecDeque::new()),
                exchange_calls: AtomicUsize::new(0),
                refresh_calls: AtomicUsize::new(0),
            })
        }

        fn script_exchange(self: &Arc<Self>, result: Result<TokenGrant, VaultError>) {
            self.exchanges.lock().expect("script lock").push_back(result);
        }

        fn script_refresh(self: &Arc<Self>, result: Result<TokenGrant, VaultError>) {
            self.refreshes.lock().expect("script lock").push_back(result);
        }

        fn exchange_calls(&self) -> usize {
            self.exchange_calls.load(Ordering::SeqCst)
        }

        fn refresh_calls(&self) -> usize {
            self.refresh_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProviderTokenClient for ScriptedTokenClient {
        fn provider(&self) -> Provider {
            self.provider
        }

        fn authorization_url(&self, state: &str) -> String {
            format!("https://consent.test/authorize?state={state}")
        }

        async fn exchange_code(&self, _code: &str) -> Result<TokenGrant, VaultError> {
            self.exchange_calls.fetch_add(1, Ordering::SeqCst);
            self.exchanges
                .lock()
                .expect("script lock")
                .pop_front()
                .expect("unscripted exchange call")
        }

        async fn refresh(&self, _refresh_token: &str) -> Result<TokenGrant, VaultError> {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            self.refreshes
                .lock()
                .expect("script lock")
                .pop_front()
                .expect("unscripted refresh call")
        }
    }

    fn grant(access_token: &str, refresh_token: Option<&str>, expires_in: Option<i64>) -> TokenGrant {
        TokenGrant {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.map(str::to_string),
            expires_in,
            external_account_id: None,
            scope: None,
        }
    }

    fn seeded_connection(expires_in_secs: Option<i64>) -> Connection {
        let now = Utc::now();
        Connection {
            user_id: "user-1".to_string(),
            provider: Provider::Quickbooks,
            access_token: "AT1".to_string(),
            refresh_token: Some("RT1".to_string()),
            external_account_id: Some("realm-42".to_string()),
            scope: None,
            obtained_at: now,
            expires_at: expires_in_secs.map(|secs| now + Duration::seconds(secs)),
        }
    }

    fn vault_with(
        store: Arc<InMemoryConnectionRepository>,
        client: Arc<ScriptedTokenClient>,
        policy: RefreshPolicy,
    ) -> TokenVault {
        TokenVault::new(store, policy).with_provider(client)
    }

    #[tokio::test]
    async fn exchange_code_persists_and_returns_stored_connection() {
        let store = Arc::new(InMemoryConnectionRepository::new());
        let client = ScriptedTokenClient::new(Provider::Quickbooks);
        client.script_exchange(Ok(grant("AT1", Some("RT1"), Some(3600))));
        let vault = vault_with(store.clone(), client.clone(), RefreshPolicy::default());

        let stored = vault
            .exchange_code(
                "user-1",
                Provider::Quickbooks,
                "AUTHCODE1",
                CallbackContext { external_account_id: Some("realm-42".to_string()) },
            )
            .await
            .expect("exchange should succeed");

        assert_eq!(stored.access_token, "AT1");
        assert_eq!(stored.refresh_token.as_deref(), Some("RT1"));
        assert_eq!(stored.external_account_id.as_deref(), Some("realm-42"));
        assert!(stored.expires_at.is_some());

        let found = store
            .find("user-1", Provider::Quickbooks)
            .await
            .expect("find should succeed")
            .expect("connection should be stored");
        assert_eq!(found, stored);
    }

    #[tokio::test]
    async fn handout_returns_exchanged_token_without_refresh_when_fresh() {
        let store = Arc::new(InMemoryConnectionRepository::new());
        let client = ScriptedTokenClient::new(Provider::Quickbooks);
        client.script_exchange(Ok(grant("AT1", Some("RT1"), Some(3600))));
        let vault = vault_with(
            store,
            client.clone(),
            RefreshPolicy::expiry_aware(Duration::seconds(60)),
        );

        vault
            .exchange_code("user-1", Provider::Quickbooks, "AUTHCODE1", CallbackContext::default())
            .await
            .expect("exchange should succeed");
        let token = vault
            .get_valid_access_token("user-1", Provider::Quickbooks)
            .await
            .expect("handout should succeed");

        assert_eq!(token, "AT1", "absent an intervening refresh the issued token comes back");
        assert_eq!(client.refresh_calls(), 0);
    }

    #[tokio::test]
    async fn handout_without_connection_fails_offline() {
        let store = Arc::new(InMemoryConnectionRepository::new());
        let client = ScriptedTokenClient::new(Provider::Slack);
        let vault = vault_with(store, client.clone(), RefreshPolicy::default());

        let error = vault
            .get_valid_access_token("ghost", Provider::Slack)
            .await
            .err()
            .expect("handout must fail");

        assert!(matches!(
            error,
            VaultError::NotConnected { provider: Provider::Slack, ref user_id } if user_id == "ghost"
        ));
        assert_eq!(client.exchange_calls(), 0, "no network call may happen");
        assert_eq!(client.refresh_calls(), 0, "no network call may happen");
    }

    #[tokio::test]
    async fn always_refresh_policy_refreshes_every_handout() {
        let store =
            Arc::new(InMemoryConnectionRepository::with_connection(seeded_connection(Some(3600))));
        let client = ScriptedTokenClient::new(Provider::Quickbooks);
        client.script_refresh(Ok(grant("AT2", Some("RT2"), Some(3600))));
        client.script_refresh(Ok(grant("AT3", Some("RT3"), Some(3600))));
        let vault = vault_with(store, client.clone(), RefreshPolicy::default());

        let first = vault
            .get_valid_access_token("user-1", Provider::Quickbooks)
            .await
            .expect("handout should succeed");
        let second = vault
            .get_valid_access_token("user-1", Provider::Quickbooks)
            .await
            .expect("handout should succeed");

        assert_eq!(first, "AT2");
        assert_eq!(second, "AT3");
        assert_eq!(client.refresh_calls(), 2);
    }

    #[tokio::test]
    async fn expiry_aware_policy_refreshes_inside_margin() {
        let store =
            Arc::new(InMemoryConnectionRepository::with_connection(seeded_connection(Some(10))));
        let client = ScriptedTokenClient::new(Provider::Quickbooks);
        client.script_refresh(Ok(grant("AT2", None, Some(3600))));
        let vault = vault_with(
            store,
            client.clone(),
            RefreshPolicy::expiry_aware(Duration::seconds(60)),
        );

        let token = vault
            .get_valid_access_token("user-1", Provider::Quickbooks)
            .await
            .expect("handout should succeed");

        assert_eq!(token, "AT2");
        assert_eq!(client.refresh_calls(), 1);
    }

    #[tokio::test]
    async fn non_rotating_connection_hands_out_stored_token() {
        let now = Utc::now();
        let seeded = Connection {
            user_id: "user-1".to_string(),
            provider: Provider::Slack,
            access_token: "xoxb-longlived".to_string(),
            refresh_token: None,
            external_account_id: Some("T012345".to_string()),
            scope: Some("chat:write,commands".to_string()),
            obtained_at: now,
            expires_at: None,
        };
        let store = Arc::new(InMemoryConnectionRepository::with_connection(seeded));
        let client = ScriptedTokenClient::new(Provider::Slack);
        let vault = vault_with(store, client.clone(), RefreshPolicy::default());

        let token = vault
            .get_valid_access_token("user-1", Provider::Slack)
            .await
            .expect("handout should succeed without a refresh token on record");

        assert_eq!(token, "xoxb-longlived");
        assert_eq!(client.refresh_calls(), 0, "nothing to refresh with, so no provider call");
    }

    #[tokio::test]
    async fn refresh_lock_entries_do_not_accumulate() {
        let store =
            Arc::new(InMemoryConnectionRepository::with_connection(seeded_connection(Some(3600))));
        let client = ScriptedTokenClient::new(Provider::Quickbooks);
        client.script_refresh(Ok(grant("AT2", Some("RT2"), Some(3600))));
        client.script_refresh(Ok(grant("AT3", Some("RT3"), Some(3600))));
        let vault = vault_with(store, client, RefreshPolicy::default());

        vault.refresh("user-1", Provider::Quickbooks).await.expect("first refresh");
        vault.refresh("user-1", Provider::Quickbooks).await.expect("second refresh");

        let locks = vault.refresh_locks.lock().expect("refresh lock map poisoned");
        assert!(locks.is_empty(), "idle lock entries must be dropped after the refresh finishes");
    }

    #[tokio::test]
    async fn rotating_refresh_tokens_track_the_latest_response() {
        let store =
            Arc::new(InMemoryConnectionRepository::with_connection(seeded_connection(Some(3600))));
        let client = ScriptedTokenClient::new(Provider::Quickbooks);
        client.script_refresh(Ok(grant("AT2", Some("RT2"), Some(3600))));
        client.script_refresh(Ok(grant("AT3", Some("RT3"), Some(3600))));
        let vault = vault_with(store.clone(), client, RefreshPolicy::default());

        let first = vault.refresh("user-1", Provider::Quickbooks).await.expect("first refresh");
        let second = vault.refresh("user-1", Provider::Quickbooks).await.expect("second refresh");

        assert_ne!(first, second);
        let connection = store
            .find("user-1", Provider::Quickbooks)
            .await
            .expect("find should succeed")
            .expect("connection should exist");
        assert_eq!(connection.access_token, "AT3");
        assert_eq!(connection.refresh_token.as_deref(), Some("RT3"));
    }

    #[tokio::test]
    async fn rejected_refresh_leaves_stored_connection_untouched() {
        let seeded = seeded_connection(Some(3600));
        let store = Arc::new(InMemoryConnectionRepository::with_connection(seeded.clone()));
        let client = ScriptedTokenClient::new(Provider::Quickbooks);
        client.script_refresh(Err(VaultError::RefreshFailed {
            provider: Provider::Quickbooks,
            reason: "token revoked".to_string(),
        }));
        let vault = vault_with(store.clone(), client, RefreshPolicy::default());

        let error = vault
            .refresh("user-1", Provider::Quickbooks)
            .await
            .err()
            .expect("refresh must fail");
        assert!(matches!(error, VaultError::RefreshFailed { .. }));

        let after = store
            .find("user-1", Provider::Quickbooks)
            .await
            .expect("find should succeed")
            .expect("connection should remain");
        assert_eq!(after, seeded, "a failed refresh must not mutate the stored connection");
    }

    #[tokio::test]
    async fn refresh_response_without_refresh_token_retains_prior_value() {
        let store = Arc::new(InMemoryConnectionRepository::new());
        let client = ScriptedTokenClient::new(Provider::Quickbooks);
        client.script_exchange(Ok(grant("AT1", Some("RT1"), Some(3600))));
        client.script_refresh(Ok(grant("AT2", None, Some(3600))));
        let vault = vault_with(store.clone(), client, RefreshPolicy::default());

        vault
            .exchange_code("user-1", Provider::Quickbooks, "AUTHCODE1", CallbackContext::default())
            .await
            .expect("exchange should succeed");
        let token = vault.refresh("user-1", Provider::Quickbooks).await.expect("refresh");

        assert_eq!(token, "AT2");
        let connection = store
            .find("user-1", Provider::Quickbooks)
            .await
            .expect("find should succeed")
            .expect("connection should exist");
        assert_eq!(connection.access_token, "AT2");
        assert_eq!(connection.refresh_token.as_deref(), Some("RT1"), "omitted token is retained");
    }

    #[tokio::test]
    async fn refresh_without_stored_refresh_token_fails_before_any_call() {
        let mut seeded = seeded_connection(Some(3600));
        seeded.refresh_token = None;
        let store = Arc::new(InMemoryConnectionRepository::with_connection(seeded.clone()));
        let client = ScriptedTokenClient::new(Provider::Quickbooks);
        let vault = vault_with(store.clone(), client.clone(), RefreshPolicy::default());

        let error = vault
            .refresh("user-1", Provider::Quickbooks)
            .await
            .err()
            .expect("refresh must fail");

        assert!(matches!(error, VaultError::RefreshFailed { .. }));
        assert_eq!(client.refresh_calls(), 0);
        let after = store
            .find("user-1", Provider::Quickbooks)
            .await
            .expect("find should succeed")
            .expect("connection should remain");
        assert_eq!(after, seeded);
    }

    #[tokio::test]
    async fn rejected_exchange_writes_nothing() {
        let store = Arc::new(InMemoryConnectionRepository::new());
        let client = ScriptedTokenClient::new(Provider::Slack);
        client.script_exchange(Err(VaultError::ExchangeFailed {
            provider: Provider::Slack,
            reason: "invalid_code".to_string(),
        }));
        let vault = vault_with(store.clone(), client, RefreshPolicy::default());

        let error = vault
            .exchange_code("user-1", Provider::Slack, "BADCODE", CallbackContext::default())
            .await
            .err()
            .expect("exchange must fail");

        assert!(matches!(error, VaultError::ExchangeFailed { .. }));
        assert!(store
            .find("user-1", Provider::Slack)
            .await
            .expect("find should succeed")
            .is_none());
    }

    #[tokio::test]
    async fn authorization_url_requires_registered_provider() {
        let store = Arc::new(InMemoryConnectionRepository::new());
        let vault = TokenVault::new(store, RefreshPolicy::default());

        let error = vault
            .authorization_url(Provider::Quickbooks, "STATE123")
            .err()
            .expect("unregistered provider must fail");
        assert!(matches!(
            error,
            VaultError::ConfigMissing { provider: Provider::Quickbooks, .. }
        ));
    }

    #[tokio::test]
    async fn quickbooks_authorization_url_embeds_expected_parameters() {
        let store = Arc::new(InMemoryConnectionRepository::new());
        let settings = ProviderSettings {
            client_id: "ABC".to_string(),
            client_secret: SecretString::from("shhh".to_string()),
            redirect_uri: "https://host/cb".to_string(),
            authorize_endpoint: "https://appcenter.intuit.com/connect/oauth2".to_string(),
            token_endpoint: "https://oauth.platform.intuit.com/oauth2/v1/tokens/bearer"
                .to_string(),
            scope: "com.intuit.quickbooks.accounting".to_string(),
        };
        let vault = TokenVault::new(store, RefreshPolicy::default()).with_provider(Arc::new(
            QuickbooksTokenClient::new(settings, reqwest::Client::new()),
        ));

        let url = vault
            .authorization_url(Provider::Quickbooks, "STATE123")
            .expect("url should build without any network call");

        assert!(url.starts_with("https://appcenter.intuit.com/connect/oauth2?"));
        assert!(url.contains("client_id=ABC"));
        assert!(url.contains("redirect_uri=https%3A%2F%2Fhost%2Fcb"));
        assert!(url.contains("state=STATE123"));
        assert!(url.contains("scope=com.intuit.quickbooks.accounting"));
        assert!(url.contains("response_type=code"));
    }
}
