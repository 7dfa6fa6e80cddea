//! Authenticated session: token, current user, query cache, auth state.
//!
//! A 401 from any read query ends the session: the token is dropped, the
//! cache is cleared, and the state flips to [`AuthState::LoggedOut`]. With no
//! token, protected requests fail before reaching the network.

use std::future::Future;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::{watch, RwLock};
use tracing::{debug, info, warn};

use labelwise_core::forms::{profile_changes, PasswordChange};
use labelwise_core::{ApiMessage, LabelingApi, Result, UserPublic, UserRegister};

use crate::api::ApiClient;
use crate::cache::{keys, QueryCache, QueryKey};
use crate::config::ClientConfig;

/// Observable authentication state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    LoggedOut,
    LoggedIn { user_id: i64, is_superuser: bool },
}

impl AuthState {
    pub fn is_logged_in(&self) -> bool {
        matches!(self, AuthState::LoggedIn { .. })
    }
}

/// Shared session handle. Clones refer to the same session.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    api: Arc<ApiClient>,
    cache: QueryCache,
    user: RwLock<Option<UserPublic>>,
    /// Token from the config, installed on the client by `restore()`.
    saved_token: RwLock<Option<String>>,
    state_tx: watch::Sender<AuthState>,
}

impl Session {
    /// Build a session from configuration. A token in the config is held
    /// back and only sent once [`Session::restore`] runs, so requests made
    /// before that fail as logged out.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let api = ApiClient::shared(&config.clone().with_token(None))?;
        let cache = QueryCache::new(config.stale_time(), config.read_retry_policy());
        Ok(Self::build(api, cache, config.token.clone()))
    }

    pub fn with_parts(api: Arc<ApiClient>, cache: QueryCache) -> Self {
        Self::build(api, cache, None)
    }

    fn build(api: Arc<ApiClient>, cache: QueryCache, saved_token: Option<String>) -> Self {
        let (state_tx, _) = watch::channel(AuthState::LoggedOut);
        Self {
            inner: Arc::new(SessionInner {
                api,
                cache,
                user: RwLock::new(None),
                saved_token: RwLock::new(saved_token),
                state_tx,
            }),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    pub fn api_arc(&self) -> Arc<ApiClient> {
        self.inner.api.clone()
    }

    pub fn cache(&self) -> &QueryCache {
        &self.inner.cache
    }

    pub fn state(&self) -> AuthState {
        *self.inner.state_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state_tx.subscribe()
    }

    pub async fn current_user(&self) -> Option<UserPublic> {
        self.inner.user.read().await.clone()
    }

    pub fn is_superuser(&self) -> bool {
        matches!(
            self.state(),
            AuthState::LoggedIn {
                is_superuser: true,
                ..
            }
        )
    }

    pub async fn token(&self) -> Option<String> {
        self.inner.api.token().await
    }

    /// Exchange credentials for a token and load the profile.
    pub async fn login(&self, username: &str, password: &str) -> Result<UserPublic> {
        let token = self.inner.api.login(username, password).await?;
        self.inner.api.set_token(Some(token.access_token)).await;
        self.load_profile().await
    }

    /// Confirm a pre-existing token by loading the profile.
    pub async fn restore(&self) -> Result<UserPublic> {
        if let Some(token) = self.inner.saved_token.write().await.take() {
            self.inner.api.set_token(Some(token)).await;
        }
        self.load_profile().await
    }

    async fn load_profile(&self) -> Result<UserPublic> {
        // Not retried: a profile that cannot be loaded leaves no session.
        let user = match self.inner.api.read_me().await {
            Ok(user) => user,
            Err(e) => {
                self.logout().await;
                return Err(e);
            }
        };
        self.inner.cache.set(keys::user(), &user).await?;
        self.set_user(user.clone()).await;
        info!(
            subsystem = "session",
            user_id = user.id,
            is_superuser = user.is_superuser,
            "Logged in"
        );
        Ok(user)
    }

    async fn set_user(&self, user: UserPublic) {
        let state = AuthState::LoggedIn {
            user_id: user.id,
            is_superuser: user.is_superuser,
        };
        *self.inner.user.write().await = Some(user);
        self.inner.state_tx.send_replace(state);
    }

    /// Self-service registration. Does not log in.
    pub async fn signup(&self, user: &UserRegister) -> Result<UserPublic> {
        let created = self.inner.api.signup(user).await?;
        info!(subsystem = "session", user_id = created.id, "Account created");
        Ok(created)
    }

    /// Drop token, cached data, and user. Idempotent.
    pub async fn logout(&self) {
        let was_logged_in = self.state().is_logged_in() || self.inner.api.has_token().await;
        self.inner.api.set_token(None).await;
        *self.inner.saved_token.write().await = None;
        self.inner.cache.clear().await;
        *self.inner.user.write().await = None;
        self.inner.state_tx.send_replace(AuthState::LoggedOut);
        if was_logged_in {
            info!(subsystem = "session", "Logged out");
        }
    }

    /// Cached read query. A 401 ends the session.
    pub async fn query<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match self.inner.cache.fetch(key, fetcher).await {
            Err(e) if e.is_unauthorized() => {
                warn!(subsystem = "session", error = %e, "Read query unauthorized, ending session");
                self.logout().await;
                Err(e)
            }
            other => other,
        }
    }

    /// Like [`Session::query`] but ignores any cached value.
    pub async fn refetch<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.inner.cache.invalidate(&key).await;
        self.query(key, fetcher).await
    }

    /// Mark cached queries under each prefix stale.
    pub async fn invalidate(&self, prefixes: &[QueryKey]) {
        for prefix in prefixes {
            self.inner.cache.invalidate(prefix).await;
        }
    }

    /// Send only the changed profile fields. Returns the current profile
    /// unchanged when nothing differs.
    pub async fn update_profile(
        &self,
        full_name: Option<&str>,
        email: Option<&str>,
    ) -> Result<UserPublic> {
        let current = match self.current_user().await {
            Some(user) => user,
            None => self.restore().await?,
        };
        let Some(update) = profile_changes(&current, full_name, email)? else {
            debug!(subsystem = "session", "Profile unchanged, nothing sent");
            return Ok(current);
        };
        let updated = self.inner.api.update_me(&update).await?;
        self.invalidate(&[keys::user()]).await;
        self.set_user(updated.clone()).await;
        Ok(updated)
    }

    pub async fn change_password(&self, form: &PasswordChange) -> Result<ApiMessage> {
        let request = form.validate()?;
        self.inner.api.update_password_me(&request).await
    }
}
