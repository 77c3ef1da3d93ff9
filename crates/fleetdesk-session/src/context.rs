//! Authentication state shared by the whole app

use chrono::Utc;
use fleetdesk_api::{ApiClient, AuthApi, Credentials, Result as ApiResult};
use fleetdesk_core::{Action, Resource, Session, User};
use fleetdesk_storage::StateStore;
use fleetdesk_storage::keys::ACCESS_TOKEN_KEY;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::token::is_token_expired;

/// Owns the current [`Session`] and the persisted access token.
///
/// Consumers read it with [`current`](Self::current) or follow changes
/// through [`subscribe`](Self::subscribe). Restoring a session never fails;
/// anything wrong with the stored token just ends in `Unauthenticated`.
pub struct SessionContext {
    api: Arc<ApiClient>,
    auth: AuthApi,
    store: Arc<dyn StateStore>,
    state: watch::Sender<Session>,
}

impl SessionContext {
    pub fn new(api: Arc<ApiClient>, store: Arc<dyn StateStore>) -> Self {
        let (state, _) = watch::channel(Session::loading());
        Self {
            auth: AuthApi::new(Arc::clone(&api)),
            api,
            store,
            state,
        }
    }

    pub fn api(&self) -> &Arc<ApiClient> {
        &self.api
    }

    pub fn current(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn has_permission(&self, resource: Resource, action: Action) -> bool {
        self.state.borrow().has_permission(resource, action)
    }

    /// Restore the session from the persisted token, starting from `Loading`
    pub async fn initialize(&self) -> Session {
        self.state.send_replace(Session::loading());
        self.refresh().await
    }

    /// Re-check the persisted token against the backend
    pub async fn refresh(&self) -> Session {
        let token = match self.store.get(ACCESS_TOKEN_KEY).await {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!("Failed to read stored token: {}", e);
                None
            }
        };

        let Some(token) = token else {
            debug!("No stored token");
            self.api.clear_token();
            return self.publish(Session::unauthenticated());
        };

        if is_token_expired(&token, Utc::now()) {
            debug!("Stored token expired, discarding it");
            self.forget_token().await;
            return self.publish(Session::unauthenticated());
        }

        self.api.set_token(&token);
        match self.auth.my_account().await {
            Ok(user) => {
                debug!("Restored session for user {}", user.id);
                self.publish(Session::authenticated(user))
            }
            Err(e) => {
                warn!("Failed to restore session: {}", e);
                self.forget_token().await;
                self.publish(Session::unauthenticated())
            }
        }
    }

    /// Exchange credentials for a session.
    ///
    /// On failure the current session is left as it was.
    pub async fn login(&self, credentials: &Credentials) -> ApiResult<User> {
        let response = self.auth.login(credentials).await?;
        self.api.set_token(&response.access_token);

        let user = match response.user {
            Some(user) => user,
            None => match self.auth.my_account().await {
                Ok(user) => user,
                Err(e) => {
                    self.restore_client_token().await;
                    return Err(e);
                }
            },
        };

        if let Err(e) = self
            .store
            .set(ACCESS_TOKEN_KEY, response.access_token.clone())
            .await
        {
            warn!("Failed to persist access token: {}", e);
        }

        info!("Signed in as {}", user.id);
        self.publish(Session::authenticated(user.clone()));
        Ok(user)
    }

    pub async fn logout(&self) {
        self.forget_token().await;
        self.publish(Session::unauthenticated());
        info!("Signed out");
    }

    async fn forget_token(&self) {
        self.api.clear_token();
        if let Err(e) = self.store.delete(ACCESS_TOKEN_KEY).await {
            warn!("Failed to remove stored token: {}", e);
        }
    }

    /// Put back whatever token the client used before a failed login
    async fn restore_client_token(&self) {
        match self.store.get(ACCESS_TOKEN_KEY).await {
            Ok(Some(token)) if !token.is_empty() => self.api.set_token(token),
            _ => self.api.clear_token(),
        }
    }

    fn publish(&self, session: Session) -> Session {
        self.state.send_replace(session.clone());
        session
    }
}
