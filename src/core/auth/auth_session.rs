// Google credentials as seen by this bot.
//
// The bot never runs the OAuth protocol itself. An external provider (the
// host's external-auth service, or a service account) hands out access
// tokens and refreshes them on request. Each tool call or scheduled run gets
// its own `AuthSession` holding the token it uses, so no token is shared
// process-wide between unrelated invocations.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

pub const SCOPE_ANALYTICS_READONLY: &str = "https://www.googleapis.com/auth/analytics.readonly";
pub const SCOPE_ANALYTICS_EDIT: &str = "https://www.googleapis.com/auth/analytics.edit";
pub const SCOPE_TAGMANAGER_EDIT: &str =
    "https://www.googleapis.com/auth/tagmanager.edit.containers";
pub const SCOPE_TAGMANAGER_READONLY: &str = "https://www.googleapis.com/auth/tagmanager.readonly";

/// Every scope the bot asks for when it starts an authorization flow.
pub const REQUIRED_SCOPES: &[&str] = &[
    SCOPE_ANALYTICS_READONLY,
    SCOPE_TAGMANAGER_EDIT,
    SCOPE_TAGMANAGER_READONLY,
];

/// Tokens this close to expiry are refreshed before use.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no Google credentials available for this user")]
    NotAuthenticated,

    #[error("auth provider error: {0}")]
    Provider(String),
}

/// An OAuth access token owned by the external auth service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl AccessToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now + Duration::seconds(EXPIRY_MARGIN_SECS)
    }
}

/// Who the bot is acting for. Supplied by the host at startup.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Persona {
    pub persona_id: String,
    pub ws_id: String,
    pub owner_user_id: String,
    #[serde(default)]
    pub setup: serde_json::Value,
}

/// External source of Google access tokens.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Current token for the persona's owner, `None` if the user never authorized.
    async fn fetch_token(&self, persona: &Persona) -> Result<Option<AccessToken>, AuthError>;

    /// Ask the provider for a fresh token.
    async fn refresh_token(&self, persona: &Persona) -> Result<Option<AccessToken>, AuthError>;

    /// Start an authorization flow and return the URL the user has to open.
    async fn start_auth_flow(&self, persona: &Persona, scopes: &[&str])
        -> Result<String, AuthError>;
}

#[async_trait]
impl TokenProvider for Box<dyn TokenProvider> {
    async fn fetch_token(&self, persona: &Persona) -> Result<Option<AccessToken>, AuthError> {
        (**self).fetch_token(persona).await
    }

    async fn refresh_token(&self, persona: &Persona) -> Result<Option<AccessToken>, AuthError> {
        (**self).refresh_token(persona).await
    }

    async fn start_auth_flow(
        &self,
        persona: &Persona,
        scopes: &[&str],
    ) -> Result<String, AuthError> {
        (**self).start_auth_flow(persona, scopes).await
    }
}

#[derive(Debug, Clone)]
enum TokenState {
    Unloaded,
    Missing,
    Loaded(AccessToken),
}

/// Credentials for a single dispatch.
///
/// The token is fetched lazily on first use so calls that never reach
/// Google (help, report listing) do not touch the auth provider.
pub struct AuthSession {
    persona: Persona,
    provider: Arc<dyn TokenProvider>,
    state: Mutex<TokenState>,
}

impl AuthSession {
    pub fn new(persona: Persona, provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            persona,
            provider,
            state: Mutex::new(TokenState::Unloaded),
        }
    }

    /// Session seeded with a known token.
    #[cfg(test)]
    pub fn with_token(persona: Persona, provider: Arc<dyn TokenProvider>, token: AccessToken) -> Self {
        Self {
            persona,
            provider,
            state: Mutex::new(TokenState::Loaded(token)),
        }
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    async fn load(&self) -> TokenState {
        let mut state = self.state.lock().await;
        if let TokenState::Unloaded = *state {
            *state = match self.provider.fetch_token(&self.persona).await {
                Ok(Some(token)) => TokenState::Loaded(token),
                Ok(None) => TokenState::Missing,
                Err(e) => {
                    tracing::warn!(
                        persona_id = %self.persona.persona_id,
                        "Failed to fetch Google token: {}",
                        e
                    );
                    TokenState::Missing
                }
            };
        }
        state.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        matches!(self.load().await, TokenState::Loaded(_))
    }

    /// Whether the held token is past (or about to pass) its expiry.
    pub async fn token_expired(&self) -> bool {
        match self.load().await {
            TokenState::Loaded(token) => token.is_expired(Utc::now()),
            _ => false,
        }
    }

    /// Access token to put in the `Authorization` header.
    pub async fn bearer(&self) -> Result<String, AuthError> {
        match self.load().await {
            TokenState::Loaded(token) => Ok(token.access_token),
            _ => Err(AuthError::NotAuthenticated),
        }
    }

    /// Ask the provider for one refresh and keep the result for this session.
    pub async fn refresh(&self) -> Result<String, AuthError> {
        tracing::info!(
            persona_id = %self.persona.persona_id,
            "Refreshing Google access token"
        );
        let refreshed = self.provider.refresh_token(&self.persona).await?;
        let mut state = self.state.lock().await;
        match refreshed {
            Some(token) => {
                let bearer = token.access_token.clone();
                *state = TokenState::Loaded(token);
                Ok(bearer)
            }
            None => {
                *state = TokenState::Missing;
                Err(AuthError::NotAuthenticated)
            }
        }
    }

    /// Authorization link for the user, `None` if the provider cannot make one.
    pub async fn authorization_url(&self, scopes: &[&str]) -> Option<String> {
        match self.provider.start_auth_flow(&self.persona, scopes).await {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::error!("Failed to initiate OAuth flow: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
pub mod testing {
    //! Scripted token provider shared by wrapper tests.

    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub struct ScriptedTokens {
        pub initial: Option<AccessToken>,
        pub refreshed: Option<AccessToken>,
        pub fetches: AtomicUsize,
        pub refreshes: AtomicUsize,
    }

    impl ScriptedTokens {
        pub fn valid(token: &str) -> Self {
            Self {
                initial: Some(token_expiring_in(token, 3600)),
                refreshed: Some(token_expiring_in("refreshed-token", 3600)),
                fetches: AtomicUsize::new(0),
                refreshes: AtomicUsize::new(0),
            }
        }

        pub fn missing() -> Self {
            Self {
                initial: None,
                refreshed: None,
                fetches: AtomicUsize::new(0),
                refreshes: AtomicUsize::new(0),
            }
        }

        pub fn refresh_count(&self) -> usize {
            self.refreshes.load(Ordering::SeqCst)
        }

        pub fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    pub fn token_expiring_in(token: &str, secs: i64) -> AccessToken {
        AccessToken {
            access_token: token.to_string(),
            expires_at: Utc::now() + Duration::seconds(secs),
            scopes: REQUIRED_SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn persona() -> Persona {
        Persona {
            persona_id: "persona-1".into(),
            ws_id: "ws-1".into(),
            owner_user_id: "user-1".into(),
            setup: serde_json::Value::Null,
        }
    }

    #[async_trait]
    impl TokenProvider for ScriptedTokens {
        async fn fetch_token(&self, _: &Persona) -> Result<Option<AccessToken>, AuthError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.initial.clone())
        }

        async fn refresh_token(&self, _: &Persona) -> Result<Option<AccessToken>, AuthError> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            Ok(self.refreshed.clone())
        }

        async fn start_auth_flow(&self, _: &Persona, _: &[&str]) -> Result<String, AuthError> {
            Ok("https://auth.example/start".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[tokio::test]
    async fn token_is_fetched_once_and_lazily() {
        let provider = Arc::new(ScriptedTokens::valid("tok"));
        let session = AuthSession::new(persona(), provider.clone());
        assert_eq!(provider.fetch_count(), 0);

        assert_eq!(session.bearer().await.unwrap(), "tok");
        assert_eq!(session.bearer().await.unwrap(), "tok");
        assert_eq!(provider.fetch_count(), 1);
    }

    #[tokio::test]
    async fn missing_token_is_not_authenticated() {
        let session = AuthSession::new(persona(), Arc::new(ScriptedTokens::missing()));
        assert!(!session.is_authenticated().await);
        assert!(matches!(
            session.bearer().await,
            Err(AuthError::NotAuthenticated)
        ));
        assert_eq!(
            session.authorization_url(REQUIRED_SCOPES).await.as_deref(),
            Some("https://auth.example/start")
        );
    }

    #[tokio::test]
    async fn refresh_replaces_the_session_token() {
        let provider = Arc::new(ScriptedTokens::valid("old"));
        let session = AuthSession::new(persona(), provider.clone());
        assert_eq!(session.refresh().await.unwrap(), "refreshed-token");
        assert_eq!(session.bearer().await.unwrap(), "refreshed-token");
        assert_eq!(provider.refresh_count(), 1);
    }

    #[test]
    fn expiry_margin_applies() {
        let now = Utc::now();
        assert!(token_expiring_in("t", 30).is_expired(now));
        assert!(!token_expiring_in("t", 600).is_expired(now));
    }
}
