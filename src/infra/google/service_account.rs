// Service-account credentials as a token source.
//
// Used when the bot runs outside the host (local development, CI) and no
// external auth service is available. The service account must be granted
// access to the GA4 properties and GTM containers it works on.
//
// Environment:
// - `GOOGLE_SERVICE_ACCOUNT_KEY`  path to the JSON key file
// - `GOOGLE_SERVICE_ACCOUNT_JSON` the JSON key itself

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::core::auth::{
    AccessToken, AuthError, Persona, TokenProvider, REQUIRED_SCOPES, SCOPE_ANALYTICS_EDIT,
};

#[derive(Debug, Error)]
pub enum ServiceAccountError {
    #[error("could not read service account key: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid service account key: {0}")]
    InvalidKey(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Deserialize)]
struct ServiceAccountCredentials {
    client_email: String,
    private_key: String,
    token_uri: String,
}

#[derive(Debug, Serialize)]
struct JwtClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

/// Exchanges a signed JWT for access tokens and caches the last one.
pub struct ServiceAccountTokens {
    credentials: ServiceAccountCredentials,
    client: Client,
    cached: RwLock<Option<AccessToken>>,
}

impl ServiceAccountTokens {
    pub async fn from_file(path: &str) -> Result<Self, ServiceAccountError> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, ServiceAccountError> {
        let credentials: ServiceAccountCredentials = serde_json::from_str(json)?;
        Ok(Self {
            credentials,
            client: Client::new(),
            cached: RwLock::new(None),
        })
    }

    /// `None` when neither variable is set.
    pub async fn from_env() -> Result<Option<Self>, ServiceAccountError> {
        if let Ok(path) = std::env::var("GOOGLE_SERVICE_ACCOUNT_KEY") {
            return Self::from_file(&path).await.map(Some);
        }
        if let Ok(json) = std::env::var("GOOGLE_SERVICE_ACCOUNT_JSON") {
            return Self::from_json(&json).map(Some);
        }
        Ok(None)
    }

    pub fn client_email(&self) -> &str {
        &self.credentials.client_email
    }

    fn scopes() -> Vec<&'static str> {
        let mut scopes: Vec<&str> = REQUIRED_SCOPES.to_vec();
        scopes.push(SCOPE_ANALYTICS_EDIT);
        scopes
    }

    async fn exchange(&self) -> Result<AccessToken, AuthError> {
        let now = Utc::now();
        let scopes = Self::scopes();
        let claims = JwtClaims {
            iss: self.credentials.client_email.clone(),
            scope: scopes.join(" "),
            aud: self.credentials.token_uri.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
        };

        let key = EncodingKey::from_rsa_pem(self.credentials.private_key.as_bytes())
            .map_err(|e| AuthError::Provider(format!("bad private key: {}", e)))?;
        let jwt = encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        let response = self
            .client
            .post(&self.credentials.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", jwt.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AuthError::Provider(format!(
                "token exchange failed ({}): {}",
                status, text
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;
        tracing::info!(
            client_email = %self.credentials.client_email,
            expires_in = token.expires_in,
            "Obtained service account token"
        );
        Ok(AccessToken {
            access_token: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
        })
    }
}

#[async_trait]
impl TokenProvider for ServiceAccountTokens {
    async fn fetch_token(&self, persona: &Persona) -> Result<Option<AccessToken>, AuthError> {
        {
            let cached = self.cached.read().await;
            if let Some(token) = cached.as_ref() {
                if !token.is_expired(Utc::now()) {
                    return Ok(Some(token.clone()));
                }
            }
        }
        self.refresh_token(persona).await
    }

    async fn refresh_token(&self, _persona: &Persona) -> Result<Option<AccessToken>, AuthError> {
        let token = self.exchange().await?;
        *self.cached.write().await = Some(token.clone());
        Ok(Some(token))
    }

    async fn start_auth_flow(
        &self,
        _persona: &Persona,
        _scopes: &[&str],
    ) -> Result<String, AuthError> {
        Err(AuthError::Provider(format!(
            "service account {} cannot start a user authorization flow; share the GA4 property and GTM container with it instead",
            self.credentials.client_email
        )))
    }
}
