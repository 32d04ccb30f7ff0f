// REST client for the Flexus host.
//
// Covers the host services the bot depends on: the external-auth token
// store, policy documents, the marketplace and persona lookup. Everything is
// JSON over HTTPS with the bot's API key as a bearer token.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::core::auth::{AccessToken, AuthError, Persona, TokenProvider};
use crate::core::documents::{DocumentEntry, DocumentError, PolicyDocumentStore};
use crate::core::setup::{MarketplaceApi, MarketplaceError, MarketplaceRegistration};

/// Provider name the external-auth service files Google credentials under.
const AUTH_PROVIDER: &str = "google";

#[derive(Debug, Error)]
pub enum HostError {
    #[error("host returned {status}: {message}")]
    Http { status: u16, message: String },

    #[error("host request failed: {0}")]
    Transport(String),

    #[error("unexpected host response: {0}")]
    Decode(String),

    #[error("invalid host configuration: {0}")]
    Config(String),
}

impl From<HostError> for AuthError {
    fn from(err: HostError) -> Self {
        AuthError::Provider(err.to_string())
    }
}

impl From<HostError> for DocumentError {
    fn from(err: HostError) -> Self {
        DocumentError::Host(err.to_string())
    }
}

impl From<HostError> for MarketplaceError {
    fn from(err: HostError) -> Self {
        MarketplaceError::Upsert(err.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct ApiAuthUrl {
    auth_url: String,
}

#[derive(Debug, Deserialize)]
struct ApiDocumentList {
    #[serde(default)]
    documents: Vec<DocumentEntry>,
}

#[derive(Debug, Deserialize)]
struct ApiDocument {
    doc: Value,
}

#[derive(Debug, Serialize)]
struct WriteDocument<'a> {
    p: &'a str,
    doc: &'a Value,
}

#[derive(Clone)]
pub struct HostApiClient {
    client: Client,
    base_url: String,
}

impl HostApiClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, HostError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| HostError::Config(e.to_string()))?,
        );
        headers.insert("User-Agent", HeaderValue::from_static("MetricMaster/0.1"));

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| HostError::Config(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path)
    }

    /// `Ok(None)` on 404, decoded body on success.
    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<Option<T>, HostError> {
        let mut request = self.client.request(method, self.url(path)).query(query);
        if let Some(body) = body {
            request = request.json(body);
        }
        let resp = request
            .send()
            .await
            .map_err(|e| HostError::Transport(e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), path, "Host API error: {}", message);
            return Err(HostError::Http {
                status: status.as_u16(),
                message,
            });
        }
        if status == StatusCode::NO_CONTENT {
            return serde_json::from_value(Value::Null)
                .map(Some)
                .map_err(|e| HostError::Decode(e.to_string()));
        }
        resp.json::<T>()
            .await
            .map(Some)
            .map_err(|e| HostError::Decode(e.to_string()))
    }

    pub async fn fetch_persona(&self, persona_id: &str) -> Result<Option<Persona>, HostError> {
        self.send(Method::GET, &format!("personas/{}", persona_id), &[], None)
            .await
    }

    /// Document store bound to one workspace.
    pub fn documents(&self, ws_id: &str) -> HostPolicyDocuments {
        HostPolicyDocuments {
            host: self.clone(),
            ws_id: ws_id.to_string(),
        }
    }

    fn auth_path(persona: &Persona, action: &str) -> String {
        format!(
            "external-auth/{}/{}/{}",
            persona.persona_id, AUTH_PROVIDER, action
        )
    }
}

#[async_trait]
impl TokenProvider for HostApiClient {
    async fn fetch_token(&self, persona: &Persona) -> Result<Option<AccessToken>, AuthError> {
        Ok(self
            .send(Method::GET, &Self::auth_path(persona, "token"), &[], None)
            .await?)
    }

    async fn refresh_token(&self, persona: &Persona) -> Result<Option<AccessToken>, AuthError> {
        Ok(self
            .send(
                Method::POST,
                &Self::auth_path(persona, "refresh"),
                &[],
                Some(&json!({})),
            )
            .await?)
    }

    async fn start_auth_flow(
        &self,
        persona: &Persona,
        scopes: &[&str],
    ) -> Result<String, AuthError> {
        let body = json!({
            "owner_user_id": persona.owner_user_id,
            "scopes": scopes,
        });
        let started: Option<ApiAuthUrl> = self
            .send(Method::POST, &Self::auth_path(persona, "start"), &[], Some(&body))
            .await?;
        started
            .map(|s| s.auth_url)
            .ok_or_else(|| AuthError::Provider("external auth service is unavailable".to_string()))
    }
}

#[async_trait]
impl MarketplaceApi for HostApiClient {
    async fn upsert_bot(
        &self,
        registration: &MarketplaceRegistration,
    ) -> Result<(), MarketplaceError> {
        let body = serde_json::to_value(registration)
            .map_err(|e| MarketplaceError::Upsert(e.to_string()))?;
        let upserted: Option<Value> = self
            .send(Method::POST, "marketplace/bots", &[], Some(&body))
            .await?;
        match upserted {
            Some(_) => Ok(()),
            None => Err(MarketplaceError::Upsert(
                "marketplace endpoint not found".to_string(),
            )),
        }
    }
}

pub struct HostPolicyDocuments {
    host: HostApiClient,
    ws_id: String,
}

#[async_trait]
impl PolicyDocumentStore for HostPolicyDocuments {
    async fn list(&self, folder: &str) -> Result<Vec<DocumentEntry>, DocumentError> {
        let path = format!("workspaces/{}/policy-documents", self.ws_id);
        let listed: Option<ApiDocumentList> = self
            .host
            .send(Method::GET, &path, &[("folder", folder)], None)
            .await?;
        Ok(listed.map(|l| l.documents).unwrap_or_default())
    }

    async fn cat(&self, path: &str) -> Result<Option<Value>, DocumentError> {
        let url = format!("workspaces/{}/policy-documents/cat", self.ws_id);
        let doc: Option<ApiDocument> = self
            .host
            .send(Method::GET, &url, &[("p", path)], None)
            .await?;
        Ok(doc.map(|d| d.doc))
    }

    async fn write(&self, path: &str, doc: &Value) -> Result<(), DocumentError> {
        let url = format!("workspaces/{}/policy-documents/write", self.ws_id);
        let body = serde_json::to_value(WriteDocument { p: path, doc })
            .map_err(|e| DocumentError::Host(e.to_string()))?;
        let _: Option<Value> = self.host.send(Method::POST, &url, &[], Some(&body)).await?;
        tracing::debug!(ws_id = %self.ws_id, path, "Wrote policy document");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth::testing::persona;
    use crate::core::auth::REQUIRED_SCOPES;
    use crate::core::setup::{build_registration, Pictures};
    use httpmock::prelude::*;

    fn host(server: &MockServer) -> HostApiClient {
        HostApiClient::new(&server.base_url(), "bot-key").unwrap()
    }

    #[tokio::test]
    async fn fetches_token_with_api_key() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v1/external-auth/persona-1/google/token")
                .header("authorization", "Bearer bot-key");
            then.status(200).json_body(json!({
                "access_token": "ya29.x",
                "expires_at": "2030-01-01T00:00:00Z",
                "scopes": ["https://www.googleapis.com/auth/analytics.readonly"]
            }));
        });
        let token = host(&server).fetch_token(&persona()).await.unwrap().unwrap();
        mock.assert_calls(1);
        assert_eq!(token.access_token, "ya29.x");
        assert_eq!(token.scopes.len(), 1);
    }

    #[tokio::test]
    async fn missing_token_is_none() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v1/external-auth/persona-1/google/token");
            then.status(404);
        });
        assert!(host(&server).fetch_token(&persona()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn start_auth_flow_sends_scopes() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/external-auth/persona-1/google/start")
                .json_body_includes(json!({"scopes": REQUIRED_SCOPES}).to_string());
            then.status(200)
                .json_body(json!({"auth_url": "https://accounts.google.com/o/oauth2/auth?x=1"}));
        });
        let url = host(&server)
            .start_auth_flow(&persona(), REQUIRED_SCOPES)
            .await
            .unwrap();
        mock.assert_calls(1);
        assert!(url.starts_with("https://accounts.google.com"));
    }

    #[tokio::test]
    async fn host_errors_become_provider_errors() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/external-auth/persona-1/google/refresh");
            then.status(500).body("boom");
        });
        let err = host(&server).refresh_token(&persona()).await.unwrap_err();
        assert!(matches!(err, AuthError::Provider(ref m) if m.contains("boom")));
    }

    #[tokio::test]
    async fn policy_documents_round_trip_through_host() {
        let server = MockServer::start();
        let write = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/workspaces/ws-1/policy-documents/write")
                .json_body(json!({"p": "/analytics/setup", "doc": {"a": 1}}));
            then.status(204);
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/v1/workspaces/ws-1/policy-documents/cat")
                .query_param("p", "/analytics/setup");
            then.status(200).json_body(json!({"doc": {"a": 1}}));
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/v1/workspaces/ws-1/policy-documents")
                .query_param("folder", "/analytics/");
            then.status(200).json_body(json!({
                "documents": [{"path": "/analytics/setup", "updated_at": "2026-05-01T10:00:00Z"}]
            }));
        });

        let docs = host(&server).documents("ws-1");
        docs.write("/analytics/setup", &json!({"a": 1})).await.unwrap();
        write.assert_calls(1);
        assert_eq!(docs.cat("/analytics/setup").await.unwrap(), Some(json!({"a": 1})));
        let listed = docs.list("/analytics/").await.unwrap();
        assert_eq!(listed[0].path, "/analytics/setup");
        assert!(listed[0].updated_at.is_some());
    }

    #[tokio::test]
    async fn marketplace_upsert_posts_registration() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/marketplace/bots")
                .json_body_includes(json!({"ws_id": "ws-9", "marketable_name": "metricmaster"}).to_string());
            then.status(200).json_body(json!({"ok": true}));
        });
        host(&server)
            .upsert_bot(&build_registration("ws-9", Pictures::default()))
            .await
            .unwrap();
        mock.assert_calls(1);
    }

    #[tokio::test]
    async fn fetches_persona() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v1/personas/persona-1");
            then.status(200).json_body(json!({
                "persona_id": "persona-1",
                "ws_id": "ws-1",
                "owner_user_id": "user-1",
                "setup": {"GA_DEFAULT_PROPERTY": "123"}
            }));
        });
        let persona = host(&server).fetch_persona("persona-1").await.unwrap().unwrap();
        assert_eq!(persona.ws_id, "ws-1");
        assert_eq!(persona.setup["GA_DEFAULT_PROPERTY"], "123");
    }
}
