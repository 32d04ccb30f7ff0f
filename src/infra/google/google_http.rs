// Shared request path for every Google REST call.
//
// Each request carries the session's bearer token. A 401 triggers exactly one
// token refresh and one retry; a second 401 or 403 after that refresh is an
// authentication error. No other retries happen here.

use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::core::auth::AuthSession;
use crate::core::tools::GoogleApiError;

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

#[derive(Clone)]
pub struct GoogleHttp {
    client: Client,
    service: &'static str,
}

impl GoogleHttp {
    pub fn new(client: Client, service: &'static str) -> Self {
        Self { client, service }
    }

    pub fn service(&self) -> &'static str {
        self.service
    }

    fn transport(&self, e: reqwest::Error) -> GoogleApiError {
        GoogleApiError::Transport {
            service: self.service,
            message: e.to_string(),
        }
    }

    async fn send_once(
        &self,
        method: &Method,
        url: &str,
        token: &str,
        body: Option<&Value>,
    ) -> Result<reqwest::Response, GoogleApiError> {
        let mut request = self.client.request(method.clone(), url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }
        request.send().await.map_err(|e| self.transport(e))
    }

    /// Send a request and decode the JSON response into `T`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        session: &AuthSession,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<T, GoogleApiError> {
        let mut refreshed = false;
        let mut token = if session.token_expired().await {
            refreshed = true;
            session.refresh().await?
        } else {
            session.bearer().await?
        };

        let mut response = self.send_once(&method, url, &token, body).await?;
        if response.status() == StatusCode::UNAUTHORIZED && !refreshed {
            tracing::info!(service = self.service, url, "Got 401, refreshing token once");
            token = session.refresh().await?;
            refreshed = true;
            response = self.send_once(&method, url, &token, body).await?;
        }

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED
            || (status == StatusCode::FORBIDDEN && refreshed)
        {
            return Err(GoogleApiError::Unauthorized {
                service: self.service,
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .ok()
                .and_then(|b| b.error)
                .and_then(|e| e.message)
                .unwrap_or(text);
            tracing::warn!(
                service = self.service,
                status = status.as_u16(),
                "Google API error: {}",
                message
            );
            return Err(GoogleApiError::Http {
                service: self.service,
                status: status.as_u16(),
                message,
            });
        }

        response.json::<T>().await.map_err(|e| GoogleApiError::Decode {
            service: self.service,
            message: e.to_string(),
        })
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        session: &AuthSession,
        url: &str,
    ) -> Result<T, GoogleApiError> {
        self.request(session, Method::GET, url, None).await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        session: &AuthSession,
        url: &str,
        body: &Value,
    ) -> Result<T, GoogleApiError> {
        self.request(session, Method::POST, url, Some(body)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth::testing::{persona, token_expiring_in, ScriptedTokens};
    use httpmock::prelude::*;
    use serde_json::json;
    use std::sync::Arc;

    fn http() -> GoogleHttp {
        GoogleHttp::new(Client::new(), "Google Tag Manager")
    }

    #[tokio::test]
    async fn refreshes_once_on_401_and_retries() {
        let server = MockServer::start();
        let stale = server.mock(|when, then| {
            when.method(GET).path("/x").header("authorization", "Bearer old");
            then.status(401);
        });
        let fresh = server.mock(|when, then| {
            when.method(GET)
                .path("/x")
                .header("authorization", "Bearer refreshed-token");
            then.status(200).json_body(json!({"ok": true}));
        });
        let tokens = Arc::new(ScriptedTokens::valid("old"));
        let session = AuthSession::new(persona(), tokens.clone());

        let body: Value = http().get(&session, &server.url("/x")).await.unwrap();
        assert_eq!(body["ok"], true);
        stale.assert_calls(1);
        fresh.assert_calls(1);
        assert_eq!(tokens.refresh_count(), 1);
    }

    #[tokio::test]
    async fn second_401_is_an_auth_error() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/x");
            then.status(401);
        });
        let tokens = Arc::new(ScriptedTokens::valid("old"));
        let session = AuthSession::new(persona(), tokens.clone());

        let err = http()
            .get::<Value>(&session, &server.url("/x"))
            .await
            .unwrap_err();
        assert!(matches!(err, GoogleApiError::Unauthorized { status: 401, .. }));
        mock.assert_calls(2);
        assert_eq!(tokens.refresh_count(), 1);
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_before_sending() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/x").header("authorization", "Bearer refreshed-token");
            then.status(200).json_body(json!({}));
        });
        let tokens = Arc::new(ScriptedTokens::valid("old"));
        let session = AuthSession::with_token(
            persona(),
            tokens.clone(),
            token_expiring_in("old", 10),
        );
        let _: Value = http().get(&session, &server.url("/x")).await.unwrap();
        mock.assert_calls(1);
        assert_eq!(tokens.refresh_count(), 1);
    }

    #[tokio::test]
    async fn api_errors_carry_google_message() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/y");
            then.status(403).json_body(json!({
                "error": {"code": 403, "message": "The caller does not have permission"}
            }));
        });
        let session = AuthSession::new(persona(), Arc::new(ScriptedTokens::valid("t")));
        let err = http()
            .post::<Value>(&session, &server.url("/y"), &json!({}))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Google Tag Manager API error: 403 - The caller does not have permission"
        );
        assert!(matches!(err, GoogleApiError::Http { status: 403, .. }));
    }
}
