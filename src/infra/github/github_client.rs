use async_trait::async_trait;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;

use crate::core::deploy::{DeployError, PullRequest, RepoRef, SnippetDeployer, SnippetPullRequest};

pub const GITHUB_API_BASE: &str = "https://api.github.com";

/// GitHub REST client that proposes snippet changes as pull requests.
///
/// The flow is: read the default branch, branch off its head (reusing the
/// branch if it already exists), write the file on that branch, open the PR.
pub struct GithubApiClient {
    client: Client,
    base_url: String,
    has_token: bool,
}

impl GithubApiClient {
    pub fn new(token: Option<String>) -> Result<Self, DeployError> {
        Self::with_base_url(token, GITHUB_API_BASE)
    }

    pub fn with_base_url(token: Option<String>, base_url: &str) -> Result<Self, DeployError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "Accept",
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert("User-Agent", HeaderValue::from_static("MetricMaster/0.1"));
        let has_token = token.is_some();
        if let Some(token) = token {
            headers.insert(
                "Authorization",
                HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|e| DeployError::Api(e.to_string()))?,
            );
        }

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| DeployError::Api(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            has_token,
        })
    }

    fn repo_url(&self, repo: &RepoRef, rest: &str) -> String {
        format!("{}/repos/{}/{}{}", self.base_url, repo.owner, repo.name, rest)
    }

    async fn fail(what: &str, resp: Response) -> DeployError {
        let status = resp.status();
        let message = resp
            .json::<ApiMessage>()
            .await
            .ok()
            .and_then(|m| m.message)
            .unwrap_or_default();
        if status == StatusCode::FORBIDDEN || status == StatusCode::UNAUTHORIZED {
            return DeployError::Api(format!(
                "GitHub rejected the token while trying to {} ({}): {}",
                what, status, message
            ));
        }
        DeployError::Api(format!("Failed to {}: {} {}", what, status, message))
    }

    async fn default_branch(&self, repo: &RepoRef) -> Result<String, DeployError> {
        let resp = self
            .client
            .get(self.repo_url(repo, ""))
            .send()
            .await
            .map_err(|e| DeployError::Api(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(Self::fail("read repository", resp).await);
        }
        let api: ApiRepo = resp
            .json()
            .await
            .map_err(|e| DeployError::Api(e.to_string()))?;
        Ok(api.default_branch.unwrap_or_else(|| "main".to_string()))
    }

    async fn head_sha(&self, repo: &RepoRef, branch: &str) -> Result<String, DeployError> {
        let resp = self
            .client
            .get(self.repo_url(repo, &format!("/git/ref/heads/{}", branch)))
            .send()
            .await
            .map_err(|e| DeployError::Api(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(Self::fail("read branch head", resp).await);
        }
        let api: ApiRef = resp
            .json()
            .await
            .map_err(|e| DeployError::Api(e.to_string()))?;
        Ok(api.object.sha)
    }

    async fn ensure_branch(&self, repo: &RepoRef, branch: &str, sha: &str) -> Result<(), DeployError> {
        let resp = self
            .client
            .post(self.repo_url(repo, "/git/refs"))
            .json(&json!({"ref": format!("refs/heads/{}", branch), "sha": sha}))
            .send()
            .await
            .map_err(|e| DeployError::Api(e.to_string()))?;
        if resp.status().is_success() {
            return Ok(());
        }
        // Branch already exists; keep using it.
        if resp.status() == StatusCode::UNPROCESSABLE_ENTITY {
            tracing::info!(repo = %repo.full_name(), branch, "Branch already exists");
            return Ok(());
        }
        Err(Self::fail("create branch", resp).await)
    }

    async fn existing_file_sha(
        &self,
        repo: &RepoRef,
        branch: &str,
        path: &str,
    ) -> Result<Option<String>, DeployError> {
        let resp = self
            .client
            .get(self.repo_url(repo, &format!("/contents/{}", path)))
            .query(&[("ref", branch)])
            .send()
            .await
            .map_err(|e| DeployError::Api(e.to_string()))?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(Self::fail("read existing file", resp).await);
        }
        let api: ApiContent = resp
            .json()
            .await
            .map_err(|e| DeployError::Api(e.to_string()))?;
        Ok(api.sha)
    }

    async fn put_file(&self, request: &SnippetPullRequest) -> Result<(), DeployError> {
        let sha = self
            .existing_file_sha(&request.repo, &request.branch, &request.file_path)
            .await?;
        let mut body = json!({
            "message": request.title,
            "content": base64::engine::general_purpose::STANDARD.encode(request.content.as_bytes()),
            "branch": request.branch,
        });
        if let Some(sha) = sha {
            body["sha"] = json!(sha);
        }
        let resp = self
            .client
            .put(self.repo_url(&request.repo, &format!("/contents/{}", request.file_path)))
            .json(&body)
            .send()
            .await
            .map_err(|e| DeployError::Api(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(Self::fail("write snippet file", resp).await);
        }
        Ok(())
    }

    async fn open_or_find_pull(
        &self,
        request: &SnippetPullRequest,
        base: &str,
    ) -> Result<PullRequest, DeployError> {
        let resp = self
            .client
            .post(self.repo_url(&request.repo, "/pulls"))
            .json(&json!({
                "title": request.title,
                "head": request.branch,
                "base": base,
                "body": request.body,
            }))
            .send()
            .await
            .map_err(|e| DeployError::Api(e.to_string()))?;

        if resp.status().is_success() {
            let api: ApiPull = resp
                .json()
                .await
                .map_err(|e| DeployError::Api(e.to_string()))?;
            return Ok(PullRequest {
                number: api.number,
                html_url: api.html_url,
            });
        }
        if resp.status() != StatusCode::UNPROCESSABLE_ENTITY {
            return Err(Self::fail("open pull request", resp).await);
        }

        // A PR for this branch is usually already open.
        let head = format!("{}:{}", request.repo.owner, request.branch);
        let resp = self
            .client
            .get(self.repo_url(&request.repo, "/pulls"))
            .query(&[("head", head.as_str()), ("state", "open")])
            .send()
            .await
            .map_err(|e| DeployError::Api(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(Self::fail("find existing pull request", resp).await);
        }
        let pulls: Vec<ApiPull> = resp
            .json()
            .await
            .map_err(|e| DeployError::Api(e.to_string()))?;
        pulls
            .into_iter()
            .next()
            .map(|api| PullRequest {
                number: api.number,
                html_url: api.html_url,
            })
            .ok_or_else(|| DeployError::Api("GitHub refused to open the pull request".to_string()))
    }
}

#[async_trait]
impl SnippetDeployer for GithubApiClient {
    async fn open_pull_request(
        &self,
        request: &SnippetPullRequest,
    ) -> Result<PullRequest, DeployError> {
        if !self.has_token {
            return Err(DeployError::MissingToken);
        }
        let repo = &request.repo;
        let base = self.default_branch(repo).await?;
        let sha = self.head_sha(repo, &base).await?;
        self.ensure_branch(repo, &request.branch, &sha).await?;
        self.put_file(request).await?;
        let pull = self.open_or_find_pull(request, &base).await?;
        tracing::info!(
            repo = %repo.full_name(),
            branch = %request.branch,
            number = pull.number,
            "Opened snippet pull request"
        );
        Ok(pull)
    }
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiRepo {
    default_branch: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiRefObject {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct ApiRef {
    object: ApiRefObject,
}

#[derive(Debug, Deserialize)]
struct ApiContent {
    sha: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiPull {
    number: u64,
    html_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn request() -> SnippetPullRequest {
        SnippetPullRequest {
            repo: RepoRef {
                owner: "acme".into(),
                name: "site".into(),
            },
            branch: "metricmaster/gtm-gtm-abc123".into(),
            file_path: "gtm/gtm-snippet.html".into(),
            content: "<script>gtm</script>".into(),
            title: "Add Google Tag Manager snippet (GTM-ABC123)".into(),
            body: "Install snippet".into(),
        }
    }

    fn mock_repo_and_branch(server: &MockServer, branch_status: u16) {
        server.mock(|when, then| {
            when.method(GET).path("/repos/acme/site");
            then.status(200).json_body(json!({"default_branch": "trunk"}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/repos/acme/site/git/ref/heads/trunk");
            then.status(200).json_body(json!({"object": {"sha": "abc"}}));
        });
        server.mock(|when, then| {
            when.method(POST)
                .path("/repos/acme/site/git/refs")
                .json_body(json!({"ref": "refs/heads/metricmaster/gtm-gtm-abc123", "sha": "abc"}));
            then.status(branch_status).json_body(json!({}));
        });
    }

    #[tokio::test]
    async fn opens_pull_request_with_encoded_file() {
        let server = MockServer::start();
        mock_repo_and_branch(&server, 201);
        server.mock(|when, then| {
            when.method(GET).path("/repos/acme/site/contents/gtm/gtm-snippet.html");
            then.status(404).json_body(json!({"message": "Not Found"}));
        });
        let put = server.mock(|when, then| {
            when.method(PUT)
                .path("/repos/acme/site/contents/gtm/gtm-snippet.html")
                .header("authorization", "Bearer gh-token")
                .json_body(json!({
                    "message": "Add Google Tag Manager snippet (GTM-ABC123)",
                    "content": "PHNjcmlwdD5ndG08L3NjcmlwdD4=",
                    "branch": "metricmaster/gtm-gtm-abc123"
                }));
            then.status(201).json_body(json!({}));
        });
        let pull = server.mock(|when, then| {
            when.method(POST)
                .path("/repos/acme/site/pulls")
                .json_body_includes(json!({"base": "trunk", "head": "metricmaster/gtm-gtm-abc123"}).to_string());
            then.status(201)
                .json_body(json!({"number": 12, "html_url": "https://github.com/acme/site/pull/12"}));
        });

        let client =
            GithubApiClient::with_base_url(Some("gh-token".into()), &server.base_url()).unwrap();
        let pr = client.open_pull_request(&request()).await.unwrap();
        put.assert_calls(1);
        pull.assert_calls(1);
        assert_eq!(pr.number, 12);
    }

    #[tokio::test]
    async fn reuses_existing_branch_file_and_pull() {
        let server = MockServer::start();
        mock_repo_and_branch(&server, 422);
        server.mock(|when, then| {
            when.method(GET).path("/repos/acme/site/contents/gtm/gtm-snippet.html");
            then.status(200).json_body(json!({"sha": "old-sha"}));
        });
        let put = server.mock(|when, then| {
            when.method(PUT)
                .path("/repos/acme/site/contents/gtm/gtm-snippet.html")
                .json_body_includes(json!({"sha": "old-sha"}).to_string());
            then.status(200).json_body(json!({}));
        });
        server.mock(|when, then| {
            when.method(POST).path("/repos/acme/site/pulls");
            then.status(422).json_body(json!({"message": "A pull request already exists"}));
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/repos/acme/site/pulls")
                .query_param("head", "acme:metricmaster/gtm-gtm-abc123");
            then.status(200)
                .json_body(json!([{"number": 7, "html_url": "https://github.com/acme/site/pull/7"}]));
        });

        let client = GithubApiClient::with_base_url(Some("t".into()), &server.base_url()).unwrap();
        let pr = client.open_pull_request(&request()).await.unwrap();
        put.assert_calls(1);
        assert_eq!(pr.number, 7);
    }

    #[tokio::test]
    async fn missing_token_makes_no_calls() {
        let server = MockServer::start();
        let any = server.mock(|when, then| {
            when.any_request();
            then.status(200);
        });
        let client = GithubApiClient::with_base_url(None, &server.base_url()).unwrap();
        assert!(matches!(
            client.open_pull_request(&request()).await,
            Err(DeployError::MissingToken)
        ));
        any.assert_calls(0);
    }
}
