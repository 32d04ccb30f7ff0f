use async_trait::async_trait;
use thiserror::Error;

pub const DEFAULT_SNIPPET_PATH: &str = "gtm/gtm-snippet.html";

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("Invalid GitHub repository URL: {0}")]
    InvalidRepo(String),
    #[error("GitHub token is not configured")]
    MissingToken,
    #[error("GitHub API error: {0}")]
    Api(String),
}

/// `owner/name` of a GitHub repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// Accepts `https://github.com/o/r(.git)`, `git@github.com:o/r.git` and bare `o/r`.
pub fn parse_repo_url(raw: &str) -> Result<RepoRef, DeployError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let rest = trimmed
        .strip_prefix("https://github.com/")
        .or_else(|| trimmed.strip_prefix("http://github.com/"))
        .or_else(|| trimmed.strip_prefix("git@github.com:"))
        .unwrap_or(trimmed);
    let rest = rest.strip_suffix(".git").unwrap_or(rest);

    let mut parts = rest.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(name), None)
            if !owner.is_empty() && !name.is_empty() && !owner.contains(':') =>
        {
            Ok(RepoRef {
                owner: owner.to_string(),
                name: name.to_string(),
            })
        }
        _ => Err(DeployError::InvalidRepo(raw.to_string())),
    }
}

/// A file change to be proposed as a pull request.
#[derive(Debug, Clone, PartialEq)]
pub struct SnippetPullRequest {
    pub repo: RepoRef,
    pub branch: String,
    pub file_path: String,
    pub content: String,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PullRequest {
    pub number: u64,
    pub html_url: String,
}

/// Opens pull requests against the user's website repository.
#[async_trait]
pub trait SnippetDeployer: Send + Sync {
    async fn open_pull_request(&self, request: &SnippetPullRequest)
        -> Result<PullRequest, DeployError>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_urls_in_common_shapes() {
        for raw in [
            "https://github.com/acme/site",
            "https://github.com/acme/site.git",
            "https://github.com/acme/site/",
            "git@github.com:acme/site.git",
            "acme/site",
        ] {
            let repo = parse_repo_url(raw).unwrap();
            assert_eq!(repo.full_name(), "acme/site", "{raw}");
        }
    }

    #[test]
    fn bad_repo_urls_are_rejected() {
        for raw in ["", "acme", "https://github.com/acme/site/tree/main", "https://gitlab.com/a/b"] {
            assert!(parse_repo_url(raw).is_err(), "{raw}");
        }
    }
}
