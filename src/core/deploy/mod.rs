pub mod snippet_deployer;

pub use snippet_deployer::{
    parse_repo_url, DeployError, PullRequest, RepoRef, SnippetDeployer, SnippetPullRequest,
    DEFAULT_SNIPPET_PATH,
};
