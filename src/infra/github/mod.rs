// GitHub infra layer.
// - `github_client.rs` opens snippet pull requests through the GitHub HTTP API.

#[path = "github_client.rs"]
pub mod github_client;

pub use github_client::GithubApiClient;
