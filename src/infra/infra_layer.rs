// The infra module contains implementations of core traits.
// Each remote system or storage engine gets its own submodule.

#[path = "google/mod.rs"]
pub mod google;

#[path = "host/mod.rs"]
pub mod host;

#[path = "reports/mod.rs"]
pub mod reports;

#[path = "github/mod.rs"]
pub mod github;
