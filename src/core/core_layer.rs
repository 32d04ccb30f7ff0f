// The core module contains all business logic.
// Each feature gets its own submodule; nothing in here performs I/O directly,
// remote systems are reached through the traits the infra layer implements.

#[path = "auth/auth_session.rs"]
pub mod auth;

#[path = "tools/mod.rs"]
pub mod tools;

#[path = "dispatch/mod.rs"]
pub mod dispatch;

#[path = "confirmation/mod.rs"]
pub mod confirmation;

#[path = "analytics/mod.rs"]
pub mod analytics;

#[path = "tag_manager/mod.rs"]
pub mod tag_manager;

#[path = "deploy/mod.rs"]
pub mod deploy;

#[path = "reports/mod.rs"]
pub mod reports;

#[path = "documents/mod.rs"]
pub mod documents;

#[path = "setup/mod.rs"]
pub mod setup;

#[path = "scheduler/mod.rs"]
pub mod scheduler;

#[path = "prompts/mod.rs"]
pub mod prompts;
