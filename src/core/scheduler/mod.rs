pub mod hooks;
pub mod schedule;

pub use hooks::{FiringCheckError, HookAction, HookKind, ScheduledRunner, HOOKS};
