pub mod snippet;
pub mod tag_manager_models;
pub mod tag_manager_service;
pub mod tag_manager_tool;

pub use tag_manager_service::{TagManagerApi, TagManagerService};
pub use tag_manager_tool::TagManagerTool;
