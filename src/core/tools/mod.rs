pub mod definitions;
pub mod tool_catalog;
pub mod tool_errors;
pub mod tool_validation;

pub use definitions::*;
pub use tool_catalog::{ConfirmKey, OpSpec, ToolSpec};
pub use tool_errors::{GoogleApiError, ToolError};
pub use tool_validation::{normalize_args, parse_request, split_csv, validate_args, Args};
