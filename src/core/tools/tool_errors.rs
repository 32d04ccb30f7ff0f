use thiserror::Error;

use crate::core::auth::AuthError;

/// Failures talking to a Google REST API.
#[derive(Debug, Error)]
pub enum GoogleApiError {
    /// Google rejected the token even after one refresh.
    #[error("{service} authentication error: {status}")]
    Unauthorized { service: &'static str, status: u16 },

    #[error("{service} API error: {status} - {message}")]
    Http {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("{service} request failed: {message}")]
    Transport {
        service: &'static str,
        message: String,
    },

    #[error("{service} returned an unexpected response: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl GoogleApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            GoogleApiError::Unauthorized { status, .. } | GoogleApiError::Http { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Everything that can go wrong while serving a tool call.
///
/// None of these are faults for the host: the dispatcher renders each one as
/// a message for the model with [`ToolError::to_model_message`].
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Missing required parameter(s): {}", quote_all(.0))]
    MissingParams(Vec<String>),

    #[error("Invalid value for '{field}': {reason}")]
    InvalidParam { field: String, reason: String },

    #[error("Unknown operation: {op}")]
    UnknownOp { tool: &'static str, op: String },

    #[error("Not authenticated with Google")]
    NotAuthenticated { auth_url: Option<String> },

    #[error(transparent)]
    Api(#[from] GoogleApiError),

    #[error("Not configured: {0}")]
    NotConfigured(String),

    #[error("Storage error: {0}")]
    Store(String),

    #[error("Host error: {0}")]
    Host(String),
}

fn quote_all(fields: &[String]) -> String {
    fields
        .iter()
        .map(|f| format!("'{}'", f))
        .collect::<Vec<_>>()
        .join(", ")
}

impl ToolError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ToolError::InvalidParam {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Natural-language rendering handed back to the model.
    pub fn to_model_message(&self, tool: &str) -> String {
        match self {
            ToolError::UnknownOp { op, .. } => format!(
                "❌ Unknown operation: {}\n\nTry {}(op='help') for usage.",
                op, tool
            ),
            ToolError::NotAuthenticated { auth_url: Some(url) } => format!(
                "❌ Not authenticated. Ask user to authorize at:\n{}\n\nThen retry this operation.",
                url
            ),
            ToolError::NotAuthenticated { auth_url: None } => {
                "❌ Not authenticated with Google and no authorization link could be created. Ask the user to connect their Google account, then retry.".to_string()
            }
            ToolError::Api(err @ GoogleApiError::Unauthorized { .. }) => format!(
                "❌ {}\n\nThe Google authorization has to be renewed before retrying.",
                err
            ),
            other => format!("❌ {}", other),
        }
    }
}
