use async_trait::async_trait;
use serde_json::Value;

use crate::core::auth::{AuthSession, REQUIRED_SCOPES};
use crate::core::setup::SetupConfig;
use crate::core::tools::{Args, OpSpec, ToolError, ToolSpec};

/// What a handler gets for one call. The session is created per dispatch.
pub struct CallContext<'a> {
    pub session: &'a AuthSession,
    pub setup: &'a SetupConfig,
}

/// One tool as seen by the dispatcher.
///
/// The dispatcher owns the shared steps (help, validation, auth, the
/// confirmation gate); handlers only run an already validated operation.
#[async_trait]
pub trait ToolCallHandler: Send + Sync {
    fn spec(&self) -> &'static ToolSpec;

    /// Whether the operation talks to Google and therefore needs a token.
    fn needs_google(&self, op: &OpSpec) -> bool {
        !self.spec().scopes_for(op).is_empty()
    }

    async fn status(&self, ctx: &CallContext<'_>) -> String {
        default_status(self.spec(), ctx).await
    }

    /// Tool-specific argument checks that need no network call. Runs after
    /// the generic validation and before anything is proposed or executed.
    fn check(&self, _setup: &SetupConfig, _op: &OpSpec, _args: &Args) -> Result<(), ToolError> {
        Ok(())
    }

    /// Short command line shown to the operator before a mutation.
    fn describe_change(&self, op: &OpSpec, args: &Args) -> String {
        let subject = op
            .required_params()
            .filter_map(|p| args.get(p.name).and_then(Value::as_str))
            .last()
            .unwrap_or_default();
        format!("{} {}", op.name, subject).trim().to_string()
    }

    async fn execute(
        &self,
        ctx: &CallContext<'_>,
        op: &OpSpec,
        args: &Args,
    ) -> Result<String, ToolError>;
}

pub async fn default_status(spec: &ToolSpec, ctx: &CallContext<'_>) -> String {
    let persona = ctx.session.persona();
    let mut out = format!("{} integration status:\n", spec.name);

    if spec.scopes.is_empty() {
        out.push_str(&format!("  Workspace: {}\n", persona.ws_id));
        out.push_str(&format!("  Operations: {}\n", spec.op_names().join(", ")));
        return out;
    }

    let authenticated = ctx.session.is_authenticated().await;
    out.push_str(&format!(
        "  Authenticated: {}\n",
        if authenticated { "✅ Yes" } else { "❌ No" }
    ));
    out.push_str(&format!("  User: {}\n", persona.owner_user_id));
    out.push_str(&format!("  Workspace: {}\n", persona.ws_id));
    out.push_str(&format!("  Operations: {}\n", spec.op_names().join(", ")));

    if !authenticated {
        match ctx.session.authorization_url(REQUIRED_SCOPES).await {
            Some(url) => out.push_str(&format!(
                "\n❌ Not authenticated. Ask user to authorize at:\n{}\n",
                url
            )),
            None => out.push_str("\n❌ Could not start the Google authorization flow.\n"),
        }
    }
    out
}
