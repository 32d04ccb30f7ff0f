// Routes one tool call through the shared pipeline.
//
// help/status → setup defaults → validation → tool checks → auth →
// confirmation gate → handler. Every failure becomes text for the model;
// nothing here returns an error to the host.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::tool_handler::{CallContext, ToolCallHandler};
use crate::core::auth::{AuthSession, Persona, TokenProvider, REQUIRED_SCOPES};
use crate::core::confirmation::{ConfirmationGate, Decision, PendingChange, Proposal, Resolution};
use crate::core::setup::SetupConfig;
use crate::core::tools::{normalize_args, validate_args, Args, GoogleApiError, OpSpec, ToolError};

/// A tool invocation as produced by the model and relayed by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub call_id: String,
    pub tool: String,
    #[serde(default)]
    pub op: String,
    #[serde(default)]
    pub args: Args,
    /// Set by the host when the operator already approved this exact call.
    #[serde(default)]
    pub confirmed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Reply(String),
    NeedsConfirmation(PendingChange),
}

#[cfg(test)]
impl DispatchOutcome {
    pub fn text(&self) -> Option<&str> {
        match self {
            DispatchOutcome::Reply(text) => Some(text),
            DispatchOutcome::NeedsConfirmation(_) => None,
        }
    }
}

pub struct Dispatcher {
    handlers: Vec<Arc<dyn ToolCallHandler>>,
    tokens: Arc<dyn TokenProvider>,
    persona: Persona,
    setup: SetupConfig,
    gate: ConfirmationGate,
}

impl Dispatcher {
    pub fn new(
        handlers: Vec<Arc<dyn ToolCallHandler>>,
        tokens: Arc<dyn TokenProvider>,
        persona: Persona,
        setup: SetupConfig,
    ) -> Self {
        Self {
            handlers,
            tokens,
            persona,
            setup,
            gate: ConfirmationGate::new(),
        }
    }

    pub fn setup(&self) -> &SetupConfig {
        &self.setup
    }

    pub fn set_setup(&mut self, setup: SetupConfig) {
        self.setup = setup;
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    /// Fresh credentials holder for one call or scheduled run.
    pub fn session(&self) -> AuthSession {
        AuthSession::new(self.persona.clone(), self.tokens.clone())
    }

    #[cfg(test)]
    pub fn pending_count(&self) -> usize {
        self.gate.pending_count()
    }

    fn handler(&self, tool: &str) -> Option<&Arc<dyn ToolCallHandler>> {
        self.handlers.iter().find(|h| h.spec().name == tool)
    }

    pub async fn dispatch(&self, call: ToolCall) -> DispatchOutcome {
        let Some(handler) = self.handler(&call.tool) else {
            tracing::warn!(tool = %call.tool, "Call for unknown tool");
            return DispatchOutcome::Reply(format!("❌ Unknown tool: {}", call.tool));
        };
        let spec = handler.spec();
        let session = self.session();

        let mut op_name = call.op.trim().to_string();
        if op_name.is_empty() && !call.args.is_empty() && spec.ops.len() == 1 {
            op_name = spec.ops[0].name.to_string();
        }
        if op_name.is_empty() || op_name.contains("help") {
            return DispatchOutcome::Reply(spec.help.to_string());
        }
        if op_name.contains("status") {
            let ctx = CallContext {
                session: &session,
                setup: &self.setup,
            };
            return DispatchOutcome::Reply(handler.status(&ctx).await);
        }
        let Some(op) = spec.op(&op_name) else {
            let err = ToolError::UnknownOp {
                tool: spec.name,
                op: op_name,
            };
            return DispatchOutcome::Reply(err.to_model_message(spec.name));
        };

        let mut args = call.args.clone();
        self.setup.apply_defaults(spec.name, op, &mut args);
        let args = normalize_args(op, &args);
        if let Err(e) = validate_args(op, &args).and_then(|_| handler.check(&self.setup, op, &args)) {
            tracing::debug!(tool = spec.name, op = op.name, "Rejected call: {}", e);
            return DispatchOutcome::Reply(format!(
                "{}\n\n{}",
                e.to_model_message(spec.name),
                op.usage(spec.name)
            ));
        }

        if handler.needs_google(op) && !session.is_authenticated().await {
            let auth_url = session.authorization_url(&scopes_for(op)).await;
            return DispatchOutcome::Reply(
                ToolError::NotAuthenticated { auth_url }.to_model_message(spec.name),
            );
        }

        let Some(mutation) = op.mutation else {
            return DispatchOutcome::Reply(self.run(handler.as_ref(), &session, op, &args).await);
        };

        let proposal = Proposal {
            tool: spec.name,
            op: op.name,
            args: &args,
            setup_key: mutation.key,
            command: handler.describe_change(op, &args),
            explanation: mutation.explanation,
        };
        let pending = self.gate.propose(proposal);
        if !call.confirmed {
            return DispatchOutcome::NeedsConfirmation(pending);
        }
        self.finish(pending.id.as_str(), Decision::Approved, session).await
    }

    /// Apply the host's answer to an earlier `NeedsConfirmation`.
    pub async fn resolve(&self, pending_id: &str, decision: Decision) -> DispatchOutcome {
        self.finish(pending_id, decision, self.session()).await
    }

    async fn finish(&self, pending_id: &str, decision: Decision, session: AuthSession) -> DispatchOutcome {
        let change = match self.gate.commit(pending_id, decision) {
            Resolution::Execute(change) => change,
            Resolution::Cancelled(message) => return DispatchOutcome::Reply(message),
        };
        let Some(handler) = self.handler(&change.tool) else {
            return DispatchOutcome::Reply(format!("❌ Unknown tool: {}", change.tool));
        };
        let Some(op) = handler.spec().op(&change.op) else {
            return DispatchOutcome::Reply(format!("❌ Unknown operation: {}", change.op));
        };
        tracing::info!(
            pending_id = %change.id,
            tool = %change.tool,
            op = %change.op,
            "Executing confirmed change"
        );
        DispatchOutcome::Reply(self.run(handler.as_ref(), &session, op, &change.args).await)
    }

    async fn run(
        &self,
        handler: &dyn ToolCallHandler,
        session: &AuthSession,
        op: &OpSpec,
        args: &Args,
    ) -> String {
        let spec = handler.spec();
        let ctx = CallContext {
            session,
            setup: &self.setup,
        };
        match handler.execute(&ctx, op, args).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(tool = spec.name, op = op.name, "Tool call failed: {}", e);
                match e {
                    ToolError::Api(GoogleApiError::Unauthorized { service, status }) => {
                        match session.authorization_url(&scopes_for(op)).await {
                            Some(url) => format!(
                                "❌ {} authentication error: {}\n\nPlease authorize at:\n{}\n\nThen retry.",
                                service, status, url
                            ),
                            None => e.to_model_message(spec.name),
                        }
                    }
                    ToolError::Api(GoogleApiError::Auth(_)) => {
                        let auth_url = session.authorization_url(&scopes_for(op)).await;
                        ToolError::NotAuthenticated { auth_url }.to_model_message(spec.name)
                    }
                    other => other.to_model_message(spec.name),
                }
            }
        }
    }
}

/// Authorization always asks for the full bot scope set plus whatever the
/// operation adds, so one consent covers every tool.
fn scopes_for(op: &OpSpec) -> Vec<&'static str> {
    let mut scopes = REQUIRED_SCOPES.to_vec();
    for scope in op.extra_scopes {
        if !scopes.contains(scope) {
            scopes.push(scope);
        }
    }
    scopes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::analytics::analytics_service::testing::FakeAnalytics;
    use crate::core::analytics::{AnalyticsService, GoogleAnalyticsTool};
    use crate::core::auth::testing::{persona, ScriptedTokens};
    use crate::core::auth::SCOPE_ANALYTICS_EDIT;
    use crate::core::dispatch::AskQuestionsTool;
    use crate::core::documents::testing::InMemoryDocuments;
    use crate::core::documents::PolicyDocumentTool;
    use crate::core::tag_manager::tag_manager_service::testing::FakeTagManager;
    use crate::core::tag_manager::tag_manager_models::Trigger;
    use crate::core::tag_manager::{TagManagerService, TagManagerTool};
    use serde_json::json;

    struct Fixture {
        gtm: Arc<FakeTagManager>,
        ga: Arc<FakeAnalytics>,
        tokens: Arc<ScriptedTokens>,
        dispatcher: Dispatcher,
    }

    fn fixture_with(tokens: ScriptedTokens, setup: SetupConfig) -> Fixture {
        let gtm = Arc::new(FakeTagManager {
            triggers: vec![Trigger {
                trigger_id: "2".into(),
                name: "All Pages".into(),
                trigger_type: "pageview".into(),
            }],
            ..FakeTagManager::with_workspace()
        });
        let ga = Arc::new(FakeAnalytics::default());
        let tokens = Arc::new(tokens);
        let handlers: Vec<Arc<dyn ToolCallHandler>> = vec![
            Arc::new(GoogleAnalyticsTool::new(Arc::new(AnalyticsService::new(ga.clone())))),
            Arc::new(TagManagerTool::new(
                Arc::new(TagManagerService::new(gtm.clone())),
                None,
            )),
            Arc::new(PolicyDocumentTool::new(Arc::new(InMemoryDocuments::default()))),
            Arc::new(AskQuestionsTool),
        ];
        let dispatcher = Dispatcher::new(handlers, tokens.clone(), persona(), setup);
        Fixture {
            gtm,
            ga,
            tokens,
            dispatcher,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(ScriptedTokens::valid("tok"), SetupConfig::default())
    }

    fn call(tool: &str, op: &str, args: serde_json::Value) -> ToolCall {
        ToolCall {
            call_id: "call-1".into(),
            tool: tool.into(),
            op: op.into(),
            args: args.as_object().cloned().unwrap_or_default(),
            confirmed: false,
        }
    }

    fn reply(outcome: DispatchOutcome) -> String {
        match outcome {
            DispatchOutcome::Reply(text) => text,
            other => panic!("expected a reply, got {other:?}"),
        }
    }

    fn publish() -> ToolCall {
        call(
            "google_tag_manager",
            "publishVersion",
            json!({"accountId": "1", "containerId": "2", "versionId": "5"}),
        )
    }

    #[tokio::test]
    async fn mutation_waits_for_approval() {
        let f = fixture();
        let outcome = f.dispatcher.dispatch(publish()).await;
        let pending = match outcome {
            DispatchOutcome::NeedsConfirmation(p) => p,
            other => panic!("expected confirmation, got {other:?}"),
        };
        assert_eq!(pending.setup_key.as_str(), "gtm_publish");
        assert_eq!(pending.command, "publish version 5");
        assert_eq!(
            pending.explanation,
            "This will publish the container version to PRODUCTION"
        );
        assert_eq!(f.gtm.write_count(), 0);

        let done = reply(f.dispatcher.resolve(&pending.id, Decision::Approved).await);
        assert_eq!(done, "✅ Published version to production: Live");
        assert_eq!(f.gtm.writes(), vec!["publish:5"]);

        let again = reply(f.dispatcher.resolve(&pending.id, Decision::Approved).await);
        assert!(again.starts_with("❌"));
        assert_eq!(f.gtm.write_count(), 1);
    }

    #[tokio::test]
    async fn declined_change_never_runs() {
        let f = fixture();
        let pending = match f.dispatcher.dispatch(publish()).await {
            DispatchOutcome::NeedsConfirmation(p) => p,
            other => panic!("expected confirmation, got {other:?}"),
        };
        let text = reply(f.dispatcher.resolve(&pending.id, Decision::Declined).await);
        assert!(text.contains("declined"));
        assert_eq!(f.gtm.write_count(), 0);
        assert_eq!(f.dispatcher.pending_count(), 0);
    }

    #[tokio::test]
    async fn confirmed_call_executes_once() {
        let f = fixture();
        let mut confirmed = call(
            "google_tag_manager",
            "linkGA4",
            json!({"accountId": "1", "containerId": "2", "measurementId": "G-ABC"}),
        );
        confirmed.confirmed = true;
        let text = reply(f.dispatcher.dispatch(confirmed).await);
        assert!(text.starts_with("✅ Created GA4 configuration tag: GA4 Configuration"));
        assert_eq!(f.gtm.write_count(), 1);
        assert_eq!(f.dispatcher.pending_count(), 0);
    }

    #[tokio::test]
    async fn missing_params_make_no_remote_call() {
        let f = fixture();
        let text = reply(
            f.dispatcher
                .dispatch(call("google_tag_manager", "createTag", json!({"accountId": "1"})))
                .await,
        );
        assert!(text.contains("'containerId'"));
        assert!(text.contains("'tagName'"));
        assert!(text.contains("'tagType'"));
        assert!(text.contains("google_tag_manager(op=\"createTag\")"));
        assert_eq!(f.gtm.call_count(), 0);
        assert_eq!(f.dispatcher.pending_count(), 0);
    }

    #[tokio::test]
    async fn setup_defaults_fill_missing_ids() {
        let f = fixture_with(
            ScriptedTokens::valid("tok"),
            SetupConfig {
                gtm_default_account: Some("1".into()),
                gtm_default_container: Some("2".into()),
                ..Default::default()
            },
        );
        let outcome = f
            .dispatcher
            .dispatch(call("google_tag_manager", "listTags", json!({})))
            .await;
        assert_eq!(reply(outcome), "🏷️ No tags found in workspace 10");
    }

    #[tokio::test]
    async fn unauthenticated_call_gets_auth_link() {
        let f = fixture_with(ScriptedTokens::missing(), SetupConfig::default());
        let text = reply(
            f.dispatcher
                .dispatch(call("google_tag_manager", "listAccounts", json!({})))
                .await,
        );
        assert!(text.contains("authorize at:\nhttps://auth.example/start"));
        assert_eq!(f.gtm.call_count(), 0);

        let pending = f.dispatcher.dispatch(publish()).await;
        assert!(pending.text().is_some(), "no proposal without credentials");
        assert_eq!(f.dispatcher.pending_count(), 0);
    }

    #[tokio::test]
    async fn invalid_measurement_id_is_rejected_before_proposal() {
        let f = fixture();
        let text = reply(
            f.dispatcher
                .dispatch(call(
                    "google_tag_manager",
                    "linkGA4",
                    json!({"accountId": "1", "containerId": "2", "measurementId": "UA-123"}),
                ))
                .await,
        );
        assert!(text.contains("measurementId"));
        assert_eq!(f.dispatcher.pending_count(), 0);
    }

    #[tokio::test]
    async fn help_status_and_unknown_ops() {
        let f = fixture();
        let help = reply(f.dispatcher.dispatch(call("google_tag_manager", "", json!({}))).await);
        assert!(help.contains("publishVersion"));

        let status = reply(f.dispatcher.dispatch(call("google_analytics", "status", json!({}))).await);
        assert!(status.contains("Authenticated: ✅ Yes"));

        let unknown = reply(f.dispatcher.dispatch(call("google_analytics", "explode", json!({}))).await);
        assert!(unknown.starts_with("❌ Unknown operation: explode"));

        let tool = reply(f.dispatcher.dispatch(call("nope", "help", json!({}))).await);
        assert_eq!(tool, "❌ Unknown tool: nope");
        assert_eq!(f.tokens.fetch_count(), 1);
        assert_eq!(f.ga.query_count(), 0);
    }

    #[tokio::test]
    async fn ask_questions_needs_no_op_or_google() {
        let f = fixture_with(ScriptedTokens::missing(), SetupConfig::default());
        let text = reply(
            f.dispatcher
                .dispatch(call(
                    "ask_questions",
                    "",
                    json!({"questions": [{"q": "Do you sell online?", "type": "yes_no"}]}),
                ))
                .await,
        );
        assert!(text.contains("1. Do you sell online? (yes/no)"));
        assert_eq!(f.tokens.fetch_count(), 0);
    }

    #[test]
    fn create_property_asks_for_edit_scope() {
        let op = crate::core::tools::GOOGLE_ANALYTICS_TOOL
            .op("createProperty")
            .unwrap();
        let scopes = scopes_for(op);
        assert!(scopes.contains(&SCOPE_ANALYTICS_EDIT));
        assert_eq!(&scopes[..REQUIRED_SCOPES.len()], REQUIRED_SCOPES);
    }
}
