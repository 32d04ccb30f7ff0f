use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::document_store::{normalize_path, DocumentError, PolicyDocumentStore};
use crate::core::dispatch::{CallContext, ToolCallHandler};
use crate::core::tools::{parse_request, Args, OpSpec, ToolError, ToolSpec, POLICY_DOCUMENT_TOOL};

#[derive(Debug, Deserialize)]
struct PathRequest {
    #[serde(default)]
    p: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WriteRequest {
    p: String,
    text: String,
}

impl From<DocumentError> for ToolError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::InvalidPath(path) => {
                ToolError::invalid("p", format!("'{}' must be an absolute path without '..'", path))
            }
            DocumentError::Host(msg) => ToolError::Host(msg),
        }
    }
}

/// `flexus_policy_document`: workspace JSON documents.
pub struct PolicyDocumentTool {
    store: Arc<dyn PolicyDocumentStore>,
}

impl PolicyDocumentTool {
    pub fn new(store: Arc<dyn PolicyDocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ToolCallHandler for PolicyDocumentTool {
    fn spec(&self) -> &'static ToolSpec {
        &POLICY_DOCUMENT_TOOL
    }

    async fn execute(
        &self,
        _ctx: &CallContext<'_>,
        op: &OpSpec,
        args: &Args,
    ) -> Result<String, ToolError> {
        match op.name {
            "list" => {
                let request: PathRequest = parse_request(op, args)?;
                let folder = normalize_path(request.p.as_deref().unwrap_or("/"))?;
                let entries = self.store.list(&folder).await?;
                if entries.is_empty() {
                    return Ok(format!("📁 No documents under {}", folder));
                }
                let mut out = vec![format!("📁 Documents under {}:", folder)];
                out.extend(entries.into_iter().map(|e| match e.updated_at {
                    Some(at) => format!("  {} (updated {})", e.path, at.format("%Y-%m-%d %H:%M")),
                    None => format!("  {}", e.path),
                }));
                Ok(out.join("\n"))
            }
            "cat" => {
                let request: PathRequest = parse_request(op, args)?;
                let path = normalize_path(request.p.as_deref().unwrap_or_default())?;
                match self.store.cat(&path).await? {
                    Some(doc) => Ok(format!(
                        "📄 {}\n\n{}",
                        path,
                        serde_json::to_string_pretty(&doc)
                            .map_err(|e| ToolError::Host(e.to_string()))?
                    )),
                    None => Ok(format!("❌ Document not found: {}", path)),
                }
            }
            "write" => {
                let request: WriteRequest = parse_request(op, args)?;
                let path = normalize_path(&request.p)?;
                if path.ends_with('/') {
                    return Err(ToolError::invalid("p", "cannot write to a folder"));
                }
                let doc: Value = serde_json::from_str(&request.text)
                    .map_err(|e| ToolError::invalid("text", format!("not valid JSON: {}", e)))?;
                self.store.write(&path, &doc).await?;
                tracing::info!(path = %path, "Policy document written");
                Ok(format!("✅ Written {}", path))
            }
            other => Err(ToolError::UnknownOp {
                tool: self.spec().name,
                op: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth::testing::{persona, ScriptedTokens};
    use crate::core::auth::AuthSession;
    use crate::core::documents::testing::InMemoryDocuments;
    use crate::core::setup::SetupConfig;
    use serde_json::json;

    #[tokio::test]
    async fn write_then_cat_and_list() {
        let store = Arc::new(InMemoryDocuments::default());
        let tool = PolicyDocumentTool::new(store.clone());
        let session = AuthSession::new(persona(), Arc::new(ScriptedTokens::missing()));
        let setup = SetupConfig::default();
        let ctx = CallContext {
            session: &session,
            setup: &setup,
        };
        let op = |name: &str| POLICY_DOCUMENT_TOOL.op(name).unwrap();
        let args = |v: Value| v.as_object().cloned().unwrap();

        let written = tool
            .execute(
                &ctx,
                op("write"),
                &args(json!({"p": "/analytics/setup", "text": "{\"measurementId\": \"G-1\"}"})),
            )
            .await
            .unwrap();
        assert!(written.contains("/analytics/setup"));

        let shown = tool
            .execute(&ctx, op("cat"), &args(json!({"p": "/analytics/setup"})))
            .await
            .unwrap();
        assert!(shown.contains("G-1"));

        let listed = tool
            .execute(&ctx, op("list"), &args(json!({"p": "/analytics/"})))
            .await
            .unwrap();
        assert!(listed.contains("/analytics/setup"));
    }

    #[tokio::test]
    async fn non_json_text_is_rejected() {
        let tool = PolicyDocumentTool::new(Arc::new(InMemoryDocuments::default()));
        let session = AuthSession::new(persona(), Arc::new(ScriptedTokens::missing()));
        let setup = SetupConfig::default();
        let ctx = CallContext {
            session: &session,
            setup: &setup,
        };
        let mut args = Args::new();
        args.insert("p".into(), json!("/a"));
        args.insert("text".into(), json!("not json"));
        let err = tool
            .execute(&ctx, POLICY_DOCUMENT_TOOL.op("write").unwrap(), &args)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidParam { ref field, .. } if field == "text"));
    }
}
