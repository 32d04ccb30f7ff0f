use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::report_models::slugify;
use super::report_service::ReportService;
use crate::core::analytics::analytics_models::ReportArgs;
use crate::core::analytics::{format_number, recipes};
use crate::core::dispatch::{CallContext, ToolCallHandler};
use crate::core::tools::{parse_request, Args, OpSpec, ToolError, ToolSpec, REPORT_STORE_TOOL};

const DEFAULT_LIST_LIMIT: u32 = 20;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListRequest {
    #[serde(default)]
    report_name: Option<String>,
    #[serde(default)]
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct IdRequest {
    id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveRequest {
    report_name: String,
    #[serde(flatten)]
    report: ReportArgs,
}

/// `report_store`: browse and produce stored reports.
pub struct ReportStoreTool {
    reports: Arc<ReportService>,
}

impl ReportStoreTool {
    pub fn new(reports: Arc<ReportService>) -> Self {
        Self { reports }
    }
}

fn store_error(e: impl std::fmt::Display) -> ToolError {
    ToolError::Store(e.to_string())
}

#[async_trait]
impl ToolCallHandler for ReportStoreTool {
    fn spec(&self) -> &'static ToolSpec {
        &REPORT_STORE_TOOL
    }

    fn needs_google(&self, op: &OpSpec) -> bool {
        op.name == "save"
    }

    async fn execute(
        &self,
        ctx: &CallContext<'_>,
        op: &OpSpec,
        args: &Args,
    ) -> Result<String, ToolError> {
        let store = self.reports.store();
        match op.name {
            "list" => {
                let request: ListRequest = parse_request(op, args)?;
                let limit = request.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, 200);
                let entries = store
                    .list(request.report_name.as_deref(), limit)
                    .await
                    .map_err(store_error)?;
                if entries.is_empty() {
                    return Ok("🗂️ No stored reports.".to_string());
                }
                let mut out = vec!["🗂️ Stored reports (newest first):".to_string()];
                for entry in entries {
                    out.push(format!(
                        "• #{} {} (property {}, {})",
                        entry.id,
                        entry.report_name,
                        entry.property_id,
                        entry.created_at.format("%Y-%m-%d %H:%M")
                    ));
                }
                Ok(out.join("\n"))
            }
            "get" => {
                let request: IdRequest = parse_request(op, args)?;
                match store.get(request.id).await.map_err(store_error)? {
                    Some(report) => Ok(format!("#{}\n{}", report.id, report.output.to_text())),
                    None => Ok(format!("❌ Report #{} not found", request.id)),
                }
            }
            "save" => {
                let request: SaveRequest = parse_request(op, args)?;
                let query = recipes::report_query(&request.report)?;
                let (id, output) = self
                    .reports
                    .generate_and_store(
                        ctx.session,
                        &request.report_name,
                        &query,
                        &slugify(&request.report_name),
                    )
                    .await?;
                let totals: Vec<String> = output
                    .totals
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, format_number(*v)))
                    .collect();
                Ok(format!(
                    "✅ Saved report '{}' as #{} ({} rows). Totals: {}",
                    output.report_name,
                    id,
                    output.rows.len(),
                    totals.join(", ")
                ))
            }
            "delete" => {
                let request: IdRequest = parse_request(op, args)?;
                if store.delete(request.id).await.map_err(store_error)? {
                    Ok(format!("🗑️ Deleted report #{}", request.id))
                } else {
                    Ok(format!("❌ Report #{} not found", request.id))
                }
            }
            other => Err(ToolError::UnknownOp {
                tool: self.spec().name,
                op: other.to_string(),
            }),
        }
    }
}
