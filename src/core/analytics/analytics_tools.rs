use std::sync::Arc;

use async_trait::async_trait;

use super::analytics_format::{format_funnel, format_journey, format_properties, format_report};
use super::analytics_models::{FunnelArgs, NewProperty, ReportArgs};
use super::analytics_service::{journey_rows, AnalyticsService};
use super::recipes;
use crate::core::dispatch::{CallContext, ToolCallHandler};
use crate::core::tools::{
    parse_request, Args, OpSpec, ToolError, ToolSpec, GOOGLE_ANALYTICS_ENHANCED_TOOL,
    GOOGLE_ANALYTICS_TOOL,
};

/// `google_analytics`: properties, plain reports and property creation.
pub struct GoogleAnalyticsTool {
    service: Arc<AnalyticsService>,
}

impl GoogleAnalyticsTool {
    pub fn new(service: Arc<AnalyticsService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl ToolCallHandler for GoogleAnalyticsTool {
    fn spec(&self) -> &'static ToolSpec {
        &GOOGLE_ANALYTICS_TOOL
    }

    fn describe_change(&self, op: &OpSpec, args: &Args) -> String {
        match op.name {
            "createProperty" => format!(
                "create GA4 property: {}",
                args.get("displayName").and_then(|v| v.as_str()).unwrap_or_default()
            ),
            other => other.to_string(),
        }
    }

    async fn execute(
        &self,
        ctx: &CallContext<'_>,
        op: &OpSpec,
        args: &Args,
    ) -> Result<String, ToolError> {
        match op.name {
            "listProperties" => {
                let accounts = self.service.list_properties(ctx.session).await?;
                Ok(format_properties(&accounts))
            }
            "getReport" => {
                let request: ReportArgs = parse_request(op, args)?;
                let query = recipes::report_query(&request)?;
                let table = self.service.run_report(ctx.session, &query).await?;
                Ok(format_report("Analytics Report", &query, &table))
            }
            "createProperty" => {
                let request: NewProperty = parse_request(op, args)?;
                let created = self.service.create_property(ctx.session, &request).await?;
                Ok(format!(
                    "✅ Created GA4 property: {} (Property ID: {})",
                    created.display_name, created.property_id
                ))
            }
            other => Err(ToolError::UnknownOp {
                tool: self.spec().name,
                op: other.to_string(),
            }),
        }
    }
}

/// `google_analytics_enhanced`: fixed report recipes for event setup work.
pub struct EnhancedAnalyticsTool {
    service: Arc<AnalyticsService>,
}

impl EnhancedAnalyticsTool {
    pub fn new(service: Arc<AnalyticsService>) -> Self {
        Self { service }
    }

    async fn recipe_report(
        &self,
        ctx: &CallContext<'_>,
        title: &str,
        query: crate::core::analytics::ReportQuery,
    ) -> Result<String, ToolError> {
        let table = self.service.run_report(ctx.session, &query).await?;
        Ok(format_report(title, &query, &table))
    }
}

#[async_trait]
impl ToolCallHandler for EnhancedAnalyticsTool {
    fn spec(&self) -> &'static ToolSpec {
        &GOOGLE_ANALYTICS_ENHANCED_TOOL
    }

    async fn execute(
        &self,
        ctx: &CallContext<'_>,
        op: &OpSpec,
        args: &Args,
    ) -> Result<String, ToolError> {
        if op.name == "getFunnelReport" {
            let request: FunnelArgs = parse_request(op, args)?;
            let steps = self.service.funnel(ctx.session, &request).await?;
            return Ok(format_funnel(&steps));
        }

        let request: ReportArgs = parse_request(op, args)?;
        match op.name {
            "getEventConfig" => {
                let event = request.event_name.clone().unwrap_or_default();
                match self
                    .service
                    .event_activity(ctx.session, &request.property_id, &event)
                    .await?
                {
                    Some(row) => Ok(format!(
                        "✅ Event '{}' is being tracked.\n\nEvents in the last 7 days: {}",
                        event,
                        row.metrics
                            .first()
                            .map(|c| super::format_number(*c))
                            .unwrap_or_else(|| "0".to_string())
                    )),
                    None => Ok(format!(
                        "⚠️ Event '{}' not found in recent data. It may not be tracked yet or has no data in the last 7 days.",
                        event
                    )),
                }
            }
            "listEvents" => {
                self.recipe_report(ctx, "Tracked Events", recipes::events_query(&request)?)
                    .await
            }
            "getEventReport" => {
                self.recipe_report(ctx, "Event Report", recipes::event_report_query(&request)?)
                    .await
            }
            "getConversions" => {
                self.recipe_report(ctx, "Conversions", recipes::conversions_query(&request)?)
                    .await
            }
            "getEcommerceReport" => {
                self.recipe_report(ctx, "E-commerce Report", recipes::ecommerce_query(&request)?)
                    .await
            }
            "getUserJourney" => {
                let query = recipes::journey_query(&request)?;
                let table = self.service.run_report(ctx.session, &query).await?;
                let start = request.start_page.as_deref().unwrap_or("/");
                let end = request.end_page.as_deref().unwrap_or_default();
                let rows = journey_rows(&table, start, end);
                Ok(format_journey(start, end, &table, &rows))
            }
            "customQuery" => {
                self.recipe_report(ctx, "Custom Report", recipes::custom_query(&request)?)
                    .await
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
    use crate::core::analytics::analytics_models::{ReportRow, ReportTable};
    use crate::core::analytics::analytics_service::testing::{page_table, FakeAnalytics};
    use crate::core::auth::testing::{persona, ScriptedTokens};
    use crate::core::auth::AuthSession;
    use crate::core::setup::SetupConfig;
    use serde_json::json;

    fn args(value: serde_json::Value) -> Args {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn get_report_renders_rows() {
        let fake = Arc::new(FakeAnalytics::with_table(ReportTable {
            dimension_headers: vec!["date".into()],
            metric_headers: vec!["sessions".into()],
            rows: vec![ReportRow {
                dimensions: vec!["20240601".into()],
                metrics: vec![31.0],
            }],
            row_count: 1,
        }));
        let tool = GoogleAnalyticsTool::new(Arc::new(AnalyticsService::new(fake.clone())));
        let session = AuthSession::new(persona(), Arc::new(ScriptedTokens::valid("tok")));
        let setup = SetupConfig::default();
        let ctx = CallContext {
            session: &session,
            setup: &setup,
        };

        let op = tool.spec().op("getReport").unwrap();
        let text = tool
            .execute(
                &ctx,
                op,
                &args(json!({"propertyId": "123", "metrics": "sessions", "dateRange": "yesterday"})),
            )
            .await
            .unwrap();
        assert!(text.contains("20240601 | 31"));
        assert_eq!(fake.last_query().unwrap().metrics, vec!["sessions"]);
    }

    #[tokio::test]
    async fn user_journey_slices_rows() {
        let fake = Arc::new(FakeAnalytics::with_table(page_table(&[
            ("/", 100.0, 90.0),
            ("/pricing", 50.0, 40.0),
            ("/checkout/complete", 10.0, 10.0),
            ("/blog", 5.0, 5.0),
        ])));
        let tool = EnhancedAnalyticsTool::new(Arc::new(AnalyticsService::new(fake)));
        let session = AuthSession::new(persona(), Arc::new(ScriptedTokens::valid("tok")));
        let setup = SetupConfig::default();
        let ctx = CallContext {
            session: &session,
            setup: &setup,
        };
        let op = tool.spec().op("getUserJourney").unwrap();
        let text = tool
            .execute(
                &ctx,
                op,
                &args(json!({"propertyId": "1", "startPage": "/", "endPage": "/checkout/complete"})),
            )
            .await
            .unwrap();
        assert!(text.contains("/pricing"));
        assert!(!text.contains("/blog"));
    }
}
