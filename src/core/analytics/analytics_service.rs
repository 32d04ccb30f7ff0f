use std::sync::Arc;

use async_trait::async_trait;

use super::analytics_models::{
    AccountSummary, DimensionFilter, FilterOperator, FunnelArgs, FunnelStep, NewProperty,
    PropertySummary, ReportQuery, ReportRow, ReportTable,
};
use super::funnel::compute_funnel;
use super::recipes;
use crate::core::auth::AuthSession;
use crate::core::tools::{GoogleApiError, ToolError};

/// Port to the GA4 Data and Admin APIs.
#[async_trait]
pub trait AnalyticsApi: Send + Sync {
    async fn run_report(
        &self,
        session: &AuthSession,
        query: &ReportQuery,
    ) -> Result<ReportTable, GoogleApiError>;

    async fn list_account_summaries(
        &self,
        session: &AuthSession,
    ) -> Result<Vec<AccountSummary>, GoogleApiError>;

    async fn create_property(
        &self,
        session: &AuthSession,
        property: &NewProperty,
    ) -> Result<PropertySummary, GoogleApiError>;
}

pub struct AnalyticsService {
    api: Arc<dyn AnalyticsApi>,
}

impl AnalyticsService {
    pub fn new(api: Arc<dyn AnalyticsApi>) -> Self {
        Self { api }
    }

    pub async fn list_properties(
        &self,
        session: &AuthSession,
    ) -> Result<Vec<AccountSummary>, ToolError> {
        Ok(self.api.list_account_summaries(session).await?)
    }

    pub async fn run_report(
        &self,
        session: &AuthSession,
        query: &ReportQuery,
    ) -> Result<ReportTable, ToolError> {
        tracing::debug!(
            property_id = %query.property_id,
            metrics = ?query.metrics,
            dimensions = ?query.dimensions,
            "Running GA4 report"
        );
        Ok(self.api.run_report(session, query).await?)
    }

    pub async fn create_property(
        &self,
        session: &AuthSession,
        property: &NewProperty,
    ) -> Result<PropertySummary, ToolError> {
        let created = self.api.create_property(session, property).await?;
        tracing::info!(
            property_id = %created.property_id,
            account_id = %property.account_id,
            "Created GA4 property"
        );
        Ok(created)
    }

    /// The event's row over the last 7 days, `None` when it was never seen.
    pub async fn event_activity(
        &self,
        session: &AuthSession,
        property_id: &str,
        event_name: &str,
    ) -> Result<Option<ReportRow>, ToolError> {
        let mut query = recipes::event_config_query(property_id)?;
        query.filters.push(DimensionFilter {
            field: "eventName".to_string(),
            operator: FilterOperator::Equals,
            value: event_name.to_string(),
        });
        let table = self.run_report(session, &query).await?;
        Ok(table
            .rows
            .into_iter()
            .find(|row| row.dimensions.first().map(String::as_str) == Some(event_name)))
    }

    pub async fn funnel(
        &self,
        session: &AuthSession,
        args: &FunnelArgs,
    ) -> Result<Vec<FunnelStep>, ToolError> {
        if args.funnel_steps.is_empty() {
            return Err(ToolError::MissingParams(vec!["funnelSteps".to_string()]));
        }
        if let Some(blank) = args.funnel_steps.iter().position(|s| s.page.trim().is_empty()) {
            return Err(ToolError::invalid(
                "funnelSteps",
                format!("step {} has no page", blank + 1),
            ));
        }
        let query = recipes::funnel_query(args)?;
        let table = self.run_report(session, &query).await?;
        Ok(compute_funnel(&args.funnel_steps, &table))
    }
}

/// Rows between `start` and `end` in report order, both inclusive.
///
/// An unknown start page starts at the first row and an unknown (or empty)
/// end page runs to the last row.
pub fn journey_rows(table: &ReportTable, start: &str, end: &str) -> Vec<ReportRow> {
    let path_idx = table.dimension_index("pagePath").unwrap_or(0);
    let position = |page: &str| {
        table
            .rows
            .iter()
            .position(|row| row.dimensions.get(path_idx).map(String::as_str) == Some(page))
    };

    let from = position(start).unwrap_or(0);
    let to = if end.is_empty() {
        None
    } else {
        position(end)
    }
    .unwrap_or(table.rows.len().saturating_sub(1));

    if table.rows.is_empty() || to < from {
        return Vec::new();
    }
    table.rows[from..=to].to_vec()
}

#[cfg(test)]
pub mod testing {
    //! In-memory GA4 fake.

    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct FakeAnalytics {
        pub table: ReportTable,
        pub accounts: Vec<AccountSummary>,
        pub queries: Mutex<Vec<ReportQuery>>,
        pub created: Mutex<Vec<NewProperty>>,
    }

    impl FakeAnalytics {
        pub fn with_table(table: ReportTable) -> Self {
            Self {
                table,
                ..Default::default()
            }
        }

        pub fn query_count(&self) -> usize {
            self.queries.lock().map(|q| q.len()).unwrap_or(0)
        }

        pub fn last_query(&self) -> Option<ReportQuery> {
            self.queries.lock().ok().and_then(|q| q.last().cloned())
        }

        pub fn created_count(&self) -> usize {
            self.created.lock().map(|c| c.len()).unwrap_or(0)
        }
    }

    #[async_trait]
    impl AnalyticsApi for FakeAnalytics {
        async fn run_report(
            &self,
            _session: &AuthSession,
            query: &ReportQuery,
        ) -> Result<ReportTable, GoogleApiError> {
            self.queries.lock().unwrap().push(query.clone());
            Ok(self.table.clone())
        }

        async fn list_account_summaries(
            &self,
            _session: &AuthSession,
        ) -> Result<Vec<AccountSummary>, GoogleApiError> {
            Ok(self.accounts.clone())
        }

        async fn create_property(
            &self,
            _session: &AuthSession,
            property: &NewProperty,
        ) -> Result<PropertySummary, GoogleApiError> {
            self.created.lock().unwrap().push(property.clone());
            Ok(PropertySummary {
                property_id: "999".into(),
                display_name: property.display_name.clone(),
                parent_account: format!("accounts/{}", property.account_id),
            })
        }
    }

    pub fn page_table(rows: &[(&str, f64, f64)]) -> ReportTable {
        ReportTable {
            dimension_headers: vec!["pagePath".into()],
            metric_headers: vec!["screenPageViews".into(), "sessions".into()],
            rows: rows
                .iter()
                .map(|(path, views, sessions)| ReportRow {
                    dimensions: vec![path.to_string()],
                    metrics: vec![*views, *sessions],
                })
                .collect(),
            row_count: rows.len() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::core::analytics::analytics_models::FunnelStepInput;
    use crate::core::auth::testing::{persona, ScriptedTokens};

    fn session() -> AuthSession {
        AuthSession::new(persona(), Arc::new(ScriptedTokens::valid("tok")))
    }

    #[test]
    fn journey_is_sliced_between_pages() {
        let table = page_table(&[
            ("/", 100.0, 80.0),
            ("/pricing", 60.0, 50.0),
            ("/checkout", 20.0, 20.0),
            ("/blog", 10.0, 9.0),
        ]);
        let rows = journey_rows(&table, "/", "/checkout");
        let paths: Vec<_> = rows.iter().map(|r| r.dimensions[0].as_str()).collect();
        assert_eq!(paths, vec!["/", "/pricing", "/checkout"]);

        assert_eq!(journey_rows(&table, "/pricing", "").len(), 3);
        assert!(journey_rows(&table, "/blog", "/pricing").is_empty());
    }

    #[tokio::test]
    async fn funnel_runs_one_page_path_report() {
        let fake = Arc::new(FakeAnalytics::with_table(page_table(&[
            ("/", 100.0, 100.0),
            ("/cart", 30.0, 25.0),
        ])));
        let service = AnalyticsService::new(fake.clone());
        let args = FunnelArgs {
            property_id: "123".into(),
            funnel_steps: vec![
                FunnelStepInput {
                    name: Some("Home".into()),
                    page: "/".into(),
                },
                FunnelStepInput {
                    name: Some("Cart".into()),
                    page: "/cart".into(),
                },
            ],
            date_range: None,
            start_date: None,
            end_date: None,
        };

        let steps = service.funnel(&session(), &args).await.unwrap();
        assert_eq!(fake.query_count(), 1);
        assert_eq!(steps[1].rate_from_previous, 0.25);
        let query = fake.last_query().unwrap();
        assert_eq!(query.dimensions, vec!["pagePath"]);
        assert_eq!(query.date_range.start_date, "30daysAgo");
    }

    #[tokio::test]
    async fn event_activity_filters_on_the_event() {
        let fake = Arc::new(FakeAnalytics::with_table(ReportTable {
            dimension_headers: vec!["eventName".into()],
            metric_headers: vec!["eventCount".into()],
            rows: vec![ReportRow {
                dimensions: vec!["purchase".into()],
                metrics: vec![42.0],
            }],
            row_count: 1,
        }));
        let service = AnalyticsService::new(fake.clone());

        let row = service
            .event_activity(&session(), "123", "purchase")
            .await
            .unwrap();
        assert_eq!(row.map(|r| r.metrics[0]), Some(42.0));
        let query = fake.last_query().unwrap();
        assert_eq!(query.filters[0].value, "purchase");
        assert_eq!(query.date_range.start_date, "7daysAgo");

        let missing = service
            .event_activity(&session(), "123", "refund")
            .await
            .unwrap();
        assert!(missing.is_none());
    }
}
