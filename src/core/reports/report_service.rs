use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use super::report_models::{unique_slugs, ReportOutput, ScheduledReportConfig};
use super::report_store::ReportStore;
use crate::core::analytics::{AnalyticsService, ReportQuery};
use crate::core::auth::AuthSession;
use crate::core::documents::PolicyDocumentStore;
use crate::core::tools::ToolError;

/// Policy-document path a report run is mirrored to.
pub fn report_document_path(slug: &str, date: NaiveDate) -> String {
    format!("/analytics/reports/{}/{}", slug, date.format("%Y-%m-%d"))
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ScheduledRunSummary {
    pub generated: Vec<(String, i64)>,
    pub skipped: Vec<String>,
    pub failed: Vec<(String, String)>,
    /// Setup entries that could not be read, so never ran.
    pub invalid: Vec<String>,
}

impl ScheduledRunSummary {
    pub fn to_text(&self) -> String {
        let mut out = vec![format!(
            "Scheduled reports: {} generated, {} not due, {} failed, {} invalid",
            self.generated.len(),
            self.skipped.len(),
            self.failed.len(),
            self.invalid.len()
        )];
        for (name, id) in &self.generated {
            out.push(format!("  ✅ {} (stored as #{})", name, id));
        }
        for (name, err) in &self.failed {
            out.push(format!("  ❌ {}: {}", name, err));
        }
        for entry in &self.invalid {
            out.push(format!("  ⚠️ ignored {}", entry));
        }
        out.join("\n")
    }
}

pub struct ReportService {
    analytics: Arc<AnalyticsService>,
    store: Arc<dyn ReportStore>,
    documents: Arc<dyn PolicyDocumentStore>,
}

impl ReportService {
    pub fn new(
        analytics: Arc<AnalyticsService>,
        store: Arc<dyn ReportStore>,
        documents: Arc<dyn PolicyDocumentStore>,
    ) -> Self {
        Self {
            analytics,
            store,
            documents,
        }
    }

    pub fn store(&self) -> &Arc<dyn ReportStore> {
        &self.store
    }

    pub async fn generate(
        &self,
        session: &AuthSession,
        report_name: &str,
        query: &ReportQuery,
    ) -> Result<ReportOutput, ToolError> {
        let table = self.analytics.run_report(session, query).await?;
        Ok(ReportOutput::from_table(report_name, query, table, Utc::now()))
    }

    /// Generate, store and mirror one report. Returns the stored id.
    pub async fn generate_and_store(
        &self,
        session: &AuthSession,
        report_name: &str,
        query: &ReportQuery,
        slug: &str,
    ) -> Result<(i64, ReportOutput), ToolError> {
        let output = self.generate(session, report_name, query).await?;
        let id = self
            .store
            .save(&output)
            .await
            .map_err(|e| ToolError::Store(e.to_string()))?;

        let path = report_document_path(slug, output.generated_at.date_naive());
        match serde_json::to_value(&output) {
            Ok(doc) => {
                if let Err(e) = self.documents.write(&path, &doc).await {
                    tracing::warn!(path = %path, "Failed to mirror report to policy document: {}", e);
                }
            }
            Err(e) => tracing::warn!("Failed to serialize report {}: {}", report_name, e),
        }

        tracing::info!(
            report_name = %report_name,
            report_id = id,
            rows = output.rows.len(),
            "Stored analytics report"
        );
        Ok((id, output))
    }

    /// Run every report due on `date`. A failing report is logged and the
    /// next one still runs.
    pub async fn run_due(
        &self,
        session: &AuthSession,
        reports: &[ScheduledReportConfig],
        date: NaiveDate,
    ) -> ScheduledRunSummary {
        let mut summary = ScheduledRunSummary::default();
        let slugs = unique_slugs(reports);

        for (report, slug) in reports.iter().zip(&slugs) {
            if !report.is_due_on(date) {
                summary.skipped.push(report.report_name.clone());
                continue;
            }

            let result = match report.to_query() {
                Ok(query) => {
                    self.generate_and_store(session, &report.report_name, &query, slug)
                        .await
                }
                Err(e) => Err(e),
            };

            match result {
                Ok((id, _)) => summary.generated.push((report.report_name.clone(), id)),
                Err(e) => {
                    tracing::error!(
                        report_name = %report.report_name,
                        "Scheduled report failed: {}",
                        e
                    );
                    summary.failed.push((report.report_name.clone(), e.to_string()));
                }
            }
        }

        summary
    }
}


#[cfg(test)]
mod tests {
    use super::testing::InMemoryReports;
    use super::*;
    use crate::core::analytics::analytics_service::testing::FakeAnalytics;
    use crate::core::analytics::{ReportRow, ReportTable};
    use crate::core::auth::testing::{persona, ScriptedTokens};
    use crate::core::documents::testing::InMemoryDocuments;
    use crate::core::reports::report_models::Frequency;

    fn weekly(name: &str, weekday: &str, property: &str) -> ScheduledReportConfig {
        ScheduledReportConfig {
            report_name: name.into(),
            frequency: Frequency::Weekly,
            property_id: property.into(),
            metrics: "sessions,conversions".into(),
            dimensions: "date".into(),
            weekday: weekday.into(),
        }
    }

    fn service(
        fake: Arc<FakeAnalytics>,
        store: Arc<InMemoryReports>,
        docs: Arc<InMemoryDocuments>,
    ) -> ReportService {
        ReportService::new(Arc::new(AnalyticsService::new(fake)), store, docs)
    }

    fn table() -> ReportTable {
        ReportTable {
            dimension_headers: vec!["date".into()],
            metric_headers: vec!["sessions".into(), "conversions".into()],
            rows: vec![ReportRow {
                dimensions: vec!["20240603".into()],
                metrics: vec![200.0, 10.0],
            }],
            row_count: 1,
        }
    }

    #[tokio::test]
    async fn weekly_report_runs_only_on_its_day() {
        let fake = Arc::new(FakeAnalytics::with_table(table()));
        let store = Arc::new(InMemoryReports::default());
        let docs = Arc::new(InMemoryDocuments::default());
        let service = service(fake.clone(), store.clone(), docs.clone());
        let session = AuthSession::new(persona(), Arc::new(ScriptedTokens::valid("tok")));
        let reports = vec![weekly("Weekly Traffic", "MO", "123")];

        // Tuesday 2024-06-04: not due.
        let tuesday = NaiveDate::from_ymd_opt(2024, 6, 4).unwrap();
        let summary = service.run_due(&session, &reports, tuesday).await;
        assert!(summary.generated.is_empty());
        assert_eq!(summary.skipped, vec!["Weekly Traffic"]);
        assert_eq!(fake.query_count(), 0);

        // Monday 2024-06-10: due.
        let monday = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let summary = service.run_due(&session, &reports, monday).await;
        assert_eq!(summary.generated.len(), 1);
        assert_eq!(fake.query_count(), 1);

        let stored = store.get(summary.generated[0].1).await.unwrap().unwrap();
        assert_eq!(stored.output.rates["conversionRate"], 0.05);
        let docs = docs.docs.read().await;
        assert_eq!(docs.len(), 1);
        assert!(docs
            .keys()
            .next()
            .unwrap()
            .starts_with("/analytics/reports/weekly-traffic/"));
    }

    #[tokio::test]
    async fn failing_report_does_not_stop_the_next() {
        let fake = Arc::new(FakeAnalytics::with_table(table()));
        let store = Arc::new(InMemoryReports::default());
        let service = service(fake, store, Arc::new(InMemoryDocuments::default()));
        let session = AuthSession::new(persona(), Arc::new(ScriptedTokens::valid("tok")));
        let reports = vec![weekly("No Property", "MO", ""), weekly("Traffic", "MO", "1")];

        let monday = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let summary = service.run_due(&session, &reports, monday).await;
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, "No Property");
        assert_eq!(summary.generated.len(), 1);
        assert!(summary.to_text().contains("1 generated"));
    }

    #[tokio::test]
    async fn reports_sharing_a_slug_keep_separate_documents() {
        let fake = Arc::new(FakeAnalytics::with_table(table()));
        let store = Arc::new(InMemoryReports::default());
        let docs = Arc::new(InMemoryDocuments::default());
        let service = service(fake, store, docs.clone());
        let session = AuthSession::new(persona(), Arc::new(ScriptedTokens::valid("tok")));
        let reports = vec![
            weekly("Weekly Traffic", "MO", "1"),
            weekly("weekly traffic!", "MO", "2"),
        ];

        let monday = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let summary = service.run_due(&session, &reports, monday).await;
        assert_eq!(summary.generated.len(), 2);

        let docs = docs.docs.read().await;
        assert_eq!(docs.len(), 2);
        let mut folders: Vec<&str> = docs
            .keys()
            .filter_map(|path| path.rsplit_once('/').map(|(folder, _)| folder))
            .collect();
        folders.sort();
        assert_eq!(
            folders,
            vec![
                "/analytics/reports/weekly-traffic",
                "/analytics/reports/weekly-traffic-2"
            ]
        );
    }
}
