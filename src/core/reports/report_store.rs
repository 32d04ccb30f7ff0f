use async_trait::async_trait;

use super::report_models::{ReportOutput, StoredReport, StoredReportSummary};

#[derive(Debug, thiserror::Error)]
pub enum ReportStoreError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Persistence for generated reports.
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn save(&self, output: &ReportOutput) -> Result<i64, ReportStoreError>;
    async fn get(&self, id: i64) -> Result<Option<StoredReport>, ReportStoreError>;
    /// Newest first, optionally restricted to one report name.
    async fn list(
        &self,
        report_name: Option<&str>,
        limit: u32,
    ) -> Result<Vec<StoredReportSummary>, ReportStoreError>;
    async fn delete(&self, id: i64) -> Result<bool, ReportStoreError>;
}
