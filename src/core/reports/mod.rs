pub mod report_models;
pub mod report_service;
pub mod report_store;
pub mod report_store_tool;

pub use report_models::{ReportOutput, ScheduledReportConfig, StoredReport, StoredReportSummary};
pub use report_service::ReportService;
pub use report_store::{ReportStore, ReportStoreError};
pub use report_store_tool::ReportStoreTool;
