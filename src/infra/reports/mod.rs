pub mod sqlite_report_store;

pub use sqlite_report_store::SqliteReportStore;
