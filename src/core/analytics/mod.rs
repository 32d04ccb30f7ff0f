pub mod analytics_format;
pub mod analytics_models;
pub mod analytics_service;
pub mod analytics_tools;
pub mod funnel;
pub mod recipes;

pub use analytics_format::{format_number, format_percent};
pub use analytics_models::{
    AccountSummary, DateRange, DateRangeName, NewProperty, PropertySummary, ReportQuery, ReportRow,
    ReportTable,
};
pub use analytics_service::{AnalyticsApi, AnalyticsService};
pub use analytics_tools::{EnhancedAnalyticsTool, GoogleAnalyticsTool};
pub use funnel::rate;
