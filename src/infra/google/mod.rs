pub mod analytics_client;
pub mod google_http;
pub mod service_account;
pub mod tag_manager_client;

pub use analytics_client::GoogleAnalyticsClient;
pub use service_account::ServiceAccountTokens;
pub use tag_manager_client::TagManagerApiClient;
