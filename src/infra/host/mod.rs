pub mod host_api_client;

pub use host_api_client::HostApiClient;
