pub mod marketplace;
pub mod setup_schema;

pub use marketplace::{
    build_registration, MarketplaceApi, MarketplaceError, MarketplaceRegistration, Pictures,
};
pub use setup_schema::{setup_schema, SetupConfig};
