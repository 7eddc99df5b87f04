pub mod aggregator;
pub mod client;
pub mod config;
pub mod error;
pub mod orders;

pub use aggregator::PurchaseAggregator;
pub use client::StoreClient;
pub use config::{StoreCredentials, ValidationError};
pub use error::CommerceError;
pub use orders::PurchaseEvent;
