pub mod config;
mod session;
pub mod worker;

pub use config::{Config, ConfigError, KpiTargets, ReportingConfig};
pub use session::Session;
pub use worker::Command;
