pub mod config;
pub mod engine;

pub use config::{MappingConfig, ValidationError};
pub use engine::{AttributedEntity, SymbolTable};
