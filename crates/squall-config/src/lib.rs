mod raw;
mod loader;
pub mod error;

pub use error::ConfigError;
pub use loader::{default_interval, CollectionCatalog, CollectionSpec, ParserSpec, Schema};
