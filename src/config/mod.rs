pub mod provider;
pub mod schema;

pub use provider::{CachedConfigProvider, DEFAULT_CONFIG_TTL};
pub use schema::{CatalogConfig, FieldMapping, FieldType};
