//! Faceted catalog search layer for an Elasticsearch-compatible engine.
//!
//! Three transformations sit at the core, all pure and schema-driven:
//!
//! 1. [`query::params`] decodes filter URLs and request parameters into one
//!    canonical filter map.
//! 2. [`query::builder`] / [`query::aggregation`] turn that map plus the
//!    catalog schema into the boolean query and the per-facet aggregation
//!    request, keeping each facet's own filter out of its aggregation so
//!    counts answer "what if I cleared only this facet".
//! 3. [`facets`] decodes the raw aggregation buckets back into a UI-ready
//!    facet model.
//!
//! [`client::SearchManager`] wires the three onto a single outbound HTTP
//! call per search or facet request.
//!
//! ```rust,no_run
//! use facetgate::{CatalogConfig, SearchManager, Transport};
//! use facetgate::query::decode_request;
//!
//! # async fn run() -> facetgate::Result<()> {
//! let config = CatalogConfig::from_file("catalog.json")?;
//! let manager = SearchManager::new(config, Transport::from_env());
//!
//! let params = decode_request(Some("color-is-red-or-blue/price-from-10-to-90"), None, &Default::default());
//! let facets = manager.facets(&params).await?;
//! println!("{} products", facets.total);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod facets;
pub mod query;
pub mod types;

pub use client::{SearchManager, Transport};
pub use config::{CachedConfigProvider, CatalogConfig, FieldMapping, FieldType};
pub use error::{FacetGateError, Result};
pub use facets::{FacetData, FacetDecoder, FacetPage, FacetResult, FacetValue};
pub use query::{decode_filter_path, decode_request, AggregationBuilder, SearchBuilder};
pub use types::{FilterParams, FilterValue, QueryNode, RangeBound, SearchRequest, SortDirection};
