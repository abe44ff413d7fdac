//! Pipeline entry points for proxy queries.
//!
//! - `Catalog`: the inbound query interface (collections, names, records)
//! - `StalenessPolicy`: decides between serving the cache and re-crawling

pub mod catalog;
pub mod staleness;

pub use catalog::{Catalog, CollectionResponse};
pub use staleness::{Freshness, StalenessPolicy};
