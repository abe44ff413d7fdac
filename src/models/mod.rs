// src/models/mod.rs

//! Domain models for the catalog proxy.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod page;
mod record;
mod resource;

// Re-export all public types
pub use config::{
    CacheConfig, Config, RequestConfig, ResolverConfig, StalenessConfig, UpstreamConfig,
};
pub use page::Page;
pub use record::Record;
pub use resource::{PROVENANCE_HEADER, Provenance, ResourceKind};
