// src/lib.rs

//! Catalog Proxy Library
//!
//! Crawls a paginated remote catalog, keeps its records in a bounded
//! in-memory cache and serves them with embedded references expanded.

pub mod cache;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod utils;

pub use error::{AppError, Result};
pub use pipeline::{Catalog, CollectionResponse};
