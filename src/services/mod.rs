//! Service layer for the catalog proxy.
//!
//! This module contains the upstream-facing logic for:
//! - Single requests (`PageSource`, `HttpFetcher`)
//! - Pagination (`PaginationCrawler`)
//! - Reference expansion (`ReferenceResolver`)

mod crawler;
mod fetcher;
#[cfg(any(test, feature = "testing"))]
mod memory;
mod resolver;

pub use crawler::{CrawlOutcome, PaginationCrawler};
pub use fetcher::{CallClass, HttpFetcher, PageRequest, PageSource};
#[cfg(any(test, feature = "testing"))]
pub use memory::MemorySource;
pub use resolver::ReferenceResolver;
