// src/services/crawler.rs

//! Pagination crawler.
//!
//! Follows `next` pointers one page at a time and concatenates every page's
//! results in upstream order.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{Page, Record};
use crate::services::fetcher::{PageRequest, PageSource};
use crate::utils::url_key;

/// Summary of a crawl run.
#[derive(Debug, Default)]
pub struct CrawlOutcome {
    pub records: Vec<Record>,
    pub pages: usize,
    /// Count declared by the first page
    pub declared: usize,
}

/// Service that materializes a full paginated collection.
#[derive(Clone)]
pub struct PaginationCrawler {
    source: Arc<dyn PageSource>,
    max_pages: usize,
}

impl PaginationCrawler {
    /// Create a crawler over the given source with a page ceiling.
    pub fn new(source: Arc<dyn PageSource>, max_pages: usize) -> Self {
        Self {
            source,
            max_pages: max_pages.max(1),
        }
    }

    /// Fetch the first page of `request` and crawl the rest of the chain.
    pub async fn crawl(&self, request: &PageRequest) -> Result<CrawlOutcome> {
        let first = self
            .source
            .fetch_page(request)
            .await
            .map_err(|e| AppError::crawl(&request.target, e))?;
        self.crawl_from(request, first).await
    }

    /// Continue a crawl from an already fetched first page.
    ///
    /// Nothing is written anywhere; the caller receives either the complete
    /// collection or an error.
    pub async fn crawl_from(&self, request: &PageRequest, first: Page) -> Result<CrawlOutcome> {
        let context = request.target.as_str();
        let mut outcome = CrawlOutcome {
            declared: first.count,
            pages: 1,
            ..CrawlOutcome::default()
        };

        let mut seen = HashSet::new();
        seen.insert(url_key(context));

        let mut next = first.next;
        outcome.records.extend(first.results);

        while let Some(pointer) = next {
            if !seen.insert(url_key(&pointer)) {
                log::error!("Crawl of {context} looped back to {pointer}");
                return Err(AppError::crawl(
                    context,
                    format!("next pointer {pointer} was already visited"),
                ));
            }
            if outcome.pages >= self.max_pages {
                return Err(AppError::crawl(
                    context,
                    format!("gave up after {} pages", self.max_pages),
                ));
            }

            let page_request = request.follow(pointer);
            let page = self
                .source
                .fetch_page(&page_request)
                .await
                .map_err(|e| AppError::crawl(context, e))?;

            outcome.pages += 1;
            log::debug!(
                "Crawl {context}: page {} brought {} records",
                outcome.pages,
                page.results.len()
            );

            next = page.next;
            outcome.records.extend(page.results);
        }

        log::info!(
            "Crawled {context}: {} records over {} pages (declared {})",
            outcome.records.len(),
            outcome.pages,
            outcome.declared
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{CallClass, MemorySource};
    use serde_json::{Value, json};

    fn person(id: usize) -> Value {
        json!({ "name": format!("Person {id}"), "url": format!("/people/{id}/") })
    }

    fn paged_source(pages: usize, per_page: usize) -> MemorySource {
        let source = MemorySource::new();
        for page in 1..=pages {
            let target = if page == 1 {
                "people/".to_string()
            } else {
                format!("people/?page={page}")
            };
            let next = (page < pages).then(|| format!("people/?page={}", page + 1));
            let results = (0..per_page).map(|i| person((page - 1) * per_page + i + 1)).collect();
            source.insert_page(&target, results, next.as_deref(), pages * per_page);
        }
        source
    }

    #[tokio::test]
    async fn test_crawl_concatenates_pages_in_order() {
        let source = Arc::new(paged_source(4, 3));
        let crawler = PaginationCrawler::new(source.clone(), 100);

        let outcome = crawler.crawl(&PageRequest::new("people/")).await.unwrap();

        assert_eq!(outcome.pages, 4);
        assert_eq!(outcome.declared, 12);
        let urls: Vec<_> = outcome.records.iter().map(|r| r.url().to_string()).collect();
        let expected: Vec<_> = (1..=12).map(|i| format!("/people/{i}/")).collect();
        assert_eq!(urls, expected);
        assert_eq!(source.request_count(), 4);
    }

    #[tokio::test]
    async fn test_single_page_collection() {
        let source = Arc::new(paged_source(1, 2));
        let crawler = PaginationCrawler::new(source, 100);

        let outcome = crawler.crawl(&PageRequest::new("people/")).await.unwrap();
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.pages, 1);
    }

    #[tokio::test]
    async fn test_repeated_next_is_a_crawl_failure() {
        let source = MemorySource::new();
        source.insert_page("people/", vec![person(1)], Some("people/?page=2"), 3);
        source.insert_page("people/?page=2", vec![person(2)], Some("people/?page=3"), 3);
        source.insert_page("people/?page=3", vec![person(3)], Some("people/?page=2"), 3);
        let crawler = PaginationCrawler::new(Arc::new(source), 100);

        let err = crawler.crawl(&PageRequest::new("people/")).await.unwrap_err();
        assert!(matches!(err, AppError::Crawl { .. }));
    }

    #[tokio::test]
    async fn test_self_referencing_first_page_fails() {
        let source = MemorySource::new();
        source.insert_page("people/", vec![person(1)], Some("people/"), 1);
        let crawler = PaginationCrawler::new(Arc::new(source), 100);

        assert!(crawler.crawl(&PageRequest::new("people/")).await.is_err());
    }

    #[tokio::test]
    async fn test_mid_crawl_fetch_failure_aborts() {
        let source = paged_source(3, 2);
        source.fail("people/?page=2");
        let crawler = PaginationCrawler::new(Arc::new(source), 100);

        let err = crawler.crawl(&PageRequest::new("people/")).await.unwrap_err();
        assert!(matches!(err, AppError::Crawl { .. }));
        assert!(err.to_string().contains("people/?page=2"));
    }

    #[tokio::test]
    async fn test_search_continuations_keep_search_timeout() {
        let source = MemorySource::new();
        source.insert_search(
            "people/",
            "sky",
            json!({ "count": 2, "next": "people/?search=sky&page=2", "results": [person(1)] }),
        );
        source.insert_page("people/?search=sky&page=2", vec![person(11)], None, 2);
        let source = Arc::new(source);
        let crawler = PaginationCrawler::new(source.clone(), 100);

        let outcome = crawler
            .crawl(&PageRequest::search("people/", "sky"))
            .await
            .unwrap();
        assert_eq!(outcome.records.len(), 2);

        let requests = source.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].search, None);
        assert!(requests.iter().all(|r| r.class == CallClass::Search));
    }

    #[tokio::test]
    async fn test_page_ceiling() {
        let source = Arc::new(paged_source(5, 1));
        let crawler = PaginationCrawler::new(source, 3);

        assert!(crawler.crawl(&PageRequest::new("people/")).await.is_err());
    }
}
