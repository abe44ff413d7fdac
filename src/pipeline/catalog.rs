// src/pipeline/catalog.rs

//! Inbound query interface.
//!
//! [`Catalog`] wires the fetcher, crawler, cache, staleness policy and
//! resolver together and bounds every query with the request deadline.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::cache::RecordCache;
use crate::error::{AppError, Result};
use crate::models::{Config, Provenance, Record, ResourceKind};
use crate::pipeline::staleness::StalenessPolicy;
use crate::services::{HttpFetcher, PageRequest, PageSource, PaginationCrawler, ReferenceResolver};
use crate::utils::{resolve_url, url_key};

/// A collection served to a client.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionResponse {
    pub kind: ResourceKind,
    pub provenance: Provenance,
    /// Number of records in this response
    pub count: usize,
    /// Total declared by upstream at request time
    pub declared: usize,
    pub served_at: DateTime<Utc>,
    pub records: Vec<Value>,
}

/// Cache-and-resolve front for the upstream catalog.
pub struct Catalog {
    source: Arc<dyn PageSource>,
    cache: RecordCache,
    crawler: PaginationCrawler,
    resolver: ReferenceResolver,
    policy: StalenessPolicy,
    base: Url,
    request_timeout: Duration,
}

impl Catalog {
    /// Build a catalog talking to the configured upstream over HTTP.
    pub fn from_config(config: &Config) -> Result<Self> {
        let source = Arc::new(HttpFetcher::new(&config.upstream)?);
        Self::new(config, source)
    }

    /// Build a catalog over any page source. Spawns the cache worker, so a
    /// Tokio runtime must be running.
    pub fn new(config: &Config, source: Arc<dyn PageSource>) -> Result<Self> {
        config.validate()?;
        let base = Url::parse(&config.upstream.base_url)?;
        let cache = RecordCache::spawn(&config.cache);

        Ok(Self {
            crawler: PaginationCrawler::new(Arc::clone(&source), config.upstream.max_pages),
            resolver: ReferenceResolver::new(cache.clone(), Arc::clone(&source), &config.resolver),
            policy: StalenessPolicy::from_config(&config.staleness),
            request_timeout: config.request.timeout(),
            source,
            cache,
            base,
        })
    }

    pub fn cache(&self) -> &RecordCache {
        &self.cache
    }

    /// Serve a whole collection, crawling upstream when the cache is stale.
    pub async fn fetch_collection(
        &self,
        kind: ResourceKind,
        resolve: bool,
    ) -> Result<CollectionResponse> {
        let operation = format!("collection {kind}");
        self.within(&operation, self.collection(kind, resolve)).await
    }

    /// Cached records whose name contains `needle`.
    pub async fn fetch_by_name(&self, needle: &str) -> Result<Vec<Record>> {
        self.within("lookup by name", self.cache.get_by_name(needle))
            .await
    }

    /// Every cached record.
    pub async fn fetch_all(&self) -> Result<Vec<Record>> {
        self.within("list all", self.cache.get_all()).await
    }

    /// Ask upstream to search a collection by name and cache the hits.
    pub async fn search(&self, kind: ResourceKind, term: &str) -> Result<Vec<Record>> {
        let operation = format!("search {kind} for '{term}'");
        self.within(&operation, async {
            let request = PageRequest::search(kind.path(), term);
            let outcome = self.crawler.crawl(&request).await?;
            log::info!("Search {kind} '{term}': {} hits", outcome.records.len());
            self.cache.put_all(outcome.records.clone()).await?;
            Ok(outcome.records)
        })
        .await
    }

    /// Serve one record by URL, cache first.
    pub async fn fetch_record(&self, url: &str, resolve: bool) -> Result<Value> {
        self.within("record lookup", async {
            let record = self.resolver.lookup(url).await?;
            if resolve {
                self.resolver.resolve(&record).await
            } else {
                Ok(record.into_value())
            }
        })
        .await
    }

    async fn collection(&self, kind: ResourceKind, resolve: bool) -> Result<CollectionResponse> {
        let request = PageRequest::new(kind.path());
        let first = self.source.fetch_page(&request).await?;
        let declared = first.count;

        let prefix = resolve_url(&self.base, kind.path());
        let cached = self.cache.get_by_prefix(&prefix).await?;
        let mut known: HashSet<String> = cached.iter().map(|r| url_key(r.url())).collect();
        known.extend(first.results.iter().map(|r| url_key(r.url())));

        let freshness = self.policy.check(known.len(), declared);
        let records = if freshness.is_stale() {
            // Nothing is cached until the whole chain has been crawled.
            let outcome = self.crawler.crawl_from(&request, first).await?;
            self.cache.put_ordered(outcome.records.clone()).await?;
            outcome.records
        } else {
            self.cache.put_all(first.results).await?;
            self.cache.get_by_prefix(&prefix).await?
        };

        let records = if resolve {
            self.resolver
                .resolve_all(&records)
                .await
                .into_iter()
                .collect::<Result<Vec<_>>>()?
        } else {
            records.into_iter().map(Record::into_value).collect()
        };

        let provenance = freshness.provenance();
        log::info!(
            "Serving {} {kind} records ({provenance}, {declared} declared)",
            records.len()
        );

        Ok(CollectionResponse {
            kind,
            provenance,
            count: records.len(),
            declared,
            served_at: Utc::now(),
            records,
        })
    }

    /// Run `work` under the request deadline.
    ///
    /// Cache writes already queued when the deadline fires still complete.
    async fn within<T>(&self, operation: &str, work: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.request_timeout, work).await {
            Ok(result) => result,
            Err(_) => {
                log::warn!(
                    "{operation} exceeded {}ms deadline",
                    self.request_timeout.as_millis()
                );
                Err(AppError::Timeout {
                    operation: operation.to_string(),
                    after_ms: self.request_timeout.as_millis() as u64,
                })
            }
        }
    }
}
