// src/services/resolver.rs

//! Reference resolver.
//!
//! Replaces the URL lists held in a record's reference fields with the full
//! bodies of the records they point to. Lookups go to the cache first and
//! fall back to the upstream source, caching whatever was fetched.
//!
//! Expansion is bounded by `max_depth`; a URL already on the current
//! expansion path is emitted flat instead of being expanded again, so
//! records that reference each other cannot recurse forever.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde_json::Value;

use crate::cache::RecordCache;
use crate::error::{AppError, Result};
use crate::models::{Record, ResolverConfig};
use crate::services::fetcher::PageSource;
use crate::utils::url_key;

/// Service that denormalizes embedded references.
#[derive(Clone)]
pub struct ReferenceResolver {
    cache: RecordCache,
    source: Arc<dyn PageSource>,
    fields: Arc<[String]>,
    max_depth: usize,
    max_concurrent: usize,
}

impl ReferenceResolver {
    pub fn new(cache: RecordCache, source: Arc<dyn PageSource>, config: &ResolverConfig) -> Self {
        Self {
            cache,
            source,
            fields: config.reference_fields.clone().into(),
            max_depth: config.max_depth.max(1),
            max_concurrent: config.max_concurrent.max(1),
        }
    }

    /// Resolve one record.
    ///
    /// Fails as a whole if any referenced URL cannot be resolved; no partially
    /// rewritten record is ever returned.
    pub async fn resolve(&self, record: &Record) -> Result<Value> {
        let mut path = HashSet::new();
        path.insert(url_key(record.url()));
        self.expand(record.clone(), self.max_depth, Arc::new(path))
            .await
    }

    /// Resolve a batch of records independently.
    ///
    /// One record failing does not affect its siblings; results line up with
    /// the input.
    pub async fn resolve_all(&self, records: &[Record]) -> Vec<Result<Value>> {
        stream::iter(records)
            .map(|record| self.resolve(record))
            .buffered(self.max_concurrent)
            .collect()
            .await
    }

    /// Find a record by URL, cache first.
    pub async fn lookup(&self, url: &str) -> Result<Record> {
        match self.cache.get_by_url(url).await? {
            Some(hit) => Ok(hit),
            None => self.fetch_and_cache(url).await,
        }
    }

    async fn fetch_and_cache(&self, url: &str) -> Result<Record> {
        let fetched = self.source.fetch_record(url).await?;
        self.cache.put(fetched.clone()).await?;
        Ok(fetched)
    }

    fn expand(
        &self,
        record: Record,
        depth: usize,
        path: Arc<HashSet<String>>,
    ) -> BoxFuture<'_, Result<Value>> {
        async move {
            let fields = record.reference_fields(&self.fields);
            let origin = record.url().to_string();

            let rebuilt = future::try_join_all(fields.iter().map(|field| {
                let urls: Vec<String> = record
                    .references(field)
                    .unwrap_or_default()
                    .into_iter()
                    .map(String::from)
                    .collect();
                self.expand_field(&origin, urls, depth, Arc::clone(&path))
            }))
            .await?;

            let mut value = record.into_value();
            if let Value::Object(map) = &mut value {
                for (field, items) in fields.into_iter().zip(rebuilt) {
                    map.insert(field.to_string(), Value::Array(items));
                }
            }
            Ok(value)
        }
        .boxed()
    }

    /// Resolve every URL of one field; returns only once all have finished.
    ///
    /// Cached targets are read in one batch; only the misses go upstream.
    async fn expand_field(
        &self,
        origin: &str,
        urls: Vec<String>,
        depth: usize,
        path: Arc<HashSet<String>>,
    ) -> Result<Vec<Value>> {
        if urls.is_empty() {
            return Ok(Vec::new());
        }
        let cached: HashMap<String, Record> = self
            .cache
            .get_many_by_url(urls.clone())
            .await?
            .into_iter()
            .map(|record| (url_key(record.url()), record))
            .collect();
        let cached = &cached;

        stream::iter(urls)
            .map(|url| {
                let path = Arc::clone(&path);
                async move {
                    let key = url_key(&url);
                    let target = match cached.get(&key) {
                        Some(hit) => hit.clone(),
                        None => self.fetch_and_cache(&url).await.map_err(|e| {
                            log::warn!("Could not resolve {url} referenced by {origin}: {e}");
                            AppError::resolution(origin, url.as_str(), e)
                        })?,
                    };

                    if depth <= 1 || path.contains(&key) {
                        return Ok(target.into_value());
                    }

                    let mut deeper = (*path).clone();
                    deeper.insert(key);
                    self.expand(target, depth - 1, Arc::new(deeper)).await
                }
            })
            .buffered(self.max_concurrent)
            .try_collect()
            .await
    }
}
