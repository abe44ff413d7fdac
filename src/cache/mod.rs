// src/cache/mod.rs

//! Record cache.
//!
//! A single worker task owns the [`RecordStore`]; every read and write is a
//! message on its queue, so mutations are applied one at a time and no reader
//! ever sees a half-written record. [`RecordCache`] is the cloneable handle
//! the rest of the proxy talks to.
//!
//! Writes are fire-and-forget: once `put` has queued a record, the worker
//! applies it even if the caller gives up waiting on something else.

mod store;

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::error::{AppError, Result};
use crate::models::{CacheConfig, Record};

pub use store::{CacheStats, RecordStore};

enum Command {
    Put { records: Vec<Record>, reseat: bool },
    GetByUrl(String, oneshot::Sender<Option<Record>>),
    GetManyByUrl(Vec<String>, oneshot::Sender<Vec<Record>>),
    GetByName(String, oneshot::Sender<Vec<Record>>),
    GetByPrefix(String, oneshot::Sender<Vec<Record>>),
    GetAll(oneshot::Sender<Vec<Record>>),
    Stats(oneshot::Sender<CacheStats>),
}

/// Handle to a running record cache.
#[derive(Clone, Debug)]
pub struct RecordCache {
    tx: mpsc::Sender<Command>,
}

impl RecordCache {
    /// Start a cache worker on the current Tokio runtime.
    ///
    /// The worker stops once every handle has been dropped.
    pub fn spawn(config: &CacheConfig) -> Self {
        let store = RecordStore::new(config.max_entries, config.idle());
        let (tx, rx) = mpsc::channel(config.queue_depth.max(1));
        tokio::spawn(run_worker(store, rx));
        Self { tx }
    }

    /// Store one record under its URL and name.
    pub async fn put(&self, record: Record) -> Result<()> {
        self.put_all(vec![record]).await
    }

    /// Store a batch of records, in order. Records already cached keep their
    /// enumeration position.
    pub async fn put_all(&self, records: Vec<Record>) -> Result<()> {
        self.send_put(records, false).await
    }

    /// Store a complete crawl. The batch order becomes the enumeration order
    /// of these records, whether or not they were cached before.
    pub async fn put_ordered(&self, records: Vec<Record>) -> Result<()> {
        self.send_put(records, true).await
    }

    async fn send_put(&self, records: Vec<Record>, reseat: bool) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        self.tx
            .send(Command::Put { records, reseat })
            .await
            .map_err(|_| AppError::CacheClosed)
    }

    pub async fn get_by_url(&self, url: &str) -> Result<Option<Record>> {
        let url = url.to_string();
        self.request(|reply| Command::GetByUrl(url, reply)).await
    }

    /// Cached subset of `urls`, in input order.
    pub async fn get_many_by_url(&self, urls: Vec<String>) -> Result<Vec<Record>> {
        self.request(|reply| Command::GetManyByUrl(urls, reply)).await
    }

    /// Records whose name contains `needle`, case-insensitively.
    pub async fn get_by_name(&self, needle: &str) -> Result<Vec<Record>> {
        let needle = needle.to_string();
        self.request(|reply| Command::GetByName(needle, reply)).await
    }

    /// Records of one collection, i.e. whose URL lies under `prefix`.
    pub async fn get_by_prefix(&self, prefix: &str) -> Result<Vec<Record>> {
        let prefix = prefix.to_string();
        self.request(|reply| Command::GetByPrefix(prefix, reply)).await
    }

    /// Every distinct record currently held.
    pub async fn get_all(&self) -> Result<Vec<Record>> {
        self.request(Command::GetAll).await
    }

    pub async fn stats(&self) -> Result<CacheStats> {
        self.request(Command::Stats).await
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| AppError::CacheClosed)?;
        response.await.map_err(|_| AppError::CacheClosed)
    }
}

async fn run_worker(mut store: RecordStore, mut rx: mpsc::Receiver<Command>) {
    while let Some(command) = rx.recv().await {
        let now = Instant::now();
        // A dropped reply receiver means the caller stopped waiting.
        match command {
            Command::Put { records, reseat } => {
                for record in records {
                    if reseat {
                        store.put_last(record, now);
                    } else {
                        store.put(record, now);
                    }
                }
            }
            Command::GetByUrl(url, reply) => {
                let _ = reply.send(store.get_by_url(&url, now));
            }
            Command::GetManyByUrl(urls, reply) => {
                let _ = reply.send(store.get_many_by_url(urls.as_slice(), now));
            }
            Command::GetByName(needle, reply) => {
                let _ = reply.send(store.get_by_name(&needle, now));
            }
            Command::GetByPrefix(prefix, reply) => {
                let _ = reply.send(store.get_by_prefix(&prefix, now));
            }
            Command::GetAll(reply) => {
                let _ = reply.send(store.all(now));
            }
            Command::Stats(reply) => {
                let _ = reply.send(store.stats());
            }
        }
    }
    log::debug!("Record cache worker stopped with {} entries", store.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn record(name: &str, url: &str) -> Record {
        Record::from_value(json!({ "name": name, "url": url })).unwrap()
    }

    fn config(max_entries: usize) -> CacheConfig {
        CacheConfig {
            max_entries,
            idle_secs: 600,
            queue_depth: 16,
        }
    }

    #[tokio::test]
    async fn test_put_then_read_through_handle() {
        let cache = RecordCache::spawn(&config(10));
        cache.put(record("Luke", "/x/1")).await.unwrap();

        let by_name = cache.get_by_name("luke").await.unwrap();
        let by_url = cache.get_by_url("/x/1").await.unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_url, Some(by_name[0].clone()));
        assert_eq!(cache.get_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_clones_share_one_store() {
        let cache = RecordCache::spawn(&config(10));
        let writer = cache.clone();
        writer
            .put_all(vec![record("Luke", "/people/1/"), record("Leia", "/people/5/")])
            .await
            .unwrap();

        assert_eq!(cache.get_by_prefix("/people/").await.unwrap().len(), 2);
        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.entries, 2);
    }

    #[tokio::test]
    async fn test_concurrent_writers_are_serialized() {
        let cache = RecordCache::spawn(&config(1000));
        let writers: Vec<_> = (0..8)
            .map(|w| {
                let cache = cache.clone();
                tokio::spawn(async move {
                    for i in 0..25 {
                        let url = format!("/people/{}/", w * 25 + i);
                        cache.put(record(&format!("P{w}-{i}"), &url)).await.unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap();
        }

        assert_eq!(cache.get_all().await.unwrap().len(), 200);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_expiry_uses_runtime_clock() {
        let cache = RecordCache::spawn(&config(10));
        cache.put(record("Luke", "/people/1/")).await.unwrap();
        assert!(cache.get_by_url("/people/1/").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(601)).await;
        assert!(cache.get_by_url("/people/1/").await.unwrap().is_none());
        assert_eq!(cache.stats().await.unwrap().expirations, 1);
    }

    #[tokio::test]
    async fn test_eviction_over_capacity() {
        let cache = RecordCache::spawn(&config(2));
        cache.put(record("A", "/a")).await.unwrap();
        cache.put(record("B", "/b")).await.unwrap();
        cache.get_by_url("/a").await.unwrap();
        cache.put(record("C", "/c")).await.unwrap();

        let urls: Vec<_> = cache
            .get_all()
            .await
            .unwrap()
            .iter()
            .map(|r| r.url().to_string())
            .collect();
        assert_eq!(urls, vec!["/a", "/c"]);
    }
}
