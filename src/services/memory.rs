// src/services/memory.rs

//! In-memory [`PageSource`] for tests. Built only for the crate's own tests
//! or with the `testing` feature.
//!
//! Responses are registered per target; the source records every request it
//! receives so callers can assert on network traffic.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::{AppError, Result};
use crate::services::fetcher::{PageRequest, PageSource};
use crate::utils::url_key;

/// Canned upstream catalog.
#[derive(Default)]
pub struct MemorySource {
    responses: Mutex<HashMap<String, Value>>,
    failing: Mutex<HashSet<String>>,
    requests: Mutex<Vec<PageRequest>>,
    delay: Option<Duration>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every response, to exercise deadlines.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Register a raw JSON response for a target.
    pub fn insert(&self, target: &str, body: Value) {
        self.lock_responses().insert(Self::key(target, None), body);
    }

    /// Register a raw JSON response for a search request.
    pub fn insert_search(&self, target: &str, term: &str, body: Value) {
        self.lock_responses()
            .insert(Self::key(target, Some(term)), body);
    }

    /// Register a collection page.
    pub fn insert_page(&self, target: &str, results: Vec<Value>, next: Option<&str>, count: usize) {
        self.insert(
            target,
            json!({ "count": count, "next": next, "results": results }),
        );
    }

    /// Register a single record under its own `url`.
    pub fn insert_record(&self, record: Value) {
        if let Some(url) = record.get("url").and_then(Value::as_str) {
            let url = url.to_string();
            self.insert(&url, record);
        }
    }

    /// Make every request for a target fail.
    pub fn fail(&self, target: &str) {
        self.failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(Self::key(target, None));
    }

    /// Requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Number of requests received for one target.
    pub fn requests_for(&self, target: &str) -> usize {
        let key = url_key(target);
        self.requests()
            .iter()
            .filter(|r| url_key(&r.target) == key)
            .count()
    }

    fn key(target: &str, search: Option<&str>) -> String {
        match search {
            Some(term) => format!("{}?search={}", url_key(target), term.to_lowercase()),
            None => url_key(target),
        }
    }

    fn lock_responses(&self) -> std::sync::MutexGuard<'_, HashMap<String, Value>> {
        self.responses.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl PageSource for MemorySource {
    async fn get_json(&self, request: &PageRequest) -> Result<Value> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let key = Self::key(&request.target, request.search.as_deref());
        if self
            .failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&key)
        {
            return Err(AppError::fetch(&request.target, "connection reset"));
        }

        self.lock_responses()
            .get(&key)
            .cloned()
            .ok_or_else(|| AppError::fetch(&request.target, "404 Not Found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_serves_registered_pages() {
        let source = MemorySource::new();
        source.insert_page(
            "people/",
            vec![json!({ "name": "Luke", "url": "/people/1/" })],
            None,
            1,
        );

        let page = source.fetch_page(&PageRequest::new("people/")).await.unwrap();
        assert_eq!(page.results.len(), 1);
        assert_eq!(source.requests_for("people/"), 1);
    }

    #[tokio::test]
    async fn test_unknown_and_failing_targets_error() {
        let source = MemorySource::new();
        source.insert_record(json!({ "name": "Luke", "url": "/people/1/" }));
        source.fail("/people/1/");

        assert!(source.fetch_record("/people/1/").await.is_err());
        assert!(source.fetch_record("/people/2/").await.is_err());
        assert_eq!(source.request_count(), 2);
    }
}
