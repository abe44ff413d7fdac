// src/services/fetcher.rs

//! Remote collection fetcher.
//!
//! [`PageSource`] is the seam between the proxy and the upstream catalog:
//! one call, one request, no retries. [`HttpFetcher`] is the TLS-backed
//! implementation used in production.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Page, Record, UpstreamConfig};
use crate::utils::{http, upstream_url};

/// Which per-call timeout a request runs under.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CallClass {
    #[default]
    Standard,
    Search,
}

/// A single upstream request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Resource path relative to the API root, or an absolute URL
    pub target: String,
    /// Optional `search` query value
    pub search: Option<String>,
    pub class: CallClass,
}

impl PageRequest {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            search: None,
            class: CallClass::Standard,
        }
    }

    pub fn search(target: impl Into<String>, term: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            search: Some(term.into()),
            class: CallClass::Search,
        }
    }

    /// Request for a `next` pointer of this request's chain.
    ///
    /// The pointer already carries every query parameter, so no search term
    /// is added; the timeout class is inherited.
    pub fn follow(&self, pointer: impl Into<String>) -> Self {
        Self {
            target: pointer.into(),
            search: None,
            class: self.class,
        }
    }
}

/// Trait for upstream catalog transports.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Issue one request and return its JSON body.
    ///
    /// Every failure (transport, timeout, error status, undecodable body)
    /// surfaces as [`AppError::Fetch`].
    async fn get_json(&self, request: &PageRequest) -> Result<Value>;

    /// Fetch one collection page.
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page> {
        let body = self.get_json(request).await?;
        Page::from_value(body).map_err(|e| AppError::fetch(&request.target, e))
    }

    /// Fetch a single record by its URL.
    async fn fetch_record(&self, url: &str) -> Result<Record> {
        let body = self.get_json(&PageRequest::new(url)).await?;
        Record::from_value(body).map_err(|e| AppError::fetch(url, e))
    }
}

/// HTTP implementation of [`PageSource`].
pub struct HttpFetcher {
    client: Client,
    base: Url,
    search_timeout: Duration,
}

impl HttpFetcher {
    /// Create a fetcher with a fresh client built from the configuration.
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let client = http::create_async_client(config)?;
        Self::with_client(client, config)
    }

    /// Create a fetcher around an existing client.
    pub fn with_client(client: Client, config: &UpstreamConfig) -> Result<Self> {
        let base = Url::parse(&config.base_url)?;
        Ok(Self {
            client,
            base,
            search_timeout: config.search_timeout(),
        })
    }
}

#[async_trait]
impl PageSource for HttpFetcher {
    async fn get_json(&self, request: &PageRequest) -> Result<Value> {
        let url = upstream_url(&self.base, &request.target)
            .map_err(|e| AppError::fetch(&request.target, e))?;

        let mut builder = self
            .client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(term) = &request.search {
            builder = builder.query(&[("search", term.as_str())]);
        }
        if request.class == CallClass::Search {
            builder = builder.timeout(self.search_timeout);
        }

        log::debug!("GET {url}");
        let response = builder
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::fetch(url.as_str(), e))?;

        response
            .json::<Value>()
            .await
            .map_err(|e| AppError::fetch(url.as_str(), e))
    }
}
