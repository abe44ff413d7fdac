// src/utils/http.rs

//! HTTP client utilities.

use crate::error::Result;
use crate::models::UpstreamConfig;

/// Create a configured asynchronous HTTP client.
///
/// The client-wide timeout is the regular per-call timeout; search requests
/// tighten it per request.
pub fn create_async_client(config: &UpstreamConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(config.timeout())
        .build()?;
    Ok(client)
}
