//! Remote store client.
//!
//! Wraps the dashboard HTTP API. Every call is bounded by the configured
//! timeout; a timeout counts as a failure like any other network error.
//! Health checks and pushes report failure as `false` and never error.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::config::RemoteConfig;
use crate::error::{Error, Result};
use crate::model::CollectionKind;

/// Remote mirror of the two collections.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// `true` only on a 2xx answer from the liveness endpoint.
    async fn check_health(&self) -> bool;

    /// Current remote collection as untyped elements.
    ///
    /// A non-2xx status or a non-array payload yields an empty list so the
    /// caller falls through to the next source; only transport failures
    /// (unreachable, timeout) are errors.
    async fn fetch_collection(&self, kind: CollectionKind) -> Result<Vec<Value>>;

    /// Replace the remote collection. `false` on any failure.
    async fn push_collection(&self, kind: CollectionKind, records: Vec<Value>) -> bool;
}

/// reqwest-backed client for the dashboard API
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: Client,
    base_url: String,
}

impl HttpRemote {
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }
}

#[async_trait]
impl RemoteStore for HttpRemote {
    async fn check_health(&self) -> bool {
        match self.client.get(self.endpoint("health")).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(base_url = %self.base_url, "remote is healthy");
                true
            }
            Ok(response) => {
                tracing::warn!(status = %response.status(), "health check rejected");
                false
            }
            Err(err) => {
                tracing::warn!(base_url = %self.base_url, "remote unreachable: {err}");
                false
            }
        }
    }

    async fn fetch_collection(&self, kind: CollectionKind) -> Result<Vec<Value>> {
        let response = self
            .client
            .get(self.endpoint(kind.as_str()))
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            tracing::warn!(%kind, status = %response.status(), "fetch rejected");
            return Ok(Vec::new());
        }

        match response.json::<Value>().await {
            Ok(Value::Array(values)) => Ok(values),
            Ok(_) => {
                tracing::warn!(%kind, "remote payload is not an array");
                Ok(Vec::new())
            }
            Err(err) if err.is_timeout() => Err(Error::Network(err.to_string())),
            Err(err) => {
                tracing::warn!(%kind, "remote payload is not JSON: {err}");
                Ok(Vec::new())
            }
        }
    }

    async fn push_collection(&self, kind: CollectionKind, records: Vec<Value>) -> bool {
        let count = records.len();
        let mut payload = serde_json::Map::new();
        payload.insert(kind.as_str().to_string(), Value::Array(records));

        let result = self
            .client
            .post(self.endpoint(&format!("update-{}", kind.as_str())))
            .json(&payload)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(%kind, count, "pushed collection");
                true
            }
            Ok(response) => {
                tracing::warn!(%kind, status = %response.status(), "push rejected");
                false
            }
            Err(err) => {
                tracing::warn!(%kind, "push failed: {err}");
                false
            }
        }
    }
}

/// Remote that is never reachable; used for `--offline` sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineRemote;

#[async_trait]
impl RemoteStore for OfflineRemote {
    async fn check_health(&self) -> bool {
        false
    }

    async fn fetch_collection(&self, kind: CollectionKind) -> Result<Vec<Value>> {
        Err(Error::Network(format!("offline: {kind} not fetched")))
    }

    async fn push_collection(&self, _kind: CollectionKind, _records: Vec<Value>) -> bool {
        false
    }
}
