//! Ordered data-source fallback.
//!
//! Each collection is loaded from a [`SourceChain`]: the sources are tried
//! in order and the first non-empty result wins. Every source normalizes
//! what it returns, and every failure inside a source degrades to "empty".

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::local::{self, LocalStore};
use crate::model::{self, Record};
use crate::remote::RemoteStore;

/// Where a loaded collection came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Remote,
    Local,
    Defaults,
    /// Every source came back empty
    Empty,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Remote => "remote",
            SourceKind::Local => "local",
            SourceKind::Defaults => "defaults",
            SourceKind::Empty => "empty",
        }
    }
}

/// A provider of one collection.
#[async_trait]
pub trait DataSource<T: Record>: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Normalized records, or empty when the source has nothing usable.
    async fn try_load(&self) -> Vec<T>;
}

/// Records fetched from the remote store
pub struct RemoteSource {
    remote: Arc<dyn RemoteStore>,
}

impl RemoteSource {
    pub fn new(remote: Arc<dyn RemoteStore>) -> Self {
        Self { remote }
    }
}

#[async_trait]
impl<T: Record> DataSource<T> for RemoteSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Remote
    }

    async fn try_load(&self) -> Vec<T> {
        match self.remote.fetch_collection(T::KIND).await {
            Ok(values) => model::normalize_values(values),
            Err(err) => {
                tracing::warn!(kind = %T::KIND, "remote fetch failed: {err}");
                Vec::new()
            }
        }
    }
}

/// Records persisted in the local store
pub struct LocalSource {
    store: Arc<dyn LocalStore>,
}

impl LocalSource {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<T: Record> DataSource<T> for LocalSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Local
    }

    async fn try_load(&self) -> Vec<T> {
        local::load_collection(self.store.as_ref())
    }
}

/// Built-in seed records
pub struct DefaultSource<T> {
    seed: fn() -> Vec<T>,
}

impl<T: Record> DefaultSource<T> {
    pub fn new(seed: fn() -> Vec<T>) -> Self {
        Self { seed }
    }
}

#[async_trait]
impl<T: Record> DataSource<T> for DefaultSource<T> {
    fn kind(&self) -> SourceKind {
        SourceKind::Defaults
    }

    async fn try_load(&self) -> Vec<T> {
        // Same normalization path as the other sources.
        model::normalize_values(model::to_values(&(self.seed)()))
    }
}

/// Result of running a chain
#[derive(Debug, Clone)]
pub struct Loaded<T> {
    pub records: Vec<T>,
    pub source: SourceKind,
}

/// Sources tried in priority order
pub struct SourceChain<T> {
    sources: Vec<Box<dyn DataSource<T>>>,
}

impl<T: Record> Default for SourceChain<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> SourceChain<T> {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    pub fn with(mut self, source: impl DataSource<T> + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// First non-empty source wins.
    pub async fn load(&self) -> Loaded<T> {
        for source in &self.sources {
            let records = source.try_load().await;
            if !records.is_empty() {
                tracing::debug!(
                    kind = %T::KIND,
                    source = source.kind().as_str(),
                    count = records.len(),
                    "collection loaded"
                );
                return Loaded {
                    records,
                    source: source.kind(),
                };
            }
            tracing::debug!(
                kind = %T::KIND,
                source = source.kind().as_str(),
                "source empty, falling through"
            );
        }
        Loaded {
            records: Vec::new(),
            source: SourceKind::Empty,
        }
    }
}
