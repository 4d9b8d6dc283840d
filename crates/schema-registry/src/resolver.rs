//! Process-wide schema cache.
//!
//! [`SchemaResolver`] fetches each [`SchemaCoordinate`] at most once and
//! hands out the same `Arc<SchemaDocument>` to every caller afterwards.
//! Concurrent first access to one coordinate is single-flight: callers
//! wait on a per-coordinate [`OnceCell`] instead of racing the registry.
//!
//! A failed resolution leaves the cell empty, so a later call tries again.
//! There is no retry inside a single call and no invalidation; a schema
//! changed in the registry is not picked up until the process restarts.

use crate::client::RegistryApi;
use crate::document::{SchemaCoordinate, SchemaDocument};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};

/// Fetches the raw schema body for a coordinate.
#[async_trait]
pub trait SchemaFetcher: Send + Sync {
    async fn fetch(&self, coordinate: &SchemaCoordinate) -> Result<String>;
}

#[async_trait]
impl<T: RegistryApi> SchemaFetcher for T {
    async fn fetch(&self, coordinate: &SchemaCoordinate) -> Result<String> {
        self.fetch_artifact(&coordinate.group, &coordinate.artifact_id)
            .await
    }
}

type Slot = Arc<OnceCell<Arc<SchemaDocument>>>;

pub struct SchemaResolver {
    fetcher: Arc<dyn SchemaFetcher>,
    cache: Mutex<HashMap<SchemaCoordinate, Slot>>,
}

impl SchemaResolver {
    pub fn new(fetcher: Arc<dyn SchemaFetcher>) -> Self {
        Self {
            fetcher,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve a coordinate, fetching and parsing it on first use.
    ///
    /// Any failure (transport, non-2xx, unparseable body) is reported as
    /// [`Error::SchemaFetch`].
    pub async fn resolve(&self, coordinate: &SchemaCoordinate) -> Result<Arc<SchemaDocument>> {
        let slot = {
            let mut cache = self.cache.lock().await;
            Arc::clone(cache.entry(coordinate.clone()).or_default())
        };

        let document = slot
            .get_or_try_init(|| async {
                debug!("Fetching schema {coordinate}");
                let body = self
                    .fetcher
                    .fetch(coordinate)
                    .await
                    .map_err(|e| schema_fetch_error(coordinate, e))?;
                let document = SchemaDocument::parse(coordinate.clone(), body)
                    .map_err(|e| schema_fetch_error(coordinate, e))?;
                info!("Resolved schema {coordinate}");
                Ok::<_, Error>(Arc::new(document))
            })
            .await?;

        Ok(Arc::clone(document))
    }

    /// The cached document, without fetching.
    pub async fn cached(&self, coordinate: &SchemaCoordinate) -> Option<Arc<SchemaDocument>> {
        let cache = self.cache.lock().await;
        cache
            .get(coordinate)
            .and_then(|slot| slot.get())
            .map(Arc::clone)
    }
}

fn schema_fetch_error(coordinate: &SchemaCoordinate, source: Error) -> Error {
    match source {
        Error::SchemaFetch { .. } => source,
        other => Error::SchemaFetch {
            coordinate: coordinate.clone(),
            reason: other.to_string(),
        },
    }
}
