//! In-memory registry.
//!
//! Implements [`RegistryApi`] (and therefore [`crate::SchemaFetcher`]) over
//! a map of `(group, artifact id) → versions`, so the resolver and the
//! export/import tooling can run without an Apicurio instance.

use crate::client::{ArtifactSummary, PublishOutcome, RegistryApi};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    artifacts: Mutex<BTreeMap<(String, String), Vec<String>>>,
    fetches: AtomicUsize,
    fetch_delay: Option<Duration>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an artifact with a single version.
    pub fn with_artifact(
        mut self,
        group: impl Into<String>,
        artifact_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        self.artifacts
            .get_mut()
            .entry((group.into(), artifact_id.into()))
            .or_default()
            .push(content.into());
        self
    }

    /// Delay every fetch, to make concurrent first access overlap.
    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    /// Number of `fetch_artifact` calls served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub async fn versions(&self, group: &str, artifact_id: &str) -> Vec<String> {
        let artifacts = self.artifacts.lock().await;
        artifacts
            .get(&(group.to_string(), artifact_id.to_string()))
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl RegistryApi for InMemoryRegistry {
    async fn fetch_artifact(&self, group: &str, artifact_id: &str) -> Result<String> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }
        let artifacts = self.artifacts.lock().await;
        artifacts
            .get(&(group.to_string(), artifact_id.to_string()))
            .and_then(|versions| versions.last().cloned())
            .ok_or_else(|| Error::Status {
                status: 404,
                url: format!("memory://groups/{group}/artifacts/{artifact_id}"),
            })
    }

    async fn list_artifacts(&self, group: &str) -> Result<Vec<ArtifactSummary>> {
        let artifacts = self.artifacts.lock().await;
        Ok(artifacts
            .keys()
            .filter(|(g, _)| g == group)
            .map(|(_, id)| ArtifactSummary {
                id: id.clone(),
                artifact_type: Some("AVRO".to_string()),
            })
            .collect())
    }

    async fn publish_artifact(
        &self,
        group: &str,
        artifact_id: &str,
        content: Vec<u8>,
    ) -> Result<PublishOutcome> {
        let content = String::from_utf8_lossy(&content).into_owned();
        let mut artifacts = self.artifacts.lock().await;
        let versions = artifacts
            .entry((group.to_string(), artifact_id.to_string()))
            .or_default();
        versions.push(content);
        Ok(if versions.len() == 1 {
            PublishOutcome::Created
        } else {
            PublishOutcome::NewVersion
        })
    }
}
