//! HTTP client for the Apicurio registry v2 API.
//!
//! Endpoints used (relative to the base URL, e.g.
//! `http://localhost:8081/apis/registry/v2`):
//!
//! - `GET  /groups/{group}/artifacts/{id}` - latest schema content
//! - `GET  /groups/{group}/artifacts?limit=1000` - artifact listing
//! - `POST /groups/{group}/artifacts` - create artifact
//! - `POST /groups/{group}/artifacts/{id}/versions` - new version of an existing artifact

use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Page size requested when listing a group.
const LIST_LIMIT: &str = "1000";

/// One entry of an artifact listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ArtifactSummary {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub artifact_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArtifactListing {
    #[serde(default)]
    artifacts: Option<Vec<ArtifactSummary>>,
}

/// What publishing a schema did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// A new artifact was created.
    Created,
    /// The artifact existed; the content was added as a new version.
    NewVersion,
}

/// Registry operations used by the consumer and the export/import tooling.
#[async_trait]
pub trait RegistryApi: Send + Sync {
    /// Latest content of an artifact.
    async fn fetch_artifact(&self, group: &str, artifact_id: &str) -> Result<String>;

    async fn list_artifacts(&self, group: &str) -> Result<Vec<ArtifactSummary>>;

    /// Create the artifact, or add a version when it already exists.
    async fn publish_artifact(
        &self,
        group: &str,
        artifact_id: &str,
        content: Vec<u8>,
    ) -> Result<PublishOutcome>;
}

/// Apicurio registry client over HTTP.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    base_url: Url,
    http: Client,
}

impl RegistryClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| Error::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::InvalidUrl(base_url.to_string()));
        }
        let http = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Base URL with percent-encoded path segments appended.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn post_schema(
        &self,
        url: Url,
        artifact_id: Option<&str>,
        content: Vec<u8>,
    ) -> Result<StatusCode> {
        let mut request = self
            .http
            .post(url)
            .header("Content-Type", "application/json")
            .header("X-Registry-ArtifactType", "AVRO");
        if let Some(id) = artifact_id {
            request = request.header("X-Registry-ArtifactId", id);
        }
        Ok(request.body(content).send().await?.status())
    }
}

#[async_trait]
impl RegistryApi for RegistryClient {
    async fn fetch_artifact(&self, group: &str, artifact_id: &str) -> Result<String> {
        let url = self.endpoint(&["groups", group, "artifacts", artifact_id])?;
        debug!("Fetching schema from {url}");

        let response = self.http.get(url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(Error::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.text().await?)
    }

    async fn list_artifacts(&self, group: &str) -> Result<Vec<ArtifactSummary>> {
        let mut url = self.endpoint(&["groups", group, "artifacts"])?;
        url.query_pairs_mut().append_pair("limit", LIST_LIMIT);
        debug!("Listing artifacts at {url}");

        let response = self.http.get(url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(Error::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }
        let body = response.text().await?;
        let listing: ArtifactListing = serde_json::from_str(&body)?;
        Ok(listing.artifacts.unwrap_or_default())
    }

    async fn publish_artifact(
        &self,
        group: &str,
        artifact_id: &str,
        content: Vec<u8>,
    ) -> Result<PublishOutcome> {
        let create_url = self.endpoint(&["groups", group, "artifacts"])?;
        let status = self
            .post_schema(create_url.clone(), Some(artifact_id), content.clone())
            .await?;
        if status == StatusCode::OK || status == StatusCode::CREATED {
            return Ok(PublishOutcome::Created);
        }
        if status != StatusCode::CONFLICT {
            return Err(Error::Status {
                status: status.as_u16(),
                url: create_url.to_string(),
            });
        }

        debug!("Artifact {group}/{artifact_id} exists, adding a version");
        let versions_url = self.endpoint(&["groups", group, "artifacts", artifact_id, "versions"])?;
        let status = self.post_schema(versions_url.clone(), None, content).await?;
        if status == StatusCode::OK || status == StatusCode::CREATED {
            Ok(PublishOutcome::NewVersion)
        } else {
            Err(Error::Status {
                status: status.as_u16(),
                url: versions_url.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_appends_segments() {
        let client = RegistryClient::new("http://localhost:8081/apis/registry/v2/").unwrap();
        let url = client
            .endpoint(&["groups", "oracle-esw", "artifacts", "raw-CUSTOMER-value"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8081/apis/registry/v2/groups/oracle-esw/artifacts/raw-CUSTOMER-value"
        );
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let client = RegistryClient::new("http://registry:8080/apis/registry/v2").unwrap();
        let url = client.endpoint(&["groups", "a b", "artifacts", "x/y"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://registry:8080/apis/registry/v2/groups/a%20b/artifacts/x%2Fy"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            RegistryClient::new("not a url"),
            Err(Error::InvalidUrl(_))
        ));
        assert!(matches!(
            RegistryClient::new("mailto:someone@example.com"),
            Err(Error::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_listing_tolerates_missing_fields() {
        let listing: ArtifactListing =
            serde_json::from_str(r#"{"artifacts":[{"id":"a-value","type":"AVRO"},{}]}"#).unwrap();
        let artifacts = listing.artifacts.unwrap();
        assert_eq!(artifacts[0].id, "a-value");
        assert_eq!(artifacts[0].artifact_type.as_deref(), Some("AVRO"));
        assert_eq!(artifacts[1].id, "");

        let empty: ArtifactListing = serde_json::from_str(r#"{"artifacts":null}"#).unwrap();
        assert!(empty.artifacts.is_none());
    }
}
