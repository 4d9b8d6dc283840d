//! Apicurio registry access for avro-cdc-tap.
//!
//! - [`client`] - HTTP client for the registry v2 API (fetch, list, publish)
//! - [`resolver`] - process-wide, single-flight cache of parsed schemas
//! - [`memory`] - in-memory registry with the same API, for tests and offline use
//! - [`layout`] / [`transfer`] - mirroring a registry group to `.avsc` files and back
//!
//! Only one pinned schema body per coordinate is ever used; there is no
//! version negotiation and cached schemas are never refreshed.

pub mod client;
pub mod document;
pub mod error;
pub mod layout;
pub mod memory;
pub mod resolver;
pub mod transfer;

pub use client::{ArtifactSummary, PublishOutcome, RegistryApi, RegistryClient};
pub use document::{SchemaCoordinate, SchemaDocument};
pub use error::{Error, Result};
pub use memory::InMemoryRegistry;
pub use resolver::{SchemaFetcher, SchemaResolver};
pub use transfer::{export_group, import_group, ExportSummary, ImportFailure, ImportSummary};
