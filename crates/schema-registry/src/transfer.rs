//! Export a registry group to `.avsc` files, and import it back.
//!
//! Files live under `<root>/<group>/` using the layout in [`crate::layout`].

use crate::client::RegistryApi;
use crate::error::{Error, Result};
use crate::layout::{artifact_to_relpath, relpath_to_artifact, safe_path_segment};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    /// Files written, in listing order.
    pub written: Vec<PathBuf>,
    /// Artifacts filtered out (keys, or non-value artifacts without `include_keys`).
    pub skipped: usize,
    /// Artifacts whose content could not be fetched or written.
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportFailure {
    pub artifact_id: String,
    pub reason: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub ok: usize,
    pub failures: Vec<ImportFailure>,
}

impl ImportSummary {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// Write every value schema of `group` under `<out_root>/<group>/`.
///
/// Without `include_keys` only `-value` artifacts are exported. A listing
/// failure is an error; a failure on a single artifact is logged and counted.
pub async fn export_group<A>(
    api: &A,
    group: &str,
    out_root: &Path,
    include_keys: bool,
) -> Result<ExportSummary>
where
    A: RegistryApi + ?Sized,
{
    let artifacts = api.list_artifacts(group).await?;
    let group_dir = out_root.join(safe_path_segment(group));
    let mut summary = ExportSummary::default();

    if artifacts.is_empty() {
        info!("No artifacts found in group '{group}'");
        return Ok(summary);
    }

    for artifact in artifacts {
        let id = artifact.id;
        if id.is_empty() {
            continue;
        }
        if !include_keys && !id.ends_with("-value") {
            debug!("Skipping {group}/{id}");
            summary.skipped += 1;
            continue;
        }

        let content = match api.fetch_artifact(group, &id).await {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to fetch {group}/{id}: {e}");
                summary.failed += 1;
                continue;
            }
        };

        let target = group_dir.join(artifact_to_relpath(&id));
        if let Err(e) = write_schema(&target, &content).await {
            warn!("Failed to write {}: {e}", target.display());
            summary.failed += 1;
            continue;
        }
        debug!("Wrote {group}/{id} to {}", target.display());
        summary.written.push(target);
    }

    info!(
        "Exported {} schema file(s) into {}",
        summary.written.len(),
        group_dir.display()
    );
    Ok(summary)
}

async fn write_schema(target: &Path, content: &str) -> Result<()> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(target, content).await?;
    Ok(())
}

/// Publish every `*.avsc` under `<in_root>/<group>/`, in sorted path order.
pub async fn import_group<A>(api: &A, group: &str, in_root: &Path) -> Result<ImportSummary>
where
    A: RegistryApi + ?Sized,
{
    let group_dir = in_root.join(group);
    let is_dir = tokio::fs::metadata(&group_dir)
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false);
    if !is_dir {
        return Err(Error::MissingInput(group_dir));
    }

    let files = collect_schema_files(&group_dir).await?;
    let mut summary = ImportSummary::default();
    if files.is_empty() {
        info!("No .avsc files found under {}", group_dir.display());
        return Ok(summary);
    }

    for path in files {
        let relpath = path.strip_prefix(&group_dir).unwrap_or(&path);
        let Some(artifact_id) = relpath_to_artifact(group, relpath) else {
            warn!("Skipping {}: not a UTF-8 file name", path.display());
            continue;
        };

        let outcome = match tokio::fs::read(&path).await {
            Ok(body) => api.publish_artifact(group, &artifact_id, body).await,
            Err(e) => Err(e.into()),
        };
        match outcome {
            Ok(outcome) => {
                debug!("Published {group}/{artifact_id}: {outcome:?}");
                summary.ok += 1;
            }
            Err(e) => {
                warn!("Failed to publish {group}/{artifact_id}: {e}");
                summary.failures.push(ImportFailure {
                    artifact_id,
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        "Imported {} schema file(s) into group '{group}' ({} failed)",
        summary.ok,
        summary.failed()
    );
    Ok(summary)
}

/// All `*.avsc` files below `dir`, sorted.
pub async fn collect_schema_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&current).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_dir() {
                pending.push(path);
            } else if path.extension().and_then(|e| e.to_str()) == Some("avsc") {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}
