//! Mapping between artifact ids and versioned `.avsc` file paths.
//!
//! Artifact ids produced by the Debezium connectors look like
//! `pg1.nbe_mock.accounts-value` (Postgres) or `raw-CUSTOMER-value`
//! (Oracle tables routed to `raw-<TABLE>` topics). They are stored as:
//!
//! | artifact id | path |
//! |---|---|
//! | `raw-<TABLE>-value` | `ESW/<TABLE>.avsc` |
//! | `raw-<TABLE>-key` | `ESW/<TABLE>.key.avsc` |
//! | `<prefix>.<schema>.<table>-value` | `<schema>/<table>.avsc` |
//! | `<prefix>.<schema>.<table>-key` | `<schema>/<table>.key.avsc` |
//! | anything else | `artifacts/<id>.avsc` |

use std::path::{Path, PathBuf};

/// Schema directory for Oracle tables routed through `raw-<TABLE>` topics.
const ORACLE_SCHEMA_DIR: &str = "ESW";

const SCHEMA_EXTENSION: &str = "avsc";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Key,
    Value,
}

/// Split `<stem>-key` / `<stem>-value`.
pub fn split_kind(artifact_id: &str) -> Option<(&str, ArtifactKind)> {
    let (stem, kind) = artifact_id.rsplit_once('-')?;
    if stem.is_empty() {
        return None;
    }
    match kind {
        "key" => Some((stem, ArtifactKind::Key)),
        "value" => Some((stem, ArtifactKind::Value)),
        _ => None,
    }
}

/// Keep `[A-Za-z0-9._-]`, replacing each run of anything else with `_`.
pub fn safe_path_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    let mut in_run = false;
    for c in segment.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push('_');
            in_run = true;
        }
    }
    out
}

fn schema_file(dir: &str, table: &str, kind: ArtifactKind) -> PathBuf {
    let file = match kind {
        ArtifactKind::Value => format!("{}.{SCHEMA_EXTENSION}", safe_path_segment(table)),
        ArtifactKind::Key => format!("{}.key.{SCHEMA_EXTENSION}", safe_path_segment(table)),
    };
    Path::new(&safe_path_segment(dir)).join(file)
}

/// Relative path under `<root>/<group>/` for an artifact.
pub fn artifact_to_relpath(artifact_id: &str) -> PathBuf {
    if let Some((stem, kind)) = split_kind(artifact_id) {
        if let Some(table) = stem.strip_prefix("raw-").filter(|t| !t.is_empty()) {
            return schema_file(ORACLE_SCHEMA_DIR, table, kind);
        }

        let mut parts = stem.splitn(3, '.');
        if let (Some(prefix), Some(schema), Some(table)) = (parts.next(), parts.next(), parts.next())
        {
            if !prefix.is_empty() && !schema.is_empty() && !table.is_empty() && !table.contains('-')
            {
                return schema_file(schema, table, kind);
            }
        }
    }

    Path::new("artifacts").join(format!(
        "{}.{SCHEMA_EXTENSION}",
        safe_path_segment(artifact_id)
    ))
}

/// Artifact id for a schema file at `relpath` (relative to `<root>/<group>/`).
///
/// `<schema>/<table>.avsc` maps to `<group>.<schema>.<table>-value` and
/// `<schema>/<table>.key.avsc` to `<group>.<schema>.<table>-key`; any other
/// layout falls back to the file stem.
pub fn relpath_to_artifact(group: &str, relpath: &Path) -> Option<String> {
    let stem = relpath.file_stem()?.to_str()?;
    let components: Vec<&str> = relpath
        .components()
        .filter_map(|c| c.as_os_str().to_str())
        .collect();

    if components.len() == 2 && relpath.extension().and_then(|e| e.to_str()) == Some(SCHEMA_EXTENSION)
    {
        let schema = components[0];
        return Some(match stem.strip_suffix(".key") {
            Some(table) => format!("{group}.{schema}.{table}-key"),
            None => format!("{group}.{schema}.{stem}-value"),
        });
    }
    Some(stem.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oracle_raw_topics() {
        assert_eq!(
            artifact_to_relpath("raw-CUSTOMER-value"),
            PathBuf::from("ESW/CUSTOMER.avsc")
        );
        assert_eq!(
            artifact_to_relpath("raw-CUSTOMER-key"),
            PathBuf::from("ESW/CUSTOMER.key.avsc")
        );
        assert_eq!(
            artifact_to_relpath("raw-CUST-ADDR-value"),
            PathBuf::from("ESW/CUST-ADDR.avsc")
        );
    }

    #[test]
    fn test_connector_topics() {
        assert_eq!(
            artifact_to_relpath("pg1.nbe_mock.accounts-value"),
            PathBuf::from("nbe_mock/accounts.avsc")
        );
        assert_eq!(
            artifact_to_relpath("pg1.nbe_mock.accounts-key"),
            PathBuf::from("nbe_mock/accounts.key.avsc")
        );
    }

    #[test]
    fn test_fallback() {
        assert_eq!(
            artifact_to_relpath("some schema"),
            PathBuf::from("artifacts/some_schema.avsc")
        );
        assert_eq!(
            artifact_to_relpath("pg1.accounts-value"),
            PathBuf::from("artifacts/pg1.accounts-value.avsc")
        );
    }

    #[test]
    fn test_safe_path_segment_collapses_runs() {
        assert_eq!(safe_path_segment("a b/c"), "a_b_c");
        assert_eq!(safe_path_segment("a  //b"), "a_b");
        assert_eq!(safe_path_segment("ok.name-1_x"), "ok.name-1_x");
    }

    #[test]
    fn test_relpath_to_artifact() {
        assert_eq!(
            relpath_to_artifact("pg1", Path::new("nbe_mock/accounts.avsc")).as_deref(),
            Some("pg1.nbe_mock.accounts-value")
        );
        assert_eq!(
            relpath_to_artifact("pg1", Path::new("nbe_mock/accounts.key.avsc")).as_deref(),
            Some("pg1.nbe_mock.accounts-key")
        );
        assert_eq!(
            relpath_to_artifact("pg1", Path::new("artifacts/x/custom.avsc")).as_deref(),
            Some("custom")
        );
    }

    #[test]
    fn test_split_kind() {
        assert_eq!(split_kind("a-value"), Some(("a", ArtifactKind::Value)));
        assert_eq!(split_kind("a-b-key"), Some(("a-b", ArtifactKind::Key)));
        assert_eq!(split_kind("-value"), None);
        assert_eq!(split_kind("a-other"), None);
    }
}
