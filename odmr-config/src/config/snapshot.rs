//! Run snapshot change detection.
//!
//! Before each run the previous run's document is kept next to the current
//! one as `<name>.aux`. Comparing the two tells the engine whether anything
//! changed since the last run. Comparison is on parsed YAML values, so
//! comments and formatting do not count.

use serde::Serialize;
use serde_yaml::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Extension of the stored snapshot file.
pub const SNAPSHOT_EXTENSION: &str = "aux";

/// Outcome of recording a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotStatus {
    /// No previous snapshot existed
    First,
    /// The document differs from the previous snapshot
    Changed,
    /// The document matches the previous snapshot
    Unchanged,
}

impl SnapshotStatus {
    /// Lowercase name, as printed by the CLI.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Changed => "changed",
            Self::Unchanged => "unchanged",
        }
    }
}

impl std::fmt::Display for SnapshotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The stored snapshot belonging to one configuration document.
#[derive(Debug, Clone)]
pub struct RunSnapshot {
    aux_path: PathBuf,
}

impl RunSnapshot {
    /// Snapshot stored beside `document` with the `.aux` extension.
    #[must_use]
    pub fn for_document(document: &Path) -> Self {
        Self::at(document.with_extension(SNAPSHOT_EXTENSION))
    }

    /// Snapshot stored at an explicit path.
    #[must_use]
    pub fn at(aux_path: impl Into<PathBuf>) -> Self {
        Self {
            aux_path: aux_path.into(),
        }
    }

    /// Path of the stored snapshot.
    #[must_use]
    pub fn aux_path(&self) -> &Path {
        &self.aux_path
    }

    /// Compares `document_text` with the stored snapshot, then replaces the
    /// snapshot with it.
    ///
    /// A stored snapshot that no longer parses counts as changed.
    ///
    /// # Errors
    ///
    /// Returns an error if `document_text` is not valid YAML (the snapshot
    /// is left untouched), or if the snapshot cannot be read or written.
    pub fn record(&self, document_text: &str) -> Result<SnapshotStatus> {
        let current: Value = serde_yaml::from_str(document_text)?;

        let status = match std::fs::read_to_string(&self.aux_path) {
            Ok(previous) => match serde_yaml::from_str::<Value>(&previous) {
                Ok(previous) if previous == current => SnapshotStatus::Unchanged,
                Ok(_) => SnapshotStatus::Changed,
                Err(e) => {
                    tracing::debug!(
                        snapshot = %self.aux_path.display(),
                        error = %e,
                        "stored snapshot does not parse"
                    );
                    SnapshotStatus::Changed
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => SnapshotStatus::First,
            Err(e) => return Err(e.into()),
        };

        std::fs::write(&self.aux_path, document_text)?;
        tracing::debug!(snapshot = %self.aux_path.display(), %status, "recorded run snapshot");
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "averages: 5\ndynamic_steps: 100\n";

    #[test]
    fn test_aux_path_beside_document() {
        let snapshot = RunSnapshot::for_document(Path::new("/runs/odmr.yaml"));
        assert_eq!(snapshot.aux_path(), Path::new("/runs/odmr.aux"));
    }

    #[test]
    fn test_first_then_unchanged_then_changed() {
        let dir = tempfile::tempdir().unwrap();
        let document = dir.path().join("odmr.yaml");
        let snapshot = RunSnapshot::for_document(&document);

        assert_eq!(snapshot.record(DOC).unwrap(), SnapshotStatus::First);
        assert_eq!(snapshot.record(DOC).unwrap(), SnapshotStatus::Unchanged);
        assert_eq!(
            snapshot.record("averages: 6\ndynamic_steps: 100\n").unwrap(),
            SnapshotStatus::Changed
        );
        assert_eq!(
            std::fs::read_to_string(snapshot.aux_path()).unwrap(),
            "averages: 6\ndynamic_steps: 100\n"
        );
        assert!(!document.exists());
    }

    #[test]
    fn test_comments_and_formatting_do_not_count() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = RunSnapshot::at(dir.path().join("odmr.aux"));
        snapshot.record(DOC).unwrap();
        let reformatted = "# tweaked by hand\naverages:   5   # five\ndynamic_steps: 100\n";
        assert_eq!(
            snapshot.record(reformatted).unwrap(),
            SnapshotStatus::Unchanged
        );
    }

    #[test]
    fn test_corrupt_snapshot_counts_as_changed() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = RunSnapshot::at(dir.path().join("odmr.aux"));
        std::fs::write(snapshot.aux_path(), "averages: [5\n").unwrap();
        assert_eq!(snapshot.record(DOC).unwrap(), SnapshotStatus::Changed);
        assert_eq!(snapshot.record(DOC).unwrap(), SnapshotStatus::Unchanged);
    }

    #[test]
    fn test_invalid_document_leaves_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = RunSnapshot::at(dir.path().join("odmr.aux"));
        snapshot.record(DOC).unwrap();
        assert!(snapshot.record("averages: [5\n").is_err());
        assert_eq!(std::fs::read_to_string(snapshot.aux_path()).unwrap(), DOC);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(SnapshotStatus::Unchanged.to_string(), "unchanged");
        assert_eq!(
            serde_json::to_string(&SnapshotStatus::First).unwrap(),
            r#""first""#
        );
    }
}
