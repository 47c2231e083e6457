// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of CarbonWatch.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! Snapshot store: a flat directory of JSON files named by request time

use carbonwatch_types::{FILENAME_DATETIME_FORMAT, round_down};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{CoreError, Result};

pub const SNAPSHOT_EXTENSION: &str = "json";
pub const DEFAULT_ARCHIVE_DIR: &str = "_archive";

/// File name of the snapshot requested at `requested_at`, e.g. `2023-03-09T2001Z.json`
pub fn snapshot_file_name(requested_at: DateTime<Utc>) -> String {
    format!(
        "{}.{SNAPSHOT_EXTENSION}",
        requested_at.format(FILENAME_DATETIME_FORMAT)
    )
}

/// Capture time encoded in a snapshot file name, rounded down to the grid
pub fn captured_at_from_path(path: &Path) -> Result<DateTime<Utc>> {
    let stem = path
        .file_stem()
        .and_then(std::ffi::OsStr::to_str)
        .ok_or_else(|| CoreError::Timestamp {
            value: path.display().to_string(),
            reason: "file name is not valid UTF-8".to_owned(),
        })?;

    let naive = NaiveDateTime::parse_from_str(stem, FILENAME_DATETIME_FORMAT).map_err(|e| {
        CoreError::Timestamp {
            value: stem.to_owned(),
            reason: e.to_string(),
        }
    })?;

    Ok(round_down(naive.and_utc()))
}

/// Write `contents` to `path` through a temporary sibling and a rename
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let temp_path = temp_sibling(path);
    fs::write(&temp_path, contents)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

pub(crate) fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// A directory of snapshot files
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
    archive_dir_name: String,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            archive_dir_name: DEFAULT_ARCHIVE_DIR.to_owned(),
        }
    }

    #[must_use]
    pub fn with_archive_dir(mut self, name: impl Into<String>) -> Self {
        self.archive_dir_name = name.into();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.dir.join(&self.archive_dir_name)
    }

    /// Create the store directory if it doesn't exist yet
    pub fn ensure_exists(&self) -> Result<()> {
        if !self.dir.exists() {
            info!("Creating directory {}", self.dir.display());
            fs::create_dir_all(&self.dir)?;
        }
        Ok(())
    }

    pub fn snapshot_path(&self, requested_at: DateTime<Utc>) -> PathBuf {
        self.dir.join(snapshot_file_name(requested_at))
    }

    /// Files with `extension` directly in the store, sorted by name.
    ///
    /// Names encode zero-padded timestamps, so name order is capture order.
    /// Subdirectories (including the archive) are not descended into.
    pub fn list(&self, extension: &str) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == extension) {
                files.push(path);
            }
        }
        files.sort();
        debug!(
            "Found {} .{} files in {}",
            files.len(),
            extension,
            self.dir.display()
        );
        Ok(files)
    }

    pub fn list_snapshots(&self) -> Result<Vec<PathBuf>> {
        self.list(SNAPSHOT_EXTENSION)
    }

    /// Move a consumed snapshot into the archive subdirectory
    pub fn archive(&self, path: &Path) -> Result<PathBuf> {
        let archive_dir = self.archive_dir();
        fs::create_dir_all(&archive_dir)?;

        let file_name = path.file_name().ok_or_else(|| {
            CoreError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Not a file: {}", path.display()),
            ))
        })?;
        let target = archive_dir.join(file_name);
        fs::rename(path, &target)?;
        debug!("Archived {} -> {}", path.display(), target.display());
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_snapshot_file_name() {
        let at = Utc.with_ymd_and_hms(2023, 3, 9, 20, 1, 0).unwrap();
        assert_eq!(snapshot_file_name(at), "2023-03-09T2001Z.json");
    }

    #[test]
    fn test_captured_at_from_path() {
        let path = Path::new("/data/2023-03-09T2001Z.json");
        assert_eq!(
            captured_at_from_path(path).unwrap(),
            Utc.with_ymd_and_hms(2023, 3, 9, 20, 0, 0).unwrap()
        );
        assert!(captured_at_from_path(Path::new("notes.json")).is_err());
    }

    #[test]
    fn test_list_sorted_and_filtered() {
        let temp = TempDir::new().unwrap();
        let store = SnapshotStore::new(temp.path());
        for name in [
            "2023-03-10T0001Z.json",
            "2023-03-09T2331Z.json",
            "2023-03-09T2331Z.csv",
        ] {
            fs::write(temp.path().join(name), "{}").unwrap();
        }
        fs::create_dir(temp.path().join("_archive")).unwrap();
        fs::write(temp.path().join("_archive/2023-01-01T0001Z.json"), "{}").unwrap();

        let names: Vec<_> = store
            .list_snapshots()
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["2023-03-09T2331Z.json", "2023-03-10T0001Z.json"]);
    }

    #[test]
    fn test_list_missing_dir_is_error() {
        let temp = TempDir::new().unwrap();
        let store = SnapshotStore::new(temp.path().join("missing"));
        assert!(store.list_snapshots().is_err());
    }

    #[test]
    fn test_archive_moves_file() {
        let temp = TempDir::new().unwrap();
        let store = SnapshotStore::new(temp.path()).with_archive_dir("old");
        let path = temp.path().join("2023-03-09T2001Z.json");
        fs::write(&path, "{}").unwrap();

        let target = store.archive(&path).unwrap();
        assert!(!path.exists());
        assert_eq!(target, temp.path().join("old/2023-03-09T2001Z.json"));
        assert!(target.exists());
    }

    #[test]
    fn test_write_atomic_replaces_content() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("summary.csv");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        assert!(!temp_sibling(&path).exists());
    }
}
