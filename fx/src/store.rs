//! On-disk snapshot of the last good rate payload.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::FxResult;

/// File name of the snapshot inside the data directory.
pub const SNAPSHOT_FILE: &str = "exchange_rates.json";

/// Single-slot store for the raw rate payload.
///
/// Writes go to a temporary file in the same directory which is then renamed
/// over the snapshot, so a crash mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct RateStore {
    path: PathBuf,
}

impl RateStore {
    /// Store the snapshot under `data_dir`.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(SNAPSHOT_FILE),
        }
    }

    /// Full path of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically replace the snapshot with `raw`.
    pub fn persist(&self, raw: &[u8]) -> FxResult<()> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(raw)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        debug!(path = %self.path.display(), bytes = raw.len(), "Persisted rate snapshot");
        Ok(())
    }

    /// Read the snapshot, `Ok(None)` if none has been written yet.
    pub fn read(&self) -> FxResult<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
