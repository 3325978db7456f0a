//! Local snapshot storage - the key/value files a previous offline version of the dashboard
//! left behind. They are read once as the source of the migration and erased afterwards.

use crate::errors::Result;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Keys held in local storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotKey {
    /// JSON array of products
    Products,
    /// JSON array of sale records
    Sales,
}

impl SnapshotKey {
    /// Storage key
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Products => "products-snapshot",
            Self::Sales => "sales-snapshot",
        }
    }
}

/// Directory-backed key/value storage, one file per key.
#[derive(Debug, Clone)]
pub struct LocalSnapshotStore {
    dir: PathBuf,
}

impl LocalSnapshotStore {
    /// Uses `dir` as the storage root. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Storage root
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: SnapshotKey) -> PathBuf {
        self.dir.join(key.as_str())
    }

    /// Reads the raw value for `key`, or `None` if nothing is stored.
    pub fn read(&self, key: SnapshotKey) -> Result<Option<String>> {
        match std::fs::read_to_string(self.path(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Stores `contents` under `key`, replacing any previous value.
    pub fn write(&self, key: SnapshotKey, contents: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path(key), contents)?;
        debug!("Wrote local {}", key.as_str());
        Ok(())
    }

    /// Erases `key`. Erasing a missing key is not an error.
    pub fn remove(&self, key: SnapshotKey) -> Result<()> {
        match std::fs::remove_file(self.path(key)) {
            Ok(()) => {
                info!("Erased local {}", key.as_str());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
