//! Local disk cache for asset bytes.
//!
//! A flat directory keyed by asset identifier. The cache is never authoritative:
//! entries may be missing at any time and are refilled from the remote store.

use crate::asset::AssetId;
use bytes::Bytes;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tracing::{debug, info};

const TEMP_PREFIX: &str = ".tmp-";

/// Disk-resident mirror of remote assets
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    /// Open the cache directory, creating it if needed
    pub async fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        info!(path = %dir.display(), "Asset cache directory ready");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the cache entry for an identifier
    pub fn path_for(&self, id: &AssetId) -> PathBuf {
        self.dir.join(id.as_str())
    }

    /// Open a cached entry, `None` when it is not cached
    pub async fn open_entry(&self, id: &AssetId) -> io::Result<Option<File>> {
        match File::open(self.path_for(id)).await {
            Ok(file) => Ok(Some(file)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Store bytes for an identifier.
    ///
    /// Each write goes to its own anonymous temporary file in the cache
    /// directory and is renamed into place, so concurrent writers never share
    /// a partial file and readers only ever open complete entries. Temporary
    /// names start with a dot and can never parse as an [`AssetId`].
    pub async fn store(&self, id: &AssetId, data: &Bytes) -> io::Result<()> {
        let dir = self.dir.clone();
        let path = self.path_for(id);
        let payload = data.clone();

        tokio::task::spawn_blocking(move || -> io::Result<()> {
            let mut staged = tempfile::Builder::new()
                .prefix(TEMP_PREFIX)
                .tempfile_in(&dir)?;
            staged.write_all(&payload)?;
            staged.as_file().sync_data()?;
            staged.persist(&path).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(io::Error::other)??;

        debug!(asset_id = %id, size_bytes = data.len(), "Asset cached");
        Ok(())
    }

    /// Remove the entry for an identifier; a missing entry is not an error
    pub async fn remove(&self, id: &AssetId) -> io::Result<()> {
        match tokio::fs::remove_file(self.path_for(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub async fn contains(&self, id: &AssetId) -> bool {
        tokio::fs::try_exists(self.path_for(id))
            .await
            .unwrap_or(false)
    }
}
