use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Stable identity of a file on disk, independent of its name.
///
/// Rotation schemes rename or replace the file at a given path; the
/// device/inode pair survives renames but changes when the path points at a
/// brand new file, which is exactly the distinction the tailer needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileIdentity {
    pub device: u64,
    pub inode: u64,
}

impl FileIdentity {
    #[cfg(unix)]
    pub fn of(meta: &std::fs::Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;
        Self {
            device: meta.dev(),
            inode: meta.ino(),
        }
    }

    #[cfg(not(unix))]
    pub fn of(meta: &std::fs::Metadata) -> Self {
        // Off unix there is no inode; creation time is the closest stable
        // stand-in for "same path, different file".
        let created = meta
            .created()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
            .unwrap_or(0);
        Self {
            device: 0,
            inode: created,
        }
    }
}

/// Read position for one tracked file: how far into the (decompressed)
/// stream the last run got, and which physical file that offset belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCursor {
    #[serde(flatten)]
    pub identity: FileIdentity,
    pub offset: u64,
}

/// All cursors for a state directory, keyed by resolved path.
///
/// Loaded once at startup and rewritten wholesale at shutdown; a corrupt or
/// missing state file degrades to an empty store so every tracked file is
/// simply re-read from the start.
#[derive(Debug, Default)]
pub struct CursorStore {
    cursors: HashMap<PathBuf, FileCursor>,
}

impl CursorStore {
    pub async fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("no cursor state at {}, starting fresh", path.display());
                return Self::default();
            }
            Err(err) => {
                log::error!("failed to read cursor state {}: {err}", path.display());
                return Self::default();
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(cursors) => Self { cursors },
            Err(err) => {
                log::error!(
                    "cursor state {} is corrupt, starting fresh: {err}",
                    path.display()
                );
                Self::default()
            }
        }
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(&self.cursors)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    pub fn cursor(&self, path: &Path) -> Option<FileCursor> {
        self.cursors.get(path).copied()
    }

    pub fn record(&mut self, path: PathBuf, cursor: FileCursor) {
        self.cursors.insert(path, cursor);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }
}
