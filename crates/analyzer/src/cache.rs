use crate::error::Result;
use crate::verdict::Verdict;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::Path;

/// Bounded LRU cache of verdicts keyed by exact line content.
///
/// A hit promotes the entry to most-recently-used; inserting at capacity
/// evicts the least-recently-used entry. Identical attack traffic repeats
/// heavily, so this is the main lever keeping reasoning spend flat.
pub struct ResultCache {
    entries: LruCache<String, Verdict>,
}

#[derive(Serialize, Deserialize)]
struct PersistedEntry {
    line: String,
    verdict: Verdict,
}

impl ResultCache {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
        }
    }

    pub fn get(&mut self, line: &str) -> Option<Verdict> {
        self.entries.get(line).cloned()
    }

    pub fn put(&mut self, line: String, verdict: Verdict) {
        self.entries.put(line, verdict);
    }

    /// Non-promoting membership check.
    #[must_use]
    pub fn contains(&self, line: &str) -> bool {
        self.entries.contains(line)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    /// Load a cache persisted by [`save`](Self::save). Entries are replayed
    /// least-recent first so the reloaded cache evicts in the same order the
    /// saved one would have. Missing or corrupt files load as empty.
    pub async fn load(path: impl AsRef<Path>, capacity: usize) -> Self {
        let path = path.as_ref();
        let mut cache = Self::new(capacity);
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("no verdict cache at {}, starting empty", path.display());
                return cache;
            }
            Err(err) => {
                log::error!("failed to read verdict cache {}: {err}", path.display());
                return cache;
            }
        };
        match serde_json::from_slice::<Vec<PersistedEntry>>(&bytes) {
            Ok(entries) => {
                for entry in entries {
                    cache.put(entry.line, entry.verdict);
                }
            }
            Err(err) => {
                log::error!(
                    "verdict cache {} is corrupt, starting empty: {err}",
                    path.display()
                );
            }
        }
        cache
    }

    /// Atomically rewrite the cache file, least-recently-used entries first.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut entries: Vec<PersistedEntry> = self
            .entries
            .iter()
            .map(|(line, verdict)| PersistedEntry {
                line: line.clone(),
                verdict: verdict.clone(),
            })
            .collect();
        // iter() walks most-recent first.
        entries.reverse();
        let bytes = serde_json::to_vec_pretty(&entries)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}
