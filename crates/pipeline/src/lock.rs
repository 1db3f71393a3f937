use crate::error::{PipelineError, Result};
use fs2::FileExt;
use std::path::Path;

/// Advisory exclusive lock covering one state directory.
///
/// Every durable file under the state directory assumes a single writer, so
/// a run takes this lock before touching any of them and a second concurrent
/// run fails fast instead of corrupting cursors or the index.
#[derive(Debug)]
pub struct RunLock {
    #[allow(dead_code)]
    file: std::fs::File,
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

impl RunLock {
    pub async fn acquire(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let lock = tokio::task::spawn_blocking(move || -> Result<Self> {
            use std::fs::OpenOptions;

            let file = OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .truncate(false)
                .open(&path)
                .map_err(|err| {
                    PipelineError::Other(format!("open run lock {}: {err}", path.display()))
                })?;

            file.try_lock_exclusive().map_err(|err| {
                if err.kind() == std::io::ErrorKind::WouldBlock {
                    PipelineError::Other(format!(
                        "another run holds the lock at {}",
                        path.display()
                    ))
                } else {
                    PipelineError::Other(format!("acquire run lock {}: {err}", path.display()))
                }
            })?;

            Ok(Self { file })
        })
        .await
        .map_err(|err| PipelineError::Other(format!("join run lock task: {err}")))??;

        Ok(lock)
    }
}
