use crate::cursor::{CursorStore, FileCursor, FileIdentity};
use crate::{Result, TailerError};
use bzip2::read::MultiBzDecoder;
use flate2::read::MultiGzDecoder;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Incremental reader over a set of append-only log files.
///
/// Each call to [`read_new_lines`](LogTailer::read_new_lines) returns only
/// the complete lines written since the previous successful call for that
/// path. Offsets address the decompressed stream, so `.gz`/`.bz2` files are
/// tailed the same way as plain text.
pub struct LogTailer {
    cursors: CursorStore,
}

impl LogTailer {
    pub fn new(cursors: CursorStore) -> Self {
        Self { cursors }
    }

    pub fn cursor_store(&self) -> &CursorStore {
        &self.cursors
    }

    /// Read every complete line appended since the last call.
    ///
    /// Never fails: a missing file or transient read error yields an empty
    /// batch and leaves the cursor untouched, so the next run retries from
    /// the same position (at-least-once delivery).
    pub async fn read_new_lines(&mut self, path: impl AsRef<Path>) -> Vec<String> {
        let path = path.as_ref();
        match self.read_inner(path).await {
            Ok(lines) => lines,
            Err(err) => {
                log::warn!("failed to tail {}: {err}", path.display());
                Vec::new()
            }
        }
    }

    async fn read_inner(&mut self, path: &Path) -> Result<Vec<String>> {
        let meta = tokio::fs::metadata(path).await?;
        let identity = FileIdentity::of(&meta);
        let key = tokio::fs::canonicalize(path)
            .await
            .unwrap_or_else(|_| path.to_path_buf());

        let offset = match self.cursors.cursor(&key) {
            Some(stored) if stored.identity == identity => stored.offset,
            Some(_) => {
                log::info!(
                    "{} was rotated or replaced, reading from the start",
                    path.display()
                );
                0
            }
            None => 0,
        };

        let task_path = path.to_path_buf();
        let (lines, new_offset) =
            tokio::task::spawn_blocking(move || read_from_offset(&task_path, offset))
                .await
                .map_err(|err| TailerError::Other(format!("join tail task: {err}")))??;

        self.cursors.record(
            key,
            FileCursor {
                identity,
                offset: new_offset,
            },
        );
        Ok(lines)
    }
}

fn open_decoded(path: &Path) -> std::io::Result<Box<dyn BufRead + Send>> {
    let file = std::fs::File::open(path)?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let raw: Box<dyn Read + Send> = match ext.as_deref() {
        Some("gz") => Box::new(MultiGzDecoder::new(file)),
        Some("bz2") => Box::new(MultiBzDecoder::new(file)),
        _ => Box::new(file),
    };
    Ok(Box::new(BufReader::new(raw)))
}

/// Read complete lines starting at `offset` in the decompressed stream.
///
/// Returns the lines plus the offset just past the last line terminator. An
/// unterminated final fragment is left unconsumed, and a stream shorter than
/// `offset` (in-place truncation) yields nothing while holding the cursor
/// until the file grows past the old position again.
fn read_from_offset(path: &Path, offset: u64) -> std::io::Result<(Vec<String>, u64)> {
    let mut reader = open_decoded(path)?;
    if offset > 0 {
        let skipped = std::io::copy(&mut (&mut reader).take(offset), &mut std::io::sink())?;
        if skipped < offset {
            return Ok((Vec::new(), offset));
        }
    }

    let mut lines = Vec::new();
    let mut consumed = offset;
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let n = reader.read_until(b'\n', &mut buf)?;
        if n == 0 {
            break;
        }
        if buf.last() != Some(&b'\n') {
            break;
        }
        consumed += n as u64;
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
        lines.push(String::from_utf8_lossy(&buf).into_owned());
    }
    Ok((lines, consumed))
}
