//! # Logwarden Tailer
//!
//! Crash-safe incremental reading of append-only log files.
//!
//! Every tracked file gets a persistent cursor (device/inode identity plus a
//! byte offset into the decompressed stream). Reads resume where the last
//! successful run stopped, rotated or replaced files restart from zero, and
//! partially written final lines are left for the next run, so each complete
//! line is delivered at least once and in order.
//!
//! ```no_run
//! use logwarden_tailer::{CursorStore, LogTailer, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let cursors = CursorStore::load("state/cursors.json").await;
//!     let mut tailer = LogTailer::new(cursors);
//!
//!     let lines = tailer.read_new_lines("/var/log/nginx/access.log").await;
//!     println!("{} new lines", lines.len());
//!
//!     tailer.cursor_store().save("state/cursors.json").await?;
//!     Ok(())
//! }
//! ```

mod cursor;
mod error;
mod reader;

pub use cursor::{CursorStore, FileCursor, FileIdentity};
pub use error::{Result, TailerError};
pub use reader::LogTailer;
