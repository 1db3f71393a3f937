//! # Logwarden Pipeline
//!
//! The per-invocation ingest run, wiring the other crates together.
//!
//! ## Architecture
//!
//! ```text
//! discover_log_files
//!     │
//!     ▼
//! Pipeline::run
//!     ├─> LogTailer ──────── new lines since the saved cursors
//!     ├─> SamplerIndexer ─── score, sample, embed, index
//!     ├─> BatchAnalyzer ──── cache / budget / reasoning verdicts
//!     └─> AnalysisRecord ─── one per analyzed line
//!             │
//!             ▼
//! export_records (NDJSON) + Pipeline::persist_state
//! ```
//!
//! A `RunLock` brackets the whole sequence: every durable file in the state
//! directory assumes a single writer. Configuration comes from `LOGWARDEN_*`
//! environment variables via [`Settings::from_env`], with CLI overrides
//! applied on top by the binary.

mod discover;
mod error;
mod export;
mod indexer;
mod lock;
mod pipeline;
mod settings;
#[cfg(test)]
mod test_support;

pub use discover::discover_log_files;
pub use error::{PipelineError, Result};
pub use export::{export_records, AnalysisRecord};
pub use indexer::SamplerIndexer;
pub use lock::RunLock;
pub use pipeline::{Pipeline, StatePaths};
pub use settings::Settings;
