//! # Logwarden Vector Store
//!
//! Persistent nearest-neighbor index over embedded log lines.
//!
//! ## Architecture
//!
//! ```text
//! Sampled lines
//!     │
//!     ├──> EmbeddingService (HTTP endpoint / hash fallback / disabled)
//!     │      └─> Vector[dimension]
//!     │
//!     └──> FlatL2Index
//!            ├─> exact squared-L2 search
//!            └─> single-file binary persistence
//! ```
//!
//! The index is append-oriented: the ingest pipeline only ever adds vectors,
//! and a missing or corrupt index file degrades to an empty index instead of
//! failing startup.

mod embedder;
mod error;
mod flat_index;

pub use embedder::{Embedder, EmbeddingService, HashEmbedder, HttpEmbedder};
pub use error::{Result, VectorStoreError};
pub use flat_index::FlatL2Index;
