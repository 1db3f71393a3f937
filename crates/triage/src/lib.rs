//! # Logwarden Triage
//!
//! Cheap, deterministic pre-filtering of log lines.
//!
//! The scorer turns one line into a suspicion score in `[0.0, 1.0]` from
//! four additive signals (HTTP status, response latency, attack keywords,
//! scanner user agents). The sampler ranks a batch by score and keeps only
//! the top slice, bounding how much volume ever reaches the expensive
//! analysis stage.

mod sampler;
mod scoring;

pub use sampler::{select_candidates, ScoredLine};
pub use scoring::score_line;
