//! # Logwarden Analyzer
//!
//! LLM-backed triage of suspicious log lines, with the guard rails needed to
//! run it unattended.
//!
//! ## Architecture
//!
//! ```text
//! Suspicious lines
//!     │
//!     └──> BatchAnalyzer
//!            ├─> ResultCache ── LRU, persisted across runs
//!            ├─> CostTracker ── hourly window + lifetime totals
//!            └─> ReasoningService (Gemini / disabled)
//!                  └─> Verdict per line, in input order
//! ```
//!
//! Every path through [`BatchAnalyzer::analyze`] yields exactly one
//! [`Verdict`] per input line. When the reasoning service is disabled, the
//! hourly budget is spent, or a call fails, sentinel verdicts take the place
//! of real analyses; only genuine analyses enter the cache.

mod batch;
mod cache;
mod cost;
mod error;
mod reasoning;
mod verdict;

pub use batch::BatchAnalyzer;
pub use cache::ResultCache;
pub use cost::{approx_token_count, CostTracker, Pricing, UsageTotals};
pub use error::{AnalyzerError, Result};
pub use reasoning::{
    GeminiClient, GeminiConfig, ReasoningClient, ReasoningService, DEFAULT_GEMINI_BASE_URL,
};
pub use verdict::{parse_verdict, Severity, Verdict};
