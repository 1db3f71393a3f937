use crate::error::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Per-1000-token prices in USD.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pricing {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

impl Pricing {
    #[must_use]
    pub fn cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        (input_tokens as f64 / 1000.0) * self.input_per_1k
            + (output_tokens as f64 / 1000.0) * self.output_per_1k
    }
}

/// Token and cost counters for one accounting scope.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct UsageTotals {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
}

impl UsageTotals {
    fn add(&mut self, input_tokens: u64, output_tokens: u64, cost: f64) {
        self.input_tokens = self.input_tokens.saturating_add(input_tokens);
        self.output_tokens = self.output_tokens.saturating_add(output_tokens);
        self.cost_usd += cost;
    }
}

/// Spend tracking for the reasoning service.
///
/// The hourly window is wall-clock driven: it closes the first time the
/// tracker is consulted at least one window length after it opened, not on a
/// timer. Lifetime totals are never reset, and the tracker persists across
/// runs so short-lived invocations still accumulate against the budget.
#[derive(Debug)]
pub struct CostTracker {
    pricing: Pricing,
    window: Duration,
    window_started_at: DateTime<Utc>,
    hourly: UsageTotals,
    lifetime: UsageTotals,
}

#[derive(Serialize, Deserialize)]
struct PersistedUsage {
    window_started_at: DateTime<Utc>,
    hourly: UsageTotals,
    lifetime: UsageTotals,
}

impl CostTracker {
    #[must_use]
    pub fn new(pricing: Pricing) -> Self {
        Self::with_window(pricing, Duration::hours(1))
    }

    #[must_use]
    pub fn with_window(pricing: Pricing, window: Duration) -> Self {
        Self {
            pricing,
            window,
            window_started_at: Utc::now(),
            hourly: UsageTotals::default(),
            lifetime: UsageTotals::default(),
        }
    }

    /// Charge a batch of token usage to the current window and to lifetime.
    pub fn add_usage(&mut self, input_tokens: u64, output_tokens: u64) {
        let cost = self.pricing.cost(input_tokens, output_tokens);
        self.hourly.add(input_tokens, output_tokens, cost);
        self.lifetime.add(input_tokens, output_tokens, cost);
    }

    /// Close the hourly window if it has been open for a full window length.
    /// Must be called before consulting [`hourly_cost`](Self::hourly_cost)
    /// for a budget decision.
    pub fn rollover_if_elapsed(&mut self) {
        self.rollover_at(Utc::now());
    }

    fn rollover_at(&mut self, now: DateTime<Utc>) {
        if now.signed_duration_since(self.window_started_at) < self.window {
            return;
        }
        if self.hourly != UsageTotals::default() {
            log::info!(
                "closing usage window opened {}: {} input tokens, {} output tokens, ${:.4}",
                self.window_started_at.to_rfc3339(),
                self.hourly.input_tokens,
                self.hourly.output_tokens,
                self.hourly.cost_usd
            );
        }
        self.hourly = UsageTotals::default();
        self.window_started_at = now;
    }

    #[must_use]
    pub fn hourly_cost(&self) -> f64 {
        self.hourly.cost_usd
    }

    #[must_use]
    pub fn hourly(&self) -> UsageTotals {
        self.hourly
    }

    #[must_use]
    pub fn lifetime(&self) -> UsageTotals {
        self.lifetime
    }

    /// Load persisted counters, keeping the caller's pricing and window.
    /// Missing or corrupt files start a fresh tracker.
    pub async fn load(path: impl AsRef<Path>, pricing: Pricing) -> Self {
        let path = path.as_ref();
        let mut tracker = Self::new(pricing);
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("no usage state at {}, starting fresh", path.display());
                return tracker;
            }
            Err(err) => {
                log::error!("failed to read usage state {}: {err}", path.display());
                return tracker;
            }
        };
        match serde_json::from_slice::<PersistedUsage>(&bytes) {
            Ok(persisted) => {
                tracker.window_started_at = persisted.window_started_at;
                tracker.hourly = persisted.hourly;
                tracker.lifetime = persisted.lifetime;
            }
            Err(err) => {
                log::error!(
                    "usage state {} is corrupt, starting fresh: {err}",
                    path.display()
                );
            }
        }
        tracker
    }

    /// Atomically rewrite the usage state file.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let persisted = PersistedUsage {
            window_started_at: self.window_started_at,
            hourly: self.hourly,
            lifetime: self.lifetime,
        };
        let bytes = serde_json::to_vec_pretty(&persisted)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

/// Whitespace-token count used to approximate billable tokens. Close enough
/// for budget enforcement, not tokenizer-exact.
#[must_use]
pub fn approx_token_count(text: &str) -> u64 {
    text.split_whitespace().count() as u64
}
