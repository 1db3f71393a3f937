use crate::error::{PipelineError, Result};
use logwarden_analyzer::{Pricing, DEFAULT_GEMINI_BASE_URL};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Runtime configuration, sourced from `LOGWARDEN_*` environment variables.
///
/// Every field has a deployment default, so an empty environment yields a
/// working (if analysis-disabled) configuration. Malformed or out-of-range
/// values are hard startup errors rather than silent fallbacks: a typo in a
/// budget ceiling should stop the run, not loosen it.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory scanned for log files.
    pub log_dir: PathBuf,
    /// Append-only NDJSON sink for analysis records.
    pub output_file: PathBuf,
    /// Directory holding cursors, caches, usage and the vector index.
    pub state_dir: PathBuf,

    /// Reasoning credentials. `None` disables analysis, it does not fail it.
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub reasoning_concurrency: usize,

    /// Embedding endpoint. `None` falls back to the deterministic hasher.
    pub embeddings_url: Option<String>,
    pub embeddings_model: String,
    pub embedding_dimension: usize,
    pub indexing_enabled: bool,

    pub sample_top_percent: u8,
    pub cache_capacity: usize,
    pub max_hourly_cost_usd: f64,
    pub price_in_per_1k: f64,
    pub price_out_per_1k: f64,

    /// L2 distance cutoffs for similarity lookups against the index. Loaded
    /// and validated for parity with the deployed configuration surface; the
    /// ingest pipeline itself only writes to the index.
    pub attack_l2_threshold: f32,
    pub normal_l2_threshold: f32,

    pub request_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("/var/log/logwarden"),
            output_file: PathBuf::from("/var/log/logwarden/analysis.ndjson"),
            state_dir: PathBuf::from("/var/lib/logwarden"),
            gemini_api_key: None,
            gemini_model: "gemini-1.5-flash-latest".to_string(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            reasoning_concurrency: 4,
            embeddings_url: None,
            embeddings_model: "paraphrase-multilingual-MiniLM-L12-v2".to_string(),
            embedding_dimension: 384,
            indexing_enabled: true,
            sample_top_percent: 20,
            cache_capacity: 10_000,
            max_hourly_cost_usd: 5.0,
            price_in_per_1k: 0.000125,
            price_out_per_1k: 0.000375,
            attack_l2_threshold: 0.3,
            normal_l2_threshold: 0.2,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let settings = Self {
            log_dir: var("LOGWARDEN_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_dir),
            output_file: var("LOGWARDEN_OUTPUT_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_file),
            state_dir: var("LOGWARDEN_STATE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.state_dir),
            gemini_api_key: var("LOGWARDEN_GEMINI_API_KEY").or_else(|| var("GEMINI_API_KEY")),
            gemini_model: var("LOGWARDEN_GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            gemini_base_url: var("LOGWARDEN_GEMINI_BASE_URL").unwrap_or(defaults.gemini_base_url),
            reasoning_concurrency: parse_var("LOGWARDEN_REASONING_CONCURRENCY")?
                .unwrap_or(defaults.reasoning_concurrency),
            embeddings_url: var("LOGWARDEN_EMBEDDINGS_URL"),
            embeddings_model: var("LOGWARDEN_EMBEDDINGS_MODEL").unwrap_or(defaults.embeddings_model),
            embedding_dimension: parse_var("LOGWARDEN_EMBEDDING_DIM")?
                .unwrap_or(defaults.embedding_dimension),
            indexing_enabled: bool_var("LOGWARDEN_INDEXING")?.unwrap_or(defaults.indexing_enabled),
            sample_top_percent: parse_var("LOGWARDEN_SAMPLE_TOP_PERCENT")?
                .unwrap_or(defaults.sample_top_percent),
            cache_capacity: parse_var("LOGWARDEN_CACHE_CAPACITY")?
                .unwrap_or(defaults.cache_capacity),
            max_hourly_cost_usd: parse_var("LOGWARDEN_MAX_HOURLY_COST_USD")?
                .unwrap_or(defaults.max_hourly_cost_usd),
            price_in_per_1k: parse_var("LOGWARDEN_PRICE_IN_PER_1K")?
                .unwrap_or(defaults.price_in_per_1k),
            price_out_per_1k: parse_var("LOGWARDEN_PRICE_OUT_PER_1K")?
                .unwrap_or(defaults.price_out_per_1k),
            attack_l2_threshold: parse_var("LOGWARDEN_ATTACK_L2_THRESHOLD")?
                .unwrap_or(defaults.attack_l2_threshold),
            normal_l2_threshold: parse_var("LOGWARDEN_NORMAL_L2_THRESHOLD")?
                .unwrap_or(defaults.normal_l2_threshold),
            request_timeout: parse_var("LOGWARDEN_REQUEST_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Range checks shared by env loading and CLI overrides.
    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.sample_top_percent) {
            return Err(config_err(format!(
                "sample percent must be in 1..=100, got {}",
                self.sample_top_percent
            )));
        }
        if self.cache_capacity == 0 {
            return Err(config_err("cache capacity must be at least 1"));
        }
        if self.embedding_dimension == 0 {
            return Err(config_err("embedding dimension must be at least 1"));
        }
        if self.reasoning_concurrency == 0 {
            return Err(config_err("reasoning concurrency must be at least 1"));
        }
        if self.request_timeout < Duration::from_secs(1) {
            return Err(config_err("request timeout must be at least 1 second"));
        }
        for (label, value) in [
            ("hourly cost ceiling", self.max_hourly_cost_usd),
            ("input token price", self.price_in_per_1k),
            ("output token price", self.price_out_per_1k),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(config_err(format!(
                    "{label} must be a non-negative number, got {value}"
                )));
            }
        }
        for (label, value) in [
            ("attack similarity threshold", self.attack_l2_threshold),
            ("normal similarity threshold", self.normal_l2_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(config_err(format!(
                    "{label} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn pricing(&self) -> Pricing {
        Pricing {
            input_per_1k: self.price_in_per_1k,
            output_per_1k: self.price_out_per_1k,
        }
    }
}

fn config_err(msg: impl Into<String>) -> PipelineError {
    PipelineError::ConfigError(msg.into())
}

fn var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T: FromStr>(key: &str) -> Result<Option<T>> {
    let Some(raw) = var(key) else {
        return Ok(None);
    };
    raw.parse::<T>()
        .map(Some)
        .map_err(|_| config_err(format!("{key} has invalid value {raw:?}")))
}

fn bool_var(key: &str) -> Result<Option<bool>> {
    let Some(raw) = var(key) else {
        return Ok(None);
    };
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(Some(true)),
        "0" | "false" | "off" | "no" => Ok(Some(false)),
        _ => Err(config_err(format!("{key} has invalid value {raw:?}"))),
    }
}
