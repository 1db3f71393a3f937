use crate::error::Result;
use chrono::{DateTime, Utc};
use logwarden_analyzer::Verdict;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::io::AsyncWriteExt;

/// One exported analysis outcome: the raw line, its heuristic score and the
/// verdict attached to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub timestamp: DateTime<Utc>,
    pub original_log: String,
    pub fast_score: f64,
    pub llm_analysis: Verdict,
}

impl AnalysisRecord {
    /// Stamp a record with the current time. Scores are rounded to two
    /// decimals so the export matches what the run log showed.
    #[must_use]
    pub fn new(original_log: String, fast_score: f32, llm_analysis: Verdict) -> Self {
        Self {
            timestamp: Utc::now(),
            original_log,
            fast_score: (f64::from(fast_score) * 100.0).round() / 100.0,
            llm_analysis,
        }
    }
}

/// Append records to the NDJSON sink, one JSON object per line. Prior output
/// is never truncated; downstream consumers tail this file.
pub async fn export_records(path: impl AsRef<Path>, records: &[AnalysisRecord]) -> Result<()> {
    if records.is_empty() {
        log::info!("no analysis records to export");
        return Ok(());
    }
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut buffer = String::new();
    for record in records {
        buffer.push_str(&serde_json::to_string(record)?);
        buffer.push('\n');
    }

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(buffer.as_bytes()).await?;
    file.flush().await?;
    log::info!("exported {} records to {}", records.len(), path.display());
    Ok(())
}
