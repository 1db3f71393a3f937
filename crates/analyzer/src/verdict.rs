use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Severity attached to a verdict.
///
/// Deserialization is deliberately forgiving: severity comes back from a
/// language model, so casing varies and unknown labels degrade to `None`
/// instead of failing the whole verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub enum Severity {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "medium" => Self::Medium,
            "high" => Self::High,
            _ => Self::None,
        })
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::None => "None",
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        };
        f.write_str(label)
    }
}

/// One judgment about one log line, as produced by the reasoning service or
/// synthesized by the pipeline when the service was not consulted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    #[serde(default)]
    pub is_attack: bool,
    #[serde(default = "default_attack_type")]
    pub attack_type: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub severity: Severity,
}

fn default_attack_type() -> String {
    "N/A".to_string()
}

impl Verdict {
    /// Sentinel for lines skipped because analysis is disabled.
    #[must_use]
    pub fn not_analyzed() -> Self {
        Self {
            is_attack: false,
            attack_type: "N/A".to_string(),
            reason: "Analysis disabled, not analyzed.".to_string(),
            severity: Severity::None,
        }
    }

    /// Sentinel for lines skipped because the hourly budget is spent.
    #[must_use]
    pub fn budget_exhausted() -> Self {
        Self {
            is_attack: false,
            attack_type: "N/A".to_string(),
            reason: "Budget limit reached, not analyzed.".to_string(),
            severity: Severity::None,
        }
    }

    /// Error verdict for a response that did not contain a usable verdict.
    /// Flagged as an attack so a human reviews what the model saw.
    #[must_use]
    pub fn parse_error() -> Self {
        Self {
            is_attack: true,
            attack_type: "Analysis Parse Error".to_string(),
            reason: "Failed to parse analysis response.".to_string(),
            severity: Severity::Medium,
        }
    }

    /// Error verdict for a whole-batch transport failure.
    #[must_use]
    pub fn service_error(detail: &str) -> Self {
        Self {
            is_attack: true,
            attack_type: "Analysis Service Error".to_string(),
            reason: detail.to_string(),
            severity: Severity::High,
        }
    }
}

/// Extract a verdict from reasoning-service output.
///
/// Accepts either a bare JSON object or the first balanced JSON object
/// embedded in surrounding text (models routinely wrap the object in prose
/// or markdown fences). Missing fields take their defaults; anything without
/// a parseable object yields `None`.
#[must_use]
pub fn parse_verdict(text: &str) -> Option<Verdict> {
    if let Ok(verdict) = serde_json::from_str(text) {
        return Some(verdict);
    }
    let start = text.find('{')?;
    let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Verdict>();
    stream.next()?.ok()
}
