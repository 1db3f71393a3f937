use crate::error::{AnalyzerError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Remote service that judges suspicious lines.
///
/// Implementations return one response per prompt, in prompt order, and fail
/// the whole batch on any transport-level error. What the response text
/// means is the caller's concern.
#[async_trait]
pub trait ReasoningClient: Send + Sync {
    async fn analyze_batch(&self, prompts: &[String]) -> Result<Vec<String>>;
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
    pub concurrency: usize,
}

/// Client for the Gemini `generateContent` REST endpoint.
///
/// The endpoint takes one prompt per request, so a batch fans out into
/// independent requests under a fixed concurrency cap and is reassembled in
/// prompt order. The first failure cancels the requests still in flight.
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    config: GeminiConfig,
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.config.base_url.trim_end_matches('/'),
            self.config.model,
            self.config.api_key
        );
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };
        let response = self.client.post(&url).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(AnalyzerError::ReasoningError(format!(
                "generateContent returned {}",
                response.status()
            )));
        }
        let parsed: GenerateContentResponse = response.json().await?;
        parsed
            .candidates
            .into_iter()
            .next()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect::<String>()
            })
            .ok_or_else(|| {
                AnalyzerError::ReasoningError("generateContent returned no candidates".into())
            })
    }
}

#[async_trait]
impl ReasoningClient for GeminiClient {
    async fn analyze_batch(&self, prompts: &[String]) -> Result<Vec<String>> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut handles = Vec::with_capacity(prompts.len());
        for prompt in prompts {
            let client = self.clone();
            let prompt = prompt.clone();
            let semaphore = Arc::clone(&semaphore);
            handles.push(tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|err| AnalyzerError::Other(format!("semaphore closed: {err}")))?;
                client.generate(&prompt).await
            }));
        }

        collect_in_order(handles).await
    }
}

/// Awaits the fanned-out batch in prompt order. The batch fails as a unit,
/// so the first failure aborts the tasks still running before the error is
/// returned.
async fn collect_in_order(handles: Vec<JoinHandle<Result<String>>>) -> Result<Vec<String>> {
    let mut responses = Vec::with_capacity(handles.len());
    let mut handles = handles.into_iter();
    while let Some(handle) = handles.next() {
        let outcome = handle
            .await
            .map_err(|err| AnalyzerError::Other(format!("reasoning task failed: {err}")))
            .and_then(|inner| inner);
        match outcome {
            Ok(text) => responses.push(text),
            Err(err) => {
                for remaining in handles {
                    remaining.abort();
                }
                return Err(err);
            }
        }
    }
    Ok(responses)
}

/// Reasoning capability as configured at startup. A missing API key selects
/// `Disabled` once, at construction; there is no runtime health check.
pub enum ReasoningService {
    Enabled(Box<dyn ReasoningClient>),
    Disabled,
}

impl ReasoningService {
    pub fn gemini(config: GeminiConfig) -> Result<Self> {
        Ok(Self::Enabled(Box::new(GeminiClient::new(config)?)))
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled(_))
    }

    pub async fn analyze_batch(&self, prompts: &[String]) -> Result<Vec<String>> {
        match self {
            Self::Enabled(client) => client.analyze_batch(prompts).await,
            Self::Disabled => Err(AnalyzerError::ReasoningError(
                "reasoning service is disabled".into(),
            )),
        }
    }
}
