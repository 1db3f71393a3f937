use crate::error::{PipelineError, Result};
use crate::export::AnalysisRecord;
use crate::indexer::SamplerIndexer;
use crate::settings::Settings;
use logwarden_analyzer::{
    BatchAnalyzer, CostTracker, GeminiConfig, ReasoningService, ResultCache, UsageTotals,
};
use logwarden_tailer::{CursorStore, LogTailer};
use logwarden_vector_store::{EmbeddingService, FlatL2Index};
use std::path::{Path, PathBuf};

/// Locations of every durable file under one state directory.
#[derive(Debug, Clone)]
pub struct StatePaths {
    pub cursors: PathBuf,
    pub verdict_cache: PathBuf,
    pub usage: PathBuf,
    pub vectors: PathBuf,
    pub lock: PathBuf,
}

impl StatePaths {
    #[must_use]
    pub fn in_dir(state_dir: &Path) -> Self {
        Self {
            cursors: state_dir.join("cursors.json"),
            verdict_cache: state_dir.join("verdict_cache.json"),
            usage: state_dir.join("usage.json"),
            vectors: state_dir.join("vectors.lwvi"),
            lock: state_dir.join("run.lock"),
        }
    }
}

/// One ingest run over a set of log files: tail, score, sample, index,
/// analyze, assemble records.
///
/// All collaborators live here, constructed once from [`Settings`]. The
/// stages degrade independently (a failed embedding batch or reasoning call
/// does not stop tailing or export), so `run` only reports what it produced
/// and [`persist_state`](Self::persist_state) always gets a chance to save
/// whatever progress was made.
pub struct Pipeline {
    tailer: LogTailer,
    indexer: SamplerIndexer,
    analyzer: BatchAnalyzer,
    paths: StatePaths,
}

impl Pipeline {
    /// Assemble a pipeline from configuration and the state persisted by
    /// earlier runs. Missing credentials disable the affected collaborator
    /// rather than failing startup.
    pub async fn open(settings: &Settings) -> Result<Self> {
        settings.validate()?;
        let paths = StatePaths::in_dir(&settings.state_dir);

        let cursors = CursorStore::load(&paths.cursors).await;
        let tailer = LogTailer::new(cursors);

        let embeddings = if !settings.indexing_enabled {
            log::info!("vector indexing disabled by configuration");
            EmbeddingService::Disabled
        } else if let Some(url) = &settings.embeddings_url {
            EmbeddingService::http(
                url,
                &settings.embeddings_model,
                settings.embedding_dimension,
                settings.request_timeout,
            )?
        } else {
            log::warn!(
                "no embeddings endpoint configured, using hash vectors (duplicate detection only)"
            );
            EmbeddingService::hash(settings.embedding_dimension)
        };
        let index = FlatL2Index::open(&paths.vectors, settings.embedding_dimension).await;
        let indexer = SamplerIndexer::new(embeddings, index, settings.sample_top_percent);

        let cache = ResultCache::load(&paths.verdict_cache, settings.cache_capacity).await;
        let cost = CostTracker::load(&paths.usage, settings.pricing()).await;
        let reasoning = match &settings.gemini_api_key {
            Some(api_key) => ReasoningService::gemini(GeminiConfig {
                api_key: api_key.clone(),
                model: settings.gemini_model.clone(),
                base_url: settings.gemini_base_url.clone(),
                timeout: settings.request_timeout,
                concurrency: settings.reasoning_concurrency,
            })?,
            None => {
                log::warn!("no reasoning API key configured, analysis disabled");
                ReasoningService::Disabled
            }
        };
        let analyzer = BatchAnalyzer::new(cache, cost, reasoning, settings.max_hourly_cost_usd);

        Ok(Self::from_parts(tailer, indexer, analyzer, paths))
    }

    /// Assemble a pipeline from prebuilt collaborators.
    #[must_use]
    pub fn from_parts(
        tailer: LogTailer,
        indexer: SamplerIndexer,
        analyzer: BatchAnalyzer,
        paths: StatePaths,
    ) -> Self {
        Self {
            tailer,
            indexer,
            analyzer,
            paths,
        }
    }

    /// Process everything appended to `files` since the last run. Returns
    /// one record per analyzed line; an empty result means there was nothing
    /// new or nothing suspicious, which is the normal steady state.
    pub async fn run(&mut self, files: &[PathBuf]) -> Result<Vec<AnalysisRecord>> {
        let mut new_lines: Vec<String> = Vec::new();
        for path in files {
            new_lines.extend(self.tailer.read_new_lines(path).await);
        }
        if new_lines.is_empty() {
            log::info!("no new log lines to process");
            return Ok(Vec::new());
        }

        let candidates = self.indexer.update_index(&new_lines).await;
        if candidates.is_empty() {
            log::info!("no lines cleared the heuristic filter");
            return Ok(Vec::new());
        }

        let lines: Vec<String> = candidates.iter().map(|c| c.line.clone()).collect();
        let verdicts = self.analyzer.analyze(&lines).await;

        let mut alerts = 0usize;
        let mut records = Vec::with_capacity(candidates.len());
        for (candidate, verdict) in candidates.into_iter().zip(verdicts) {
            if verdict.is_attack {
                alerts += 1;
                log::warn!(
                    "{} | score {:.2} | {} ({}): {}",
                    candidate.line,
                    candidate.score,
                    verdict.attack_type,
                    verdict.severity,
                    verdict.reason
                );
            } else {
                log::info!(
                    "{} | score {:.2} | clear: {}",
                    candidate.line,
                    candidate.score,
                    verdict.reason
                );
            }
            records.push(AnalysisRecord::new(candidate.line, candidate.score, verdict));
        }

        if alerts > 0 {
            log::warn!("run finished with {alerts} potential attack alerts");
        } else {
            log::info!("run finished with no attack alerts");
        }
        Ok(records)
    }

    /// Save every piece of durable state, attempting all of them even when
    /// one fails. The first failure is returned so the caller can surface it
    /// in the exit status; everything that could be saved has been.
    pub async fn persist_state(&self) -> Result<()> {
        let mut first_err: Option<PipelineError> = None;

        if let Err(err) = self.tailer.cursor_store().save(&self.paths.cursors).await {
            log::error!("failed to save cursors: {err}");
            first_err.get_or_insert(err.into());
        }
        if let Err(err) = self.analyzer.cache().save(&self.paths.verdict_cache).await {
            log::error!("failed to save verdict cache: {err}");
            first_err.get_or_insert(err.into());
        }
        if let Err(err) = self.analyzer.cost_tracker().save(&self.paths.usage).await {
            log::error!("failed to save usage state: {err}");
            first_err.get_or_insert(err.into());
        }
        if let Err(err) = self.indexer.save_index().await {
            log::error!("failed to save vector index: {err}");
            first_err.get_or_insert(err.into());
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    #[must_use]
    pub fn lifetime_usage(&self) -> UsageTotals {
        self.analyzer.cost_tracker().lifetime()
    }

    pub fn paths(&self) -> &StatePaths {
        &self.paths
    }
}
