use logwarden_triage::{select_candidates, ScoredLine};
use logwarden_vector_store::{EmbeddingService, FlatL2Index};

/// Scores and samples new lines, then folds the survivors into the vector
/// index.
///
/// Indexing is strictly best-effort: an embedding or index failure is logged
/// and the sampled lines still flow on to analysis. The index enriches later
/// retrieval, it does not gate detection.
pub struct SamplerIndexer {
    embeddings: EmbeddingService,
    index: FlatL2Index,
    sample_percent: u8,
}

impl SamplerIndexer {
    #[must_use]
    pub fn new(embeddings: EmbeddingService, index: FlatL2Index, sample_percent: u8) -> Self {
        Self {
            embeddings,
            index,
            sample_percent,
        }
    }

    pub fn index(&self) -> &FlatL2Index {
        &self.index
    }

    /// Select the suspicious slice of `lines` and index it. Returns the
    /// selected lines with their scores, highest first.
    pub async fn update_index(&mut self, lines: &[String]) -> Vec<ScoredLine> {
        if lines.is_empty() {
            return Vec::new();
        }

        log::info!("scoring {} new lines", lines.len());
        let candidates = select_candidates(lines, self.sample_percent);
        let Some(top) = candidates.first() else {
            log::info!("no line scored above zero, nothing to index");
            return candidates;
        };
        log::info!(
            "selected {} lines for analysis (top score {:.2})",
            candidates.len(),
            top.score
        );

        if !self.embeddings.is_enabled() {
            log::warn!("embedding service disabled, skipping vector index update");
            return candidates;
        }

        let texts: Vec<String> = candidates.iter().map(|c| c.line.clone()).collect();
        match self.embeddings.embed_batch(&texts).await {
            Ok(vectors) => match self.index.add(&vectors) {
                Ok(()) => log::info!(
                    "added {} vectors to the index ({} total)",
                    texts.len(),
                    self.index.len()
                ),
                Err(err) => log::error!("failed to add vectors to the index: {err}"),
            },
            Err(err) => log::error!("embedding {} lines failed: {err}", texts.len()),
        }

        candidates
    }

    pub async fn save_index(&self) -> logwarden_vector_store::Result<()> {
        self.index.save().await
    }
}
