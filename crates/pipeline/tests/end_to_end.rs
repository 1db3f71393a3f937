use async_trait::async_trait;
use logwarden_analyzer::{
    AnalyzerError, BatchAnalyzer, CostTracker, Pricing, ReasoningClient, ReasoningService,
    ResultCache, Verdict,
};
use logwarden_pipeline::{
    discover_log_files, export_records, Pipeline, SamplerIndexer, Settings, StatePaths,
};
use logwarden_tailer::{CursorStore, LogTailer};
use logwarden_vector_store::{EmbeddingService, FlatL2Index};
use pretty_assertions::assert_eq;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const ATTACK_LINE: &str =
    r#"203.0.113.7 - - [10/Aug/2026:12:00:00 +0000] "GET /etc/passwd HTTP/1.1" 500 512 resp_time:2.5"#;
const CLEAN_LINE: &str =
    r#"198.51.100.3 - - [10/Aug/2026:12:00:01 +0000] "GET /index.html HTTP/1.1" 200 1024 resp_time:0.1"#;

fn settings_in(root: &Path) -> Settings {
    Settings {
        log_dir: root.join("logs"),
        output_file: root.join("out").join("analysis.ndjson"),
        state_dir: root.join("state"),
        ..Settings::default()
    }
}

async fn append_line(path: &Path, line: &str) {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.expect("mkdir");
    }
    let existing = tokio::fs::read_to_string(path).await.unwrap_or_default();
    tokio::fs::write(path, format!("{existing}{line}\n"))
        .await
        .expect("write log");
}

#[tokio::test]
async fn suspicious_line_is_exported_and_clean_line_filtered() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = settings_in(dir.path());
    let log_path = settings.log_dir.join("access.log");
    append_line(&log_path, CLEAN_LINE).await;
    append_line(&log_path, ATTACK_LINE).await;

    let mut pipeline = Pipeline::open(&settings).await.expect("open");
    let files = discover_log_files(&settings.log_dir);
    assert_eq!(files.len(), 1);

    let records = pipeline.run(&files).await.expect("run");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].original_log, ATTACK_LINE);
    // No API key configured, so the verdict is the disabled sentinel.
    assert_eq!(records[0].llm_analysis, Verdict::not_analyzed());
    assert!(records[0].fast_score > 0.0);

    export_records(&settings.output_file, &records)
        .await
        .expect("export");
    pipeline.persist_state().await.expect("persist");

    let exported = tokio::fs::read_to_string(&settings.output_file)
        .await
        .expect("read export");
    let lines: Vec<&str> = exported.lines().collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("/etc/passwd"));

    let paths = pipeline.paths();
    assert!(paths.cursors.exists());
    assert!(paths.verdict_cache.exists());
    assert!(paths.usage.exists());
    assert!(paths.vectors.exists());
}

#[tokio::test]
async fn second_run_without_growth_produces_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = settings_in(dir.path());
    let log_path = settings.log_dir.join("access.log");
    append_line(&log_path, ATTACK_LINE).await;

    let files = discover_log_files(&settings.log_dir);
    let mut first = Pipeline::open(&settings).await.expect("open");
    let records = first.run(&files).await.expect("run");
    assert_eq!(records.len(), 1);
    first.persist_state().await.expect("persist");

    // A fresh pipeline over the same state resumes past everything read.
    let mut second = Pipeline::open(&settings).await.expect("reopen");
    let records = second.run(&files).await.expect("second run");
    assert!(records.is_empty());

    // New growth after the cursor is picked up.
    append_line(&log_path, ATTACK_LINE).await;
    let records = second.run(&files).await.expect("third run");
    assert_eq!(records.len(), 1);
}

/// Reasoning client that always returns one canned verdict per prompt.
#[derive(Clone)]
struct CannedClient {
    body: String,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl ReasoningClient for CannedClient {
    async fn analyze_batch(
        &self,
        prompts: &[String],
    ) -> Result<Vec<String>, AnalyzerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![self.body.clone(); prompts.len()])
    }
}

#[tokio::test]
async fn reasoning_verdicts_flow_into_records_and_the_cache() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = settings_in(dir.path());
    let log_path = settings.log_dir.join("access.log");
    append_line(&log_path, ATTACK_LINE).await;

    let calls = Arc::new(AtomicUsize::new(0));
    let client = CannedClient {
        body: r#"{"is_attack": true, "attack_type": "LFI", "reason": "passwd probe", "severity": "High"}"#
            .to_string(),
        calls: Arc::clone(&calls),
    };

    let paths = StatePaths::in_dir(&settings.state_dir);
    let tailer = LogTailer::new(CursorStore::load(&paths.cursors).await);
    let index = FlatL2Index::open(&paths.vectors, settings.embedding_dimension).await;
    let indexer = SamplerIndexer::new(
        EmbeddingService::hash(settings.embedding_dimension),
        index,
        settings.sample_top_percent,
    );
    let analyzer = BatchAnalyzer::new(
        ResultCache::new(settings.cache_capacity),
        CostTracker::new(Pricing {
            input_per_1k: settings.price_in_per_1k,
            output_per_1k: settings.price_out_per_1k,
        }),
        ReasoningService::Enabled(Box::new(client)),
        settings.max_hourly_cost_usd,
    );
    let mut pipeline = Pipeline::from_parts(tailer, indexer, analyzer, paths);

    let files = discover_log_files(&settings.log_dir);
    let records = pipeline.run(&files).await.expect("run");
    assert_eq!(records.len(), 1);
    assert!(records[0].llm_analysis.is_attack);
    assert_eq!(records[0].llm_analysis.attack_type, "LFI");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(pipeline.lifetime_usage().input_tokens > 0);

    // The same line appended again is answered from the verdict cache.
    append_line(&log_path, ATTACK_LINE).await;
    let records = pipeline.run(&files).await.expect("second run");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].llm_analysis.attack_type, "LFI");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
