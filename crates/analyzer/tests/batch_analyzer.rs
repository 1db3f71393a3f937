use async_trait::async_trait;
use logwarden_analyzer::{
    AnalyzerError, BatchAnalyzer, CostTracker, Pricing, ReasoningClient, ReasoningService,
    ResultCache, Severity, Verdict,
};
use pretty_assertions::assert_eq;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const PRICING: Pricing = Pricing {
    input_per_1k: 0.000125,
    output_per_1k: 0.000375,
};

/// Reasoning client that replays a script of canned batch results and
/// records what it was asked.
#[derive(Clone)]
struct ScriptedClient {
    state: Arc<ScriptedState>,
}

struct ScriptedState {
    script: Mutex<VecDeque<logwarden_analyzer::Result<Vec<String>>>>,
    calls: AtomicUsize,
    prompts_seen: Mutex<Vec<Vec<String>>>,
}

impl ScriptedClient {
    fn new(script: Vec<logwarden_analyzer::Result<Vec<String>>>) -> Self {
        Self {
            state: Arc::new(ScriptedState {
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
                prompts_seen: Mutex::new(Vec::new()),
            }),
        }
    }

    fn calls(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }

    fn prompts_seen(&self) -> Vec<Vec<String>> {
        self.state.prompts_seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReasoningClient for ScriptedClient {
    async fn analyze_batch(&self, prompts: &[String]) -> logwarden_analyzer::Result<Vec<String>> {
        self.state.calls.fetch_add(1, Ordering::SeqCst);
        self.state.prompts_seen.lock().unwrap().push(prompts.to_vec());
        self.state
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AnalyzerError::Other("script exhausted".to_string())))
    }
}

fn analyzer_with(client: &ScriptedClient, budget: f64) -> BatchAnalyzer {
    BatchAnalyzer::new(
        ResultCache::new(100),
        CostTracker::new(PRICING),
        ReasoningService::Enabled(Box::new(client.clone())),
        budget,
    )
}

fn attack_json(reason: &str) -> String {
    format!(
        r#"{{"is_attack": true, "attack_type": "SQLi", "reason": "{reason}", "severity": "High"}}"#
    )
}

fn lines(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn cached_lines_never_reach_the_service() {
    let client = ScriptedClient::new(vec![]);
    let mut cache = ResultCache::new(100);
    cache.put("line A".to_string(), Verdict::not_analyzed());
    cache.put("line B".to_string(), Verdict::parse_error());
    let mut analyzer = BatchAnalyzer::new(
        cache,
        CostTracker::new(PRICING),
        ReasoningService::Enabled(Box::new(client.clone())),
        5.0,
    );

    let verdicts = analyzer.analyze(&lines(&["line A", "line B"])).await;

    assert_eq!(verdicts, vec![Verdict::not_analyzed(), Verdict::parse_error()]);
    assert_eq!(client.calls(), 0);
    assert_eq!(analyzer.cost_tracker().lifetime().input_tokens, 0);
}

#[tokio::test]
async fn disabled_service_fills_not_analyzed_sentinels() {
    let mut analyzer = BatchAnalyzer::new(
        ResultCache::new(100),
        CostTracker::new(PRICING),
        ReasoningService::Disabled,
        5.0,
    );

    let verdicts = analyzer.analyze(&lines(&["one", "two"])).await;

    assert_eq!(verdicts, vec![Verdict::not_analyzed(); 2]);
    assert!(analyzer.cache().is_empty());
}

#[tokio::test]
async fn spent_budget_fills_sentinels_without_calling() {
    let client = ScriptedClient::new(vec![Ok(vec![attack_json("never used")])]);
    let per_token = Pricing {
        input_per_1k: 1.0,
        output_per_1k: 1.0,
    };
    let mut tracker = CostTracker::new(per_token);
    tracker.add_usage(5000, 0);
    let mut analyzer = BatchAnalyzer::new(
        ResultCache::new(100),
        tracker,
        ReasoningService::Enabled(Box::new(client.clone())),
        5.0,
    );

    let verdicts = analyzer.analyze(&lines(&["GET /etc/passwd 500"])).await;

    assert_eq!(verdicts, vec![Verdict::budget_exhausted()]);
    assert_eq!(client.calls(), 0);
    assert!(analyzer.cache().is_empty());
}

#[tokio::test]
async fn mixed_hits_and_misses_come_back_in_input_order() {
    let client = ScriptedClient::new(vec![Ok(vec![attack_json("first"), attack_json("third")])]);
    let mut cache = ResultCache::new(100);
    cache.put("line B".to_string(), Verdict::not_analyzed());
    let mut analyzer = BatchAnalyzer::new(
        cache,
        CostTracker::new(PRICING),
        ReasoningService::Enabled(Box::new(client.clone())),
        5.0,
    );

    let verdicts = analyzer
        .analyze(&lines(&["line A", "line B", "line C"]))
        .await;

    assert_eq!(verdicts.len(), 3);
    assert_eq!(verdicts[0].reason, "first");
    assert_eq!(verdicts[1], Verdict::not_analyzed());
    assert_eq!(verdicts[2].reason, "third");

    let batches = client.prompts_seen();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 2);
    assert!(batches[0][0].contains("line A"));
    assert!(batches[0][1].contains("line C"));

    assert!(analyzer.cache().contains("line A"));
    assert!(analyzer.cache().contains("line C"));
}

#[tokio::test]
async fn fresh_verdicts_are_reused_on_the_next_batch() {
    let client = ScriptedClient::new(vec![Ok(vec![attack_json("cached once")])]);
    let mut analyzer = analyzer_with(&client, 5.0);

    let first = analyzer.analyze(&lines(&["line A"])).await;
    let second = analyzer.analyze(&lines(&["line A"])).await;

    assert_eq!(first, second);
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn whole_batch_failure_marks_lines_and_charges_input_only() {
    let client = ScriptedClient::new(vec![Err(AnalyzerError::Other("boom".to_string()))]);
    let mut analyzer = analyzer_with(&client, 5.0);

    let verdicts = analyzer.analyze(&lines(&["line A", "line B"])).await;

    assert_eq!(verdicts, vec![Verdict::service_error("boom"); 2]);
    assert_eq!(verdicts[0].severity, Severity::High);
    assert!(analyzer.cache().is_empty());
    assert!(analyzer.cost_tracker().lifetime().input_tokens > 0);
    assert_eq!(analyzer.cost_tracker().lifetime().output_tokens, 0);
}

#[tokio::test]
async fn unparseable_response_is_flagged_but_not_cached() {
    let client = ScriptedClient::new(vec![
        Ok(vec![attack_json("good"), "no verdict here".to_string()]),
        Ok(vec![attack_json("retried")]),
    ]);
    let mut analyzer = analyzer_with(&client, 5.0);

    let first = analyzer.analyze(&lines(&["line A", "line B"])).await;
    assert_eq!(first[0].reason, "good");
    assert_eq!(first[1], Verdict::parse_error());
    assert!(analyzer.cache().contains("line A"));
    assert!(!analyzer.cache().contains("line B"));

    // The parse error was not cached, so the line goes out again.
    let second = analyzer.analyze(&lines(&["line B"])).await;
    assert_eq!(second[0].reason, "retried");
    assert_eq!(client.calls(), 2);
}

#[tokio::test]
async fn response_count_mismatch_is_a_service_error() {
    let client = ScriptedClient::new(vec![Ok(vec![attack_json("only one")])]);
    let mut analyzer = analyzer_with(&client, 5.0);

    let verdicts = analyzer.analyze(&lines(&["line A", "line B"])).await;

    assert_eq!(verdicts.len(), 2);
    for verdict in &verdicts {
        assert_eq!(verdict.attack_type, "Analysis Service Error");
        assert!(verdict.reason.contains("1 responses for 2 prompts"));
    }
    assert!(analyzer.cache().is_empty());
    assert_eq!(analyzer.cost_tracker().lifetime().output_tokens, 0);
}

#[tokio::test]
async fn usage_from_a_successful_call_counts_toward_the_next_gate() {
    let client = ScriptedClient::new(vec![Ok(vec![attack_json("expensive")])]);
    let per_token = Pricing {
        input_per_1k: 1000.0,
        output_per_1k: 1000.0,
    };
    let mut analyzer = BatchAnalyzer::new(
        ResultCache::new(100),
        CostTracker::new(per_token),
        ReasoningService::Enabled(Box::new(client.clone())),
        5.0,
    );

    let first = analyzer.analyze(&lines(&["line A"])).await;
    assert_eq!(first[0].reason, "expensive");

    let second = analyzer.analyze(&lines(&["line B"])).await;
    assert_eq!(second, vec![Verdict::budget_exhausted()]);
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn empty_input_returns_empty_output() {
    let client = ScriptedClient::new(vec![]);
    let mut analyzer = analyzer_with(&client, 5.0);

    let verdicts = analyzer.analyze(&[]).await;

    assert!(verdicts.is_empty());
    assert_eq!(client.calls(), 0);
}
