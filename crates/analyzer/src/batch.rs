use crate::cache::ResultCache;
use crate::cost::{approx_token_count, CostTracker};
use crate::reasoning::ReasoningService;
use crate::verdict::{parse_verdict, Verdict};

/// Budget- and cache-gated front end to the reasoning service.
///
/// [`analyze`](Self::analyze) returns exactly one verdict per input line, in
/// input order. Lines are answered from cache where possible; the remainder
/// goes out as one batched call unless analysis is disabled or the hourly
/// budget is spent, in which case sentinel verdicts fill the gaps. Error
/// verdicts are never cached, so transient failures retry on later runs.
pub struct BatchAnalyzer {
    cache: ResultCache,
    cost: CostTracker,
    service: ReasoningService,
    hourly_budget_usd: f64,
}

impl BatchAnalyzer {
    #[must_use]
    pub fn new(
        cache: ResultCache,
        cost: CostTracker,
        service: ReasoningService,
        hourly_budget_usd: f64,
    ) -> Self {
        Self {
            cache,
            cost,
            service,
            hourly_budget_usd,
        }
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn cost_tracker(&self) -> &CostTracker {
        &self.cost
    }

    pub async fn analyze(&mut self, lines: &[String]) -> Vec<Verdict> {
        let mut verdicts: Vec<Option<Verdict>> = Vec::with_capacity(lines.len());
        let mut misses: Vec<usize> = Vec::new();
        for (idx, line) in lines.iter().enumerate() {
            match self.cache.get(line) {
                Some(verdict) => verdicts.push(Some(verdict)),
                None => {
                    verdicts.push(None);
                    misses.push(idx);
                }
            }
        }
        log::debug!(
            "{} of {} lines answered from cache",
            lines.len() - misses.len(),
            lines.len()
        );

        if misses.is_empty() {
            return resolve(verdicts);
        }

        if !self.service.is_enabled() {
            log::warn!("analysis disabled, {} lines left unanalyzed", misses.len());
            fill(&mut verdicts, &misses, &Verdict::not_analyzed());
            return resolve(verdicts);
        }

        self.cost.rollover_if_elapsed();
        if self.cost.hourly_cost() >= self.hourly_budget_usd {
            log::warn!(
                "hourly budget spent (${:.4} of ${:.2}), skipping analysis of {} lines",
                self.cost.hourly_cost(),
                self.hourly_budget_usd,
                misses.len()
            );
            fill(&mut verdicts, &misses, &Verdict::budget_exhausted());
            return resolve(verdicts);
        }

        let prompts: Vec<String> = misses
            .iter()
            .map(|&idx| build_prompt(&lines[idx]))
            .collect();
        let input_tokens: u64 = prompts.iter().map(|p| approx_token_count(p)).sum();

        match self.service.analyze_batch(&prompts).await {
            Ok(responses) if responses.len() == misses.len() => {
                let output_tokens: u64 = responses.iter().map(|r| approx_token_count(r)).sum();
                self.cost.add_usage(input_tokens, output_tokens);
                for (&idx, response) in misses.iter().zip(&responses) {
                    match parse_verdict(response) {
                        Some(verdict) => {
                            self.cache.put(lines[idx].clone(), verdict.clone());
                            verdicts[idx] = Some(verdict);
                        }
                        None => {
                            log::warn!("unparseable analysis response for line: {}", lines[idx]);
                            verdicts[idx] = Some(Verdict::parse_error());
                        }
                    }
                }
            }
            Ok(responses) => {
                // The requests were dispatched, so the input side still
                // counts against the budget.
                self.cost.add_usage(input_tokens, 0);
                log::error!(
                    "analysis returned {} responses for {} prompts",
                    responses.len(),
                    misses.len()
                );
                let detail = format!(
                    "response count mismatch: {} responses for {} prompts",
                    responses.len(),
                    misses.len()
                );
                fill(&mut verdicts, &misses, &Verdict::service_error(&detail));
            }
            Err(err) => {
                self.cost.add_usage(input_tokens, 0);
                log::error!("analysis batch of {} prompts failed: {err}", prompts.len());
                fill(
                    &mut verdicts,
                    &misses,
                    &Verdict::service_error(&err.to_string()),
                );
            }
        }

        if self.cost.hourly_cost() >= self.hourly_budget_usd {
            log::warn!(
                "hourly budget now spent: ${:.4} of ${:.2}",
                self.cost.hourly_cost(),
                self.hourly_budget_usd
            );
        }
        resolve(verdicts)
    }
}

fn fill(verdicts: &mut [Option<Verdict>], misses: &[usize], verdict: &Verdict) {
    for &idx in misses {
        verdicts[idx] = Some(verdict.clone());
    }
}

fn resolve(verdicts: Vec<Option<Verdict>>) -> Vec<Verdict> {
    verdicts
        .into_iter()
        .map(|verdict| verdict.unwrap_or_else(Verdict::not_analyzed))
        .collect()
}

fn build_prompt(line: &str) -> String {
    format!(
        "You are a security analyst reviewing web server logs.\n\
         Decide whether the following log line is part of an attack.\n\
         Respond with only a JSON object with keys \"is_attack\" (boolean), \
         \"attack_type\" (string), \"reason\" (string) and \"severity\" \
         (one of \"None\", \"Low\", \"Medium\", \"High\").\n\n\
         Log line: {line}"
    )
}
