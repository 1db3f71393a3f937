use crate::scoring::score_line;
use std::cmp::Ordering;

/// A line that cleared the heuristic filter, with its score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredLine {
    pub score: f32,
    pub line: String,
}

/// Score every line and keep the most suspicious slice.
///
/// Lines scoring `0.0` are dropped outright. The remainder is ordered by
/// score descending (ties keep their input order) and truncated to the top
/// `sample_percent` of the positive set, but never to fewer than one line
/// when anything scored at all.
#[must_use]
pub fn select_candidates(lines: &[String], sample_percent: u8) -> Vec<ScoredLine> {
    let mut positives: Vec<(f32, usize)> = lines
        .iter()
        .enumerate()
        .map(|(idx, line)| (score_line(line), idx))
        .filter(|(score, _)| *score > 0.0)
        .collect();
    if positives.is_empty() {
        return Vec::new();
    }

    positives.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

    let take = (positives.len() * usize::from(sample_percent) / 100).max(1);
    positives.truncate(take);
    log::debug!(
        "sampled {} of {} lines ({sample_percent}%)",
        positives.len(),
        lines.len()
    );

    positives
        .into_iter()
        .map(|(score, idx)| ScoredLine {
            score,
            line: lines[idx].clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn error_line(path: &str) -> String {
        format!(r#"10.0.0.1 - - [t] "GET {path} HTTP/1.1" 500 0 "-" "Mozilla/5.0""#)
    }

    fn clean_line(path: &str) -> String {
        format!(r#"10.0.0.1 - - [t] "GET {path} HTTP/1.1" 200 0 "-" "Mozilla/5.0""#)
    }

    #[test]
    fn empty_input_selects_nothing() {
        assert!(select_candidates(&[], 20).is_empty());
    }

    #[test]
    fn all_clean_lines_select_nothing() {
        let lines = vec![clean_line("/a"), clean_line("/b"), clean_line("/c")];
        assert!(select_candidates(&lines, 20).is_empty());
    }

    #[test]
    fn single_positive_line_survives_small_percent() {
        let lines = vec![clean_line("/a"), error_line("/b"), clean_line("/c")];
        let selected = select_candidates(&lines, 20);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].line, lines[1]);
    }

    #[test]
    fn takes_top_percent_of_positive_lines_only() {
        // Ten positives at 20% keeps two, regardless of how many clean
        // lines were in the batch.
        let mut lines: Vec<String> = (0..10).map(|i| error_line(&format!("/e{i}"))).collect();
        for i in 0..50 {
            lines.push(clean_line(&format!("/c{i}")));
        }
        let selected = select_candidates(&lines, 20);
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn orders_by_score_descending() {
        let slow = r#"10.0.0.1 - - [t] "GET /q?id=1 UNION SELECT HTTP/1.1" 500 0 "-" "sqlmap/1.7" resp_time:3.0"#.to_string();
        let lines = vec![error_line("/mild"), slow.clone()];
        let selected = select_candidates(&lines, 100);
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].line, slow);
        assert!(selected[0].score > selected[1].score);
    }

    #[test]
    fn equal_scores_keep_input_order() {
        let lines = vec![
            error_line("/first"),
            error_line("/second"),
            error_line("/third"),
        ];
        let selected = select_candidates(&lines, 100);
        let selected_lines: Vec<String> = selected.into_iter().map(|s| s.line).collect();
        assert_eq!(selected_lines, lines);
    }

    #[test]
    fn full_percent_keeps_every_positive() {
        let lines = vec![error_line("/a"), clean_line("/b"), error_line("/c")];
        let selected = select_candidates(&lines, 100);
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn truncation_rounds_down() {
        // Seven positives at 50% -> 3 (integer truncation).
        let lines: Vec<String> = (0..7).map(|i| error_line(&format!("/e{i}"))).collect();
        assert_eq!(select_candidates(&lines, 50).len(), 3);
    }
}
