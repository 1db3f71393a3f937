/// Substrings that mark a request as worth a closer look. Matched
/// case-insensitively against the lowercased line.
const SUSPICIOUS_KEYWORDS: &[&str] = &[
    "/etc/passwd",
    "<script>",
    " or ",
    "%20or%20",
    "select ",
    "union ",
    "insert ",
    "concat(",
];

/// User-agent fragments of common scanners and attack tooling.
const SCANNER_USER_AGENTS: &[&str] = &["nmap", "sqlmap", "nikto", "curl/", "python-requests"];

const STATUS_SIGNAL: f32 = 0.4;
const LATENCY_SIGNAL: f32 = 0.2;
const KEYWORD_SIGNAL_PER_HIT: f32 = 0.1;
const KEYWORD_SIGNAL_CAP: f32 = 0.4;
const SCANNER_SIGNAL: f32 = 0.2;
const SLOW_RESPONSE_SECS: f64 = 1.0;

/// Score one log line into `[0.0, 1.0]`.
///
/// Four independent signals are summed and clamped: a non-success HTTP
/// status, a slow response time, suspicious keyword hits (capped), and a
/// scanner user agent. Malformed lines simply contribute nothing per signal;
/// a line that matches no signal scores exactly `0.0`.
#[must_use]
pub fn score_line(line: &str) -> f32 {
    let mut score = 0.0f32;

    if let Some(status) = parse_status(line) {
        if status != 0 && !(200..400).contains(&status) {
            score += STATUS_SIGNAL;
        }
    }

    if let Some(resp_time) = parse_resp_time(line) {
        if resp_time > SLOW_RESPONSE_SECS {
            score += LATENCY_SIGNAL;
        }
    }

    let lower = line.to_lowercase();
    let hits = SUSPICIOUS_KEYWORDS
        .iter()
        .filter(|kw| lower.contains(*kw))
        .count();
    if hits > 0 {
        score += (KEYWORD_SIGNAL_PER_HIT * hits as f32).min(KEYWORD_SIGNAL_CAP);
    }

    if SCANNER_USER_AGENTS.iter().any(|ua| lower.contains(ua)) {
        score += SCANNER_SIGNAL;
    }

    score.min(1.0)
}

/// HTTP status in combined log format: the first token after the closing
/// quote of the request field.
fn parse_status(line: &str) -> Option<i64> {
    let mut fields = line.split('"');
    fields.next()?;
    fields.next()?;
    let after_request = fields.next()?;
    after_request.split_whitespace().next()?.parse().ok()
}

/// Response time as logged by a `resp_time:<seconds>` field. Whitespace
/// between the marker and the value is skipped; the token ends at the next
/// whitespace or a closing quote.
fn parse_resp_time(line: &str) -> Option<f64> {
    let (_, rest) = line.split_once("resp_time:")?;
    let token = rest
        .trim_start()
        .split(|c: char| c.is_whitespace() || c == '"')
        .next()?;
    token.parse().ok()
}
