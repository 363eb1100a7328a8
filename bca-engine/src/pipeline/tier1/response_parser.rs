// Tier 1: Generative response parser
//
// Concept: Tolerant extraction of structured fields from free-form model text.
// Never fails: missing or malformed fields fall back to documented defaults.
//
// Grammar (case-insensitive, line oriented):
//   score: <number>          clamped to 0..1
//   confidence: <number>     same
//   assessment: <text>
//   insights:                section header; bullets below it are insights
//   - / * / • / "N." bullet  insight line
//
// Bullets under `strengths:` or `risks:` are not insights. A response without
// an `insights:` header contributes all of its bullets.

use crate::pipeline::tier1::evidence::truncate_chars;
use crate::pipeline::types::clamp_unit;
use once_cell::sync::Lazy;
use regex::Regex;

pub const DEFAULT_PARSED_SCORE: f64 = 0.65;
pub const DEFAULT_PARSED_CONFIDENCE: f64 = 0.6;
pub const MAX_INSIGHTS: usize = 8;

static SCORE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[\s*#_]*(?:overall\s+)?score\s*[:=]\s*\**\s*(-?\d+(?:\.\d+)?)").expect("static regex")
});

static CONFIDENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[\s*#_]*confidence\s*[:=]\s*\**\s*(-?\d+(?:\.\d+)?)").expect("static regex")
});

static ASSESSMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^[\s*#_]*assessment\s*[:=]\s*\**\s*(.+)$").expect("static regex"));

static BULLET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:[-*•]|\d+[.)])\s+(.+)$").expect("static regex"));

static FIELD_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[\s*#_]*(?:overall\s+)?(score|confidence|assessment|strengths|risks|insights)\s*[:=]")
        .expect("static regex")
});

/// Fields extracted from one response
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedScore {
    pub score: f64,
    pub confidence: f64,
    pub insights: Vec<String>,
    pub assessment: Option<String>,
    /// At least one numeric field fell back to its default
    pub defaulted: bool,
}

impl ParsedScore {
    /// All-default result (used when a response is unusable)
    pub fn defaults() -> Self {
        Self {
            score: DEFAULT_PARSED_SCORE,
            confidence: DEFAULT_PARSED_CONFIDENCE,
            insights: Vec::new(),
            assessment: None,
            defaulted: true,
        }
    }
}

/// Read a captured number, clamped to [0,1]
fn normalize(raw: &str) -> Option<f64> {
    let value: f64 = raw.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(clamp_unit(value))
}

fn bullet_text(line: &str) -> Option<String> {
    BULLET_RE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().trim_matches('*').trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Bullets under the `insights:` header, or every bullet when there is none
fn extract_insights(text: &str) -> Vec<String> {
    let has_header = text.lines().any(|line| {
        FIELD_LINE_RE
            .captures(line)
            .and_then(|caps| caps.get(1))
            .is_some_and(|m| m.as_str().eq_ignore_ascii_case("insights"))
    });
    if !has_header {
        return text.lines().filter_map(bullet_text).take(MAX_INSIGHTS).collect();
    }

    let mut in_insights = false;
    let mut insights = Vec::new();
    for line in text.lines() {
        if let Some(field) = FIELD_LINE_RE.captures(line).and_then(|caps| caps.get(1)) {
            in_insights = field.as_str().eq_ignore_ascii_case("insights");
            continue;
        }
        if in_insights {
            if let Some(insight) = bullet_text(line) {
                insights.push(insight);
                if insights.len() == MAX_INSIGHTS {
                    break;
                }
            }
        }
    }
    insights
}

fn capture_number(re: &Regex, text: &str) -> Option<f64> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| normalize(m.as_str()))
}

/// Parse a generative response into score, confidence, insights and assessment
pub fn parse_score_response(text: &str, assessment_max_chars: usize) -> ParsedScore {
    let score = capture_number(&SCORE_RE, text);
    let confidence = capture_number(&CONFIDENCE_RE, text);

    let insights = extract_insights(text);

    let assessment = ASSESSMENT_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .or_else(|| {
            // First free-text line that is neither a field nor a bullet
            text.lines()
                .map(str::trim)
                .find(|line| {
                    !line.is_empty() && !FIELD_LINE_RE.is_match(line) && !BULLET_RE.is_match(line)
                })
                .map(str::to_string)
        })
        .filter(|s| !s.is_empty())
        .map(|s| truncate_chars(&s, assessment_max_chars));

    ParsedScore {
        score: score.unwrap_or(DEFAULT_PARSED_SCORE),
        confidence: confidence.unwrap_or(DEFAULT_PARSED_CONFIDENCE),
        insights,
        assessment,
        defaulted: score.is_none() || confidence.is_none(),
    }
}
