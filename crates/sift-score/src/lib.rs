//! sift text scorer
//!
//! Five cheap signals, one point each, that together flag formulaic or
//! machine-written posts:
//!
//! 1. uniform sentence lengths (low population variance of word counts)
//! 2. stock engagement phrases ("comment below", "follow me", ...)
//! 3. corporate buzzword density
//! 4. em-dash density
//! 5. a high share of typographic (curly) quotes
//!
//! Scoring is pure; callers that want "score once per node" keep their own
//! marker.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Sentence: a run of non-terminators followed by a run of terminators
static SENTENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^.!?]+[.!?]+").expect("static regex"));

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("static regex"));

static FORMULAIC: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)here are \d+ (tips|ways|steps)",
        r"(?i)what do you think",
        r"(?i)comment below",
        r"(?i)let's connect",
        r"(?i)agree\?",
        r"(?i)follow me",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static regex"))
    .collect()
});

const BUZZWORDS: &[&str] = &[
    "innovation",
    "value",
    "impact",
    "journey",
    "growth",
    "synergy",
    "passionate",
    "community",
    "transformation",
];

const EM_DASH: char = '\u{2014}';
const CURLY_QUOTES: &[char] = &['\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}'];
const STRAIGHT_QUOTES: &[char] = &['\'', '"'];

/// Signal thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Thresholds {
    /// Variance below this fires signal 1
    pub sentence_variance: f64,
    /// Phrase matches needed to fire signal 2
    pub formulaic_phrases: usize,
    pub buzzword_density: f64,
    pub em_dash_density: f64,
    pub curly_quote_ratio: f64,
    /// Points needed to flag
    pub final_score: u8,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            sentence_variance: 20.0,
            formulaic_phrases: 1,
            buzzword_density: 0.03,
            em_dash_density: 0.005,
            curly_quote_ratio: 0.8,
            final_score: 3,
        }
    }
}

/// Raw signal values
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Signals {
    pub sentence_variance: f64,
    pub formulaic_count: usize,
    pub buzzword_density: f64,
    pub em_dash_density: f64,
    pub curly_quote_ratio: f64,
}

/// Scorer output
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    /// Signals that fired, 0..=5
    pub score: u8,
    pub is_flagged: bool,
    pub signals: Signals,
}

impl ScoreResult {
    /// Score 0, not flagged
    pub fn neutral() -> Self {
        Self::default()
    }
}

/// Input the scorer declines to evaluate
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScorerInputError {
    #[error("text is empty or whitespace-only")]
    Empty,
}

/// Heuristic text scorer
#[derive(Debug, Clone, Default)]
pub struct TextScorer {
    thresholds: Thresholds,
}

impl TextScorer {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Score `text`; empty input yields the neutral result
    pub fn score(&self, text: &str) -> ScoreResult {
        self.score_checked(text).unwrap_or_else(|_| ScoreResult::neutral())
    }

    /// Score `text`, reporting empty input instead of neutralising it
    pub fn score_checked(&self, text: &str) -> Result<ScoreResult, ScorerInputError> {
        if text.trim().is_empty() {
            return Err(ScorerInputError::Empty);
        }
        let t = &self.thresholds;

        let signals = Signals {
            sentence_variance: sentence_variance(text),
            formulaic_count: FORMULAIC.iter().filter(|re| re.is_match(text)).count(),
            buzzword_density: buzzword_density(text),
            em_dash_density: em_dash_density(text),
            curly_quote_ratio: curly_quote_ratio(text).unwrap_or(0.0),
        };

        let fired = [
            signals.sentence_variance < t.sentence_variance,
            signals.formulaic_count >= t.formulaic_phrases,
            signals.buzzword_density > t.buzzword_density,
            signals.em_dash_density > t.em_dash_density,
            curly_quote_ratio(text).is_some_and(|r| r > t.curly_quote_ratio),
        ];
        let score = fired.iter().filter(|&&f| f).count() as u8;

        tracing::trace!("scored {} chars: {} ({:?})", text.len(), score, fired);
        Ok(ScoreResult {
            score,
            is_flagged: score >= t.final_score,
            signals,
        })
    }
}

/// Score with default thresholds
pub fn score(text: &str) -> ScoreResult {
    TextScorer::default().score(text)
}

/// Population variance of sentence word counts; 0 for fewer than two
/// sentences. A bare terminator counts as a one-word sentence.
fn sentence_variance(text: &str) -> f64 {
    let lengths: Vec<f64> = SENTENCE_RE
        .find_iter(text)
        .map(|m| m.as_str().split_whitespace().count().max(1) as f64)
        .collect();
    if lengths.len() < 2 {
        return 0.0;
    }
    let n = lengths.len() as f64;
    let mean = lengths.iter().sum::<f64>() / n;
    lengths.iter().map(|l| (l - mean).powi(2)).sum::<f64>() / n
}

fn buzzword_density(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let mut words = 0usize;
    let mut hits = 0usize;
    for word in WORD_RE.find_iter(&lower) {
        words += 1;
        if BUZZWORDS.contains(&word.as_str()) {
            hits += 1;
        }
    }
    if words == 0 {
        0.0
    } else {
        hits as f64 / words as f64
    }
}

fn em_dash_density(text: &str) -> f64 {
    let len = text.chars().count();
    if len == 0 {
        return 0.0;
    }
    text.chars().filter(|&c| c == EM_DASH).count() as f64 / len as f64
}

/// Curly share of all quotes; `None` when the text has no quotes
fn curly_quote_ratio(text: &str) -> Option<f64> {
    let curly = text.chars().filter(|c| CURLY_QUOTES.contains(c)).count();
    let straight = text.chars().filter(|c| STRAIGHT_QUOTES.contains(c)).count();
    let total = curly + straight;
    (total > 0).then(|| curly as f64 / total as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentence_variance() {
        assert_eq!(sentence_variance("no terminator"), 0.0);
        assert_eq!(sentence_variance("One sentence only."), 0.0);
        // 1 and 5 words: mean 3, variance 4
        assert_eq!(sentence_variance("Hi! This one has five words."), 4.0);
        assert_eq!(sentence_variance("Hi. . Bye."), 0.0);
    }

    #[test]
    fn test_buzzword_density() {
        assert_eq!(buzzword_density(""), 0.0);
        assert_eq!(buzzword_density("Innovation drives growth, not luck"), 0.4);
    }

    #[test]
    fn test_curly_ratio() {
        assert_eq!(curly_quote_ratio("plain"), None);
        assert_eq!(curly_quote_ratio("\u{201C}a\u{201D} 'b"), Some(2.0 / 3.0));
    }

    #[test]
    fn test_score_checked_rejects_blank() {
        let scorer = TextScorer::default();
        assert_eq!(scorer.score_checked("  \n\t"), Err(ScorerInputError::Empty));
        assert_eq!(scorer.score("  \n\t"), ScoreResult::neutral());
    }
}
