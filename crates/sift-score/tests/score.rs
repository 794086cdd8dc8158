//! Scorer behaviour on sample posts

use sift_score::{score, Thresholds, TextScorer};

#[test]
fn test_empty_is_neutral() {
    let result = score("");
    assert_eq!(result.score, 0);
    assert!(!result.is_flagged);
}

#[test]
fn test_formulaic_post_is_flagged() {
    let result = score("Here are 5 tips to improve your impact\u{2014}follow me!");
    assert_eq!(result.signals.formulaic_count, 2);
    assert!(result.signals.buzzword_density > 0.03);
    assert!(result.signals.em_dash_density > 0.005);
    // Single sentence: variance 0 also fires.
    assert_eq!(result.score, 4);
    assert!(result.is_flagged);
}

#[test]
fn test_zero_quotes_do_not_fire() {
    let result = score("No quotes at all here. Just words of many differing lengths in these sentences, honestly a lot of them.");
    assert_eq!(result.signals.curly_quote_ratio, 0.0);
    assert!(result.score <= 1);
}

#[test]
fn test_curly_quotes_fire() {
    let text = "She said \u{201C}ship it\u{201D} and I said \u{201C}agreed\u{201D}.";
    let result = score(text);
    assert_eq!(result.signals.curly_quote_ratio, 1.0);
    // variance (single sentence) + quotes
    assert_eq!(result.score, 2);
    assert!(!result.is_flagged);
}

#[test]
fn test_varied_human_text_scores_low() {
    let text = "Shipped the migration today. It took three weeks longer than planned because the \
                legacy schema had undocumented triggers that rewrote timestamps on every update. \
                Lesson learned. Next time I will read the database before the docs, and I will \
                budget a full sprint for archaeology whenever a system predates the current team.";
    let result = score(text);
    assert!(result.signals.sentence_variance >= 20.0);
    assert_eq!(result.score, 0);
}

#[test]
fn test_custom_thresholds() {
    let scorer = TextScorer::new(Thresholds {
        final_score: 1,
        ..Thresholds::default()
    });
    assert!(scorer.score("Agree?").is_flagged);
}

#[test]
fn test_serializes_camel_case() {
    let json = serde_json::to_value(score("Comment below!")).unwrap();
    assert_eq!(json["isFlagged"], false);
    assert_eq!(json["signals"]["formulaicCount"], 1);
}
