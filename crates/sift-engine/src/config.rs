//! Engine Configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};
use sift_css::SelectorList;
use sift_score::Thresholds;

use crate::EngineError;

/// Engine configuration options
///
/// Every field has a shipped default, so a JSON file only needs the keys it
/// overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Toggle class used in normal mode (1)
    pub normal_class: String,
    /// Toggle class used in extreme mode (2)
    pub extreme_class: String,
    /// Class carried by custom filters
    pub custom_class: String,
    /// Class carried by highlight rules
    pub highlight_class: String,
    /// Class added to posts the scorer flags
    pub ai_class: String,

    /// Attribute naming the rule that last classified a node
    pub classification_attribute: String,
    /// One-time marker on posts the scorer has seen
    pub ai_checked_attribute: String,
    /// Rule id that enables scoring
    pub ai_rule_id: String,

    /// Structural selector for one post
    pub post_selector: String,
    /// Post body, relative to a post
    pub post_text_selector: String,
    /// Unit of content counted by the noise ratio
    pub unit_selector: String,
    /// Token in catalog selectors replaced by `post_selector`
    pub placeholder: String,

    /// Minimum gap between badge updates, in milliseconds
    pub badge_interval_ms: u64,
    /// Name shown in the badge title
    pub badge_title: String,

    pub thresholds: Thresholds,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            normal_class: "sift-dim".into(),
            extreme_class: "sift-remove".into(),
            custom_class: "sift-custom".into(),
            highlight_class: "sift-highlight".into(),
            ai_class: "sift-ai".into(),
            classification_attribute: "data-sift".into(),
            ai_checked_attribute: "data-sift-ai-check".into(),
            ai_rule_id: "ai".into(),
            post_selector: r#"div[data-id^="urn:li:"] div.feed-shared-update-v2"#.into(),
            post_text_selector: ".update-components-update-v2__commentary .tvm-parent-container"
                .into(),
            unit_selector: "div[data-id]".into(),
            placeholder: "${POST_SELECTOR}".into(),
            badge_interval_ms: 18_000,
            badge_title: "sift".into(),
            thresholds: Thresholds::default(),
        }
    }
}

impl EngineConfig {
    /// Load from JSON, falling back to defaults for missing keys
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        serde_json::from_str(json).map_err(EngineError::Config)
    }

    pub fn badge_interval(&self) -> Duration {
        Duration::from_millis(self.badge_interval_ms)
    }
}

/// Parse one of the configured structural selectors
pub(crate) fn parse_config_selector(what: &'static str, source: &str) -> Result<SelectorList, EngineError> {
    SelectorList::parse(source).map_err(|source| EngineError::ConfigSelector { what, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{"normalClass": "dim", "thresholds": {"finalScore": 4}}"#).unwrap();
        assert_eq!(config.normal_class, "dim");
        assert_eq!(config.extreme_class, "sift-remove");
        assert_eq!(config.thresholds.final_score, 4);
        assert_eq!(config.thresholds.sentence_variance, 20.0);
        assert_eq!(config.badge_interval(), Duration::from_secs(18));
    }

    #[test]
    fn test_bad_json_is_config_error() {
        assert!(matches!(EngineConfig::from_json("{"), Err(EngineError::Config(_))));
    }

    #[test]
    fn test_configured_selectors() {
        let config = EngineConfig::default();
        assert!(parse_config_selector("post", &config.post_selector).is_ok());
        assert!(parse_config_selector("post text", &config.post_text_selector).is_ok());
        assert!(matches!(
            parse_config_selector("unit", "div["),
            Err(EngineError::ConfigSelector { what: "unit", .. })
        ));
    }
}
