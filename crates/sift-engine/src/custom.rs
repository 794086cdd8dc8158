//! Custom filters
//!
//! `custom_<n>` rules hold a user regex wrapped into
//! `<post selector>:contains(/<pattern>/)`.

use once_cell::sync::Lazy;
use regex::Regex;
use sift_css::TextPredicate;

use crate::options::{RuleStatus, StoredOptions, StoredRuleState};
use crate::{EngineConfig, EngineError};

pub const CUSTOM_PREFIX: &str = "custom_";
pub const DEFAULT_CUSTOM_COLOR: &str = "#0078D4";
pub const DEFAULT_CUSTOM_PATTERN: &str = "example";

static PATTERN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r":contains\(/(.*)/\)\s*$").expect("static regex"));

pub fn is_custom(id: &str) -> bool {
    custom_index(id).is_some()
}

/// `n` in `custom_<n>`
pub fn custom_index(id: &str) -> Option<u32> {
    id.strip_prefix(CUSTOM_PREFIX)?.parse().ok()
}

/// Build a custom selector, rejecting patterns that do not compile
pub fn custom_selector(config: &EngineConfig, pattern: &str) -> Result<String, EngineError> {
    TextPredicate::regex(pattern)?;
    Ok(format!("{}:contains(/{}/)", config.post_selector, pattern))
}

/// Pattern of a custom selector, if it has the custom shape
pub fn extract_pattern(selector: &str) -> Option<&str> {
    PATTERN_RE
        .captures(selector)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

impl StoredOptions {
    /// Next free custom index
    pub fn next_custom_id(&self) -> String {
        let next = self
            .rules
            .keys()
            .filter_map(|id| custom_index(id))
            .max()
            .map_or(1, |n| n + 1);
        format!("{CUSTOM_PREFIX}{next}")
    }

    /// Add a disabled custom filter with the default pattern and color
    pub fn add_custom_filter(&mut self, config: &EngineConfig) -> Result<String, EngineError> {
        let id = self.next_custom_id();
        let state = StoredRuleState {
            status: RuleStatus::Disabled,
            selector: Some(custom_selector(config, DEFAULT_CUSTOM_PATTERN)?),
            class: Some(config.custom_class.clone()),
            color: Some(DEFAULT_CUSTOM_COLOR.to_string()),
        };
        tracing::debug!("Added custom filter {}", id);
        self.rules.insert(id.clone(), state);
        Ok(id)
    }

    /// Replace a custom filter's pattern and color, keeping its status
    pub fn save_custom_filter(
        &mut self,
        id: &str,
        pattern: &str,
        color: &str,
        config: &EngineConfig,
    ) -> Result<(), EngineError> {
        let selector = custom_selector(config, pattern)?;
        let state = self.rules.entry(id.to_string()).or_default();
        state.selector = Some(selector);
        state.class = Some(config.custom_class.clone());
        state.color = Some(color.to_string());
        Ok(())
    }

    pub fn disable_rule(&mut self, id: &str) -> Result<(), EngineError> {
        self.set_status(id, RuleStatus::Disabled)
    }

    /// Mark a rule for removal on next load
    pub fn mark_for_deletion(&mut self, id: &str) -> Result<(), EngineError> {
        self.set_status(id, RuleStatus::Delete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_index() {
        assert_eq!(custom_index("custom_12"), Some(12));
        assert_eq!(custom_index("custom_"), None);
        assert_eq!(custom_index("custom_x"), None);
        assert_eq!(custom_index("brands"), None);
    }

    #[test]
    fn test_selector_round_trip() {
        let config = EngineConfig::default();
        let selector = custom_selector(&config, r"hiring|\d+ roles").unwrap();
        assert!(selector.starts_with(&config.post_selector));
        assert_eq!(extract_pattern(&selector), Some(r"hiring|\d+ roles"));
        assert_eq!(extract_pattern("div.post"), None);
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let err = custom_selector(&EngineConfig::default(), "(unclosed").unwrap_err();
        assert!(matches!(err, EngineError::Selector(_)));
    }

    #[test]
    fn test_add_allocates_next_index() {
        let config = EngineConfig::default();
        let mut opts = StoredOptions::default();
        assert_eq!(opts.next_custom_id(), "custom_1");

        let first = opts.add_custom_filter(&config).unwrap();
        let second = opts.add_custom_filter(&config).unwrap();
        assert_eq!((first.as_str(), second.as_str()), ("custom_1", "custom_2"));

        let state = &opts.rules["custom_2"];
        assert_eq!(state.status, RuleStatus::Disabled);
        assert_eq!(state.color.as_deref(), Some(DEFAULT_CUSTOM_COLOR));
        assert_eq!(state.class.as_deref(), Some("sift-custom"));
        assert_eq!(extract_pattern(state.selector.as_deref().unwrap()), Some("example"));
    }

    #[test]
    fn test_save_and_delete() {
        let config = EngineConfig::default();
        let mut opts = StoredOptions::default();
        let id = opts.add_custom_filter(&config).unwrap();
        opts.set_status(&id, RuleStatus::Enabled).unwrap();

        opts.save_custom_filter(&id, "webinar", "#ff0000", &config).unwrap();
        let state = &opts.rules[&id];
        assert!(state.status.is_enabled());
        assert_eq!(state.color.as_deref(), Some("#ff0000"));
        assert_eq!(extract_pattern(state.selector.as_deref().unwrap()), Some("webinar"));

        assert!(opts.save_custom_filter(&id, "[", "#000", &config).is_err());

        opts.mark_for_deletion(&id).unwrap();
        assert_eq!(opts.rules[&id].status, RuleStatus::Delete);
        assert!(opts.mark_for_deletion("custom_99").is_err());
    }
}
