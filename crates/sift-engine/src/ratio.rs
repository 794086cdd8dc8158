//! Noise ratio
//!
//! Share of the feed hidden by toggle rules. Read-only over the tree.

use sift_css::selectors::MatchContext;
use sift_css::SelectorList;
use sift_dom::DomTree;

use crate::config::parse_config_selector;
use crate::{EngineConfig, EngineError};

/// Raw counts behind a ratio
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RatioCounts {
    /// Elements bearing either toggle class
    pub classified: usize,
    /// Elements matching the unit selector
    pub items: usize,
    /// Classified elements inside a unit
    pub classified_in_units: usize,
}

impl RatioCounts {
    /// Rounded percentage, 0 when there is nothing to count
    pub fn ratio(&self) -> u8 {
        let denominator = (self.items + self.classified).saturating_sub(self.classified_in_units);
        if denominator == 0 {
            return 0;
        }
        let percent = (self.classified as f64 / denominator as f64 * 100.0).round();
        percent.min(100.0) as u8
    }
}

#[derive(Debug, Clone)]
pub struct NoiseRatio {
    unit: SelectorList,
    normal_class: String,
    extreme_class: String,
}

impl NoiseRatio {
    pub fn new(config: &EngineConfig) -> Result<Self, EngineError> {
        let unit = parse_config_selector("unit", &config.unit_selector)?;
        Ok(Self {
            unit,
            normal_class: config.normal_class.clone(),
            extreme_class: config.extreme_class.clone(),
        })
    }

    pub fn counts(&self, tree: &DomTree) -> RatioCounts {
        let ctx = MatchContext::new(tree);
        let mut counts = RatioCounts::default();
        for el in tree.elements() {
            if self.unit.matches(el, ctx) {
                counts.items += 1;
            }
            if tree.has_class(el, &self.normal_class) || tree.has_class(el, &self.extreme_class) {
                counts.classified += 1;
                if tree.ancestors(el).any(|a| tree.is_element(a) && self.unit.matches(a, ctx)) {
                    counts.classified_in_units += 1;
                }
            }
        }
        counts
    }

    pub fn compute(&self, tree: &DomTree) -> u8 {
        self.counts(tree).ratio()
    }
}
