//! Rules
//!
//! An enabled `RuleSpec` with a compiled selector and the visual action it
//! applies to matching nodes.

use std::sync::Arc;

use sift_css::{CompiledSelector, SelectorCompiler, SelectorError};

use crate::options::{Mode, RuleSpec};
use crate::record::{ClassificationEntry, EntryKind};
use crate::EngineConfig;

/// Visual action of a rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleAction {
    /// Normal or extreme class, picked by the global mode
    Toggle,
    /// Fixed class plus optional inline color
    Style { class: String, color: Option<String> },
    /// Scorer-driven; matches posts whose text is flagged
    AiFlag,
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub id: String,
    /// `None` only for `AiFlag`
    pub selector: Option<Arc<CompiledSelector>>,
    pub action: RuleAction,
}

impl Rule {
    /// Build a rule from a merged `RuleSpec`.
    ///
    /// Returns `Ok(None)` for rules that have nothing to match (missing or
    /// blank selector). A selector that fails to compile is an error.
    pub fn from_spec(
        spec: &RuleSpec,
        config: &EngineConfig,
        compiler: &mut SelectorCompiler,
    ) -> Result<Option<Rule>, SelectorError> {
        if spec.id == config.ai_rule_id {
            return Ok(Some(Rule {
                id: spec.id.clone(),
                selector: None,
                action: RuleAction::AiFlag,
            }));
        }

        let Some(source) = spec.selector.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(None);
        };
        let selector = compiler.compile(source)?;
        let action = match spec.class.as_deref().filter(|c| !c.is_empty()) {
            Some(class) => RuleAction::Style {
                class: class.to_string(),
                color: spec.color.clone().filter(|c| !c.is_empty()),
            },
            None => RuleAction::Toggle,
        };
        Ok(Some(Rule {
            id: spec.id.clone(),
            selector: Some(selector),
            action,
        }))
    }

    pub fn is_toggle(&self) -> bool {
        self.action == RuleAction::Toggle
    }

    /// Entry this rule writes under `mode` from position `rank` in the rule
    /// list; `None` when the mode is off
    pub fn entry(&self, rank: usize, mode: Mode, config: &EngineConfig) -> Option<ClassificationEntry> {
        if mode == Mode::Off {
            return None;
        }
        let (kind, class, color) = match &self.action {
            RuleAction::Toggle => (EntryKind::Toggle, toggle_class(mode, config)?, None),
            RuleAction::Style { class, color } => (EntryKind::Style, class.clone(), color.clone()),
            RuleAction::AiFlag => (EntryKind::Ai, config.ai_class.clone(), None),
        };
        Some(ClassificationEntry {
            rule_id: self.id.clone(),
            rank,
            kind,
            applied_class: class,
            applied_color: color,
        })
    }
}

/// Class a toggle rule applies under `mode`
pub fn toggle_class(mode: Mode, config: &EngineConfig) -> Option<String> {
    match mode {
        Mode::Off => None,
        Mode::Normal => Some(config.normal_class.clone()),
        Mode::Extreme => Some(config.extreme_class.clone()),
    }
}
