//! Stored options
//!
//! Flat persisted map: `"mode"` plus one entry per rule id. The engine
//! consumes it and reports back the ids it purged; persistence itself is the
//! caller's concern.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::catalog::Catalog;
use crate::custom::{custom_index, is_custom};
use crate::EngineError;

/// Global mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Mode {
    /// Revert everything
    Off,
    /// Toggle rules use the normal class
    #[default]
    Normal,
    /// Toggle rules use the extreme class
    Extreme,
}

impl TryFrom<u8> for Mode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Mode::Off),
            1 => Ok(Mode::Normal),
            2 => Ok(Mode::Extreme),
            other => Err(format!("mode must be 0, 1 or 2, got {other}")),
        }
    }
}

impl From<Mode> for u8 {
    fn from(mode: Mode) -> u8 {
        match mode {
            Mode::Off => 0,
            Mode::Normal => 1,
            Mode::Extreme => 2,
        }
    }
}

/// Per-rule status: `true`, `false` or `"delete"`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RuleStatus {
    Enabled,
    #[default]
    Disabled,
    /// Remove permanently on next load
    Delete,
}

impl RuleStatus {
    pub fn is_enabled(self) -> bool {
        self == RuleStatus::Enabled
    }
}

impl From<bool> for RuleStatus {
    fn from(enabled: bool) -> Self {
        if enabled {
            RuleStatus::Enabled
        } else {
            RuleStatus::Disabled
        }
    }
}

impl Serialize for RuleStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RuleStatus::Enabled => serializer.serialize_bool(true),
            RuleStatus::Disabled => serializer.serialize_bool(false),
            RuleStatus::Delete => serializer.serialize_str("delete"),
        }
    }
}

impl<'de> Deserialize<'de> for RuleStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Word(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Flag(flag) => Ok(flag.into()),
            Raw::Word(word) if word == "delete" => Ok(RuleStatus::Delete),
            Raw::Word(word) => Err(serde::de::Error::custom(format!(
                "rule status must be a boolean or \"delete\", got \"{word}\""
            ))),
        }
    }
}

/// Persisted state of one rule
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRuleState {
    #[serde(default)]
    pub status: RuleStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Whole persisted options map
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredOptions {
    #[serde(default)]
    pub mode: Mode,
    #[serde(flatten)]
    pub rules: BTreeMap<String, StoredRuleState>,
}

impl StoredOptions {
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        serde_json::from_str(json).map_err(EngineError::Options)
    }

    pub fn to_json(&self) -> Result<String, EngineError> {
        serde_json::to_string_pretty(self).map_err(EngineError::Options)
    }

    /// Default options for a catalog
    pub fn defaults(catalog: &Catalog) -> Self {
        let rules = catalog
            .entries()
            .map(|entry| {
                let state = StoredRuleState {
                    status: entry.status.unwrap_or(false).into(),
                    class: entry.class.clone(),
                    color: entry.color.clone(),
                    selector: is_custom(&entry.id).then(|| entry.selector.clone()).flatten(),
                };
                (entry.id.clone(), state)
            })
            .collect();
        Self {
            mode: Mode::Normal,
            rules,
        }
    }

    pub fn get(&self, id: &str) -> Option<&StoredRuleState> {
        self.rules.get(id)
    }

    /// Set a rule's status, keeping its other stored fields
    pub fn set_status(&mut self, id: &str, status: RuleStatus) -> Result<(), EngineError> {
        let state = self
            .rules
            .get_mut(id)
            .ok_or_else(|| EngineError::UnknownRule(id.to_string()))?;
        state.status = status;
        Ok(())
    }

    /// Drop purged rule ids
    pub fn purge(&mut self, ids: &[String]) {
        for id in ids {
            self.rules.remove(id);
        }
    }
}

/// A stored rule merged with its catalog fallback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSpec {
    pub id: String,
    pub status: RuleStatus,
    pub selector: Option<String>,
    pub class: Option<String>,
    pub color: Option<String>,
}

/// Merge stored options with catalog fallbacks.
///
/// Every stored id becomes a `RuleSpec`. Catalog ids come first in catalog order,
/// then ids unknown to the catalog ordered by custom index.
pub fn merge(catalog: &Catalog, stored: &StoredOptions) -> Vec<RuleSpec> {
    let fallbacks = catalog.flatten();
    let mut ids: Vec<&String> = stored.rules.keys().collect();
    ids.sort_by_key(|&id| {
        (
            catalog.position(id).unwrap_or(usize::MAX),
            custom_index(id).unwrap_or(u32::MAX),
            id.as_str(),
        )
    });

    ids.into_iter()
        .map(|id| {
            let state = &stored.rules[id];
            let fallback = fallbacks.get(id.as_str());
            let pick = |own: &Option<String>, fb: Option<&Option<String>>| {
                own.clone()
                    .filter(|v| !v.is_empty())
                    .or_else(|| fb.and_then(|f| f.clone()))
            };
            RuleSpec {
                id: id.clone(),
                status: state.status,
                selector: pick(&state.selector, fallback.map(|f| &f.selector)),
                class: pick(&state.class, fallback.map(|f| &f.class)),
                color: pick(&state.color, fallback.map(|f| &f.color)),
            }
        })
        .collect()
}
