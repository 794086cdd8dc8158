//! Rule catalog
//!
//! Ordered groups of rule definitions, loaded from JSON. Selectors may use
//! the configured placeholder for the post selector; it is substituted once
//! at load time.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{EngineConfig, EngineError};

/// Bundled English catalog
const BUNDLED_EN: &str = include_str!("../catalog/en.json");

/// One rule definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Default enablement when nothing is stored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<bool>,
}

/// Named group of entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogGroup {
    pub group: String,
    pub settings: Vec<CatalogEntry>,
}

/// Fallback values for a rule id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleDefaults {
    pub selector: Option<String>,
    pub class: Option<String>,
    pub color: Option<String>,
}

/// Ordered rule catalog
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    groups: Vec<CatalogGroup>,
}

impl Catalog {
    /// Parse a catalog and substitute the post-selector placeholder
    pub fn from_json(json: &str, config: &EngineConfig) -> Result<Self, EngineError> {
        let mut groups: Vec<CatalogGroup> = serde_json::from_str(json).map_err(EngineError::Catalog)?;
        for entry in groups.iter_mut().flat_map(|g| g.settings.iter_mut()) {
            if let Some(selector) = entry.selector.as_mut()
                && selector.contains(&config.placeholder)
            {
                *selector = selector.replace(&config.placeholder, &config.post_selector);
            }
        }
        let catalog = Self { groups };
        tracing::debug!("Loaded catalog with {} rules", catalog.entries().count());
        Ok(catalog)
    }

    /// The catalog shipped with the crate
    pub fn bundled(config: &EngineConfig) -> Result<Self, EngineError> {
        Self::from_json(BUNDLED_EN, config)
    }

    pub fn groups(&self) -> &[CatalogGroup] {
        &self.groups
    }

    /// Entries in catalog order
    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.groups.iter().flat_map(|g| g.settings.iter())
    }

    pub fn get(&self, id: &str) -> Option<&CatalogEntry> {
        self.entries().find(|e| e.id == id)
    }

    /// Position of `id` in catalog order
    pub fn position(&self, id: &str) -> Option<usize> {
        self.entries().position(|e| e.id == id)
    }

    /// Per-id fallbacks; entries without selector, class or color are left out
    pub fn flatten(&self) -> HashMap<String, RuleDefaults> {
        self.entries()
            .filter(|e| e.selector.is_some() || e.class.is_some() || e.color.is_some())
            .map(|e| {
                (
                    e.id.clone(),
                    RuleDefaults {
                        selector: e.selector.clone(),
                        class: e.class.clone(),
                        color: e.color.clone(),
                    },
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_catalog_substitutes_placeholder() {
        let config = EngineConfig::default();
        let catalog = Catalog::bundled(&config).unwrap();
        assert!(catalog.entries().all(|e| e
            .selector
            .as_deref()
            .is_none_or(|s| !s.contains("${POST_SELECTOR}"))));

        let promoted = catalog.get("promoted").unwrap();
        assert!(promoted.selector.as_deref().unwrap().starts_with(&config.post_selector));
        assert_eq!(catalog.get("ai").unwrap().selector, None);
    }

    #[test]
    fn test_flatten_skips_bare_entries() {
        let config = EngineConfig::default();
        let catalog = Catalog::from_json(
            r#"[{"group": "g", "settings": [
                {"id": "ai", "label": "AI"},
                {"id": "x", "selector": "${POST_SELECTOR} p", "class": "c"}
            ]}]"#,
            &config,
        )
        .unwrap();
        let flat = catalog.flatten();
        assert_eq!(flat.len(), 1);
        assert_eq!(flat["x"].class.as_deref(), Some("c"));
        assert_eq!(catalog.position("x"), Some(1));
    }

    #[test]
    fn test_invalid_catalog() {
        let err = Catalog::from_json("{}", &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, EngineError::Catalog(_)));
    }
}
