//! sift engine
//!
//! Applies an ordered set of user-configurable rules to a live document
//! tree. Each rule pairs an extended selector with a visual action; the
//! engine records what it wrote so that disabling a rule, deleting it or
//! switching the mode off puts every touched node back as it was.
//!
//! # Example
//! ```rust,ignore
//! use sift_engine::{ChangeBatch, Engine, StoredOptions};
//!
//! let mut engine = Engine::with_defaults()?;
//! let options = StoredOptions::defaults(engine.catalog());
//! engine.apply_options(document.tree_mut(), &options);
//! engine.process_batch(document.tree_mut(), &ChangeBatch::added(new_nodes));
//! let ratio = engine.noise_ratio(document.tree());
//! ```

mod config;
mod error;
mod engine;
pub mod badge;
pub mod catalog;
pub mod custom;
pub mod feed;
pub mod options;
pub mod ratio;
pub mod record;
pub mod rule;

pub use config::EngineConfig;
pub use error::EngineError;
pub use engine::{BatchReport, Engine, EngineState, OptionsReport, AI_CLEAN, AI_FLAGGED};
pub use badge::{BadgeError, BadgeForwarder, BadgeSink, BadgeText, Throttle};
pub use catalog::{Catalog, CatalogEntry, CatalogGroup};
pub use feed::{ChangeBatch, ChangeFeed};
pub use options::{Mode, RuleSpec, RuleStatus, StoredOptions, StoredRuleState};
pub use ratio::{NoiseRatio, RatioCounts};
pub use record::{ClassificationEntry, ClassificationRecord, EntryKind, Sweep};
pub use rule::{Rule, RuleAction};

// Re-export sub-crates for advanced usage
pub use sift_css as css;
pub use sift_dom as dom;
pub use sift_score as score;
