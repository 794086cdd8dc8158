//! Classification engine
//!
//! Owns the rule list, the global mode and the classification record, and
//! applies them to whatever part of the tree a batch names.

use std::collections::{HashMap, HashSet};

use sift_css::selectors::MatchContext;
use sift_css::{select, SelectorCompiler, SelectorList};
use sift_dom::{DomTree, NodeId};
use sift_score::TextScorer;

use crate::catalog::Catalog;
use crate::config::parse_config_selector;
use crate::feed::ChangeBatch;
use crate::options::{merge, Mode, RuleStatus, StoredOptions};
use crate::ratio::NoiseRatio;
use crate::record::{ClassificationEntry, ClassificationRecord, EntryKind, Sweep};
use crate::rule::{toggle_class, Rule, RuleAction};
use crate::{EngineConfig, EngineError};

/// Marker value for posts the scorer flagged
pub const AI_FLAGGED: &str = "flagged";
/// Marker value for posts the scorer let through
pub const AI_CLEAN: &str = "clean";

/// Mutable engine state
#[derive(Debug, Clone)]
pub struct EngineState {
    pub mode: Mode,
    pub rules: Vec<Rule>,
    pub record: ClassificationRecord,
}

/// Outcome of one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Elements evaluated
    pub candidates: usize,
    /// Entries added or changed
    pub classified: usize,
    /// Entries removed
    pub reverted: usize,
    /// Posts sent to the scorer
    pub scored: usize,
    /// Rules skipped after an evaluation or write failure
    pub errors: usize,
}

/// Outcome of loading stored options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionsReport {
    /// Ids marked `"delete"`; the caller drops them from storage
    pub purged: Vec<String>,
    /// Ids whose selector failed to compile
    pub invalid: Vec<String>,
    /// Entries reverted because their rule went away or changed shape
    pub reverted: usize,
    /// Nodes whose revert or update failed; retried on the next load
    pub errors: usize,
    pub batch: BatchReport,
}

pub struct Engine {
    config: EngineConfig,
    catalog: Catalog,
    compiler: SelectorCompiler,
    scorer: TextScorer,
    post: SelectorList,
    post_text: SelectorList,
    ratio: NoiseRatio,
    state: EngineState,
}

impl Engine {
    pub fn new(config: EngineConfig, catalog: Catalog) -> Result<Self, EngineError> {
        let post = parse_config_selector("post", &config.post_selector)?;
        let post_text = parse_config_selector("post text", &config.post_text_selector)?;
        let ratio = NoiseRatio::new(&config)?;
        let scorer = TextScorer::new(config.thresholds.clone());
        let record = ClassificationRecord::new(config.classification_attribute.clone());
        Ok(Self {
            config,
            catalog,
            compiler: SelectorCompiler::new(),
            scorer,
            post,
            post_text,
            ratio,
            state: EngineState {
                mode: Mode::default(),
                rules: Vec::new(),
                record,
            },
        })
    }

    /// Default configuration with the bundled catalog
    pub fn with_defaults() -> Result<Self, EngineError> {
        let config = EngineConfig::default();
        let catalog = Catalog::bundled(&config)?;
        Self::new(config, catalog)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    pub fn rules(&self) -> &[Rule] {
        &self.state.rules
    }

    pub fn rule(&self, id: &str) -> Option<&Rule> {
        self.state.rules.iter().find(|r| r.id == id)
    }

    pub fn record(&self) -> &ClassificationRecord {
        &self.state.record
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Rebuild rules from stored options and bring the tree in line.
    ///
    /// Entries of rules that were disabled, deleted or changed shape are
    /// reverted, surviving entries take their rule's new position, the mode
    /// is applied, then the whole tree is re-evaluated. Write failures are
    /// logged and counted per node.
    pub fn apply_options(&mut self, tree: &mut DomTree, stored: &StoredOptions) -> OptionsReport {
        let mut report = OptionsReport::default();
        let mut rules = Vec::new();

        for spec in merge(&self.catalog, stored) {
            match spec.status {
                RuleStatus::Delete => {
                    report.purged.push(spec.id);
                    continue;
                }
                RuleStatus::Disabled => continue,
                RuleStatus::Enabled => {}
            }
            match Rule::from_spec(&spec, &self.config, &mut self.compiler) {
                Ok(Some(rule)) => rules.push(rule),
                Ok(None) => tracing::debug!("Rule '{}' has no selector, skipped", spec.id),
                Err(err) => {
                    tracing::warn!("Rule '{}' skipped: {}", spec.id, err);
                    report.invalid.push(spec.id);
                }
            }
        }

        let reverted = self
            .state
            .record
            .revert_where(tree, |entry| !rules.iter().any(|rule| produces(rule, entry)));
        let ranks: HashMap<&str, usize> = rules.iter().enumerate().map(|(i, r)| (r.id.as_str(), i)).collect();
        let reranked = self.state.record.rerank(tree, |id| ranks.get(id).copied());
        report.reverted = reverted.changed;
        report.errors = reverted.failed + reranked.failed;
        self.state.rules = rules;
        if !report.purged.is_empty() {
            tracing::info!("Purging rules marked for deletion: {}", report.purged.join(", "));
        }
        tracing::debug!(
            "Loaded {} active rules ({} invalid, {} entries reverted)",
            self.state.rules.len(),
            report.invalid.len(),
            report.reverted
        );

        let switched = self.switch_mode(tree, stored.mode);
        report.reverted += switched.changed;
        report.errors += switched.failed;
        if self.state.mode != Mode::Off {
            report.batch = self.process_batch(tree, &ChangeBatch::navigation());
        }
        report
    }

    /// Change the global mode.
    ///
    /// Off reverts everything. Switching between normal and extreme swaps
    /// the toggle class in place without re-matching. Leaving off runs a
    /// full pass.
    pub fn set_mode(&mut self, tree: &mut DomTree, mode: Mode) -> BatchReport {
        let was_off = self.state.mode == Mode::Off;
        let switched = self.switch_mode(tree, mode);
        let mut report = if was_off && mode != Mode::Off {
            self.process_batch(tree, &ChangeBatch::navigation())
        } else {
            BatchReport::default()
        };
        report.reverted += switched.changed;
        report.errors += switched.failed;
        report
    }

    /// `changed` counts reverted entries; retargeted nodes are not counted
    fn switch_mode(&mut self, tree: &mut DomTree, mode: Mode) -> Sweep {
        let previous = std::mem::replace(&mut self.state.mode, mode);
        if previous == mode {
            return Sweep::default();
        }
        tracing::info!("Mode {} -> {}", u8::from(previous), u8::from(mode));
        match toggle_class(mode, &self.config) {
            None => self.state.record.revert_all(tree),
            Some(class) => {
                let retargeted = self.state.record.retarget(tree, EntryKind::Toggle, &class);
                Sweep {
                    changed: 0,
                    failed: retargeted.failed,
                }
            }
        }
    }

    /// Evaluate every rule against the nodes a batch names.
    ///
    /// Failures are logged and counted per rule; they never abort the batch.
    pub fn process_batch(&mut self, tree: &mut DomTree, batch: &ChangeBatch) -> BatchReport {
        let mut report = BatchReport::default();
        if self.state.mode == Mode::Off {
            return report;
        }

        let candidates = if batch.navigation_changed {
            let pruned = self.state.record.prune(tree);
            if pruned > 0 {
                tracing::debug!("Forgot {} detached nodes", pruned);
            }
            tree.elements().collect()
        } else {
            batch_candidates(tree, &batch.added)
        };
        report.candidates = candidates.len();
        if candidates.is_empty() {
            return report;
        }

        let mode = self.state.mode;
        for index in 0..self.state.rules.len() {
            let Some(entry) = self.state.rules[index].entry(index, mode, &self.config) else {
                continue;
            };
            let outcome = if entry.kind == EntryKind::Ai {
                self.apply_ai(tree, &candidates, entry, &mut report)
            } else {
                self.apply_rule(tree, index, &candidates, entry, &mut report)
            };
            if let Err(err) = outcome {
                tracing::warn!("Rule '{}' skipped for this batch: {}", self.state.rules[index].id, err);
                report.errors += 1;
            }
        }

        tracing::debug!(
            "Batch: {} candidates, {} classified, {} reverted, {} scored, {} errors",
            report.candidates,
            report.classified,
            report.reverted,
            report.scored,
            report.errors
        );
        report
    }

    fn apply_rule(
        &mut self,
        tree: &mut DomTree,
        index: usize,
        candidates: &[NodeId],
        entry: ClassificationEntry,
        report: &mut BatchReport,
    ) -> Result<(), EngineError> {
        let rule = &self.state.rules[index];
        let Some(selector) = rule.selector.as_ref() else {
            return Ok(());
        };
        let matched = select(tree, selector, candidates)?;
        let matched_set: HashSet<NodeId> = matched.iter().copied().collect();

        let record = &mut self.state.record;
        for &node in &matched {
            if record.classify(tree, node, entry.clone())? {
                report.classified += 1;
            }
        }
        for &node in candidates.iter().filter(|n| !matched_set.contains(n)) {
            if record.unclassify(tree, node, &entry.rule_id)? {
                report.reverted += 1;
            }
        }
        Ok(())
    }

    fn apply_ai(
        &mut self,
        tree: &mut DomTree,
        candidates: &[NodeId],
        entry: ClassificationEntry,
        report: &mut BatchReport,
    ) -> Result<(), EngineError> {
        let posts: Vec<NodeId> = {
            let ctx = MatchContext::new(tree);
            candidates.iter().copied().filter(|&n| self.post.matches(n, ctx)).collect()
        };
        let marker = self.config.ai_checked_attribute.as_str();

        for post in posts {
            let flagged = match tree.get_attribute(post, marker) {
                Some(value) => value == AI_FLAGGED,
                None => {
                    let Some(body) = self.post_text.query_selector(tree, post) else {
                        continue;
                    };
                    let result = self.scorer.score(&tree.rendered_text(body));
                    report.scored += 1;
                    let value = if result.is_flagged { AI_FLAGGED } else { AI_CLEAN };
                    tree.set_attribute(post, marker, value)?;
                    if result.is_flagged {
                        tracing::debug!("Post {} scored {} and was flagged", post, result.score);
                    }
                    result.is_flagged
                }
            };
            if flagged && self.state.record.classify(tree, post, entry.clone())? {
                report.classified += 1;
            }
        }
        Ok(())
    }

    /// Current noise ratio of the tree
    pub fn noise_ratio(&self, tree: &DomTree) -> u8 {
        self.ratio.compute(tree)
    }
}

/// Whether `rule` would still write `entry`, up to the mode-driven class
fn produces(rule: &Rule, entry: &ClassificationEntry) -> bool {
    if rule.id != entry.rule_id {
        return false;
    }
    match (&rule.action, entry.kind) {
        (RuleAction::Toggle, EntryKind::Toggle) | (RuleAction::AiFlag, EntryKind::Ai) => true,
        (RuleAction::Style { class, color }, EntryKind::Style) => {
            *class == entry.applied_class && *color == entry.applied_color
        }
        _ => false,
    }
}

/// Connected element roots of a batch, outermost only, in document order,
/// each followed by its element descendants
fn batch_candidates(tree: &DomTree, added: &[NodeId]) -> Vec<NodeId> {
    let mut roots: Vec<NodeId> = Vec::new();
    for &node in added {
        if tree.is_element(node) && tree.is_connected(node) && !roots.contains(&node) {
            roots.push(node);
        }
    }
    let outermost: Vec<NodeId> = roots
        .iter()
        .copied()
        .filter(|&node| !tree.ancestors(node).any(|a| roots.contains(&a)))
        .collect();

    let mut ordered: Vec<(Vec<u32>, NodeId)> = outermost.into_iter().map(|n| (tree.tree_position(n), n)).collect();
    ordered.sort();

    let mut candidates = Vec::new();
    for (_, root) in ordered {
        candidates.push(root);
        candidates.extend(tree.descendant_elements(root));
    }
    candidates
}
