//! Classification record
//!
//! Per-node list of active classifications plus the node's state before the
//! first one. Every change goes through `reconcile`, which compares the
//! desired markers with what the node carries and writes only differences.
//! Once a node has no entries left its raw `class` and `style` attributes
//! and the classification attribute are put back as captured.
//!
//! Entries are kept in rule order, so the classification attribute always
//! names the last active rule regardless of the order they were applied in.

use std::collections::BTreeMap;

use sift_dom::{DomError, DomTree, NodeId};

/// Inline style property used for rule colors
pub const COLOR_PROPERTY: &str = "color";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Toggle,
    Style,
    Ai,
}

/// One rule's effect on one node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationEntry {
    pub rule_id: String,
    /// Position of the rule in the engine's rule list
    pub rank: usize,
    pub kind: EntryKind,
    pub applied_class: String,
    pub applied_color: Option<String>,
}

/// Node state captured before the first classification
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Baseline {
    pub classes: Vec<String>,
    pub color: Option<String>,
    pub attribute: Option<String>,
    pub class_attr: Option<String>,
    pub style_attr: Option<String>,
}

impl Baseline {
    pub fn capture(tree: &DomTree, node: NodeId, attribute: &str) -> Self {
        let Some(el) = tree.element(node) else {
            return Self::default();
        };
        Self {
            classes: el.classes().iter().map(str::to_string).collect(),
            color: el.style().get_property(COLOR_PROPERTY).map(str::to_string),
            attribute: el.get_attr(attribute).map(str::to_string),
            class_attr: el.get_attr("class").map(str::to_string),
            style_attr: el.get_attr("style").map(str::to_string),
        }
    }

    fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    pub baseline: Baseline,
    /// Active entries by rank; the last one names the node
    pub entries: Vec<ClassificationEntry>,
    /// Classes the engine added on top of the baseline
    added: Vec<String>,
}

impl NodeRecord {
    pub fn entry(&self, rule_id: &str) -> Option<&ClassificationEntry> {
        self.entries.iter().find(|e| e.rule_id == rule_id)
    }
}

/// Outcome of a record-wide write pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sweep {
    pub changed: usize,
    /// Nodes whose writes failed; their entries stay for the next pass
    pub failed: usize,
}

/// Engine-owned map from node to its classifications
#[derive(Debug, Clone, Default)]
pub struct ClassificationRecord {
    attribute: String,
    nodes: BTreeMap<NodeId, NodeRecord>,
}

impl ClassificationRecord {
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            nodes: BTreeMap::new(),
        }
    }

    pub fn get(&self, node: NodeId) -> Option<&NodeRecord> {
        self.nodes.get(&node)
    }

    pub fn entry(&self, node: NodeId, rule_id: &str) -> Option<&ClassificationEntry> {
        self.nodes.get(&node).and_then(|r| r.entry(rule_id))
    }

    /// Classified nodes in node-id order
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &NodeRecord)> {
        self.nodes.iter().map(|(&id, rec)| (id, rec))
    }

    /// Nodes carrying an entry for `rule_id`
    pub fn nodes_for<'a>(&'a self, rule_id: &'a str) -> impl Iterator<Item = NodeId> + 'a {
        self.nodes
            .iter()
            .filter(move |(_, rec)| rec.entry(rule_id).is_some())
            .map(|(&id, _)| id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Record `entry` on `node`. Returns whether anything changed.
    pub fn classify(
        &mut self,
        tree: &mut DomTree,
        node: NodeId,
        entry: ClassificationEntry,
    ) -> Result<bool, DomError> {
        let attribute = &self.attribute;
        let rec = self.nodes.entry(node).or_insert_with(|| NodeRecord {
            baseline: Baseline::capture(tree, node, attribute),
            entries: Vec::new(),
            added: Vec::new(),
        });

        match rec.entries.iter().position(|e| e.rule_id == entry.rule_id) {
            Some(i) if rec.entries[i] == entry => return Ok(false),
            Some(i) => {
                rec.entries[i] = entry;
                rec.entries.sort_by_key(|e| e.rank);
            }
            None => {
                let at = rec.entries.partition_point(|e| e.rank <= entry.rank);
                rec.entries.insert(at, entry);
            }
        }
        reconcile(tree, node, rec, attribute)?;
        Ok(true)
    }

    /// Drop `rule_id`'s entry from `node`, reverting it
    pub fn unclassify(&mut self, tree: &mut DomTree, node: NodeId, rule_id: &str) -> Result<bool, DomError> {
        let Some(rec) = self.nodes.get_mut(&node) else {
            return Ok(false);
        };
        let before = rec.entries.len();
        rec.entries.retain(|e| e.rule_id != rule_id);
        if rec.entries.len() == before {
            return Ok(false);
        }
        reconcile(tree, node, rec, &self.attribute)?;
        if rec.entries.is_empty() {
            self.nodes.remove(&node);
        }
        Ok(true)
    }

    /// Revert every entry matching `pred`.
    ///
    /// `changed` counts removed entries. A node whose writes fail keeps its
    /// entries and is counted in `failed`; the rest of the sweep goes on.
    pub fn revert_where(&mut self, tree: &mut DomTree, mut pred: impl FnMut(&ClassificationEntry) -> bool) -> Sweep {
        let mut sweep = Sweep::default();
        for (&node, rec) in self.nodes.iter_mut() {
            let (dropped, kept): (Vec<_>, Vec<_>) = rec.entries.drain(..).partition(|e| pred(e));
            rec.entries = kept;
            if dropped.is_empty() {
                continue;
            }
            match reconcile(tree, node, rec, &self.attribute) {
                Ok(()) => sweep.changed += dropped.len(),
                Err(err) => {
                    tracing::warn!("Reverting node {} failed: {}", node, err);
                    rec.entries.extend(dropped);
                    rec.entries.sort_by_key(|e| e.rank);
                    sweep.failed += 1;
                }
            }
        }
        self.nodes.retain(|_, rec| !rec.entries.is_empty());
        sweep
    }

    pub fn revert_all(&mut self, tree: &mut DomTree) -> Sweep {
        self.revert_where(tree, |_| true)
    }

    /// Swap the class of every entry of `kind`; `changed` counts nodes
    pub fn retarget(&mut self, tree: &mut DomTree, kind: EntryKind, class: &str) -> Sweep {
        let mut sweep = Sweep::default();
        for (&node, rec) in self.nodes.iter_mut() {
            let mut changed = false;
            for entry in rec.entries.iter_mut().filter(|e| e.kind == kind) {
                if entry.applied_class != class {
                    entry.applied_class = class.to_string();
                    changed = true;
                }
            }
            if changed {
                sweep.tally(node, "Retargeting", reconcile(tree, node, rec, &self.attribute));
            }
        }
        sweep
    }

    /// Re-rank entries after the rule list changed; `changed` counts nodes.
    ///
    /// Entries whose rule has no rank are left where they are.
    pub fn rerank(&mut self, tree: &mut DomTree, rank_of: impl Fn(&str) -> Option<usize>) -> Sweep {
        let mut sweep = Sweep::default();
        for (&node, rec) in self.nodes.iter_mut() {
            let mut changed = false;
            for entry in rec.entries.iter_mut() {
                if let Some(rank) = rank_of(&entry.rule_id)
                    && rank != entry.rank
                {
                    entry.rank = rank;
                    changed = true;
                }
            }
            if changed {
                rec.entries.sort_by_key(|e| e.rank);
                sweep.tally(node, "Re-ranking", reconcile(tree, node, rec, &self.attribute));
            }
        }
        sweep
    }

    /// Forget nodes no longer in the document. No writes.
    pub fn prune(&mut self, tree: &DomTree) -> usize {
        let before = self.nodes.len();
        self.nodes.retain(|&node, _| tree.is_connected(node));
        before - self.nodes.len()
    }
}

impl Sweep {
    fn tally(&mut self, node: NodeId, what: &str, outcome: Result<(), DomError>) {
        match outcome {
            Ok(()) => self.changed += 1,
            Err(err) => {
                tracing::warn!("{} node {} failed: {}", what, node, err);
                self.failed += 1;
            }
        }
    }
}

fn reconcile(tree: &mut DomTree, node: NodeId, rec: &mut NodeRecord, attribute: &str) -> Result<(), DomError> {
    if rec.entries.is_empty() {
        rec.added.clear();
        return restore(tree, node, &rec.baseline, attribute);
    }

    let mut wanted: Vec<String> = Vec::new();
    for entry in &rec.entries {
        let class = &entry.applied_class;
        if !rec.baseline.has_class(class) && !wanted.contains(class) {
            wanted.push(class.clone());
        }
    }
    for class in rec.added.iter().filter(|c| !wanted.contains(c)) {
        if tree.has_class(node, class) {
            tree.remove_class(node, class)?;
        }
    }
    for class in &wanted {
        if !tree.has_class(node, class) {
            tree.add_class(node, class)?;
        }
    }
    rec.added = wanted;

    let color = rec
        .entries
        .iter()
        .rev()
        .find_map(|e| e.applied_color.as_deref())
        .or(rec.baseline.color.as_deref());
    match color {
        Some(color) if tree.style_property(node, COLOR_PROPERTY) != Some(color) => {
            tree.set_style_property(node, COLOR_PROPERTY, color)?;
        }
        None if tree.style_property(node, COLOR_PROPERTY).is_some() => {
            tree.remove_style_property(node, COLOR_PROPERTY)?;
        }
        _ => {}
    }

    if let Some(last) = rec.entries.last()
        && tree.get_attribute(node, attribute) != Some(last.rule_id.as_str())
    {
        tree.set_attribute(node, attribute, &last.rule_id)?;
    }
    Ok(())
}

fn restore(tree: &mut DomTree, node: NodeId, baseline: &Baseline, attribute: &str) -> Result<(), DomError> {
    restore_attr(tree, node, "class", baseline.class_attr.as_deref())?;
    restore_attr(tree, node, "style", baseline.style_attr.as_deref())?;
    restore_attr(tree, node, attribute, baseline.attribute.as_deref())
}

fn restore_attr(tree: &mut DomTree, node: NodeId, name: &str, value: Option<&str>) -> Result<(), DomError> {
    if tree.get_attribute(node, name) == value {
        return Ok(());
    }
    match value {
        Some(value) => tree.set_attribute(node, name, value),
        None => tree.remove_attribute(node, name).map(drop),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Rule "a" ranks first, "b" second and so on
    fn entry(rule: &str, kind: EntryKind, class: &str, color: Option<&str>) -> ClassificationEntry {
        ClassificationEntry {
            rule_id: rule.into(),
            rank: usize::from(rule.as_bytes()[0] - b'a'),
            kind,
            applied_class: class.into(),
            applied_color: color.map(Into::into),
        }
    }

    fn node(tree: &mut DomTree) -> NodeId {
        let div = tree.create_element_with_attrs("div", &[("class", "post  card"), ("style", "color: red; margin: 0")]);
        tree.append_child(tree.root(), div).unwrap();
        div
    }

    #[test]
    fn test_classify_is_idempotent() {
        let mut tree = DomTree::new();
        let div = node(&mut tree);
        let mut record = ClassificationRecord::new("data-sift");

        assert!(record.classify(&mut tree, div, entry("a", EntryKind::Toggle, "dim", None)).unwrap());
        assert!(tree.has_class(div, "dim"));
        assert_eq!(tree.get_attribute(div, "data-sift"), Some("a"));

        let generation = tree.generation();
        assert!(!record.classify(&mut tree, div, entry("a", EntryKind::Toggle, "dim", None)).unwrap());
        assert_eq!(tree.generation(), generation);
    }

    #[test]
    fn test_revert_restores_raw_attributes() {
        let mut tree = DomTree::new();
        let div = node(&mut tree);
        let mut record = ClassificationRecord::new("data-sift");

        record.classify(&mut tree, div, entry("a", EntryKind::Style, "hl", Some("#0078D4"))).unwrap();
        assert_eq!(tree.style_property(div, "color"), Some("#0078D4"));

        assert!(record.unclassify(&mut tree, div, "a").unwrap());
        assert!(record.is_empty());
        assert_eq!(tree.get_attribute(div, "class"), Some("post  card"));
        assert_eq!(tree.get_attribute(div, "style"), Some("color: red; margin: 0"));
        assert_eq!(tree.get_attribute(div, "data-sift"), None);
    }

    #[test]
    fn test_last_entry_names_node() {
        let mut tree = DomTree::new();
        let div = node(&mut tree);
        let mut record = ClassificationRecord::new("data-sift");

        record.classify(&mut tree, div, entry("a", EntryKind::Toggle, "dim", None)).unwrap();
        record.classify(&mut tree, div, entry("b", EntryKind::Style, "hl", Some("blue"))).unwrap();
        assert_eq!(tree.get_attribute(div, "data-sift"), Some("b"));
        assert!(tree.has_class(div, "dim") && tree.has_class(div, "hl"));

        record.unclassify(&mut tree, div, "b").unwrap();
        assert_eq!(tree.get_attribute(div, "data-sift"), Some("a"));
        assert!(!tree.has_class(div, "hl"));
        assert_eq!(tree.style_property(div, "color"), Some("red"));
    }

    #[test]
    fn test_attribute_follows_rank_not_arrival() {
        let mut tree = DomTree::new();
        let div = node(&mut tree);
        let mut record = ClassificationRecord::new("data-sift");

        record.classify(&mut tree, div, entry("b", EntryKind::Toggle, "dim", None)).unwrap();
        record.classify(&mut tree, div, entry("a", EntryKind::Toggle, "dim", None)).unwrap();
        assert_eq!(tree.get_attribute(div, "data-sift"), Some("b"));

        // "a" moves behind "b"
        let sweep = record.rerank(&mut tree, |id| Some(if id == "a" { 5 } else { 1 }));
        assert_eq!(sweep, Sweep { changed: 1, failed: 0 });
        assert_eq!(tree.get_attribute(div, "data-sift"), Some("a"));
        let order: Vec<&str> = record.get(div).unwrap().entries.iter().map(|e| e.rule_id.as_str()).collect();
        assert_eq!(order, vec!["b", "a"]);
    }

    #[test]
    fn test_failed_node_does_not_stop_sweep() {
        let mut tree = DomTree::new();
        let div = node(&mut tree);
        let text = tree.create_text("loose");
        tree.append_child(tree.root(), text).unwrap();
        let mut record = ClassificationRecord::new("data-sift");

        for target in [div, text] {
            for rule in ["a", "b"] {
                let outcome = record.classify(&mut tree, target, entry(rule, EntryKind::Style, rule, None));
                assert_eq!(outcome.is_ok(), target == div);
            }
        }
        assert_eq!(record.len(), 2);

        let sweep = record.revert_where(&mut tree, |e| e.rule_id == "b");
        assert_eq!(sweep, Sweep { changed: 1, failed: 1 });
        assert!(!tree.has_class(div, "b"));
        assert_eq!(tree.get_attribute(div, "data-sift"), Some("a"));
        assert_eq!(record.get(text).map(|r| r.entries.len()), Some(2));
    }

    #[test]
    fn test_baseline_class_is_kept() {
        let mut tree = DomTree::new();
        let div = node(&mut tree);
        let mut record = ClassificationRecord::new("data-sift");

        record.classify(&mut tree, div, entry("a", EntryKind::Style, "card", None)).unwrap();
        record.classify(&mut tree, div, entry("b", EntryKind::Toggle, "dim", None)).unwrap();
        record.unclassify(&mut tree, div, "a").unwrap();
        assert!(tree.has_class(div, "card"));
    }

    #[test]
    fn test_retarget_and_revert_where() {
        let mut tree = DomTree::new();
        let div = node(&mut tree);
        let mut record = ClassificationRecord::new("data-sift");

        record.classify(&mut tree, div, entry("a", EntryKind::Toggle, "dim", None)).unwrap();
        assert_eq!(record.retarget(&mut tree, EntryKind::Toggle, "gone").changed, 1);
        assert!(!tree.has_class(div, "dim"));
        assert!(tree.has_class(div, "gone"));
        assert_eq!(record.entry(div, "a").unwrap().applied_class, "gone");

        assert_eq!(record.revert_where(&mut tree, |e| e.rule_id == "a").changed, 1);
        assert!(record.is_empty());
        assert!(!tree.has_class(div, "gone"));
    }

    #[test]
    fn test_prune_forgets_detached() {
        let mut tree = DomTree::new();
        let div = node(&mut tree);
        let mut record = ClassificationRecord::new("data-sift");

        record.classify(&mut tree, div, entry("a", EntryKind::Toggle, "dim", None)).unwrap();
        tree.detach(div).unwrap();
        let generation = tree.generation();
        assert_eq!(record.prune(&tree), 1);
        assert_eq!(tree.generation(), generation);
    }
}
