//! Extended selector matcher
//!
//! Filters candidate elements through the structural base, then the
//! `:contains()` stage, then the `:has()` stage. Both text stages must pass
//! when present. Nothing here writes to the tree.

use sift_dom::{DomTree, NodeId};

use crate::selectors::MatchContext;
use crate::{CompiledSelector, EvaluationError};

/// Keep the candidates that match `compiled`, preserving candidate order
pub fn select(
    tree: &DomTree,
    compiled: &CompiledSelector,
    candidates: &[NodeId],
) -> Result<Vec<NodeId>, EvaluationError> {
    let base = compiled.structural()?;
    let ctx = MatchContext::new(tree);
    let structural = candidates
        .iter()
        .copied()
        .filter(|&el| base.matches(el, ctx));

    if compiled.is_structural_only() {
        return Ok(structural.collect());
    }

    // Surface sub-selector errors before filtering, not only for
    // candidates that reach the has stage.
    for clause in compiled.has_clauses() {
        for pair in clause.pairs() {
            pair.structural()?;
        }
    }

    let mut matched = Vec::new();
    for el in structural {
        if matches_text_stages(tree, compiled, el)? {
            matched.push(el);
        }
    }
    Ok(matched)
}

/// Query every element under `root` (excluding `root`) in document order
pub fn query_all(
    tree: &DomTree,
    compiled: &CompiledSelector,
    root: NodeId,
) -> Result<Vec<NodeId>, EvaluationError> {
    let candidates: Vec<NodeId> = tree.descendant_elements(root).collect();
    select(tree, compiled, &candidates)
}

fn matches_text_stages(
    tree: &DomTree,
    compiled: &CompiledSelector,
    el: NodeId,
) -> Result<bool, EvaluationError> {
    let contains = compiled.contains_predicates();
    if !contains.is_empty() {
        let text = tree.rendered_text(el);
        if !contains.iter().any(|p| p.test(&text)) {
            return Ok(false);
        }
    }

    let clauses = compiled.has_clauses();
    if clauses.is_empty() {
        return Ok(true);
    }
    for clause in clauses {
        let mut holds = true;
        for pair in clause.pairs() {
            let inner = pair.structural()?.query_relative(tree, el, pair.reach());
            if !inner
                .into_iter()
                .any(|d| pair.predicate().test(&tree.rendered_text(d)))
            {
                holds = false;
                break;
            }
        }
        if holds {
            return Ok(true);
        }
    }
    Ok(false)
}
