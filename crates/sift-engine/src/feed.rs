//! Change feed
//!
//! Batches handed to the engine: subtrees added since the last batch, or a
//! navigation signal that asks for a full pass.

use sift_dom::{DomTree, MutationRecord, NodeId};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeBatch {
    pub added: Vec<NodeId>,
    /// Re-evaluate the whole tree; `added` is ignored
    pub navigation_changed: bool,
}

impl ChangeBatch {
    pub fn added(nodes: impl IntoIterator<Item = NodeId>) -> Self {
        Self {
            added: nodes.into_iter().collect(),
            navigation_changed: false,
        }
    }

    pub fn navigation() -> Self {
        Self {
            added: Vec::new(),
            navigation_changed: true,
        }
    }

    pub fn from_records(records: &[MutationRecord]) -> Self {
        Self::added(records.iter().flat_map(|r| r.added_nodes.iter().copied()))
    }

    pub fn is_empty(&self) -> bool {
        !self.navigation_changed && self.added.is_empty()
    }
}

/// Pull-based feed over a tree's mutation journal
#[derive(Debug, Default)]
pub struct ChangeFeed {
    last_url: Option<String>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain pending mutations. A URL different from the previous poll
    /// (including the first poll) is reported as navigation.
    pub fn poll(&mut self, tree: &mut DomTree, url: &str) -> ChangeBatch {
        let records = tree.take_records();
        if self.last_url.as_deref() != Some(url) {
            tracing::debug!("Navigation to {}", url);
            self.last_url = Some(url.to_string());
            return ChangeBatch::navigation();
        }
        ChangeBatch::from_records(&records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll() {
        let mut tree = DomTree::new();
        tree.observe(true);
        let mut feed = ChangeFeed::new();

        assert!(feed.poll(&mut tree, "https://a/feed").navigation_changed);
        assert!(feed.poll(&mut tree, "https://a/feed").is_empty());

        let div = tree.create_element("div");
        tree.append_child(tree.root(), div).unwrap();
        let batch = feed.poll(&mut tree, "https://a/feed");
        assert_eq!(batch, ChangeBatch::added([div]));

        let p = tree.create_element("p");
        tree.append_child(tree.root(), p).unwrap();
        let batch = feed.poll(&mut tree, "https://a/jobs");
        assert!(batch.navigation_changed);
        assert!(tree.take_records().is_empty());
    }
}
