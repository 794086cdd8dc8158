//! Parsed page: the arena tree plus cached html/head/body handles

use crate::{DomTree, NodeId};

pub struct Document {
    tree: DomTree,
    url: String,
    /// `NodeId::NONE` until located
    html_element: NodeId,
    head_element: NodeId,
    body_element: NodeId,
}

impl Document {
    /// Create a document with an empty html/head/body skeleton
    pub fn new(url: &str) -> Self {
        let mut tree = DomTree::new();

        let html = tree.create_element("html");
        let head = tree.create_element("head");
        let body = tree.create_element("body");

        // Freshly created nodes cannot form a cycle.
        let _ = tree.append_child(tree.root(), html);
        let _ = tree.append_child(html, head);
        let _ = tree.append_child(html, body);

        Self {
            tree,
            url: url.to_string(),
            html_element: html,
            head_element: head,
            body_element: body,
        }
    }

    /// Bare document node, to be filled by a parser
    pub fn empty(url: &str) -> Self {
        Self {
            tree: DomTree::new(),
            url: url.to_string(),
            html_element: NodeId::NONE,
            head_element: NodeId::NONE,
            body_element: NodeId::NONE,
        }
    }

    /// Locate html/head/body after the tree was filled externally
    pub fn finalize(&mut self) {
        let find = |tree: &DomTree, parent: NodeId, tag: &str| {
            tree.element_children(parent)
                .find(|&c| tree.tag_name(c) == Some(tag))
                .unwrap_or(NodeId::NONE)
        };
        self.html_element = find(&self.tree, self.tree.root(), "html");
        if self.html_element.is_valid() {
            self.head_element = find(&self.tree, self.html_element, "head");
            self.body_element = find(&self.tree, self.html_element, "body");
        } else {
            tracing::debug!("Document {} has no <html> element", self.url);
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Trimmed text of `<head><title>`
    pub fn title(&self) -> String {
        if !self.head_element.is_valid() {
            return String::new();
        }
        self.tree
            .element_children(self.head_element)
            .find(|&c| self.tree.tag_name(c) == Some("title"))
            .map(|title| self.tree.text_content(title).trim().to_string())
            .unwrap_or_default()
    }

    pub fn document_element(&self) -> NodeId {
        self.html_element
    }

    pub fn head(&self) -> NodeId {
        self.head_element
    }

    pub fn body(&self) -> NodeId {
        self.body_element
    }

    /// First element in document order with this `id`
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.tree
            .elements()
            .find(|&e| self.tree.get_attribute(e, "id") == Some(id))
    }

    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut DomTree {
        &mut self.tree
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new("about:blank")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skeleton() {
        let doc = Document::default();
        assert!(doc.body().is_valid());
        assert_eq!(doc.tree().tag_name(doc.document_element()), Some("html"));
        assert_eq!(doc.title(), "");
    }

    #[test]
    fn test_finalize_and_lookup() {
        let mut doc = Document::empty("https://example.test/feed");
        let tree = doc.tree_mut();
        let html = tree.create_element("html");
        let head = tree.create_element("head");
        let title = tree.create_element("title");
        let text = tree.create_text(" Feed ");
        let body = tree.create_element("body");
        let div = tree.create_element_with_attrs("div", &[("id", "main")]);
        tree.append_child(tree.root(), html).unwrap();
        tree.append_child(html, head).unwrap();
        tree.append_child(head, title).unwrap();
        tree.append_child(title, text).unwrap();
        tree.append_child(html, body).unwrap();
        tree.append_child(body, div).unwrap();

        doc.finalize();
        assert_eq!(doc.body(), body);
        assert_eq!(doc.title(), "Feed");
        assert_eq!(doc.get_element_by_id("main"), Some(div));
        assert_eq!(doc.get_element_by_id("nope"), None);
    }
}
