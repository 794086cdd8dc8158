//! HTML5 Parser implementation
//!
//! Uses html5ever's RcDom and converts it into the arena tree.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};
use sift_dom::{Document, DomError, DomTree, NodeId};

use crate::ParseError;

/// HTML5 parser
pub struct HtmlParser;

impl HtmlParser {
    /// Create a new HTML parser
    pub fn new() -> Self {
        Self
    }

    /// Parse HTML string into a Document
    pub fn parse(&self, html: &str) -> Document {
        self.parse_with_url(html, "about:blank")
    }

    /// Parse HTML with a base URL
    pub fn parse_with_url(&self, html: &str, url: &str) -> Document {
        tracing::debug!("Parsing HTML document: {}", url);

        let dom = parse_document(RcDom::default(), Default::default()).one(html);

        let mut document = Document::empty(url);
        for child in dom.document.children.borrow().iter() {
            // The arena only rejects cycles, which fresh nodes cannot form.
            if let Err(err) = self.convert_node(child, document.tree_mut(), NodeId::ROOT) {
                tracing::warn!("dropping node during conversion: {}", err);
            }
        }
        document.finalize();

        tracing::debug!("Parsed {} nodes", document.tree().len());
        document
    }

    /// Parse `html` as body content and append it under `parent`.
    ///
    /// Returns the top-level nodes that were appended, in order.
    pub fn parse_fragment_into(
        &self,
        tree: &mut DomTree,
        parent: NodeId,
        html: &str,
    ) -> Result<Vec<NodeId>, ParseError> {
        if !tree.is_element(parent) {
            return Err(ParseError::InvalidParent(parent));
        }

        let dom = parse_document(RcDom::default(), Default::default()).one(html);
        let Some(body) = find_body(&dom.document) else {
            return Ok(Vec::new());
        };

        let mut roots = Vec::new();
        for child in body.children.borrow().iter() {
            if let Some(id) = self.convert_node(child, tree, parent)? {
                roots.push(id);
            }
        }
        tracing::debug!("Appended {} fragment roots under {}", roots.len(), parent);
        Ok(roots)
    }

    /// Convert an RcDom node (and its subtree) and append it to `parent`
    fn convert_node(
        &self,
        handle: &Handle,
        tree: &mut DomTree,
        parent: NodeId,
    ) -> Result<Option<NodeId>, DomError> {
        let id = match &handle.data {
            RcNodeData::Document => {
                for child in handle.children.borrow().iter() {
                    self.convert_node(child, tree, parent)?;
                }
                return Ok(None);
            }
            RcNodeData::Doctype { name, .. } => tree.create_doctype(name),
            RcNodeData::Text { contents } => {
                // Whitespace-only text is kept: it separates inline words.
                let text = contents.borrow();
                tree.create_text(&text)
            }
            RcNodeData::Comment { contents } => tree.create_comment(contents),
            RcNodeData::Element { name, attrs, .. } => {
                let attrs: Vec<(String, String)> = attrs
                    .borrow()
                    .iter()
                    .map(|a| (a.name.local.to_string(), a.value.to_string()))
                    .collect();
                let pairs: Vec<(&str, &str)> =
                    attrs.iter().map(|(n, v)| (n.as_str(), v.as_str())).collect();
                let id = tree.create_element_with_attrs(&name.local, &pairs);
                tree.append_child(parent, id)?;

                for child in handle.children.borrow().iter() {
                    self.convert_node(child, tree, id)?;
                }
                return Ok(Some(id));
            }
            RcNodeData::ProcessingInstruction { .. } => return Ok(None),
        };
        tree.append_child(parent, id)?;
        Ok(Some(id))
    }
}

impl Default for HtmlParser {
    fn default() -> Self {
        Self::new()
    }
}

fn find_body(document: &Handle) -> Option<Handle> {
    let element_named = |handle: &Handle, tag: &str| {
        handle
            .children
            .borrow()
            .iter()
            .find(|c| matches!(&c.data, RcNodeData::Element { name, .. } if &*name.local == tag))
            .cloned()
    };
    let html = element_named(document, "html")?;
    element_named(&html, "body")
}
