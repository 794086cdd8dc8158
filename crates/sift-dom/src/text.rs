//! Text extraction
//!
//! `text_content` is the raw concatenation of descendant text nodes.
//! `rendered_text` approximates what a reader sees: hidden containers are
//! skipped, block elements and `<br>` break lines, and whitespace inside a
//! line collapses to single spaces.

use crate::{DomTree, NodeData, NodeId};

/// Elements whose content is never rendered
const SKIPPED: &[&str] = &["head", "noscript", "script", "style", "template", "title"];

/// Elements that start and end a line
const BLOCK: &[&str] = &[
    "address", "article", "aside", "blockquote", "caption", "dd", "details", "dialog", "div",
    "dl", "dt", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4",
    "h5", "h6", "header", "hgroup", "hr", "li", "main", "nav", "ol", "p", "pre", "section",
    "summary", "table", "tbody", "tfoot", "thead", "tr", "ul",
];

impl DomTree {
    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        if let Some(text) = self.get(id).and_then(|n| n.as_text()) {
            out.push_str(text);
        }
        for d in self.descendants(id) {
            if let Some(text) = self.get(d).and_then(|n| n.as_text()) {
                out.push_str(text);
            }
        }
        out
    }

    /// Human-visible text of a node, one rendered line per `\n`
    pub fn rendered_text(&self, id: NodeId) -> String {
        let mut raw = String::new();
        self.collect_rendered(id, &mut raw);

        raw.split('\n')
            .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn collect_rendered(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.get(id) else {
            return;
        };
        match &node.data {
            NodeData::Text(text) => {
                out.extend(text.chars().map(|c| if c.is_whitespace() { ' ' } else { c }));
            }
            NodeData::Element(elem) => {
                let tag = elem.name.as_str();
                if SKIPPED.contains(&tag) {
                    return;
                }
                if tag == "br" {
                    out.push('\n');
                    return;
                }
                let block = BLOCK.contains(&tag);
                if block {
                    out.push('\n');
                }
                for (child, _) in self.children(id) {
                    self.collect_rendered(child, out);
                }
                if block {
                    out.push('\n');
                } else if matches!(tag, "td" | "th") {
                    out.push(' ');
                }
            }
            NodeData::Document => {
                for (child, _) in self.children(id) {
                    self.collect_rendered(child, out);
                }
            }
            NodeData::Doctype { .. } | NodeData::Comment(_) => {}
        }
    }
}
