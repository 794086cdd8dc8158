//! sift HTML Parser
//!
//! HTML5 parsing built on html5ever. Documents are parsed into a fresh
//! arena; fragments are grafted under an existing element so the new
//! subtree roots can be handed to the classifier as a change batch.

mod parser;

pub use parser::HtmlParser;
pub use sift_dom::{Document, DomTree, NodeId};

/// Parse an HTML string into a Document
pub fn parse(html: &str) -> Document {
    HtmlParser::new().parse(html)
}

/// Parse error
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("fragment parent {0} is not an element in this tree")]
    InvalidParent(NodeId),

    #[error(transparent)]
    Dom(#[from] sift_dom::DomError),
}
