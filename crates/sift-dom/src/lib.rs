//! sift DOM - Document Object Model
//!
//! Arena-backed document tree. The classification engine never creates,
//! removes or reparents nodes; it only annotates elements with classes,
//! inline style overrides and attributes.

mod classlist;
mod document;
mod node;
mod observer;
mod style;
mod text;
mod tree;

pub use classlist::DOMTokenList;
pub use document::Document;
pub use node::{Attribute, ElementData, Node, NodeData};
pub use observer::MutationRecord;
pub use style::InlineStyle;
pub use tree::{Children, Descendants, DomTree};

use std::fmt;

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Root (document) node ID
    pub const ROOT: NodeId = NodeId(0);

    /// Sentinel for "no node"
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Check that this is not the NONE sentinel
    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::NONE
    }

    /// Arena index
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "#{}", self.0)
        } else {
            f.write_str("#none")
        }
    }
}

/// DOM operation error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("node {0} does not exist")]
    NoSuchNode(NodeId),

    #[error("node {0} is not an element")]
    NotAnElement(NodeId),

    #[error("cannot insert {child} under {parent}: {child} is an inclusive ancestor")]
    HierarchyRequest { parent: NodeId, child: NodeId },
}
