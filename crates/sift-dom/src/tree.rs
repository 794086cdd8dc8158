//! DOM Tree (arena-based allocation)

use crate::{DomError, ElementData, MutationRecord, Node, NodeId};

/// Arena-based DOM tree
///
/// Index 0 always holds the document node. Every observable write (child
/// list, attribute, class or style change) bumps `generation`, whether or
/// not the value actually changed, the way a live DOM fires a mutation for
/// every `setAttribute`.
#[derive(Debug)]
pub struct DomTree {
    nodes: Vec<Node>,
    generation: u64,
    observing: bool,
    records: Vec<MutationRecord>,
}

impl DomTree {
    /// Create a tree holding only the document node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::document()],
            generation: 0,
            observing: false,
            records: Vec::new(),
        }
    }

    /// Document node
    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    /// Number of nodes in the arena (attached or not)
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Only the document node exists
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Write counter
    pub fn generation(&self) -> u64 {
        self.generation
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Create a detached element
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push(Node::element(name))
    }

    /// Create a detached element with attributes
    pub fn create_element_with_attrs(&mut self, name: &str, attrs: &[(&str, &str)]) -> NodeId {
        let mut node = Node::element(name);
        if let Some(elem) = node.as_element_mut() {
            for (attr, value) in attrs {
                elem.set_attr(attr, value);
            }
        }
        self.push(node)
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(Node::text(text))
    }

    /// Create a detached comment node
    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.push(Node::comment(text))
    }

    /// Create a detached doctype node
    pub fn create_doctype(&mut self, name: &str) -> NodeId {
        self.push(Node {
            data: crate::NodeData::Doctype { name: name.to_string() },
            ..Node::document()
        })
    }

    /// Append `child` as the last child of `parent`, detaching it first
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.check(parent)?;
        self.check(child)?;
        if self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        if self.nodes[child.index()].parent.is_valid() {
            self.unlink(child);
        }

        let last = self.nodes[parent.index()].last_child;
        {
            let node = &mut self.nodes[child.index()];
            node.parent = parent;
            node.prev_sibling = last;
            node.next_sibling = NodeId::NONE;
        }
        if last.is_valid() {
            self.nodes[last.index()].next_sibling = child;
        } else {
            self.nodes[parent.index()].first_child = child;
        }
        self.nodes[parent.index()].last_child = child;

        self.generation += 1;
        if self.observing {
            self.records.push(MutationRecord::added(parent, child));
        }
        Ok(())
    }

    /// Remove a node (and its subtree) from its parent
    pub fn detach(&mut self, node: NodeId) -> Result<(), DomError> {
        self.check(node)?;
        let parent = self.nodes[node.index()].parent;
        if !parent.is_valid() {
            return Ok(());
        }
        self.unlink(node);
        self.generation += 1;
        if self.observing {
            self.records.push(MutationRecord::removed(parent, node));
        }
        Ok(())
    }

    fn unlink(&mut self, id: NodeId) {
        let (parent, prev, next) = {
            let node = &self.nodes[id.index()];
            (node.parent, node.prev_sibling, node.next_sibling)
        };
        if prev.is_valid() {
            self.nodes[prev.index()].next_sibling = next;
        } else if parent.is_valid() {
            self.nodes[parent.index()].first_child = next;
        }
        if next.is_valid() {
            self.nodes[next.index()].prev_sibling = prev;
        } else if parent.is_valid() {
            self.nodes[parent.index()].last_child = prev;
        }
        let node = &mut self.nodes[id.index()];
        node.parent = NodeId::NONE;
        node.prev_sibling = NodeId::NONE;
        node.next_sibling = NodeId::NONE;
    }

    fn check(&self, id: NodeId) -> Result<(), DomError> {
        if id.index() < self.nodes.len() {
            Ok(())
        } else {
            Err(DomError::NoSuchNode(id))
        }
    }

    // ------------------------------------------------------------------
    // Mutation journal
    // ------------------------------------------------------------------

    /// Start or stop recording child-list mutations
    pub fn observe(&mut self, enabled: bool) {
        self.observing = enabled;
        if !enabled && !self.records.is_empty() {
            tracing::debug!("Dropping {} undelivered mutation records", self.records.len());
            self.records.clear();
        }
    }

    /// Drain queued mutation records
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.records)
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// Iterate over children as `(id, node)` pairs
    pub fn children(&self, id: NodeId) -> Children<'_> {
        let next = self.get(id).map_or(NodeId::NONE, |n| n.first_child);
        Children { tree: self, next }
    }

    /// Iterate over element children
    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .filter(|(_, node)| node.is_element())
            .map(|(child, _)| child)
    }

    /// Parent node, if attached
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).map(|n| n.parent).filter(|p| p.is_valid())
    }

    /// Parent, if it is an element
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|&p| self.is_element(p))
    }

    /// Ancestors from parent up to the document node
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&p| self.parent(p))
    }

    /// Pre-order descendants, excluding `id` itself
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let next = self.get(id).map_or(NodeId::NONE, |n| n.first_child);
        Descendants { tree: self, root: id, next }
    }

    /// Element descendants of `id` in document order, excluding `id`
    pub fn descendant_elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.descendants(id).filter(move |&d| self.is_element(d))
    }

    /// All connected elements in document order
    pub fn elements(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.descendant_elements(NodeId::ROOT)
    }

    /// Previous sibling that is an element
    pub fn prev_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut cursor = self.get(id)?.prev_sibling;
        while cursor.is_valid() {
            if self.is_element(cursor) {
                return Some(cursor);
            }
            cursor = self.nodes[cursor.index()].prev_sibling;
        }
        None
    }

    /// Next sibling that is an element
    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut cursor = self.get(id)?.next_sibling;
        while cursor.is_valid() {
            if self.is_element(cursor) {
                return Some(cursor);
            }
            cursor = self.nodes[cursor.index()].next_sibling;
        }
        None
    }

    /// `ancestor == node` or `ancestor` contains `node`
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        ancestor == node || self.ancestors(node).any(|a| a == ancestor)
    }

    /// Attached to the document node
    pub fn is_connected(&self, id: NodeId) -> bool {
        id == NodeId::ROOT || self.ancestors(id).any(|a| a == NodeId::ROOT)
    }

    /// Child-index path from the document node; orders nodes in tree order
    pub fn tree_position(&self, id: NodeId) -> Vec<u32> {
        let mut path = Vec::new();
        let mut cursor = id;
        while let Some(parent) = self.parent(cursor) {
            let index = self
                .children(parent)
                .position(|(child, _)| child == cursor)
                .unwrap_or_default();
            path.push(index as u32);
            cursor = parent;
        }
        path.reverse();
        path
    }

    // ------------------------------------------------------------------
    // Element accessors
    // ------------------------------------------------------------------

    pub fn is_element(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(Node::is_element)
    }

    /// Element data
    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id).and_then(Node::as_element)
    }

    /// Lower-cased tag name
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.name.as_str())
    }

    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.get_attr(name))
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id).is_some_and(|e| e.has_class(class))
    }

    pub fn style_property(&self, id: NodeId, property: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.style().get_property(property))
    }

    // ------------------------------------------------------------------
    // Element writes
    // ------------------------------------------------------------------

    fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData, DomError> {
        let node = self.get_mut(id).ok_or(DomError::NoSuchNode(id))?;
        node.as_element_mut().ok_or(DomError::NotAnElement(id))
    }

    fn write<R>(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut ElementData) -> R,
    ) -> Result<R, DomError> {
        let result = f(self.element_mut(id)?);
        self.generation += 1;
        Ok(result)
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        self.write(id, |e| e.set_attr(name, value))
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<Option<String>, DomError> {
        self.write(id, |e| e.remove_attr(name))
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) -> Result<(), DomError> {
        self.write(id, |e| e.add_class(class))
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) -> Result<(), DomError> {
        self.write(id, |e| e.remove_class(class))
    }

    pub fn set_style_property(&mut self, id: NodeId, property: &str, value: &str) -> Result<(), DomError> {
        self.write(id, |e| e.set_style_property(property, value))
    }

    pub fn remove_style_property(&mut self, id: NodeId, property: &str) -> Result<Option<String>, DomError> {
        self.write(id, |e| e.remove_style_property(property))
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Child iterator
pub struct Children<'a> {
    tree: &'a DomTree,
    next: NodeId,
}

impl<'a> Iterator for Children<'a> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next;
        let node = self.tree.get(id)?;
        self.next = node.next_sibling;
        Some((id, node))
    }
}

/// Pre-order descendant iterator
pub struct Descendants<'a> {
    tree: &'a DomTree,
    root: NodeId,
    next: NodeId,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next;
        let node = self.tree.get(current)?;

        self.next = if node.first_child.is_valid() {
            node.first_child
        } else {
            let mut cursor = current;
            loop {
                if cursor == self.root {
                    break NodeId::NONE;
                }
                let Some(n) = self.tree.get(cursor) else {
                    break NodeId::NONE;
                };
                if n.next_sibling.is_valid() {
                    break n.next_sibling;
                }
                cursor = n.parent;
                if !cursor.is_valid() {
                    break NodeId::NONE;
                }
            }
        };
        Some(current)
    }
}
