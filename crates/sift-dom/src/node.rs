//! DOM Node - Arena representation
//!
//! Nodes link to their relatives through `NodeId` indices instead of
//! pointers, so the whole tree lives in one `Vec`.

use crate::{DOMTokenList, InlineStyle, NodeId};

/// DOM Node - Core structure
#[derive(Debug)]
pub struct Node {
    /// Parent node (NONE if root or detached)
    pub parent: NodeId,
    /// First child
    pub first_child: NodeId,
    /// Last child (for O(1) append)
    pub last_child: NodeId,
    /// Previous sibling
    pub prev_sibling: NodeId,
    /// Next sibling
    pub next_sibling: NodeId,
    /// Node-specific data
    pub data: NodeData,
}

impl Node {
    fn with_data(data: NodeData) -> Self {
        Self {
            parent: NodeId::NONE,
            first_child: NodeId::NONE,
            last_child: NodeId::NONE,
            prev_sibling: NodeId::NONE,
            next_sibling: NodeId::NONE,
            data,
        }
    }

    /// Create a new element node
    pub fn element(name: &str) -> Self {
        Self::with_data(NodeData::Element(ElementData::new(name)))
    }

    /// Create a new text node
    pub fn text(content: impl Into<String>) -> Self {
        Self::with_data(NodeData::Text(content.into()))
    }

    /// Create a new comment node
    pub fn comment(content: impl Into<String>) -> Self {
        Self::with_data(NodeData::Comment(content.into()))
    }

    /// Create a document node
    pub fn document() -> Self {
        Self::with_data(NodeData::Document)
    }

    /// Check if this is an element
    #[inline]
    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(_))
    }

    /// Check if this is text
    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self.data, NodeData::Text(_))
    }

    /// Get element data if this is an element
    #[inline]
    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Get mutable element data
    #[inline]
    pub fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Get text content if this is a text node
    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match &self.data {
            NodeData::Text(t) => Some(t),
            _ => None,
        }
    }
}

/// Node-specific data
#[derive(Debug)]
pub enum NodeData {
    /// Document root
    Document,
    /// DOCTYPE
    Doctype { name: String },
    /// Element
    Element(ElementData),
    /// Text content
    Text(String),
    /// Comment
    Comment(String),
}

/// Attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Element-specific data
///
/// `class` and `style` are mirrored: the raw attribute stays in `attrs` so
/// attribute selectors see it, while `classes` and `style` hold the parsed
/// form. An emptied class list or style block drops its attribute.
#[derive(Debug)]
pub struct ElementData {
    /// Lower-cased local name
    pub name: String,
    attrs: Vec<Attribute>,
    classes: DOMTokenList,
    style: InlineStyle,
}

impl ElementData {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            attrs: Vec::new(),
            classes: DOMTokenList::new(),
            style: InlineStyle::new(),
        }
    }

    /// Get an attribute value
    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .map(|a| a.value.as_str())
    }

    /// Check attribute presence
    pub fn has_attr(&self, name: &str) -> bool {
        self.get_attr(name).is_some()
    }

    /// Set an attribute
    pub fn set_attr(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        match name.as_str() {
            "class" => self.classes.set_value(value),
            "style" => self.style = InlineStyle::parse(value),
            _ => {}
        }
        self.store_attr(name, value.to_string());
    }

    /// Remove an attribute, returning its old value
    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let pos = self
            .attrs
            .iter()
            .position(|a| a.name.eq_ignore_ascii_case(name))?;
        let removed = self.attrs.remove(pos);
        match removed.name.as_str() {
            "class" => self.classes = DOMTokenList::new(),
            "style" => self.style = InlineStyle::new(),
            _ => {}
        }
        Some(removed.value)
    }

    /// Iterate over attributes in insertion order
    pub fn attrs(&self) -> impl Iterator<Item = &Attribute> {
        self.attrs.iter()
    }

    /// Element id attribute
    pub fn id(&self) -> Option<&str> {
        self.get_attr("id")
    }

    /// Class list
    pub fn classes(&self) -> &DOMTokenList {
        &self.classes
    }

    /// Check for a class
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }

    /// Add a class token
    pub fn add_class(&mut self, class: &str) {
        self.classes.add(&[class]);
        self.sync_classes();
    }

    /// Remove a class token
    pub fn remove_class(&mut self, class: &str) {
        self.classes.remove(&[class]);
        self.sync_classes();
    }

    /// Inline style declarations
    pub fn style(&self) -> &InlineStyle {
        &self.style
    }

    /// Set an inline style property
    pub fn set_style_property(&mut self, property: &str, value: &str) {
        self.style.set_property(property, value);
        self.sync_style();
    }

    /// Remove an inline style property, returning its old value
    pub fn remove_style_property(&mut self, property: &str) -> Option<String> {
        let old = self.style.remove_property(property);
        self.sync_style();
        old
    }

    fn store_attr(&mut self, name: String, value: String) {
        if let Some(attr) = self.attrs.iter_mut().find(|a| a.name == name) {
            attr.value = value;
        } else {
            self.attrs.push(Attribute { name, value });
        }
    }

    fn drop_attr(&mut self, name: &str) {
        self.attrs.retain(|a| a.name != name);
    }

    fn sync_classes(&mut self) {
        if self.classes.is_empty() {
            self.drop_attr("class");
        } else {
            let value = self.classes.value();
            self.store_attr("class".to_string(), value);
        }
    }

    fn sync_style(&mut self) {
        if self.style.is_empty() {
            self.drop_attr("style");
        } else {
            let value = self.style.css_text();
            self.store_attr("style".to_string(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_attribute_mirrors_token_list() {
        let mut elem = ElementData::new("DIV");
        assert_eq!(elem.name, "div");

        elem.set_attr("class", "post  card");
        assert!(elem.has_class("post"));
        assert!(elem.has_class("card"));

        elem.add_class("hidden");
        assert_eq!(elem.get_attr("class"), Some("post card hidden"));

        elem.remove_class("post");
        elem.remove_class("card");
        elem.remove_class("hidden");
        assert_eq!(elem.get_attr("class"), None);
    }

    #[test]
    fn test_style_attribute_mirrors_declarations() {
        let mut elem = ElementData::new("span");
        elem.set_style_property("color", "#0078D4");
        assert_eq!(elem.get_attr("style"), Some("color: #0078D4;"));

        assert_eq!(elem.remove_style_property("color").as_deref(), Some("#0078D4"));
        assert!(!elem.has_attr("style"));
    }

    #[test]
    fn test_attribute_names_case_insensitive() {
        let mut elem = ElementData::new("a");
        elem.set_attr("ARIA-Label", "1,024 followers");
        assert_eq!(elem.get_attr("aria-label"), Some("1,024 followers"));
        assert_eq!(elem.remove_attr("aria-label").as_deref(), Some("1,024 followers"));
        assert!(elem.attrs().next().is_none());
    }
}
