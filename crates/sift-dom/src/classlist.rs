//! DOMTokenList (classList)
//!
//! Ordered, duplicate-free class tokens of one element. The element keeps
//! the raw `class` attribute in sync after every change.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DOMTokenList {
    tokens: Vec<String>,
}

impl DOMTokenList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `class` attribute value; repeated tokens collapse
    pub fn from_string(s: &str) -> Self {
        let mut list = Self::new();
        list.add(&s.split_whitespace().collect::<Vec<_>>());
        list
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }

    /// Append tokens not already present; empty tokens are ignored
    pub fn add(&mut self, tokens: &[&str]) {
        for &token in tokens {
            if !token.is_empty() && !self.contains(token) {
                self.tokens.push(token.to_owned());
            }
        }
    }

    pub fn remove(&mut self, tokens: &[&str]) {
        self.tokens.retain(|t| !tokens.contains(&t.as_str()));
    }

    /// Serialized form, single-space separated
    pub fn value(&self) -> String {
        self.tokens.join(" ")
    }

    pub fn set_value(&mut self, value: &str) {
        *self = Self::from_string(value);
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }
}

impl std::fmt::Display for DOMTokenList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.value())
    }
}
