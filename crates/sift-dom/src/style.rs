//! Inline style declarations (`style` attribute)

/// Ordered list of `property: value` declarations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineStyle {
    declarations: Vec<(String, String)>,
}

impl InlineStyle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `style` attribute value. Malformed declarations are skipped.
    pub fn parse(css: &str) -> Self {
        let mut style = Self::new();
        for decl in css.split(';') {
            let Some((prop, value)) = decl.split_once(':') else {
                continue;
            };
            let (prop, value) = (prop.trim(), value.trim());
            if !prop.is_empty() && !value.is_empty() {
                style.set_property(prop, value);
            }
        }
        style
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    /// Get a property value
    pub fn get_property(&self, property: &str) -> Option<&str> {
        self.declarations
            .iter()
            .find(|(p, _)| p.eq_ignore_ascii_case(property))
            .map(|(_, v)| v.as_str())
    }

    /// Set a property, keeping its position if already declared
    pub fn set_property(&mut self, property: &str, value: &str) {
        let property = property.to_ascii_lowercase();
        if let Some(slot) = self.declarations.iter_mut().find(|(p, _)| *p == property) {
            slot.1 = value.to_string();
        } else {
            self.declarations.push((property, value.to_string()));
        }
    }

    /// Remove a property, returning its old value
    pub fn remove_property(&mut self, property: &str) -> Option<String> {
        let pos = self
            .declarations
            .iter()
            .position(|(p, _)| p.eq_ignore_ascii_case(property))?;
        Some(self.declarations.remove(pos).1)
    }

    /// Serialize back to attribute text
    pub fn css_text(&self) -> String {
        self.declarations
            .iter()
            .map(|(p, v)| format!("{p}: {v};"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_serialize() {
        let style = InlineStyle::parse("color: red;  FONT-WEIGHT:bold; broken; :x");
        assert_eq!(style.len(), 2);
        assert_eq!(style.get_property("font-weight"), Some("bold"));
        assert_eq!(style.css_text(), "color: red; font-weight: bold;");
    }

    #[test]
    fn test_set_keeps_position() {
        let mut style = InlineStyle::parse("color: red; margin: 0");
        style.set_property("color", "#D32727");
        assert_eq!(style.css_text(), "color: #D32727; margin: 0;");
        assert_eq!(style.remove_property("margin").as_deref(), Some("0"));
        assert_eq!(style.remove_property("margin"), None);
    }
}
