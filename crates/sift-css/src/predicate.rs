//! Text predicates (`:contains()` arguments)

use regex::Regex;

use crate::SelectorError;

/// How the predicate was written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    /// `"text"` or `'text'`: case-sensitive substring
    Literal,
    /// `/regex/`
    Regex,
}

/// Compiled boolean test over a node's rendered text
#[derive(Debug, Clone)]
pub struct TextPredicate {
    kind: PatternKind,
    /// Pattern after unescaping, before regex-escaping literals
    pattern: String,
    regex: Regex,
}

impl TextPredicate {
    /// Case-sensitive substring test
    pub fn literal(text: &str) -> Result<Self, SelectorError> {
        Self::build(PatternKind::Literal, text, &regex::escape(text))
    }

    /// Regular expression test (no flags)
    pub fn regex(pattern: &str) -> Result<Self, SelectorError> {
        Self::build(PatternKind::Regex, pattern, pattern)
    }

    fn build(kind: PatternKind, pattern: &str, expr: &str) -> Result<Self, SelectorError> {
        let regex = Regex::new(expr).map_err(|error| SelectorError::InvalidRegex {
            pattern: pattern.to_string(),
            error,
        })?;
        Ok(Self {
            kind,
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// Build from a raw delimited argument body.
    ///
    /// Quoted bodies drop backslash escapes; regex bodies only unescape `\/`
    /// so the remaining escapes reach the regex engine intact.
    pub(crate) fn from_delimited(delimiter: char, body: &str) -> Result<Self, SelectorError> {
        let mut out = String::with_capacity(body.len());
        let mut chars = body.chars();
        while let Some(c) = chars.next() {
            if c != '\\' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('/') if delimiter == '/' => out.push('/'),
                Some(next) if delimiter == '/' => {
                    out.push('\\');
                    out.push(next);
                }
                Some(next) => out.push(next),
                None => out.push('\\'),
            }
        }
        if delimiter == '/' {
            Self::regex(&out)
        } else {
            Self::literal(&out)
        }
    }

    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Test a string
    #[inline]
    pub fn test(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for TextPredicate {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.pattern == other.pattern
    }
}

impl std::fmt::Display for TextPredicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            PatternKind::Literal => write!(f, "{:?}", self.pattern),
            PatternKind::Regex => write!(f, "/{}/", self.pattern),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_is_escaped() {
        let p = TextPredicate::literal("a.b (c)").unwrap();
        assert!(p.test("x a.b (c) y"));
        assert!(!p.test("aXb (c)"));
        assert!(!p.test("A.B (C)"));
    }

    #[test]
    fn test_regex() {
        let p = TextPredicate::regex("^y").unwrap();
        assert!(p.test("yes"));
        assert!(!p.test("a yes"));
    }

    #[test]
    fn test_invalid_regex() {
        let err = TextPredicate::regex("(unclosed").unwrap_err();
        assert!(matches!(err, SelectorError::InvalidRegex { ref pattern, .. } if pattern == "(unclosed"));
    }

    #[test]
    fn test_delimited_unescape() {
        let p = TextPredicate::from_delimited('/', r"a\/b\d").unwrap();
        assert_eq!(p.pattern(), r"a/b\d");
        assert!(p.test("a/b7"));

        let q = TextPredicate::from_delimited('\'', r"it\'s").unwrap();
        assert_eq!(q.pattern(), "it's");
        assert_eq!(q.to_string(), "\"it's\"");
    }
}
