//! Extended selector compiler
//!
//! Splits a selector that uses `:contains(pattern)` into a structural base
//! plus text predicates. `:has(...)` arguments that contain `:contains()`
//! become has-clauses: the `:contains()` tokens are stripped from the
//! argument (which stays in the base as a structural `:has()`), and each one
//! is paired with the stripped text that precedes it.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::selectors::{Combinator, SelectorList, SelectorParseError};
use crate::{EvaluationError, SelectorError, TextPredicate};

const CONTAINS: &str = ":contains(";
const HAS: &str = ":has(";

static EMPTY_LOGICAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i):(?:not|is|where)\(\s*\)").expect("static regex"));

/// One `(subSelector, predicate)` pair of a has-clause
#[derive(Debug, Clone)]
pub struct HasPredicate {
    sub_selector: String,
    structural: Result<SelectorList, SelectorParseError>,
    /// How the sub-selector reaches out from the candidate
    reach: Combinator,
    predicate: TextPredicate,
}

impl HasPredicate {
    fn new(sub_selector: String, predicate: TextPredicate) -> Self {
        // A leading combinator is relative to the candidate itself.
        let reach = match sub_selector.as_bytes().first() {
            Some(b'>') => Combinator::Child,
            Some(b'+') => Combinator::NextSibling,
            Some(b'~') => Combinator::SubsequentSibling,
            _ => Combinator::Descendant,
        };
        let query = if reach == Combinator::Descendant {
            sub_selector.clone()
        } else {
            format!(":scope {sub_selector}")
        };
        Self {
            structural: SelectorList::parse(&query),
            sub_selector,
            reach,
            predicate,
        }
    }

    /// Stripped `:has()` argument text preceding the `:contains()`
    pub fn sub_selector(&self) -> &str {
        &self.sub_selector
    }

    pub fn predicate(&self) -> &TextPredicate {
        &self.predicate
    }

    pub(crate) fn reach(&self) -> Combinator {
        self.reach
    }

    pub(crate) fn structural(&self) -> Result<&SelectorList, EvaluationError> {
        self.structural.as_ref().map_err(|err| EvaluationError {
            selector: self.sub_selector.clone(),
            source: err.clone(),
        })
    }
}

/// Pairs from one `:has(...)`; all must hold
#[derive(Debug, Clone)]
pub struct HasClause(pub(crate) Vec<HasPredicate>);

impl HasClause {
    pub fn pairs(&self) -> &[HasPredicate] {
        &self.0
    }
}

/// Immutable compiler output
#[derive(Debug, Clone)]
pub struct CompiledSelector {
    source: String,
    base: String,
    structural: Result<SelectorList, SelectorParseError>,
    has: Vec<HasClause>,
    contains: Vec<TextPredicate>,
}

impl CompiledSelector {
    fn new(source: &str, base: String, has: Vec<HasClause>, contains: Vec<TextPredicate>) -> Self {
        Self {
            source: source.to_string(),
            structural: SelectorList::parse(&base),
            base,
            has,
            contains,
        }
    }

    /// Selector text as written
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Structural selector text handed to the native matcher
    pub fn base(&self) -> &str {
        &self.base
    }

    /// `:has()` clauses carrying text predicates (OR'd)
    pub fn has_clauses(&self) -> &[HasClause] {
        &self.has
    }

    /// Top-level `:contains()` predicates (OR'd)
    pub fn contains_predicates(&self) -> &[TextPredicate] {
        &self.contains
    }

    /// No text predicates: matching is a pure structural query
    pub fn is_structural_only(&self) -> bool {
        self.has.is_empty() && self.contains.is_empty()
    }

    /// Parsed structural base
    pub fn structural(&self) -> Result<&SelectorList, EvaluationError> {
        self.structural.as_ref().map_err(|err| EvaluationError {
            selector: self.base.clone(),
            source: err.clone(),
        })
    }
}

/// Compile an extended selector
pub fn compile(source: &str) -> Result<CompiledSelector, SelectorError> {
    if !source.contains(CONTAINS) {
        return Ok(CompiledSelector::new(source, source.to_string(), Vec::new(), Vec::new()));
    }

    let bytes = source.as_bytes();
    let mut base = String::with_capacity(source.len());
    let mut has = Vec::new();
    let mut contains = Vec::new();
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => i = skip_quoted(bytes, i).unwrap_or(bytes.len()),
            b':' if starts_with_ignore_case(source, i, HAS) => {
                let (arg_start, close) = has_span(source, i)?;
                let arg = &source[arg_start..close];
                if arg.contains(CONTAINS) {
                    base.push_str(&source[copied..i]);
                    let (stripped, pairs) = strip_contains(arg, arg_start)?;
                    base.push_str(":has(");
                    base.push_str(if stripped.is_empty() { "*" } else { &stripped });
                    base.push(')');
                    has.push(HasClause(pairs));
                    copied = close + 1;
                }
                i = close + 1;
            }
            b':' if source[i..].starts_with(CONTAINS) => {
                base.push_str(&source[copied..i]);
                let (end, predicate) = parse_contains(source, i, 0)?;
                contains.push(predicate);
                i = end;
                copied = end;
            }
            _ => i += 1,
        }
    }
    base.push_str(&source[copied..]);

    let base = clean_base(&base);
    tracing::trace!(
        "compiled '{}' -> base '{}', {} has, {} contains",
        source,
        base,
        has.len(),
        contains.len()
    );
    Ok(CompiledSelector::new(source, base, has, contains))
}

fn starts_with_ignore_case(src: &str, at: usize, pat: &str) -> bool {
    src.as_bytes()
        .get(at..at + pat.len())
        .is_some_and(|s| s.eq_ignore_ascii_case(pat.as_bytes()))
}

/// Index just past a quoted string starting at `at`, if terminated
fn skip_quoted(bytes: &[u8], at: usize) -> Option<usize> {
    let quote = bytes[at];
    let mut j = at + 1;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 2,
            c if c == quote => return Some(j + 1),
            _ => j += 1,
        }
    }
    None
}

/// Parse `:contains(pattern)` at `at`, returning the index past `)`.
/// `origin` is added to offsets reported in errors.
fn parse_contains(
    src: &str,
    at: usize,
    origin: usize,
) -> Result<(usize, TextPredicate), SelectorError> {
    let bytes = src.as_bytes();
    let offset = origin + at;
    let skip_ws = |mut j: usize| {
        while bytes.get(j).is_some_and(u8::is_ascii_whitespace) {
            j += 1;
        }
        j
    };

    let open = skip_ws(at + CONTAINS.len());
    let delimiter = match bytes.get(open) {
        None => return Err(SelectorError::UnbalancedParens { offset }),
        Some(&d @ (b'"' | b'\'' | b'/')) => d,
        Some(_) => return Err(SelectorError::UnquotedPattern { offset }),
    };

    let body_start = open + 1;
    let mut j = body_start;
    loop {
        match bytes.get(j) {
            None => return Err(SelectorError::UnterminatedLiteral { offset }),
            Some(b'\\') => j += 2,
            Some(&c) if c == delimiter => break,
            Some(_) => j += 1,
        }
    }
    let body = &src[body_start..j];

    let close = skip_ws(j + 1);
    if bytes.get(close) != Some(&b')') {
        return Err(SelectorError::UnbalancedParens { offset });
    }

    let predicate = TextPredicate::from_delimited(delimiter as char, body)?;
    Ok((close + 1, predicate))
}

/// Locate the argument of `:has(` at `at`: `(start, index of closing paren)`
fn has_span(src: &str, at: usize) -> Result<(usize, usize), SelectorError> {
    let bytes = src.as_bytes();
    let start = at + HAS.len();
    let mut depth = 0usize;
    let mut i = start;

    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                i = skip_quoted(bytes, i).ok_or(SelectorError::UnterminatedLiteral { offset: i })?;
            }
            b':' if src[i..].starts_with(CONTAINS) => i = parse_contains(src, i, 0)?.0,
            b'(' => {
                depth += 1;
                i += 1;
            }
            b')' if depth == 0 => return Ok((start, i)),
            b')' => {
                depth -= 1;
                i += 1;
            }
            _ => i += 1,
        }
    }
    Err(SelectorError::UnbalancedParens { offset: at })
}

/// Remove `:contains()` tokens from a `:has()` argument
fn strip_contains(arg: &str, origin: usize) -> Result<(String, Vec<HasPredicate>), SelectorError> {
    let bytes = arg.as_bytes();
    let mut stripped = String::with_capacity(arg.len());
    let mut pairs = Vec::new();
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => i = skip_quoted(bytes, i).unwrap_or(bytes.len()),
            b':' if arg[i..].starts_with(CONTAINS) => {
                stripped.push_str(&arg[copied..i]);
                let (end, predicate) = parse_contains(arg, i, origin)?;
                let sub = stripped.trim();
                let sub = if sub.is_empty() { "*" } else { sub };
                pairs.push(HasPredicate::new(sub.to_string(), predicate));
                i = end;
                copied = end;
            }
            _ => i += 1,
        }
    }
    stripped.push_str(&arg[copied..]);
    Ok((stripped.trim().to_string(), pairs))
}

/// Tidy the residual base after `:contains()` removal
fn clean_base(base: &str) -> String {
    let mut text = base.to_string();
    loop {
        let next = EMPTY_LOGICAL.replace_all(&text, "").into_owned();
        if next == text {
            break;
        }
        text = next;
    }

    split_top_level(&text)
        .into_iter()
        .map(clean_segment)
        .collect::<Vec<_>>()
        .join(", ")
}

fn clean_segment(segment: &str) -> String {
    let collapsed = collapse_whitespace(segment.trim());
    if collapsed.is_empty() {
        return "*".to_string();
    }
    let mut out = collapsed;
    if out.starts_with(['>', '+', '~']) {
        out.insert_str(0, "* ");
    }
    if out.ends_with(['>', '+', '~']) {
        out.push_str(" *");
    }
    out
}

/// Split on commas outside parentheses, brackets and quotes
fn split_top_level(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                i = skip_quoted(bytes, i).unwrap_or(bytes.len());
                continue;
            }
            b'(' | b'[' => depth += 1,
            b')' | b']' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    parts.push(&text[start..]);
    parts
}

/// Collapse whitespace runs outside quotes to one space
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut quote = None;
    let mut escaped = false;
    let mut pending_space = false;
    for c in text.chars() {
        if let Some(q) = quote {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        if c == '"' || c == '\'' {
            quote = Some(c);
        }
        out.push(c);
    }
    out
}

/// Compile cache keyed by source string
///
/// Only successful compilations are cached; a selector whose structural
/// base does not parse is still cached, its error surfaces on every match.
#[derive(Debug, Default)]
pub struct SelectorCompiler {
    cache: HashMap<String, Arc<CompiledSelector>>,
}

impl SelectorCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `source`, reusing a cached result when present
    pub fn compile(&mut self, source: &str) -> Result<Arc<CompiledSelector>, SelectorError> {
        if let Some(hit) = self.cache.get(source) {
            return Ok(Arc::clone(hit));
        }
        let compiled = Arc::new(compile(source)?);
        if let Err(err) = compiled.structural() {
            tracing::debug!("structural base will not evaluate: {}", err);
        }
        self.cache.insert(source.to_string(), Arc::clone(&compiled));
        Ok(compiled)
    }

    /// Number of cached selectors
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }
}
