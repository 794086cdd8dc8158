//! Structural selector engine
//!
//! Parses selector lists into compound selectors joined by combinators and
//! matches them right-to-left against the arena tree. Only tree-structural
//! and logical pseudo-classes are understood; anything that depends on user
//! interaction or rendering state is rejected at parse time.

use sift_dom::{DomTree, NodeData, NodeId};

/// Selector parse failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorParseError {
    #[error("empty selector")]
    Empty,

    #[error("unexpected end of selector")]
    UnexpectedEnd,

    #[error("unexpected '{ch}' at offset {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("unsupported pseudo-class ':{0}'")]
    UnsupportedPseudo(String),

    #[error("pseudo-elements are not supported")]
    PseudoElement,

    #[error("invalid An+B expression '{0}'")]
    InvalidNth(String),
}

/// Comma-separated selector list
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorList(pub Vec<ComplexSelector>);

/// Compound selectors joined by combinators, stored left-to-right
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexSelector {
    pub compounds: Vec<CompoundSelector>,
    /// `combinators[i]` sits between `compounds[i]` and `compounds[i + 1]`
    pub combinators: Vec<Combinator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// `a b`
    Descendant,
    /// `a > b`
    Child,
    /// `a + b`
    NextSibling,
    /// `a ~ b`
    SubsequentSibling,
}

/// Sequence of simple selectors that all apply to one element
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundSelector(pub Vec<SelectorComponent>);

/// A component of a selector
#[derive(Debug, Clone, PartialEq)]
pub enum SelectorComponent {
    /// Universal selector *
    Universal,
    /// Type selector (lower-cased tag name)
    Type(String),
    /// ID selector #id
    Id(String),
    /// Class selector .class
    Class(String),
    /// Attribute selector [attr], [attr=value], etc.
    Attribute(AttributeSelector),
    /// Pseudo-class :first-child, :has(), etc.
    PseudoClass(PseudoClass),
}

/// Pseudo-class type
#[derive(Debug, Clone, PartialEq)]
pub enum PseudoClass {
    // Tree-structural pseudo-classes
    Root,
    Scope,
    Empty,
    FirstChild,
    LastChild,
    OnlyChild,
    FirstOfType,
    LastOfType,
    OnlyOfType,
    NthChild(NthExpression),
    NthLastChild(NthExpression),
    NthOfType(NthExpression),
    NthLastOfType(NthExpression),

    // Logical pseudo-classes
    Not(SelectorList),
    Is(SelectorList),
    Where(SelectorList),
    Has(Vec<RelativeSelector>),
}

/// `:has()` argument
///
/// Stored as a complex selector whose leftmost compound is `:scope`, so
/// matching is an ordinary right-to-left match with the `:has()` subject as
/// the scope element.
#[derive(Debug, Clone, PartialEq)]
pub struct RelativeSelector {
    pub combinator: Combinator,
    pub selector: ComplexSelector,
}

/// An+B expression for :nth-* selectors
#[derive(Debug, Clone, PartialEq)]
pub struct NthExpression {
    /// Coefficient (A in An+B)
    pub a: i32,
    /// Offset (B in An+B)
    pub b: i32,
}

impl NthExpression {
    /// Create "odd" expression (2n+1)
    pub fn odd() -> Self {
        Self { a: 2, b: 1 }
    }

    /// Create "even" expression (2n)
    pub fn even() -> Self {
        Self { a: 2, b: 0 }
    }

    /// Create a simple index (0n+b)
    pub fn index(n: i32) -> Self {
        Self { a: 0, b: n }
    }

    /// Create An+B expression
    pub fn new(a: i32, b: i32) -> Self {
        Self { a, b }
    }

    /// Parse from string like "2n+1", "odd", "even", "3"
    pub fn parse(s: &str) -> Option<Self> {
        let s: String = s.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_lowercase();

        match s.as_str() {
            "odd" => return Some(Self::odd()),
            "even" => return Some(Self::even()),
            _ => {}
        }

        if let Ok(n) = s.parse::<i32>() {
            return Some(Self::index(n));
        }

        let n_pos = s.find('n')?;
        let a = match &s[..n_pos] {
            "" | "+" => 1,
            "-" => -1,
            a => a.parse().ok()?,
        };
        let rest = &s[n_pos + 1..];
        let b = if rest.is_empty() {
            0
        } else if rest.starts_with(['+', '-']) {
            rest.parse().ok()?
        } else {
            return None;
        };
        Some(Self::new(a, b))
    }

    /// Check if index n (1-based) matches this expression
    pub fn matches(&self, n: i32) -> bool {
        if self.a == 0 {
            return n == self.b;
        }

        let diff = n - self.b;
        if self.a > 0 {
            diff >= 0 && diff % self.a == 0
        } else {
            diff <= 0 && diff % self.a == 0
        }
    }
}

/// Attribute selector
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSelector {
    pub name: String,
    pub matcher: Option<AttributeMatcher>,
    pub case_insensitive: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeMatcher {
    /// [attr=value] - exact match
    Exact(String),
    /// [attr~=value] - whitespace-separated list contains
    Contains(String),
    /// [attr|=value] - exact or prefix with hyphen
    DashMatch(String),
    /// [attr^=value] - starts with
    Prefix(String),
    /// [attr$=value] - ends with
    Suffix(String),
    /// [attr*=value] - contains substring
    Substring(String),
}

impl AttributeSelector {
    /// Check if an attribute value matches
    pub fn matches(&self, value: Option<&str>) -> bool {
        let (Some(matcher), Some(val)) = (&self.matcher, value) else {
            return self.matcher.is_none() && value.is_some();
        };

        let fold = |s: &str| {
            if self.case_insensitive {
                s.to_lowercase()
            } else {
                s.to_string()
            }
        };
        let val = fold(val);

        match matcher {
            AttributeMatcher::Exact(expected) => val == fold(expected),
            AttributeMatcher::Contains(expected) => {
                let expected = fold(expected);
                !expected.is_empty()
                    && !expected.contains(char::is_whitespace)
                    && val.split_whitespace().any(|w| w == expected)
            }
            AttributeMatcher::DashMatch(expected) => {
                let expected = fold(expected);
                val == expected || val.starts_with(&format!("{expected}-"))
            }
            AttributeMatcher::Prefix(expected) => {
                !expected.is_empty() && val.starts_with(&fold(expected))
            }
            AttributeMatcher::Suffix(expected) => {
                !expected.is_empty() && val.ends_with(&fold(expected))
            }
            AttributeMatcher::Substring(expected) => {
                !expected.is_empty() && val.contains(&fold(expected))
            }
        }
    }
}

// ============================================================================
// Parsing
// ============================================================================

impl SelectorList {
    /// Parse a selector list
    pub fn parse(input: &str) -> Result<Self, SelectorParseError> {
        if input.trim().is_empty() {
            return Err(SelectorParseError::Empty);
        }
        let mut parser = Parser { input, pos: 0 };
        let list = parser.parse_list()?;
        parser.skip_ws();
        match parser.peek() {
            None => Ok(list),
            Some(ch) => Err(SelectorParseError::UnexpectedChar { ch, pos: parser.pos }),
        }
    }
}

impl std::str::FromStr for SelectorList {
    type Err = SelectorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '-' || c == '\\' || !c.is_ascii()
}

fn is_ident_char(c: char) -> bool {
    is_ident_start(c) || c.is_ascii_digit()
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn unexpected(&self) -> SelectorParseError {
        match self.peek() {
            Some(ch) => SelectorParseError::UnexpectedChar { ch, pos: self.pos },
            None => SelectorParseError::UnexpectedEnd,
        }
    }

    fn expect(&mut self, want: char) -> Result<(), SelectorParseError> {
        if self.peek() == Some(want) {
            self.pos += want.len_utf8();
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    /// Skip whitespace, reporting whether any was consumed
    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
        self.pos != start
    }

    fn parse_list(&mut self) -> Result<SelectorList, SelectorParseError> {
        let mut selectors = vec![self.parse_complex()?];
        loop {
            self.skip_ws();
            if self.peek() != Some(',') {
                break;
            }
            self.bump();
            selectors.push(self.parse_complex()?);
        }
        Ok(SelectorList(selectors))
    }

    fn parse_combinator(&mut self) -> Option<Combinator> {
        let combinator = match self.peek()? {
            '>' => Combinator::Child,
            '+' => Combinator::NextSibling,
            '~' => Combinator::SubsequentSibling,
            _ => return None,
        };
        self.bump();
        Some(combinator)
    }

    fn parse_complex(&mut self) -> Result<ComplexSelector, SelectorParseError> {
        self.skip_ws();
        let mut compounds = vec![self.parse_compound()?];
        let mut combinators = Vec::new();
        loop {
            let had_ws = self.skip_ws();
            let combinator = match self.peek() {
                None | Some(',') | Some(')') => break,
                _ => match self.parse_combinator() {
                    Some(c) => c,
                    None if had_ws => Combinator::Descendant,
                    None => return Err(self.unexpected()),
                },
            };
            self.skip_ws();
            compounds.push(self.parse_compound()?);
            combinators.push(combinator);
        }
        Ok(ComplexSelector { compounds, combinators })
    }

    fn parse_relative(&mut self) -> Result<RelativeSelector, SelectorParseError> {
        self.skip_ws();
        let combinator = self.parse_combinator().unwrap_or(Combinator::Descendant);
        let inner = self.parse_complex()?;

        let mut compounds = vec![CompoundSelector(vec![SelectorComponent::PseudoClass(
            PseudoClass::Scope,
        )])];
        compounds.extend(inner.compounds);
        let mut combinators = vec![combinator];
        combinators.extend(inner.combinators);

        Ok(RelativeSelector {
            combinator,
            selector: ComplexSelector { compounds, combinators },
        })
    }

    fn parse_compound(&mut self) -> Result<CompoundSelector, SelectorParseError> {
        let mut components = Vec::new();
        loop {
            let Some(c) = self.peek() else { break };
            let component = match c {
                '*' if components.is_empty() => {
                    self.bump();
                    SelectorComponent::Universal
                }
                c if is_ident_start(c) && components.is_empty() => {
                    SelectorComponent::Type(self.parse_ident()?.to_ascii_lowercase())
                }
                '#' => {
                    self.bump();
                    SelectorComponent::Id(self.parse_ident()?)
                }
                '.' => {
                    self.bump();
                    SelectorComponent::Class(self.parse_ident()?)
                }
                '[' => SelectorComponent::Attribute(self.parse_attribute()?),
                ':' => SelectorComponent::PseudoClass(self.parse_pseudo()?),
                _ => break,
            };
            components.push(component);
        }
        if components.is_empty() {
            return Err(self.unexpected());
        }
        Ok(CompoundSelector(components))
    }

    fn parse_ident(&mut self) -> Result<String, SelectorParseError> {
        let mut ident = String::new();
        while let Some(c) = self.peek() {
            if !is_ident_char(c) {
                break;
            }
            self.bump();
            if c == '\\' {
                ident.push(self.bump().ok_or(SelectorParseError::UnexpectedEnd)?);
            } else {
                ident.push(c);
            }
        }
        if ident.is_empty() {
            return Err(self.unexpected());
        }
        Ok(ident)
    }

    fn parse_string(&mut self) -> Result<String, SelectorParseError> {
        let Some(quote) = self.bump() else {
            return Err(SelectorParseError::UnexpectedEnd);
        };
        let mut value = String::new();
        loop {
            match self.bump() {
                None => return Err(SelectorParseError::UnexpectedEnd),
                Some('\\') => value.push(self.bump().ok_or(SelectorParseError::UnexpectedEnd)?),
                Some(c) if c == quote => return Ok(value),
                Some(c) => value.push(c),
            }
        }
    }

    fn parse_attribute(&mut self) -> Result<AttributeSelector, SelectorParseError> {
        self.expect('[')?;
        self.skip_ws();
        let name = self.parse_ident()?.to_ascii_lowercase();
        self.skip_ws();

        let op = match self.peek() {
            Some(']') => None,
            Some('=') => {
                self.bump();
                Some('=')
            }
            Some(c @ ('~' | '|' | '^' | '$' | '*')) => {
                self.bump();
                self.expect('=')?;
                Some(c)
            }
            _ => return Err(self.unexpected()),
        };

        let mut case_insensitive = false;
        let matcher = match op {
            None => None,
            Some(op) => {
                self.skip_ws();
                let value = match self.peek() {
                    Some('"' | '\'') => self.parse_string()?,
                    _ => self.parse_value_ident()?,
                };
                self.skip_ws();
                if let Some(flag @ ('i' | 'I' | 's' | 'S')) = self.peek() {
                    self.bump();
                    case_insensitive = flag.eq_ignore_ascii_case(&'i');
                    self.skip_ws();
                }
                Some(match op {
                    '=' => AttributeMatcher::Exact(value),
                    '~' => AttributeMatcher::Contains(value),
                    '|' => AttributeMatcher::DashMatch(value),
                    '^' => AttributeMatcher::Prefix(value),
                    '$' => AttributeMatcher::Suffix(value),
                    _ => AttributeMatcher::Substring(value),
                })
            }
        };
        self.expect(']')?;

        Ok(AttributeSelector { name, matcher, case_insensitive })
    }

    /// Unquoted attribute value; digits may lead
    fn parse_value_ident(&mut self) -> Result<String, SelectorParseError> {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.bump();
        }
        if self.pos == start {
            return Err(self.unexpected());
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn parse_pseudo(&mut self) -> Result<PseudoClass, SelectorParseError> {
        self.expect(':')?;
        if self.peek() == Some(':') {
            return Err(SelectorParseError::PseudoElement);
        }
        let name = self.parse_ident()?.to_ascii_lowercase();

        if self.peek() != Some('(') {
            return Ok(match name.as_str() {
                "root" => PseudoClass::Root,
                "scope" => PseudoClass::Scope,
                "empty" => PseudoClass::Empty,
                "first-child" => PseudoClass::FirstChild,
                "last-child" => PseudoClass::LastChild,
                "only-child" => PseudoClass::OnlyChild,
                "first-of-type" => PseudoClass::FirstOfType,
                "last-of-type" => PseudoClass::LastOfType,
                "only-of-type" => PseudoClass::OnlyOfType,
                "before" | "after" | "first-line" | "first-letter" => {
                    return Err(SelectorParseError::PseudoElement);
                }
                _ => return Err(SelectorParseError::UnsupportedPseudo(name)),
            });
        }

        self.bump();
        let pseudo = match name.as_str() {
            "not" => PseudoClass::Not(self.parse_list()?),
            "is" | "matches" => PseudoClass::Is(self.parse_list()?),
            "where" => PseudoClass::Where(self.parse_list()?),
            "has" => {
                let mut relative = vec![self.parse_relative()?];
                loop {
                    self.skip_ws();
                    if self.peek() != Some(',') {
                        break;
                    }
                    self.bump();
                    relative.push(self.parse_relative()?);
                }
                PseudoClass::Has(relative)
            }
            "nth-child" | "nth-last-child" | "nth-of-type" | "nth-last-of-type" => {
                let start = self.pos;
                while self.peek().is_some_and(|c| c != ')') {
                    self.bump();
                }
                let raw = &self.input[start..self.pos];
                let expr = NthExpression::parse(raw)
                    .ok_or_else(|| SelectorParseError::InvalidNth(raw.trim().to_string()))?;
                match name.as_str() {
                    "nth-child" => PseudoClass::NthChild(expr),
                    "nth-last-child" => PseudoClass::NthLastChild(expr),
                    "nth-of-type" => PseudoClass::NthOfType(expr),
                    _ => PseudoClass::NthLastOfType(expr),
                }
            }
            _ => return Err(SelectorParseError::UnsupportedPseudo(name)),
        };
        self.skip_ws();
        self.expect(')')?;
        Ok(pseudo)
    }
}

// ============================================================================
// Matching
// ============================================================================

/// Tree and scoping element for a match
#[derive(Clone, Copy)]
pub struct MatchContext<'a> {
    pub tree: &'a DomTree,
    /// Element `:scope` refers to; `None` makes `:scope` behave as `:root`
    pub scope: Option<NodeId>,
}

impl<'a> MatchContext<'a> {
    pub fn new(tree: &'a DomTree) -> Self {
        Self { tree, scope: None }
    }

    pub fn scoped(tree: &'a DomTree, scope: NodeId) -> Self {
        Self { tree, scope: Some(scope) }
    }
}

impl SelectorList {
    /// Check whether `element` matches any selector in the list
    pub fn matches(&self, element: NodeId, ctx: MatchContext<'_>) -> bool {
        ctx.tree.is_element(element) && self.0.iter().any(|c| c.matches(element, ctx))
    }

    /// Elements strictly inside `root` that match, in document order
    pub fn query_selector_all(&self, tree: &DomTree, root: NodeId) -> Vec<NodeId> {
        let ctx = MatchContext {
            tree,
            scope: tree.is_element(root).then_some(root),
        };
        tree.descendant_elements(root)
            .filter(|&el| self.matches(el, ctx))
            .collect()
    }

    /// Matching elements a relative query from `anchor` reaches through
    /// `combinator`, with `:scope` bound to `anchor`
    pub fn query_relative(&self, tree: &DomTree, anchor: NodeId, combinator: Combinator) -> Vec<NodeId> {
        let ctx = MatchContext::scoped(tree, anchor);
        has_candidates(tree, anchor, combinator)
            .into_iter()
            .filter(|&el| self.matches(el, ctx))
            .collect()
    }

    /// First matching element strictly inside `root`
    pub fn query_selector(&self, tree: &DomTree, root: NodeId) -> Option<NodeId> {
        let ctx = MatchContext {
            tree,
            scope: tree.is_element(root).then_some(root),
        };
        tree.descendant_elements(root).find(|&el| self.matches(el, ctx))
    }
}

impl ComplexSelector {
    pub fn matches(&self, element: NodeId, ctx: MatchContext<'_>) -> bool {
        match self.compounds.len() {
            0 => false,
            n => self.match_from(n - 1, element, ctx),
        }
    }

    fn match_from(&self, idx: usize, element: NodeId, ctx: MatchContext<'_>) -> bool {
        if !self.compounds[idx].matches(element, ctx) {
            return false;
        }
        if idx == 0 {
            return true;
        }

        let tree = ctx.tree;
        let next = idx - 1;
        match self.combinators[next] {
            Combinator::Child => tree
                .parent_element(element)
                .is_some_and(|p| self.match_from(next, p, ctx)),
            Combinator::Descendant => tree
                .ancestors(element)
                .filter(|&a| tree.is_element(a))
                .any(|a| self.match_from(next, a, ctx)),
            Combinator::NextSibling => tree
                .prev_element_sibling(element)
                .is_some_and(|s| self.match_from(next, s, ctx)),
            Combinator::SubsequentSibling => {
                std::iter::successors(tree.prev_element_sibling(element), |&s| {
                    tree.prev_element_sibling(s)
                })
                .any(|s| self.match_from(next, s, ctx))
            }
        }
    }
}

impl CompoundSelector {
    pub fn matches(&self, element: NodeId, ctx: MatchContext<'_>) -> bool {
        self.0.iter().all(|c| c.matches(element, ctx))
    }
}

impl SelectorComponent {
    /// Match a selector component against an element
    pub fn matches(&self, element: NodeId, ctx: MatchContext<'_>) -> bool {
        let tree = ctx.tree;
        match self {
            SelectorComponent::Universal => true,
            SelectorComponent::Type(tag) => tree.tag_name(element) == Some(tag.as_str()),
            SelectorComponent::Id(id) => tree.get_attribute(element, "id") == Some(id.as_str()),
            SelectorComponent::Class(class) => tree.has_class(element, class),
            SelectorComponent::Attribute(attr) => {
                attr.matches(tree.get_attribute(element, &attr.name))
            }
            SelectorComponent::PseudoClass(pseudo) => pseudo.matches(element, ctx),
        }
    }
}

/// 1-based position of `element` among its element siblings, and the count
fn sibling_position(tree: &DomTree, element: NodeId, same_type: bool) -> (usize, usize) {
    let tag = tree.tag_name(element);
    let Some(parent) = tree.parent(element) else {
        return (1, 1);
    };
    let mut index = 0;
    let mut count = 0;
    for sibling in tree.element_children(parent) {
        if same_type && tree.tag_name(sibling) != tag {
            continue;
        }
        count += 1;
        if sibling == element {
            index = count;
        }
    }
    (index, count)
}

impl PseudoClass {
    /// Match a pseudo-class against an element
    pub fn matches(&self, element: NodeId, ctx: MatchContext<'_>) -> bool {
        let tree = ctx.tree;
        let position = |same_type| sibling_position(tree, element, same_type);
        match self {
            PseudoClass::Root => tree.parent(element) == Some(tree.root()),
            PseudoClass::Scope => match ctx.scope {
                Some(scope) => scope == element,
                None => tree.parent(element) == Some(tree.root()),
            },
            PseudoClass::Empty => tree.children(element).all(|(_, child)| match &child.data {
                NodeData::Text(text) => text.is_empty(),
                NodeData::Comment(_) => true,
                _ => false,
            }),
            PseudoClass::FirstChild => position(false).0 == 1,
            PseudoClass::LastChild => {
                let (index, count) = position(false);
                index == count
            }
            PseudoClass::OnlyChild => position(false).1 == 1,
            PseudoClass::FirstOfType => position(true).0 == 1,
            PseudoClass::LastOfType => {
                let (index, count) = position(true);
                index == count
            }
            PseudoClass::OnlyOfType => position(true).1 == 1,
            PseudoClass::NthChild(expr) => expr.matches(position(false).0 as i32),
            PseudoClass::NthLastChild(expr) => {
                let (index, count) = position(false);
                expr.matches((count - index + 1) as i32)
            }
            PseudoClass::NthOfType(expr) => expr.matches(position(true).0 as i32),
            PseudoClass::NthLastOfType(expr) => {
                let (index, count) = position(true);
                expr.matches((count - index + 1) as i32)
            }

            PseudoClass::Not(list) => !list.matches(element, ctx),
            PseudoClass::Is(list) | PseudoClass::Where(list) => list.matches(element, ctx),
            PseudoClass::Has(relative) => {
                let scoped = MatchContext::scoped(tree, element);
                relative.iter().any(|rel| {
                    has_candidates(tree, element, rel.combinator)
                        .into_iter()
                        .any(|c| rel.selector.matches(c, scoped))
                })
            }
        }
    }
}

/// Elements a relative selector anchored at `anchor` can land on
fn has_candidates(tree: &DomTree, anchor: NodeId, combinator: Combinator) -> Vec<NodeId> {
    match combinator {
        Combinator::Descendant | Combinator::Child => tree.descendant_elements(anchor).collect(),
        Combinator::NextSibling | Combinator::SubsequentSibling => {
            let mut out = Vec::new();
            let mut sibling = tree.next_element_sibling(anchor);
            while let Some(s) = sibling {
                out.push(s);
                out.extend(tree.descendant_elements(s));
                sibling = tree.next_element_sibling(s);
            }
            out
        }
    }
}
