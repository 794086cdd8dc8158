//! sift selectors
//!
//! A structural selector engine over `sift-dom` plus two content-aware
//! extensions: `:contains(pattern)` tests an element's rendered text, and
//! `:has(sub:contains(pattern))` tests the rendered text of descendants.

mod compiler;
mod matcher;
mod predicate;
pub mod selectors;

pub use compiler::{compile, CompiledSelector, HasClause, HasPredicate, SelectorCompiler};
pub use matcher::{query_all, select};
pub use predicate::{PatternKind, TextPredicate};
pub use selectors::{SelectorList, SelectorParseError};

/// Malformed `:contains()` argument or regex
#[derive(Debug, Clone, thiserror::Error)]
pub enum SelectorError {
    #[error("unterminated pattern literal in :contains() at offset {offset}")]
    UnterminatedLiteral { offset: usize },

    #[error("unbalanced parentheses at offset {offset}")]
    UnbalancedParens { offset: usize },

    #[error(":contains() at offset {offset} needs a quoted or /regex/ pattern")]
    UnquotedPattern { offset: usize },

    #[error("invalid regular expression /{pattern}/: {error}")]
    InvalidRegex {
        pattern: String,
        #[source]
        error: regex::Error,
    },
}

/// Structural part of a selector cannot be evaluated
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot evaluate selector '{selector}': {source}")]
pub struct EvaluationError {
    pub selector: String,
    #[source]
    pub source: SelectorParseError,
}
