//! Engine errors

use sift_css::{EvaluationError, SelectorError, SelectorParseError};
use sift_dom::DomError;

/// Engine error
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid engine configuration: {0}")]
    Config(#[source] serde_json::Error),

    #[error("invalid rule catalog: {0}")]
    Catalog(#[source] serde_json::Error),

    #[error("invalid stored options: {0}")]
    Options(#[source] serde_json::Error),

    #[error("configured {what} selector does not parse: {source}")]
    ConfigSelector {
        what: &'static str,
        #[source]
        source: SelectorParseError,
    },

    #[error(transparent)]
    Selector(#[from] SelectorError),

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error(transparent)]
    Dom(#[from] DomError),

    #[error("no stored rule '{0}'")]
    UnknownRule(String),
}
