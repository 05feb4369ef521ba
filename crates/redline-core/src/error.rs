use thiserror::Error;

/// Reasons a single rule definition is refused at catalog-build time.
///
/// A refused rule never aborts catalog construction; it is collected into
/// [`crate::rules::catalog::CatalogBuild::rejected`] so the loader can surface
/// it as a configuration warning.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RuleError {
    #[error("rule type must not be empty")]
    EmptyName,

    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("unknown severity `{0}`")]
    UnknownSeverity(String),

    #[error("unknown validator `{0}`")]
    UnknownValidator(String),

    #[error("malformed rule record: {0}")]
    MalformedRecord(String),
}

impl From<regex::Error> for RuleError {
    fn from(err: regex::Error) -> Self {
        Self::InvalidPattern(err.to_string())
    }
}
