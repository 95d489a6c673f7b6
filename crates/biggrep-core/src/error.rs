//! Error types for term normalization and metadata filtering.

/// Failure modes when turning a user-supplied search term into canonical hex.
#[derive(Debug, thiserror::Error)]
pub enum TermError {
    /// `--binary` input contained a character outside `[0-9a-fA-F]`.
    #[error("term {term:?} contains invalid hexadecimal characters")]
    InvalidHexChar {
        /// The offending term, as supplied by the user.
        term: String,
    },
    /// `--binary` input had an odd number of hex digits.
    #[error("term {term:?} has an odd number of hexadecimal characters")]
    OddLengthHex {
        /// The offending term, as supplied by the user.
        term: String,
    },
}

/// Failure modes when parsing a `-f/--filter` expression.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    /// The expression did not match `key OP value`.
    #[error("malformed filter expression: {expr:?}")]
    Malformed {
        /// The offending expression, as supplied by the user.
        expr: String,
    },
    /// The expression's operator was not one of the supported ones.
    #[error("unsupported filter operator in {expr:?}")]
    UnsupportedOperator {
        /// The offending expression, as supplied by the user.
        expr: String,
    },
    /// A `~` (regex) predicate's value did not compile as a regex.
    #[error("invalid regex in filter {expr:?}: {source}")]
    InvalidRegex {
        /// The offending expression, as supplied by the user.
        expr: String,
        /// Underlying regex compilation error.
        #[source]
        source: regex::Error,
    },
}
