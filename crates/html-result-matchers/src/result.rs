//! Result and error types for selector assertions.

use std::fmt;

use thiserror::Error;

use crate::template::FormatError;

/// Result type for selector assertions
pub type MatchResult<T> = Result<T, MatchError>;

/// Broad category of a [`MatchError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Selector template and arguments are incompatible
    Format,
    /// Response content or selector could not be parsed
    Parse,
    /// A value-extracting assertion matched zero or several elements
    Uniqueness,
    /// Expected and actual values differ
    Assertion,
}

/// The property of the matched element(s) an assertion inspects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    /// Size of the matched node set
    NodeCount,
    /// Rendered text of the unique element
    Text,
    /// Text of the unique element read as a number
    Number,
    /// Text of the unique element read as a boolean
    Boolean,
    /// Named attribute of the unique element
    Attribute(String),
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NodeCount => f.write_str("node count"),
            Self::Text => f.write_str("text"),
            Self::Number => f.write_str("number"),
            Self::Boolean => f.write_str("boolean"),
            Self::Attribute(name) => write!(f, "attribute '{name}'"),
        }
    }
}

/// Errors raised while building or evaluating a selector expectation
#[derive(Debug, Error)]
pub enum MatchError {
    /// Selector template could not be formatted
    #[error("invalid selector template: {0}")]
    Format(#[from] FormatError),

    /// Declared or configured encoding label is unknown
    #[error("unsupported character encoding '{label}'")]
    UnknownEncoding {
        /// The rejected label
        label: String,
    },

    /// Selector expression is not valid CSS
    #[error("CSS selector {selector} is invalid: {message}")]
    InvalidSelector {
        /// Selector expression
        selector: String,
        /// Parser message
        message: String,
    },

    /// Value extraction needs exactly one matched element
    #[error("elements from CSS selector {selector} are not unique: expected 1, got {count}")]
    NotUnique {
        /// Selector expression
        selector: String,
        /// Number of matched elements
        count: usize,
    },

    /// Nothing matched the selector
    #[error("CSS selector {selector} does not exist")]
    DoesNotExist {
        /// Selector expression
        selector: String,
    },

    /// Something matched a selector expected to match nothing
    #[error("CSS selector {selector} exists ({count} matched)")]
    Exists {
        /// Selector expression
        selector: String,
        /// Number of matched elements
        count: usize,
    },

    /// Actual value differs from the expected one
    #[error("{subject} for CSS selector {selector}: expected <{expected}> but was <{actual}>")]
    Mismatch {
        /// Selector expression
        selector: String,
        /// What was compared
        subject: Subject,
        /// Expected value
        expected: String,
        /// Actual value
        actual: String,
    },

    /// Actual value does not satisfy the supplied predicate
    #[error("{subject} for CSS selector {selector}: <{actual}> does not satisfy {predicate}")]
    PredicateFailed {
        /// Selector expression
        selector: String,
        /// What was tested
        subject: Subject,
        /// Predicate description
        predicate: String,
        /// Actual value
        actual: String,
    },

    /// Element text is not a number
    #[error("text '{text}' of CSS selector {selector} is not a number")]
    NotANumber {
        /// Selector expression
        selector: String,
        /// Rendered text of the element
        text: String,
    },
}

impl MatchError {
    /// Category of this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Format(_) => ErrorKind::Format,
            Self::UnknownEncoding { .. } | Self::InvalidSelector { .. } => ErrorKind::Parse,
            Self::NotUnique { .. } => ErrorKind::Uniqueness,
            Self::DoesNotExist { .. }
            | Self::Exists { .. }
            | Self::Mismatch { .. }
            | Self::PredicateFailed { .. }
            | Self::NotANumber { .. } => ErrorKind::Assertion,
        }
    }

    /// Selector expression the error refers to, if any
    #[must_use]
    pub fn selector(&self) -> Option<&str> {
        match self {
            Self::Format(_) | Self::UnknownEncoding { .. } => None,
            Self::InvalidSelector { selector, .. }
            | Self::NotUnique { selector, .. }
            | Self::DoesNotExist { selector }
            | Self::Exists { selector, .. }
            | Self::Mismatch { selector, .. }
            | Self::PredicateFailed { selector, .. }
            | Self::NotANumber { selector, .. } => Some(selector.as_str()),
        }
    }
}
