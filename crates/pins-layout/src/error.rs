//! Layout error types.

use pins_types::{ErrorCode, PinsError};
use thiserror::Error;

/// Errors raised while computing the memory layout.
///
/// A valid attributed AST never produces these; they signal literals the
/// front end should have rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// An integer literal is malformed or outside the 32-bit range.
    #[error("illegal integer constant {0}")]
    IllegalInteger(String),

    /// A character literal is malformed.
    #[error("illegal character constant {0}")]
    IllegalChar(String),

    /// A string literal is malformed.
    #[error("illegal string constant {0}")]
    IllegalString(String),

    /// A repetition count is negative or the initializer overflows memory.
    #[error("illegal initializer: {0}")]
    IllegalInitializer(String),
}

impl LayoutError {
    pub fn code(&self) -> ErrorCode {
        match self {
            LayoutError::IllegalInteger(_) => ErrorCode::ILLEGAL_INTEGER,
            LayoutError::IllegalChar(_) => ErrorCode::ILLEGAL_CHAR,
            LayoutError::IllegalString(_) => ErrorCode::ILLEGAL_STRING,
            LayoutError::IllegalInitializer(_) => ErrorCode::INITIALIZER_TOO_LARGE,
        }
    }
}

impl From<&LayoutError> for PinsError {
    fn from(err: &LayoutError) -> Self {
        PinsError::new(err.code(), err.to_string())
    }
}

/// Layout result type alias.
pub type LayoutResult<T> = Result<T, LayoutError>;
