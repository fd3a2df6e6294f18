//! Codegen error types.

use pins_layout::LayoutError;
use pins_types::{ErrorCode, PinsError, Span};
use thiserror::Error;

/// Errors that can occur during stack-machine code generation.
///
/// All of them mean the attributed AST and the layout disagree; none is
/// recoverable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodegenError {
    /// A definition link, frame or access is missing for a node.
    #[error("missing {what} for node {node}")]
    MissingAttribute { what: &'static str, node: String },

    /// An assignment target does not denote a memory location.
    #[error("not an lvalue at {0}")]
    NotAnLvalue(Span),

    /// Address-of applied to something other than a variable.
    #[error("cannot take the address at {0}")]
    NotAddressable(Span),

    /// No top-level `main` function to start from.
    #[error("program has no top-level function main")]
    NoEntryPoint,

    /// A constant in an expression could not be decoded.
    #[error(transparent)]
    Literal(#[from] LayoutError),

    /// An internal consistency check failed.
    #[error("internal codegen error: {0}")]
    Internal(String),
}

impl CodegenError {
    pub fn code(&self) -> ErrorCode {
        match self {
            CodegenError::MissingAttribute { .. } => ErrorCode::MISSING_ATTRIBUTE,
            CodegenError::NotAnLvalue(_) => ErrorCode::NOT_AN_LVALUE,
            CodegenError::NotAddressable(_) => ErrorCode::NOT_ADDRESSABLE,
            CodegenError::NoEntryPoint => ErrorCode::NO_ENTRY_POINT,
            CodegenError::Literal(err) => err.code(),
            CodegenError::Internal(_) => ErrorCode::INTERNAL,
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            CodegenError::NotAnLvalue(span) | CodegenError::NotAddressable(span) => Some(*span),
            _ => None,
        }
    }
}

impl From<&CodegenError> for PinsError {
    fn from(err: &CodegenError) -> Self {
        PinsError::new(err.code(), err.to_string()).with_span(err.span())
    }
}

/// Codegen result type alias.
pub type CodegenResult<T> = Result<T, CodegenError>;
