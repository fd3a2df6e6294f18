use crate::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error category, determined by error code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Layout,
    Codegen,
    Load,
    Runtime,
    Internal,
}

/// Numeric error code (E100–E499).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    // ── Layout errors (E100–E199) ──
    pub const ILLEGAL_INTEGER: Self = Self(100);
    pub const ILLEGAL_CHAR: Self = Self(101);
    pub const ILLEGAL_STRING: Self = Self(102);
    pub const INITIALIZER_TOO_LARGE: Self = Self(103);

    // ── Codegen errors (E200–E299) ──
    pub const MISSING_ATTRIBUTE: Self = Self(200);
    pub const NOT_AN_LVALUE: Self = Self(201);
    pub const NOT_ADDRESSABLE: Self = Self(202);
    pub const NO_ENTRY_POINT: Self = Self(203);
    pub const INTERNAL: Self = Self(299);

    // ── Load errors (E300–E399) ──
    pub const DUPLICATE_LABEL: Self = Self(300);
    pub const UNRESOLVED_LABEL: Self = Self(301);
    pub const IMAGE_TOO_LARGE: Self = Self(302);
    pub const INVALID_STACK_TOP: Self = Self(303);

    // ── Runtime faults (E400–E499) ──
    pub const MEMORY_FAULT: Self = Self(400);
    pub const STACK_OVERFLOW: Self = Self(401);
    pub const HEAP_EXHAUSTED: Self = Self(402);
    pub const DIVISION_BY_ZERO: Self = Self(403);
    pub const INVALID_PC: Self = Self(404);
    pub const STEP_LIMIT: Self = Self(405);
    pub const END_OF_INPUT: Self = Self(406);
    pub const BAD_INPUT: Self = Self(407);
    pub const IO: Self = Self(408);

    /// Get the category for this error code.
    pub fn category(self) -> ErrorCategory {
        match self.0 {
            100..=199 => ErrorCategory::Layout,
            200..=299 => ErrorCategory::Codegen,
            300..=399 => ErrorCategory::Load,
            400..=499 => ErrorCategory::Runtime,
            _ => ErrorCategory::Internal,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Layout => write!(f, "layout"),
            Self::Codegen => write!(f, "codegen"),
            Self::Load => write!(f, "load"),
            Self::Runtime => write!(f, "runtime"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// A structured backend error, ready for JSON reporting.
///
/// Stage-specific error enums convert into this shape at the pipeline
/// boundary; hosts render it without parsing free-form strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinsError {
    /// Error code (e.g., E403).
    pub code: ErrorCode,
    /// Error category (derived from code).
    pub category: ErrorCategory,
    /// Human-readable error message.
    pub message: String,
    /// Source location, when the failure is tied to a node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

impl PinsError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            category: code.category(),
            message: message.into(),
            span: None,
        }
    }

    /// Attach a source location.
    pub fn with_span(mut self, span: Option<Span>) -> Self {
        self.span = span;
        self
    }
}

impl fmt::Display for PinsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.span {
            Some(span) => write!(
                f,
                "{}: {} [{}] {}",
                span, self.code, self.category, self.message
            ),
            None => write!(f, "{} [{}] {}", self.code, self.category, self.message),
        }
    }
}

impl std::error::Error for PinsError {}
