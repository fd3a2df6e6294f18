//! Shared types for the PINS compiler backend.
//!
//! This crate defines the AST node types and the attribute tables the
//! front end hands over, source spans, memory descriptors produced by the
//! layout stage, the stack-machine instruction set, and structured error
//! codes used across all backend stages.

mod error;
mod span;
pub mod ast;
pub mod attr;
pub mod instr;
pub mod mem;

pub use error::{ErrorCategory, ErrorCode, PinsError};
pub use span::Span;
