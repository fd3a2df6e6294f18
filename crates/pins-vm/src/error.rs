//! Load and runtime error types for the stack machine.

use pins_types::{ErrorCode, PinsError};
use thiserror::Error;

/// Errors raised while building the memory image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The same label is defined twice.
    #[error("duplicate label {0}")]
    DuplicateLabel(String),

    /// A `NAME` operand names neither a label nor a runtime service.
    #[error("unresolved label {0}")]
    UnresolvedLabel(String),

    /// Code and data do not fit below the stack top.
    #[error("image of {size} bytes does not fit below stack top {stack_top}")]
    ImageTooLarge { size: i64, stack_top: i32 },

    /// The configured stack top is not a positive, word-aligned size within
    /// [`MachineConfig::MAX_STACK_TOP`](crate::MachineConfig::MAX_STACK_TOP).
    #[error("invalid stack top {0}")]
    InvalidStackTop(i32),
}

impl LoadError {
    pub fn code(&self) -> ErrorCode {
        match self {
            LoadError::DuplicateLabel(_) => ErrorCode::DUPLICATE_LABEL,
            LoadError::UnresolvedLabel(_) => ErrorCode::UNRESOLVED_LABEL,
            LoadError::ImageTooLarge { .. } => ErrorCode::IMAGE_TOO_LARGE,
            LoadError::InvalidStackTop(_) => ErrorCode::INVALID_STACK_TOP,
        }
    }
}

/// Runtime faults. Every fault stops the machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VmError {
    /// Access to the code segment or outside memory.
    #[error("memory fault at address {0}")]
    MemoryFault(i32),

    /// The stack grew into the heap.
    #[error("stack overflow")]
    StackOverflow,

    /// A pop above the stack top.
    #[error("stack underflow")]
    StackUnderflow,

    /// An allocation would cross the stack pointer.
    #[error("heap exhausted allocating {0} bytes")]
    HeapExhausted(i32),

    #[error("division by zero")]
    DivisionByZero,

    /// PC does not address an instruction.
    #[error("no instruction at address {0}")]
    InvalidPc(i32),

    /// The configured step budget ran out.
    #[error("step limit of {0} instructions reached")]
    StepLimit(u64),

    /// A read service hit end of input.
    #[error("end of input")]
    EndOfInput,

    /// `getint` read something that is not an integer.
    #[error("bad integer input {0:?}")]
    BadInput(String),

    #[error("i/o error: {0}")]
    Io(String),
}

impl VmError {
    pub fn code(&self) -> ErrorCode {
        match self {
            VmError::MemoryFault(_) | VmError::StackUnderflow => ErrorCode::MEMORY_FAULT,
            VmError::StackOverflow => ErrorCode::STACK_OVERFLOW,
            VmError::HeapExhausted(_) => ErrorCode::HEAP_EXHAUSTED,
            VmError::DivisionByZero => ErrorCode::DIVISION_BY_ZERO,
            VmError::InvalidPc(_) => ErrorCode::INVALID_PC,
            VmError::StepLimit(_) => ErrorCode::STEP_LIMIT,
            VmError::EndOfInput => ErrorCode::END_OF_INPUT,
            VmError::BadInput(_) => ErrorCode::BAD_INPUT,
            VmError::Io(_) => ErrorCode::IO,
        }
    }
}

impl From<std::io::Error> for VmError {
    fn from(err: std::io::Error) -> Self {
        VmError::Io(err.to_string())
    }
}

impl From<&LoadError> for PinsError {
    fn from(err: &LoadError) -> Self {
        PinsError::new(err.code(), err.to_string())
    }
}

impl From<&VmError> for PinsError {
    fn from(err: &VmError) -> Self {
        PinsError::new(err.code(), err.to_string())
    }
}

/// Result alias for machine operations.
pub type VmResult<T> = Result<T, VmError>;
