use pins_codegen::CodegenError;
use pins_layout::LayoutError;
use pins_types::{ErrorCode, PinsError};
use pins_vm::{LoadError, VmError};
use thiserror::Error;

/// Any failure along the pipeline, tagged by stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("layout: {0}")]
    Layout(#[from] LayoutError),

    #[error("codegen: {0}")]
    Codegen(#[from] CodegenError),

    #[error("load: {0}")]
    Load(#[from] LoadError),

    #[error("runtime: {0}")]
    Runtime(#[from] VmError),
}

impl CompileError {
    pub fn code(&self) -> ErrorCode {
        match self {
            CompileError::Layout(e) => e.code(),
            CompileError::Codegen(e) => e.code(),
            CompileError::Load(e) => e.code(),
            CompileError::Runtime(e) => e.code(),
        }
    }
}

impl From<&CompileError> for PinsError {
    fn from(err: &CompileError) -> Self {
        match err {
            CompileError::Layout(e) => e.into(),
            CompileError::Codegen(e) => e.into(),
            CompileError::Load(e) => e.into(),
            CompileError::Runtime(e) => e.into(),
        }
    }
}
