//! PINS compiler backend: orchestrates the full pipeline.
//!
//! ```text
//! Attributed AST → Layout → Code Generator → Image → Stack Machine
//! ```
//!
//! The front end (scanner, parser, name resolution) is not part of this
//! workspace; its output is an [`AttrAst`], built by a host or with
//! [`pins_types::attr::AstBuilder`].

mod error;
pub mod report;

use std::io::{BufRead, Write};

use pins_codegen::{generate, Image};
use pins_layout::organize;
use pins_types::attr::AttrAst;
use pins_types::PinsError;
use pins_vm::{Machine, MachineConfig};
use tracing::debug;

pub use error::CompileError;
pub use report::{image_hash, CompileResult, FrameSummary};

/// Lay out and generate code for a program.
pub fn compile(ast: &AttrAst) -> Result<Image, CompileError> {
    let layout = organize(ast)?;
    let image = generate(ast, &layout)?;
    debug!(
        code_size = image.code_size(),
        data_size = image.data_size(),
        "compiled"
    );
    Ok(image)
}

/// Compile and report the outcome as a serialisable [`CompileResult`].
/// Errors are captured in the result rather than returned.
pub fn compile_to_result(ast: &AttrAst) -> CompileResult {
    let layout = match organize(ast) {
        Ok(layout) => layout,
        Err(err) => return CompileResult::failure(PinsError::from(&CompileError::from(err))),
    };
    match generate(ast, &layout) {
        Ok(image) => CompileResult::success(&layout, &image),
        Err(err) => CompileResult::failure(PinsError::from(&CompileError::from(err))),
    }
}

/// Load a compiled image into a fresh machine.
pub fn load<R: BufRead, W: Write>(
    image: &Image,
    config: MachineConfig,
    input: R,
    output: W,
) -> Result<Machine<R, W>, CompileError> {
    Ok(Machine::load(&image.code, &image.data, config, input, output)?)
}

/// Compile, load and run a program to completion; returns its exit code.
pub fn run<R: BufRead, W: Write>(
    ast: &AttrAst,
    config: MachineConfig,
    input: R,
    output: W,
) -> Result<i32, CompileError> {
    let image = compile(ast)?;
    let mut machine = load(&image, config, input, output)?;
    let exit_code = machine.run()?;
    debug!(exit_code, steps = machine.steps(), "program finished");
    Ok(exit_code)
}
