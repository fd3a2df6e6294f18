//! PINS code generator: compiles an attributed, laid-out AST to stack-machine
//! code and data segments.
//!
//! # Architecture
//!
//! The code generator takes an [`pins_types::attr::AttrAst`] and the
//! [`pins_layout::Layout`] computed for it and produces an [`Image`]:
//!
//! - a code segment starting with a bootstrap that initialises globals,
//!   calls `main` and then the `exit` service, followed by every function
//!   body in pre-order;
//! - a data segment holding global storage, initializer blocks and string
//!   constants;
//! - the instructions generated for each AST node, for inspection.
//!
//! ## Calling convention
//!
//! The caller pushes arguments right to left, then the callee's access
//! link, then the callee's address, and executes `CALL`. The callee's
//! prologue reserves its locals with `PUSH -n; POPN`; its epilogue pushes
//! the parameter size minus one word and executes `RETN`, which leaves the
//! result in place of the arguments.

pub mod compiler;
pub mod error;
pub mod expr;
pub mod image;
pub mod source_map;
pub mod stmt;

pub use compiler::{generate, ENTRY_POINT};
pub use error::{CodegenError, CodegenResult};
pub use image::{Image, ListingLine};
pub use source_map::SourceMap;
