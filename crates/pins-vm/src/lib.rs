//! PINS stack machine.
//!
//! Loads a code segment and a data segment into one flat memory image and
//! interprets the code. Runtime services (`exit`, `getint`, `putint`,
//! `getstr`, `putstr`, `new`, `del`) live at fixed negative addresses and
//! are dispatched by `CALL`.
//!
//! # Frame layout
//!
//! ```text
//! FP + 4k     argument k
//! FP          access link (static link)
//! FP - 4      caller's FP
//! FP - 8      return address
//! FP - 8 - n  locals
//! ```

pub mod builtins;
pub mod config;
pub mod error;
pub mod io;
pub(crate) mod loader;
pub mod machine;
pub mod memory;

pub use builtins::Builtin;
pub use config::MachineConfig;
pub use error::{LoadError, VmError, VmResult};
pub use machine::{Machine, Registers, State};
