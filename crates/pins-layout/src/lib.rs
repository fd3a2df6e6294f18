//! PINS memory layout.
//!
//! Computes, for an attributed program, the activation record of every
//! function and the storage location of every parameter and variable.
//! The result is consumed read-only by code generation.
//!
//! # Frame shape
//!
//! ```text
//!   FP + 4k   parameter k (k >= 1)
//!   FP + 0    access link (FP of the lexically enclosing function)
//!   FP - 4    caller's FP
//!   FP - 8    return address
//!   FP - 8 - n .. FP - 8   locals, allocated downward
//! ```

pub mod error;
pub mod inits;
pub mod layout;

pub use error::{LayoutError, LayoutResult};
pub use layout::{organize, Layout};
