//! Memory descriptors produced by the layout stage.
//!
//! A [`Frame`] describes one function's activation record; an [`Access`]
//! says where a variable or parameter lives. Both are created once and
//! never change afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Size of a machine word in bytes.
pub const WORD: i32 = 4;

/// Bytes between FP and the first local: saved FP and return address.
pub const FRAME_HEADER: i32 = 8;

/// Labels pre-bound to the runtime services, in address order from `-1`.
pub const SERVICE_NAMES: [&str; 7] = [
    "exit", "getint", "putint", "getstr", "putstr", "new", "del",
];

/// Activation record of one function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Code label of the function's entry point.
    pub name: String,
    /// Static depth of the function body.
    pub depth: u32,
    /// Parameter bytes plus the access-link slot.
    pub pars_size: i32,
    /// Local bytes plus [`FRAME_HEADER`].
    pub vars_size: i32,
    /// Parameters in declaration order.
    pub pars: Vec<RelAccess>,
    /// Locals in allocation order, across all nested blocks.
    pub vars: Vec<RelAccess>,
}

impl Frame {
    /// Bytes the prologue reserves below the frame header.
    pub fn locals_size(&self) -> i32 {
        self.vars_size - FRAME_HEADER
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (depth={} pars={} vars={})",
            self.name, self.depth, self.pars_size, self.vars_size
        )
    }
}

/// Frame-relative location of a parameter or local variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelAccess {
    /// Byte offset from FP: positive for parameters, negative for locals.
    pub offset: i32,
    /// Static depth of the declaring scope.
    pub depth: u32,
    pub size: i32,
    /// Flattened initializer; `None` for parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inits: Option<Vec<i32>>,
    pub name: String,
}

/// Data-segment location of a global variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbsAccess {
    pub label: String,
    pub size: i32,
    pub inits: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Access {
    Abs(AbsAccess),
    Rel(RelAccess),
}

impl Access {
    pub fn size(&self) -> i32 {
        match self {
            Access::Abs(abs) => abs.size,
            Access::Rel(rel) => rel.size,
        }
    }

    /// The flattened initializer, if the access has one.
    pub fn inits(&self) -> Option<&[i32]> {
        match self {
            Access::Abs(abs) => Some(&abs.inits),
            Access::Rel(rel) => rel.inits.as_deref(),
        }
    }
}
