//! Source mapping: code address → PINS function and source location.
//!
//! Each entry covers one function's instructions in the assembled code
//! segment. This lets a host resolve a runtime fault at some PC back to a
//! function name and source position.
//!
//! Granularity is per function; per-instruction locations are kept on the
//! instructions themselves.

use pins_types::Span;
use serde::{Deserialize, Serialize};

/// A complete source map for an assembled program.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMap {
    pub entries: Vec<SourceMapEntry>,
}

/// One function's code range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMapEntry {
    /// Code label of the function ("main", "outer.inner").
    pub label: String,
    /// Address of the function's first instruction.
    pub address: i32,
    /// Bytes of code the function occupies.
    pub size: i32,
    /// Source span of the definition (1-based line/column).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Push a new entry.
    pub fn push(&mut self, label: impl Into<String>, address: i32, size: i32, span: Option<Span>) {
        self.entries.push(SourceMapEntry {
            label: label.into(),
            address,
            size,
            span,
        });
    }

    /// The function whose code contains `pc`.
    pub fn find_by_address(&self, pc: i32) -> Option<&SourceMapEntry> {
        self.entries
            .iter()
            .find(|e| e.address <= pc && pc < e.address + e.size)
    }

    /// Serialize to JSON bytes.
    pub fn to_json(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }

    /// Deserialize from JSON bytes.
    pub fn from_json(data: &[u8]) -> Option<Self> {
        serde_json::from_slice(data).ok()
    }
}
