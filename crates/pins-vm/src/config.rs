use pins_types::mem::WORD;
use serde::{Deserialize, Serialize};

use crate::error::LoadError;

/// Machine parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Size of the memory image; the stack grows down from here.
    pub stack_top: i32,
    /// Maximum number of instructions to execute, if any.
    pub max_steps: Option<u64>,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            stack_top: 0x10000,
            max_steps: None,
        }
    }
}

impl MachineConfig {
    /// Largest accepted memory image: 256 MiB.
    pub const MAX_STACK_TOP: i32 = 1 << 28;

    /// Reject a stack top the machine cannot address safely.
    pub fn validate(&self) -> Result<(), LoadError> {
        let top = self.stack_top;
        if top <= 0 || top % WORD != 0 || top > Self::MAX_STACK_TOP {
            return Err(LoadError::InvalidStackTop(top));
        }
        Ok(())
    }

    /// Parse a configuration from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = Some(max_steps);
        self
    }
}
