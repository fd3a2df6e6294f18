//! Builds the memory image from code and data segments.
//!
//! Code is placed from address 0, data right after it. Labels bind to the
//! address of the next instruction. `NAME` operands are resolved against
//! program labels first and runtime service names second.

use std::collections::HashMap;

use pins_types::instr::{CodeInstr, CodeOp, DataInstr, DataOp, Instruction};
use tracing::debug;

use crate::builtins::Builtin;
use crate::error::LoadError;
use crate::memory::Memory;

/// An executable instruction with its operand resolved.
#[derive(Debug, Clone)]
pub(crate) struct Slot {
    pub instr: CodeInstr,
    /// Value pushed by `PUSH`/`NAME`; zero otherwise.
    pub operand: i32,
}

pub(crate) struct Loaded {
    pub memory: Memory,
    pub slots: HashMap<i32, Slot>,
    pub labels: HashMap<String, i32>,
    pub data_end: i32,
}

pub(crate) fn load(
    code: &[CodeInstr],
    data: &[DataInstr],
    stack_top: i32,
) -> Result<Loaded, LoadError> {
    let mut labels = HashMap::new();
    let mut bind = |name: &str, addr: i64| -> Result<(), LoadError> {
        if labels.insert(name.to_string(), addr as i32).is_some() {
            return Err(LoadError::DuplicateLabel(name.to_string()));
        }
        Ok(())
    };

    // ── Code addresses ───────────────────────────────────────────────────
    let mut addr: i64 = 0;
    let mut placed = Vec::with_capacity(code.len());
    for instr in code {
        match &instr.op {
            CodeOp::Label(name) => bind(name, addr)?,
            _ => placed.push((addr, instr)),
        }
        addr += i64::from(instr.size());
    }
    let code_size = addr;

    // ── Data addresses ───────────────────────────────────────────────────
    let mut words = Vec::new();
    for instr in data {
        match &instr.op {
            DataOp::Label(name) => bind(name, addr)?,
            DataOp::Data(value) => words.push((addr, *value)),
            DataOp::Size(_) => {}
        }
        addr += i64::from(instr.size());
    }
    if addr > i64::from(stack_top) {
        return Err(LoadError::ImageTooLarge {
            size: addr,
            stack_top,
        });
    }
    let data_end = addr as i32;

    let mut memory = Memory::new(stack_top, code_size as i32);
    for (addr, value) in words {
        memory
            .store(addr as i32, value)
            .map_err(|_| LoadError::ImageTooLarge {
                size: addr + 4,
                stack_top,
            })?;
    }

    // ── Operands ─────────────────────────────────────────────────────────
    let mut slots = HashMap::with_capacity(placed.len());
    for (addr, instr) in placed {
        let operand = match &instr.op {
            CodeOp::Push(value) => *value,
            CodeOp::Name(name) => labels
                .get(name)
                .copied()
                .or_else(|| Builtin::from_name(name).map(Builtin::address))
                .ok_or_else(|| LoadError::UnresolvedLabel(name.clone()))?,
            _ => 0,
        };
        slots.insert(
            addr as i32,
            Slot {
                instr: instr.clone(),
                operand,
            },
        );
    }

    debug!(
        code_size,
        data_size = addr - code_size,
        labels = labels.len(),
        "image loaded"
    );
    Ok(Loaded {
        memory,
        slots,
        labels,
        data_end,
    })
}
