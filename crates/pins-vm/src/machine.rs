//! The interpreter loop.
//!
//! Fetch the instruction at PC, execute it, advance PC by its size unless
//! it transferred control. The machine is either running or halted; a
//! fault is returned to the caller and leaves the registers where it hit.

use std::collections::HashMap;
use std::io::{BufRead, Write};

use pins_types::instr::{CodeInstr, CodeOp, DataInstr, Instruction, Oper, Reg};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::builtins::Builtin;
use crate::config::MachineConfig;
use crate::error::{LoadError, VmError, VmResult};
use crate::io;
use crate::loader::{self, Slot};
use crate::memory::Memory;

const WORD: i32 = 4;

/// Execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum State {
    Running,
    Halted { exit_code: i32 },
}

/// Register snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    pub pc: i32,
    pub fp: i32,
    pub sp: i32,
    pub hp: i32,
}

/// A loaded program plus its registers and I/O streams.
pub struct Machine<R, W> {
    memory: Memory,
    slots: HashMap<i32, Slot>,
    labels: HashMap<String, i32>,
    data_end: i32,
    regs: Registers,
    state: State,
    steps: u64,
    config: MachineConfig,
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Machine<R, W> {
    /// Build the memory image and reset the registers.
    pub fn load(
        code: &[CodeInstr],
        data: &[DataInstr],
        config: MachineConfig,
        input: R,
        output: W,
    ) -> Result<Self, LoadError> {
        config.validate()?;
        let loaded = loader::load(code, data, config.stack_top)?;
        Ok(Self {
            memory: loaded.memory,
            slots: loaded.slots,
            labels: loaded.labels,
            data_end: loaded.data_end,
            regs: Registers {
                pc: 0,
                fp: config.stack_top,
                sp: config.stack_top,
                hp: loaded.data_end,
            },
            state: State::Running,
            steps: 0,
            config,
            input,
            output,
        })
    }

    // ── Inspection ───────────────────────────────────────────────────────

    pub fn registers(&self) -> Registers {
        self.regs
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Instructions executed so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Address bound to a program label.
    pub fn label(&self, name: &str) -> Option<i32> {
        self.labels.get(name).copied()
    }

    pub fn code_size(&self) -> i32 {
        self.memory.code_size()
    }

    /// First address after the data segment.
    pub fn data_end(&self) -> i32 {
        self.data_end
    }

    pub fn read_word(&self, addr: i32) -> VmResult<i32> {
        self.memory.load(addr)
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn into_output(self) -> W {
        self.output
    }

    // ── Execution ────────────────────────────────────────────────────────

    /// Run until halt and return the exit code.
    pub fn run(&mut self) -> VmResult<i32> {
        loop {
            if let State::Halted { exit_code } = self.step()? {
                return Ok(exit_code);
            }
        }
    }

    /// Execute one instruction.
    pub fn step(&mut self) -> VmResult<State> {
        if let State::Halted { .. } = self.state {
            return Ok(self.state);
        }
        if let Some(max) = self.config.max_steps {
            if self.steps >= max {
                return Err(VmError::StepLimit(max));
            }
        }
        let pc = self.regs.pc;
        let slot = self
            .slots
            .get(&pc)
            .cloned()
            .ok_or(VmError::InvalidPc(pc))?;
        trace!(
            pc,
            sp = self.regs.sp,
            fp = self.regs.fp,
            instr = %slot.instr,
            "step"
        );
        self.steps += 1;
        self.execute(&slot).inspect_err(|err| {
            debug!(pc, %err, "machine fault");
        })?;
        Ok(self.state)
    }

    fn execute(&mut self, slot: &Slot) -> VmResult<()> {
        let next = self.regs.pc + slot.instr.size();
        match &slot.instr.op {
            CodeOp::Label(_) => {}
            CodeOp::Push(_) | CodeOp::Name(_) => self.push(slot.operand)?,
            CodeOp::Load => {
                let addr = self.pop()?;
                let value = self.memory.load(addr)?;
                self.push(value)?;
            }
            CodeOp::Save => {
                let addr = self.pop()?;
                let value = self.pop()?;
                self.memory.store(addr, value)?;
            }
            CodeOp::Popn => {
                let mut bytes = self.pop()?;
                while bytes < 0 {
                    self.push(0)?;
                    bytes += WORD;
                }
                while bytes > 0 {
                    self.pop()?;
                    bytes -= WORD;
                }
            }
            CodeOp::Oper(oper) => self.oper(*oper)?,
            CodeOp::Ujmp => {
                self.regs.pc = self.pop()?;
                return Ok(());
            }
            CodeOp::Cjmp => {
                let then_addr = self.pop()?;
                let else_addr = self.pop()?;
                let cond = self.pop()?;
                self.regs.pc = if cond != 0 { then_addr } else { else_addr };
                return Ok(());
            }
            CodeOp::Call(_) => {
                let target = self.pop()?;
                if target < 0 {
                    let builtin = Builtin::from_address(target).ok_or(VmError::InvalidPc(target))?;
                    self.builtin(builtin)?;
                } else {
                    self.push(self.regs.fp)?;
                    self.push(next)?;
                    self.regs.fp = self.regs.sp + 2 * WORD;
                    self.regs.pc = target;
                    return Ok(());
                }
            }
            CodeOp::Retn(_) => {
                self.retn()?;
                return Ok(());
            }
            CodeOp::Init => self.init()?,
            CodeOp::Regn(reg) => {
                let value = match reg {
                    Reg::Pc => self.regs.pc,
                    Reg::Fp => self.regs.fp,
                    Reg::Sp => self.regs.sp,
                };
                self.push(value)?;
            }
        }
        if let State::Running = self.state {
            self.regs.pc = next;
        }
        Ok(())
    }

    // ── Stack ────────────────────────────────────────────────────────────

    fn push(&mut self, value: i32) -> VmResult<()> {
        let sp = self.regs.sp - WORD;
        if sp < self.regs.hp {
            return Err(VmError::StackOverflow);
        }
        self.memory.store(sp, value)?;
        self.regs.sp = sp;
        Ok(())
    }

    fn pop(&mut self) -> VmResult<i32> {
        if self.regs.sp + WORD > self.config.stack_top {
            return Err(VmError::StackUnderflow);
        }
        let value = self.memory.load(self.regs.sp)?;
        self.regs.sp += WORD;
        Ok(value)
    }

    // ── Instructions with more than a line of semantics ──────────────────

    fn oper(&mut self, oper: Oper) -> VmResult<()> {
        let result = if oper.is_unary() {
            let value = self.pop()?;
            match oper {
                Oper::Not => (value == 0) as i32,
                _ => value.wrapping_neg(),
            }
        } else {
            let snd = self.pop()?;
            let fst = self.pop()?;
            binary(oper, fst, snd)?
        };
        self.push(result)
    }

    /// Pop the parameter size and the result, unwind the frame, drop the
    /// access link and arguments, push the result.
    fn retn(&mut self) -> VmResult<()> {
        let pars_size = self.pop()?;
        let result = self.pop()?;
        let fp = self.regs.fp;
        if self.regs.sp > fp {
            return Err(VmError::StackUnderflow);
        }
        let return_addr = self.memory.load(fp - 2 * WORD)?;
        let caller_fp = self.memory.load(fp - WORD)?;
        let sp = fp + pars_size + WORD;
        if sp > self.config.stack_top || pars_size < 0 {
            return Err(VmError::StackUnderflow);
        }
        self.regs.sp = sp;
        self.regs.fp = caller_fp;
        self.regs.pc = return_addr;
        self.push(result)
    }

    /// Expand a flattened initializer `[count, (num, len, v..)*]`.
    fn init(&mut self) -> VmResult<()> {
        let mut src = self.pop()?;
        let mut dst = self.pop()?;
        let count = self.memory.load(src)?;
        src += WORD;
        for _ in 0..count {
            let num = self.memory.load(src)?;
            let len = self.memory.load(src + WORD)?;
            src += 2 * WORD;
            for _ in 0..num {
                for l in 0..len {
                    let value = self.memory.load(src + WORD * l)?;
                    self.memory.store(dst, value)?;
                    dst += WORD;
                }
            }
            src += WORD * len;
        }
        Ok(())
    }

    // ── Runtime services ─────────────────────────────────────────────────

    fn builtin(&mut self, builtin: Builtin) -> VmResult<()> {
        // access link
        self.pop()?;
        let result = match builtin {
            Builtin::Exit => {
                let exit_code = self.pop()?;
                self.output.flush()?;
                self.state = State::Halted { exit_code };
                debug!(exit_code, steps = self.steps, "halted");
                return Ok(());
            }
            Builtin::Getint => io::read_int(&mut self.input)?,
            Builtin::Putint => {
                let value = self.pop()?;
                write!(self.output, "{value}")?;
                1
            }
            Builtin::Getstr => {
                let mut addr = self.pop()?;
                let line = io::read_line(&mut self.input)?;
                for c in line.chars() {
                    self.memory.store(addr, c as i32)?;
                    addr += WORD;
                }
                self.memory.store(addr, 0)?;
                1
            }
            Builtin::Putstr => {
                let mut addr = self.pop()?;
                let mut text = String::new();
                loop {
                    let c = self.memory.load(addr)?;
                    if c == 0 {
                        break;
                    }
                    text.push(char::from_u32(c as u32).unwrap_or(char::REPLACEMENT_CHARACTER));
                    addr += WORD;
                }
                self.output.write_all(text.as_bytes())?;
                1
            }
            Builtin::New => {
                let size = self.pop()?;
                let addr = self.regs.hp;
                let end = addr
                    .checked_add(size)
                    .filter(|end| size >= 0 && *end <= self.regs.sp)
                    .ok_or(VmError::HeapExhausted(size))?;
                self.memory.clear(addr, size)?;
                self.regs.hp = end;
                addr
            }
            Builtin::Del => {
                self.pop()?;
                1
            }
        };
        self.push(result)
    }
}

/// Binary operators on 32-bit words; booleans are 0 and 1.
pub fn binary(oper: Oper, fst: i32, snd: i32) -> VmResult<i32> {
    Ok(match oper {
        Oper::Or => (fst != 0 || snd != 0) as i32,
        Oper::And => (fst != 0 && snd != 0) as i32,
        Oper::Equ => (fst == snd) as i32,
        Oper::Neq => (fst != snd) as i32,
        Oper::Gth => (fst > snd) as i32,
        Oper::Lth => (fst < snd) as i32,
        Oper::Geq => (fst >= snd) as i32,
        Oper::Leq => (fst <= snd) as i32,
        Oper::Add => fst.wrapping_add(snd),
        Oper::Sub => fst.wrapping_sub(snd),
        Oper::Mul => fst.wrapping_mul(snd),
        Oper::Div => {
            if snd == 0 {
                return Err(VmError::DivisionByZero);
            }
            fst.wrapping_div(snd)
        }
        Oper::Mod => {
            if snd == 0 {
                return Err(VmError::DivisionByZero);
            }
            fst.wrapping_rem(snd)
        }
        Oper::Not => (fst == 0) as i32,
        Oper::Neg => fst.wrapping_neg(),
    })
}
