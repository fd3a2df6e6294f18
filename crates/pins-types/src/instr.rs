//! The stack-machine instruction set.
//!
//! Code instructions live in the code segment starting at address 0; data
//! instructions follow them in the data segment. `LABEL` belongs to both.
//! Every instruction has a fixed size in bytes, which determines the
//! address of everything after it.

use std::fmt;
use std::rc::Rc;

use crate::mem::Frame;
use crate::Span;

/// Fixed size of an instruction in address units.
pub trait Instruction {
    fn size(&self) -> i32;
    fn loc(&self) -> Option<Span>;
}

// ══════════════════════════════════════════════════════════════════════════════
// Operands
// ══════════════════════════════════════════════════════════════════════════════

/// Operator codes of the `OPER` instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Oper {
    Not,
    Neg,
    Or,
    And,
    Equ,
    Neq,
    Gth,
    Lth,
    Geq,
    Leq,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl Oper {
    /// Unary operators pop one operand; all others pop two.
    pub fn is_unary(self) -> bool {
        matches!(self, Oper::Not | Oper::Neg)
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Oper::Not => "NOT",
            Oper::Neg => "NEG",
            Oper::Or => "OR",
            Oper::And => "AND",
            Oper::Equ => "EQU",
            Oper::Neq => "NEQ",
            Oper::Gth => "GTH",
            Oper::Lth => "LTH",
            Oper::Geq => "GEQ",
            Oper::Leq => "LEQ",
            Oper::Add => "ADD",
            Oper::Sub => "SUB",
            Oper::Mul => "MUL",
            Oper::Div => "DIV",
            Oper::Mod => "MOD",
        }
    }
}

/// Registers readable with `REGN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reg {
    Pc,
    Fp,
    Sp,
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reg::Pc => write!(f, "PC"),
            Reg::Fp => write!(f, "FP"),
            Reg::Sp => write!(f, "SP"),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Code Instructions
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum CodeOp {
    /// Bind a name to the current address.
    Label(String),
    /// Push a constant.
    Push(i32),
    /// Push the address bound to a label.
    Name(String),
    /// Pop an address, push the word stored there.
    Load,
    /// Pop an address and a value, store the value.
    Save,
    /// Pop a byte count; positive discards, negative pushes zeros.
    Popn,
    Oper(Oper),
    /// Pop an address and jump there.
    Ujmp,
    /// Pop then-address, else-address and a condition; branch on non-zero.
    Cjmp,
    /// Pop a target and call it; the frame is for listings only.
    Call(Option<Rc<Frame>>),
    /// Return from the function whose frame is given.
    Retn(Option<Rc<Frame>>),
    /// Pop an initializer address and a destination, expand the initializer.
    Init,
    /// Push a register.
    Regn(Reg),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CodeInstr {
    pub op: CodeOp,
    pub loc: Option<Span>,
}

impl CodeInstr {
    pub fn new(op: CodeOp, loc: Option<Span>) -> Self {
        Self { op, loc }
    }
}

impl Instruction for CodeInstr {
    fn size(&self) -> i32 {
        match self.op {
            CodeOp::Label(_) => 0,
            CodeOp::Push(_) | CodeOp::Name(_) => 5,
            _ => 1,
        }
    }

    fn loc(&self) -> Option<Span> {
        self.loc
    }
}

impl fmt::Display for CodeInstr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.op {
            CodeOp::Label(name) => write!(f, "LABEL {name}"),
            CodeOp::Push(value) => write!(f, "PUSH {value}"),
            CodeOp::Name(name) => write!(f, "NAME {name}"),
            CodeOp::Load => write!(f, "LOAD"),
            CodeOp::Save => write!(f, "SAVE"),
            CodeOp::Popn => write!(f, "POPN"),
            CodeOp::Oper(oper) => write!(f, "OPER {}", oper.mnemonic()),
            CodeOp::Ujmp => write!(f, "UJMP"),
            CodeOp::Cjmp => write!(f, "CJMP"),
            CodeOp::Call(Some(frame)) => write!(f, "CALL {}", frame.name),
            CodeOp::Call(None) => write!(f, "CALL"),
            CodeOp::Retn(Some(frame)) => write!(f, "RETN {}", frame.name),
            CodeOp::Retn(None) => write!(f, "RETN"),
            CodeOp::Init => write!(f, "INIT"),
            CodeOp::Regn(reg) => write!(f, "REGN {reg}"),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Data Instructions
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataOp {
    /// Bind a name to the current data address.
    Label(String),
    /// Reserve this many zeroed bytes.
    Size(i32),
    /// One 32-bit constant.
    Data(i32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataInstr {
    pub op: DataOp,
    pub loc: Option<Span>,
}

impl DataInstr {
    pub fn new(op: DataOp, loc: Option<Span>) -> Self {
        Self { op, loc }
    }
}

impl Instruction for DataInstr {
    fn size(&self) -> i32 {
        match self.op {
            DataOp::Label(_) => 0,
            DataOp::Size(bytes) => bytes,
            DataOp::Data(_) => 4,
        }
    }

    fn loc(&self) -> Option<Span> {
        self.loc
    }
}

impl fmt::Display for DataInstr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.op {
            DataOp::Label(name) => write!(f, "LABEL {name}"),
            DataOp::Size(bytes) => write!(f, "SIZE {bytes}"),
            DataOp::Data(value) => write!(f, "DATA {value}"),
        }
    }
}

/// Total size in bytes of a run of instructions.
pub fn segment_size<I: Instruction>(instrs: &[I]) -> i32 {
    instrs.iter().map(Instruction::size).sum()
}
