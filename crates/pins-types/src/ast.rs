//! AST node types for the PINS language.
//!
//! Every node carries a [`NodeId`]; source locations, name resolution and
//! lvalue-ness live in side tables keyed by that id (see [`crate::attr`]).
//! Literals keep their source lexeme; decoding happens in the layout stage.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of an AST node, unique within one program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Top Level
// ══════════════════════════════════════════════════════════════════════════════

/// A complete program: top-level function and variable definitions in
/// source order.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub defs: Vec<Def>,
}

// ══════════════════════════════════════════════════════════════════════════════
// Definitions
// ══════════════════════════════════════════════════════════════════════════════

/// A definition that may appear at top level or in a `let` block.
#[derive(Debug, Clone, PartialEq)]
pub enum Def {
    Fun(FunDef),
    Var(VarDef),
}

impl Def {
    pub fn id(&self) -> NodeId {
        match self {
            Def::Fun(fun) => fun.id,
            Def::Var(var) => var.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Def::Fun(fun) => &fun.name,
            Def::Var(var) => &var.name,
        }
    }
}

/// `fun name(pars) = stmts`
///
/// A function without statements is a declaration of an external
/// (runtime-provided) function.
#[derive(Debug, Clone, PartialEq)]
pub struct FunDef {
    pub id: NodeId,
    pub name: String,
    pub pars: Vec<ParDef>,
    pub stmts: Vec<Stmt>,
}

impl FunDef {
    /// True when the function has no body and is provided by the runtime.
    pub fn is_external(&self) -> bool {
        self.stmts.is_empty()
    }
}

/// A function parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParDef {
    pub id: NodeId,
    pub name: String,
}

/// `var name = init, init, ...`
#[derive(Debug, Clone, PartialEq)]
pub struct VarDef {
    pub id: NodeId,
    pub name: String,
    pub inits: Vec<Init>,
}

/// One initializer element: `num * value`, i.e. `num` copies of `value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Init {
    pub id: NodeId,
    pub num: Atom,
    pub value: Atom,
}

// ══════════════════════════════════════════════════════════════════════════════
// Statements
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub id: NodeId,
    pub kind: StmtKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// `expr`
    Expr(Expr),
    /// `dst = src`
    Assign { dst: Expr, src: Expr },
    /// `if cond then stmts else stmts end`
    If {
        cond: Expr,
        then_stmts: Vec<Stmt>,
        else_stmts: Vec<Stmt>,
    },
    /// `while cond do stmts end`
    While { cond: Expr, stmts: Vec<Stmt> },
    /// `let defs in stmts end`
    Let { defs: Vec<Def>, stmts: Vec<Stmt> },
}

// ══════════════════════════════════════════════════════════════════════════════
// Expressions
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Integer, character or string constant.
    Atom(Atom),
    /// `not e`, `+e`, `-e`, `^e`, `e^`
    Unary { op: UnOp, expr: Box<Expr> },
    /// `fst op snd`
    Binary {
        op: BinOp,
        fst: Box<Expr>,
        snd: Box<Expr>,
    },
    /// Use of a variable or parameter.
    Var { name: String },
    /// `name(args...)`
    Call { name: String, args: Vec<Expr> },
}

/// A constant as written in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atom {
    pub id: NodeId,
    pub kind: AtomKind,
    /// Source lexeme, including quotes for characters and strings.
    pub lexeme: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AtomKind {
    Int,
    Char,
    Str,
}

// ── Operators ─────────────────────────────────────────────────────────────────

/// Prefix and postfix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnOp {
    /// `not e`
    Not,
    /// `+e`
    Add,
    /// `-e`
    Sub,
    /// `^e`: address of a variable.
    AddrOf,
    /// `e^`: value at an address.
    ValueAt,
}

/// Binary operators (in precedence order, lowest first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Or,
    And,
    Eq,
    Neq,
    Gt,
    Lt,
    Ge,
    Le,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinOp {
    /// Returns the operator symbol.
    pub fn as_str(&self) -> &'static str {
        match self {
            BinOp::Or => "||",
            BinOp::And => "&&",
            BinOp::Eq => "==",
            BinOp::Neq => "!=",
            BinOp::Gt => ">",
            BinOp::Lt => "<",
            BinOp::Ge => ">=",
            BinOp::Le => "<=",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
        }
    }

    pub fn is_relational(&self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Neq | BinOp::Gt | BinOp::Lt | BinOp::Ge | BinOp::Le
        )
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Traversal helpers
// ══════════════════════════════════════════════════════════════════════════════

/// Call `f` on every function definition in pre-order (a function before
/// the functions nested in its body).
pub fn walk_funs<'a>(defs: &'a [Def], f: &mut impl FnMut(&'a FunDef)) {
    for def in defs {
        if let Def::Fun(fun) = def {
            f(fun);
            walk_stmt_funs(&fun.stmts, f);
        }
    }
}

fn walk_stmt_funs<'a>(stmts: &'a [Stmt], f: &mut impl FnMut(&'a FunDef)) {
    for stmt in stmts {
        match &stmt.kind {
            StmtKind::Expr(_) | StmtKind::Assign { .. } => {}
            StmtKind::If {
                then_stmts,
                else_stmts,
                ..
            } => {
                walk_stmt_funs(then_stmts, f);
                walk_stmt_funs(else_stmts, f);
            }
            StmtKind::While { stmts, .. } => walk_stmt_funs(stmts, f),
            StmtKind::Let { defs, stmts } => {
                walk_stmt_funs(stmts, f);
                walk_funs(defs, f);
            }
        }
    }
}
