//! The attributed AST handed to the backend.
//!
//! The front end delivers a [`Program`] together with three read-only side
//! tables: node → source location, name use → definition, and expression →
//! lvalue-ness. [`AstBuilder`] constructs such a tree directly, with
//! definition links given explicitly by the caller.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use crate::ast::*;
use crate::Span;

// ══════════════════════════════════════════════════════════════════════════════
// AttrAst
// ══════════════════════════════════════════════════════════════════════════════

/// A program plus its front-end attributes. Immutable once built.
#[derive(Debug, Clone)]
pub struct AttrAst {
    pub program: Program,
    locations: HashMap<NodeId, Span>,
    definitions: HashMap<NodeId, NodeId>,
    lvalues: HashMap<NodeId, bool>,
}

impl AttrAst {
    pub fn new(
        program: Program,
        locations: HashMap<NodeId, Span>,
        definitions: HashMap<NodeId, NodeId>,
        lvalues: HashMap<NodeId, bool>,
    ) -> Self {
        Self {
            program,
            locations,
            definitions,
            lvalues,
        }
    }

    /// Source location of a node, if the front end recorded one.
    pub fn location(&self, id: NodeId) -> Option<Span> {
        self.locations.get(&id).copied()
    }

    /// The definition a variable use or call resolves to.
    pub fn definition(&self, id: NodeId) -> Option<NodeId> {
        self.definitions.get(&id).copied()
    }

    /// Whether an expression denotes a memory location.
    pub fn is_lvalue(&self, id: NodeId) -> Option<bool> {
        self.lvalues.get(&id).copied()
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// AstBuilder
// ══════════════════════════════════════════════════════════════════════════════

/// Builds an [`AttrAst`] node by node.
///
/// Methods take `&self` so nested construction reads naturally:
///
/// ```
/// use pins_types::attr::AstBuilder;
/// use pins_types::ast::BinOp;
///
/// let b = AstBuilder::new();
/// let putint = b.reserve_fun("putint");
/// let x = b.par("x");
/// let decl = b.fun(putint, vec![x], vec![]);
/// let main = b.reserve_fun("main");
/// let body = b.expr_stmt(b.call(putint, vec![b.binary(BinOp::Add, b.int(2), b.int(3))]));
/// let main = b.fun(main, vec![], vec![body]);
/// let ast = b.finish(vec![decl, main]);
/// assert_eq!(ast.program.defs.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct AstBuilder {
    next_id: Cell<u32>,
    line: Cell<u32>,
    col: Cell<u32>,
    locations: RefCell<HashMap<NodeId, Span>>,
    definitions: RefCell<HashMap<NodeId, NodeId>>,
    lvalues: RefCell<HashMap<NodeId, bool>>,
    names: RefCell<HashMap<NodeId, String>>,
}

impl AstBuilder {
    pub fn new() -> Self {
        let builder = Self::default();
        builder.line.set(1);
        builder
    }

    /// Nodes created from now on are located on `line`.
    pub fn line(&self, line: u32) {
        self.line.set(line);
        self.col.set(0);
    }

    fn node(&self) -> NodeId {
        let id = NodeId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        let col = self.col.get() + 1;
        self.col.set(col);
        self.locations
            .borrow_mut()
            .insert(id, Span::point(self.line.get(), col));
        id
    }

    fn name_of(&self, def: NodeId) -> String {
        self.names
            .borrow()
            .get(&def)
            .cloned()
            .unwrap_or_else(|| panic!("no definition with id {def}"))
    }

    fn expr(&self, id: NodeId, kind: ExprKind, lvalue: bool) -> Expr {
        self.lvalues.borrow_mut().insert(id, lvalue);
        Expr { id, kind }
    }

    // ── Definitions ──────────────────────────────────────────────────────

    /// Allocate the id of a function so it can be called before its body
    /// is built (recursion, forward references).
    pub fn reserve_fun(&self, name: &str) -> NodeId {
        let id = self.node();
        self.names.borrow_mut().insert(id, name.to_string());
        id
    }

    /// Complete a function reserved with [`reserve_fun`](Self::reserve_fun).
    /// An empty body declares an external function.
    pub fn fun(&self, id: NodeId, pars: Vec<ParDef>, stmts: Vec<Stmt>) -> Def {
        Def::Fun(FunDef {
            id,
            name: self.name_of(id),
            pars,
            stmts,
        })
    }

    pub fn par(&self, name: &str) -> ParDef {
        let id = self.node();
        self.names.borrow_mut().insert(id, name.to_string());
        ParDef {
            id,
            name: name.to_string(),
        }
    }

    pub fn var_def(&self, name: &str, inits: Vec<Init>) -> Def {
        let id = self.node();
        self.names.borrow_mut().insert(id, name.to_string());
        Def::Var(VarDef {
            id,
            name: name.to_string(),
            inits,
        })
    }

    /// `num * value`
    pub fn init(&self, num: i32, value: Atom) -> Init {
        Init {
            id: self.node(),
            num: self.int_atom(num),
            value,
        }
    }

    // ── Atoms ────────────────────────────────────────────────────────────

    pub fn int_atom(&self, value: i32) -> Atom {
        self.atom(AtomKind::Int, value.to_string())
    }

    pub fn char_atom(&self, value: char) -> Atom {
        self.atom(AtomKind::Char, format!("'{}'", escape(value, '\'')))
    }

    pub fn str_atom(&self, value: &str) -> Atom {
        let body: String = value.chars().map(|c| escape(c, '"')).collect();
        self.atom(AtomKind::Str, format!("\"{body}\""))
    }

    /// An atom with a raw source lexeme, exactly as the scanner produced it.
    pub fn atom(&self, kind: AtomKind, lexeme: impl Into<String>) -> Atom {
        Atom {
            id: self.node(),
            kind,
            lexeme: lexeme.into(),
        }
    }

    // ── Expressions ──────────────────────────────────────────────────────

    pub fn atom_expr(&self, atom: Atom) -> Expr {
        let id = atom.id;
        self.expr(id, ExprKind::Atom(atom), false)
    }

    pub fn int(&self, value: i32) -> Expr {
        self.atom_expr(self.int_atom(value))
    }

    pub fn chr(&self, value: char) -> Expr {
        self.atom_expr(self.char_atom(value))
    }

    pub fn string(&self, value: &str) -> Expr {
        self.atom_expr(self.str_atom(value))
    }

    /// A use of the variable or parameter defined by `def`.
    pub fn var(&self, def: NodeId) -> Expr {
        let id = self.node();
        self.definitions.borrow_mut().insert(id, def);
        self.expr(id, ExprKind::Var { name: self.name_of(def) }, true)
    }

    /// A call of the function defined (or reserved) as `fun`.
    pub fn call(&self, fun: NodeId, args: Vec<Expr>) -> Expr {
        let id = self.node();
        self.definitions.borrow_mut().insert(id, fun);
        let name = self.name_of(fun);
        self.expr(id, ExprKind::Call { name, args }, false)
    }

    pub fn unary(&self, op: UnOp, expr: Expr) -> Expr {
        let id = self.node();
        let expr = Box::new(expr);
        self.expr(id, ExprKind::Unary { op, expr }, op == UnOp::ValueAt)
    }

    pub fn binary(&self, op: BinOp, fst: Expr, snd: Expr) -> Expr {
        let id = self.node();
        let kind = ExprKind::Binary {
            op,
            fst: Box::new(fst),
            snd: Box::new(snd),
        };
        self.expr(id, kind, false)
    }

    /// `^expr`
    pub fn addr_of(&self, expr: Expr) -> Expr {
        self.unary(UnOp::AddrOf, expr)
    }

    /// `expr^`
    pub fn value_at(&self, expr: Expr) -> Expr {
        self.unary(UnOp::ValueAt, expr)
    }

    // ── Statements ───────────────────────────────────────────────────────

    fn stmt(&self, kind: StmtKind) -> Stmt {
        Stmt {
            id: self.node(),
            kind,
        }
    }

    pub fn expr_stmt(&self, expr: Expr) -> Stmt {
        self.stmt(StmtKind::Expr(expr))
    }

    pub fn assign(&self, dst: Expr, src: Expr) -> Stmt {
        self.stmt(StmtKind::Assign { dst, src })
    }

    pub fn if_stmt(&self, cond: Expr, then_stmts: Vec<Stmt>, else_stmts: Vec<Stmt>) -> Stmt {
        self.stmt(StmtKind::If {
            cond,
            then_stmts,
            else_stmts,
        })
    }

    pub fn while_stmt(&self, cond: Expr, stmts: Vec<Stmt>) -> Stmt {
        self.stmt(StmtKind::While { cond, stmts })
    }

    pub fn let_stmt(&self, defs: Vec<Def>, stmts: Vec<Stmt>) -> Stmt {
        self.stmt(StmtKind::Let { defs, stmts })
    }

    /// Seal the tables and return the attributed program.
    pub fn finish(self, defs: Vec<Def>) -> AttrAst {
        AttrAst::new(
            Program { defs },
            self.locations.into_inner(),
            self.definitions.into_inner(),
            self.lvalues.into_inner(),
        )
    }
}

/// Render one character as it would appear inside a quoted literal.
fn escape(c: char, quote: char) -> String {
    match c {
        '\n' => "\\n".to_string(),
        '\\' => "\\\\".to_string(),
        c if c == quote => format!("\\{c}"),
        c if (c as u32) < 0x20 || c as u32 == 0x7F => format!("\\{:02X}", c as u32),
        c => c.to_string(),
    }
}
