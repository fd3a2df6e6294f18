//! Activation-record and variable-access computation.
//!
//! One depth-first pass over the program assigns:
//! - every function a [`Frame`],
//! - every parameter a frame-relative access at `+4, +8, ...` (the access
//!   link sits at offset 0),
//! - every global variable an absolute access bound to a data label,
//! - every local variable a frame-relative access below the frame header,
//!   growing downward from `-8`.
//!
//! Program labels never coincide with a runtime service name, except for
//! body-less declarations, which keep their plain name at any depth so that
//! calls to them reach the service.
//!
//! Static depth is 0 at top level and grows by one on entering a function
//! body or a `let` block. Blocks share the frame of their enclosing
//! function, and local offsets are never reused within one frame.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use pins_types::ast::*;
use pins_types::attr::AttrAst;
use pins_types::mem::{
    AbsAccess, Access, Frame, RelAccess, FRAME_HEADER, SERVICE_NAMES, WORD,
};
use tracing::debug;

use crate::error::LayoutResult;
use crate::inits;

// ══════════════════════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════════════════════

/// Frames and accesses for one program, keyed by definition node.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    frames: HashMap<NodeId, Rc<Frame>>,
    accesses: HashMap<NodeId, Access>,
}

impl Layout {
    /// Frame of the function defined by `fun`.
    pub fn frame(&self, fun: NodeId) -> Option<&Rc<Frame>> {
        self.frames.get(&fun)
    }

    /// Access of the parameter or variable defined by `def`.
    pub fn access(&self, def: NodeId) -> Option<&Access> {
        self.accesses.get(&def)
    }

    pub fn frames(&self) -> impl Iterator<Item = (&NodeId, &Rc<Frame>)> {
        self.frames.iter()
    }

    pub fn accesses(&self) -> impl Iterator<Item = (&NodeId, &Access)> {
        self.accesses.iter()
    }
}

/// Compute the memory layout of an attributed program.
pub fn organize(ast: &AttrAst) -> LayoutResult<Layout> {
    let mut organizer = Organizer::default();
    organizer
        .labels
        .extend(SERVICE_NAMES.iter().map(|name| name.to_string()));
    for def in &ast.program.defs {
        if let Def::Var(var) = def {
            let label = organizer.unique_label(var.name.clone());
            organizer.globals.insert(var.id, label);
        }
    }
    organizer.defs(&ast.program.defs)?;
    debug!(
        frames = organizer.layout.frames.len(),
        accesses = organizer.layout.accesses.len(),
        "layout complete"
    );
    Ok(organizer.layout)
}

// ══════════════════════════════════════════════════════════════════════════════
// Organizer
// ══════════════════════════════════════════════════════════════════════════════

/// A function whose body is being laid out.
struct FunScope {
    label: String,
    vars: Vec<RelAccess>,
    /// Lowest offset handed out so far; the next local ends here.
    next_var: i32,
}

#[derive(Default)]
struct Organizer {
    layout: Layout,
    depth: u32,
    funs: Vec<FunScope>,
    labels: HashSet<String>,
    /// Data labels of top-level variables.
    globals: HashMap<NodeId, String>,
}

impl Organizer {
    fn defs(&mut self, defs: &[Def]) -> LayoutResult<()> {
        for def in defs {
            match def {
                Def::Fun(fun) => self.fun(fun)?,
                Def::Var(var) => self.var(var)?,
            }
        }
        Ok(())
    }

    fn fun(&mut self, fun: &FunDef) -> LayoutResult<()> {
        let label = if fun.is_external() {
            fun.name.clone()
        } else {
            let base = match self.funs.last() {
                Some(outer) => format!("{}.{}", outer.label, fun.name),
                None => fun.name.clone(),
            };
            self.unique_label(base)
        };

        self.depth += 1;
        let depth = self.depth;

        let mut pars = Vec::with_capacity(fun.pars.len());
        for (index, par) in fun.pars.iter().enumerate() {
            let access = RelAccess {
                offset: WORD * (index as i32 + 1),
                depth,
                size: WORD,
                inits: None,
                name: par.name.clone(),
            };
            self.layout
                .accesses
                .insert(par.id, Access::Rel(access.clone()));
            pars.push(access);
        }

        self.funs.push(FunScope {
            label,
            vars: Vec::new(),
            next_var: -FRAME_HEADER,
        });
        let body = self.stmts(&fun.stmts);
        let scope = self.funs.pop();
        self.depth -= 1;
        body?;

        if let Some(scope) = scope {
            let frame = Frame {
                name: scope.label,
                depth,
                pars_size: WORD * pars.len() as i32 + WORD,
                vars_size: -scope.next_var,
                pars,
                vars: scope.vars,
            };
            debug!(%frame, "frame");
            self.layout.frames.insert(fun.id, Rc::new(frame));
        }
        Ok(())
    }

    fn var(&mut self, var: &VarDef) -> LayoutResult<()> {
        let flat = inits::flatten(&var.inits)?;
        let size = inits::size_of(&flat)?;
        let access = match self.funs.last_mut() {
            None => Access::Abs(AbsAccess {
                label: self
                    .globals
                    .get(&var.id)
                    .cloned()
                    .unwrap_or_else(|| var.name.clone()),
                size,
                inits: flat,
            }),
            Some(scope) => {
                scope.next_var -= size;
                let rel = RelAccess {
                    offset: scope.next_var,
                    depth: self.depth,
                    size,
                    inits: Some(flat),
                    name: var.name.clone(),
                };
                scope.vars.push(rel.clone());
                Access::Rel(rel)
            }
        };
        self.layout.accesses.insert(var.id, access);
        Ok(())
    }

    fn stmts(&mut self, stmts: &[Stmt]) -> LayoutResult<()> {
        for stmt in stmts {
            match &stmt.kind {
                StmtKind::Expr(_) | StmtKind::Assign { .. } => {}
                StmtKind::If {
                    then_stmts,
                    else_stmts,
                    ..
                } => {
                    self.stmts(then_stmts)?;
                    self.stmts(else_stmts)?;
                }
                StmtKind::While { stmts, .. } => self.stmts(stmts)?,
                StmtKind::Let { defs, stmts } => {
                    self.depth += 1;
                    let result = self.defs(defs).and_then(|()| self.stmts(stmts));
                    self.depth -= 1;
                    result?;
                }
            }
        }
        Ok(())
    }

    /// Reserve `base`, or `base_1`, `base_2`, ... if it is taken.
    fn unique_label(&mut self, base: String) -> String {
        let mut label = base.clone();
        let mut suffix = 0;
        while self.labels.contains(&label) {
            suffix += 1;
            label = format!("{base}_{suffix}");
        }
        self.labels.insert(label.clone());
        label
    }
}
