//! Program assembler.
//!
//! Orchestrates code generation:
//! 1. Emit every global's data block and bootstrap initialisation
//! 2. Emit every function (nested functions are emitted from their `let`)
//! 3. Build the bootstrap: globals, call `main`, call `exit`
//! 4. Assemble the code segment by a pre-order walk over functions
//! 5. Assemble the data segment in emission order

use std::collections::HashMap;
use std::rc::Rc;

use pins_layout::Layout;
use pins_types::ast::*;
use pins_types::attr::AttrAst;
use pins_types::instr::{segment_size, CodeInstr, CodeOp, DataInstr, DataOp, Oper, Reg};
use pins_types::mem::{Access, Frame, WORD};
use pins_types::Span;
use tracing::debug;

use crate::error::{CodegenError, CodegenResult};
use crate::image::Image;
use crate::source_map::SourceMap;
use crate::stmt::{emit_stmts, leaves_value};

/// Label of the function the bootstrap calls.
pub const ENTRY_POINT: &str = "main";

/// Label of the runtime service the bootstrap ends with.
pub const EXIT: &str = "exit";

// ══════════════════════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════════════════════

/// Generate the code and data segments of an attributed, laid-out program.
pub fn generate(ast: &AttrAst, layout: &Layout) -> CodegenResult<Image> {
    let mut ctx = GenContext::new(ast, layout);
    ctx.compile()
}

// ══════════════════════════════════════════════════════════════════════════════
// GenContext
// ══════════════════════════════════════════════════════════════════════════════

/// Code generation state shared by the expression and statement emitters.
pub struct GenContext<'a> {
    pub ast: &'a AttrAst,
    pub layout: &'a Layout,

    // ── Per-node output ──────────────────────────────────────────────────
    /// Instructions generated for each node.
    pub code: HashMap<NodeId, Vec<CodeInstr>>,
    /// Data generated for each node.
    pub data: HashMap<NodeId, Vec<DataInstr>>,
    /// Nodes with data, in emission order.
    data_order: Vec<NodeId>,

    // ── Counters ─────────────────────────────────────────────────────────
    next_label: u32,
    next_const: u32,

    /// Frames of the functions enclosing the current point, outermost first.
    pub frames: Vec<Rc<Frame>>,
}

impl<'a> GenContext<'a> {
    fn new(ast: &'a AttrAst, layout: &'a Layout) -> Self {
        Self {
            ast,
            layout,
            code: HashMap::new(),
            data: HashMap::new(),
            data_order: Vec::new(),
            next_label: 0,
            next_const: 0,
            frames: Vec::new(),
        }
    }

    fn compile(&mut self) -> CodegenResult<Image> {
        let ast = self.ast;
        let defs = &ast.program.defs;
        for def in defs {
            match def {
                Def::Var(var) => self.emit_global(var)?,
                Def::Fun(fun) => self.emit_fun(fun)?,
            }
        }

        let mut code = self.bootstrap(defs)?;
        let mut source_map = SourceMap::new();
        let node_code = &self.code;
        walk_funs(defs, &mut |fun| {
            if let Some(fun_code) = node_code.get(&fun.id) {
                let label = match fun_code.first().map(|instr| &instr.op) {
                    Some(CodeOp::Label(label)) => label.clone(),
                    _ => fun.name.clone(),
                };
                source_map.push(
                    label,
                    segment_size(&code),
                    segment_size(fun_code),
                    ast.location(fun.id),
                );
                code.extend(fun_code.iter().cloned());
            }
        });

        let mut data = Vec::new();
        for id in &self.data_order {
            if let Some(block) = self.data.get(id) {
                data.extend(block.iter().cloned());
            }
        }

        debug!(
            code_size = segment_size(&code),
            data_size = segment_size(&data),
            functions = source_map.entries.len(),
            "segments assembled"
        );

        Ok(Image {
            code,
            data,
            node_code: std::mem::take(&mut self.code),
            node_data: std::mem::take(&mut self.data),
            source_map,
        })
    }

    // ── Bootstrap ────────────────────────────────────────────────────────

    /// Global initialisation, `main()`, then `exit(0)`.
    fn bootstrap(&self, defs: &[Def]) -> CodegenResult<Vec<CodeInstr>> {
        let main = defs
            .iter()
            .find_map(|def| match def {
                Def::Fun(fun) if fun.name == ENTRY_POINT && !fun.is_external() => Some(fun),
                _ => None,
            })
            .ok_or(CodegenError::NoEntryPoint)?;
        let main_frame = self.frame(main.id)?;

        let mut code = Vec::new();
        for def in defs {
            if let Def::Var(var) = def {
                if let Some(init) = self.code.get(&var.id) {
                    code.extend(init.iter().cloned());
                }
            }
        }
        let op = |op| CodeInstr::new(op, None);
        code.push(op(CodeOp::Push(0)));
        code.push(op(CodeOp::Name(main_frame.name.clone())));
        code.push(op(CodeOp::Call(Some(main_frame))));
        code.push(op(CodeOp::Push(0)));
        code.push(op(CodeOp::Push(0)));
        code.push(op(CodeOp::Name(EXIT.to_string())));
        code.push(op(CodeOp::Call(None)));
        Ok(code)
    }

    // ── Definitions ──────────────────────────────────────────────────────

    /// Emit a function body once; declarations of external functions have
    /// no code.
    pub fn emit_fun(&mut self, fun: &FunDef) -> CodegenResult<()> {
        if fun.is_external() || self.code.contains_key(&fun.id) {
            return Ok(());
        }
        let frame = self.frame(fun.id)?;
        let loc = self.loc(fun.id);

        let mut code = vec![
            CodeInstr::new(CodeOp::Label(frame.name.clone()), loc),
            CodeInstr::new(CodeOp::Push(-frame.locals_size()), loc),
            CodeInstr::new(CodeOp::Popn, loc),
        ];

        self.frames.push(Rc::clone(&frame));
        let body = emit_stmts(&fun.stmts, true, self, &mut code);
        self.frames.pop();
        body?;

        if !leaves_value(&fun.stmts) {
            code.push(CodeInstr::new(CodeOp::Push(0), loc));
        }
        code.push(CodeInstr::new(CodeOp::Push(frame.pars_size - WORD), loc));
        code.push(CodeInstr::new(CodeOp::Retn(Some(Rc::clone(&frame))), loc));

        debug!(function = %frame.name, instructions = code.len(), "function emitted");
        self.code.insert(fun.id, code);
        Ok(())
    }

    /// A global reserves its bytes in the data segment; the bootstrap copies
    /// the initializer in.
    fn emit_global(&mut self, var: &VarDef) -> CodegenResult<()> {
        let access = match self.access(var.id)? {
            Access::Abs(abs) => abs,
            Access::Rel(_) => {
                return Err(CodegenError::Internal(format!(
                    "global {} has a frame-relative access",
                    var.name
                )))
            }
        };
        let loc = self.loc(var.id);
        let label = access.label.clone();
        let init_label = self.const_label();

        let mut data = vec![
            DataInstr::new(DataOp::Label(label.clone()), loc),
            DataInstr::new(DataOp::Size(access.size), loc),
        ];
        data.extend(init_block(&init_label, &access.inits, loc));
        self.add_data(var.id, data);

        let code = vec![
            CodeInstr::new(CodeOp::Name(label), loc),
            CodeInstr::new(CodeOp::Name(init_label), loc),
            CodeInstr::new(CodeOp::Init, loc),
        ];
        self.code.insert(var.id, code);
        Ok(())
    }

    /// Locals are initialised on every activation from a constant block.
    pub fn emit_local(&mut self, var: &VarDef, out: &mut Vec<CodeInstr>) -> CodegenResult<()> {
        let (offset, inits) = match self.access(var.id)? {
            Access::Rel(rel) => (rel.offset, rel.inits.clone().unwrap_or_default()),
            Access::Abs(_) => {
                return Err(CodegenError::Internal(format!(
                    "local {} has an absolute access",
                    var.name
                )))
            }
        };
        let loc = self.loc(var.id);
        let init_label = self.const_label();
        self.add_data(var.id, init_block(&init_label, &inits, loc));

        let code = vec![
            CodeInstr::new(CodeOp::Regn(Reg::Fp), loc),
            CodeInstr::new(CodeOp::Push(offset), loc),
            CodeInstr::new(CodeOp::Oper(Oper::Add), loc),
            CodeInstr::new(CodeOp::Name(init_label), loc),
            CodeInstr::new(CodeOp::Init, loc),
        ];
        out.extend(code.iter().cloned());
        self.code.insert(var.id, code);
        Ok(())
    }

    // ── Attribute lookup ─────────────────────────────────────────────────

    pub fn loc(&self, id: NodeId) -> Option<Span> {
        self.ast.location(id)
    }

    /// Location for error reports; nodes without one report `0:0`.
    pub fn span(&self, id: NodeId) -> Span {
        self.loc(id).unwrap_or_else(|| Span::point(0, 0))
    }

    pub fn definition(&self, id: NodeId) -> CodegenResult<NodeId> {
        self.ast
            .definition(id)
            .ok_or_else(|| missing("definition", id))
    }

    pub fn frame(&self, fun: NodeId) -> CodegenResult<Rc<Frame>> {
        self.layout
            .frame(fun)
            .cloned()
            .ok_or_else(|| missing("frame", fun))
    }

    pub fn access(&self, def: NodeId) -> CodegenResult<&'a Access> {
        self.layout
            .access(def)
            .ok_or_else(|| missing("access", def))
    }

    /// Access links to follow from the current frame to reach the frame
    /// owning a declaration at static depth `depth`.
    pub fn hops(&self, depth: u32) -> CodegenResult<usize> {
        let current = self
            .frames
            .len()
            .checked_sub(1)
            .ok_or_else(|| CodegenError::Internal("frame access outside a function".into()))?;
        let owner = self
            .frames
            .iter()
            .rposition(|frame| frame.depth <= depth)
            .ok_or_else(|| {
                CodegenError::Internal(format!("no enclosing frame at depth {depth}"))
            })?;
        Ok(current - owner)
    }

    // ── Labels and bookkeeping ───────────────────────────────────────────

    /// Next control-flow label number, unique across the program.
    pub fn fresh_label(&mut self) -> u32 {
        let n = self.next_label;
        self.next_label += 1;
        n
    }

    /// Next constant-block label (`:0`, `:1`, ...).
    pub fn const_label(&mut self) -> String {
        let n = self.next_const;
        self.next_const += 1;
        format!(":{n}")
    }

    pub fn add_data(&mut self, id: NodeId, data: Vec<DataInstr>) {
        self.data_order.push(id);
        self.data.insert(id, data);
    }

    /// Remember the instructions emitted for `id` since `start`.
    pub fn record(&mut self, id: NodeId, out: &[CodeInstr], start: usize) {
        self.code.insert(id, out[start..].to_vec());
    }
}

fn missing(what: &'static str, node: NodeId) -> CodegenError {
    CodegenError::MissingAttribute {
        what,
        node: node.to_string(),
    }
}

/// `LABEL k; DATA w...` for a flattened initializer.
fn init_block(label: &str, inits: &[i32], loc: Option<Span>) -> Vec<DataInstr> {
    let mut block = Vec::with_capacity(inits.len() + 1);
    block.push(DataInstr::new(DataOp::Label(label.to_string()), loc));
    block.extend(
        inits
            .iter()
            .map(|word| DataInstr::new(DataOp::Data(*word), loc)),
    );
    block
}
