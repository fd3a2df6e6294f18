//! Expression code generation.
//!
//! Every expression evaluated for its value leaves exactly one word on the
//! operand stack. Lvalues can also be evaluated for their address, which
//! likewise leaves one word.

use pins_layout::inits;
use pins_types::ast::*;
use pins_types::instr::{CodeInstr, CodeOp, DataInstr, DataOp, Oper, Reg};
use pins_types::mem::Access;
use pins_types::Span;

use crate::compiler::GenContext;
use crate::error::{CodegenError, CodegenResult};

/// Emit instructions computing the value of an expression.
pub fn emit_expr(
    expr: &Expr,
    ctx: &mut GenContext,
    out: &mut Vec<CodeInstr>,
) -> CodegenResult<()> {
    let start = out.len();
    let loc = ctx.loc(expr.id);
    match &expr.kind {
        // ── Constants ────────────────────────────────────────────────────
        ExprKind::Atom(atom) => emit_atom(atom, expr.id, ctx, out)?,

        // ── Variables ────────────────────────────────────────────────────
        ExprKind::Var { .. } => {
            emit_addr(expr, ctx, out)?;
            out.push(CodeInstr::new(CodeOp::Load, loc));
        }

        // ── Calls ────────────────────────────────────────────────────────
        ExprKind::Call { args, .. } => emit_call(expr.id, args, ctx, out)?,

        // ── Operators ────────────────────────────────────────────────────
        ExprKind::Unary { op, expr: operand } => emit_unary(*op, operand, expr.id, ctx, out)?,
        ExprKind::Binary { op, fst, snd } => {
            emit_expr(fst, ctx, out)?;
            emit_expr(snd, ctx, out)?;
            out.push(CodeInstr::new(CodeOp::Oper(binary_oper(*op)), loc));
        }
    }
    ctx.record(expr.id, out, start);
    Ok(())
}

/// Emit instructions computing the address an lvalue denotes.
pub fn emit_addr(
    expr: &Expr,
    ctx: &mut GenContext,
    out: &mut Vec<CodeInstr>,
) -> CodegenResult<()> {
    if ctx.ast.is_lvalue(expr.id) != Some(true) {
        return Err(CodegenError::NotAnLvalue(ctx.span(expr.id)));
    }
    let start = out.len();
    match &expr.kind {
        ExprKind::Var { .. } => emit_var_addr(expr.id, ctx, out)?,
        ExprKind::Unary {
            op: UnOp::ValueAt,
            expr: pointer,
        } => emit_expr(pointer, ctx, out)?,
        _ => return Err(CodegenError::NotAnLvalue(ctx.span(expr.id))),
    }
    ctx.record(expr.id, out, start);
    Ok(())
}

// ══════════════════════════════════════════════════════════════════════════════
// Constants
// ══════════════════════════════════════════════════════════════════════════════

fn emit_atom(
    atom: &Atom,
    id: NodeId,
    ctx: &mut GenContext,
    out: &mut Vec<CodeInstr>,
) -> CodegenResult<()> {
    let loc = ctx.loc(id);
    match atom.kind {
        AtomKind::Int => {
            let value = inits::decode_int(&atom.lexeme)?;
            out.push(CodeInstr::new(CodeOp::Push(value), loc));
        }
        AtomKind::Char => {
            let value = inits::decode_char(&atom.lexeme)?;
            out.push(CodeInstr::new(CodeOp::Push(value), loc));
        }
        AtomKind::Str => {
            let chars = inits::decode_str(&atom.lexeme)?;
            let label = ctx.const_label();
            let mut data = Vec::with_capacity(chars.len() + 2);
            data.push(DataInstr::new(DataOp::Label(label.clone()), loc));
            data.extend(
                chars
                    .into_iter()
                    .chain(std::iter::once(0))
                    .map(|c| DataInstr::new(DataOp::Data(c), loc)),
            );
            ctx.add_data(id, data);
            out.push(CodeInstr::new(CodeOp::Name(label), loc));
        }
    }
    Ok(())
}

// ══════════════════════════════════════════════════════════════════════════════
// Variables
// ══════════════════════════════════════════════════════════════════════════════

/// Globals are addressed by label; frame-relative variables by following
/// access links from FP to the owning frame and adding the offset.
fn emit_var_addr(id: NodeId, ctx: &mut GenContext, out: &mut Vec<CodeInstr>) -> CodegenResult<()> {
    let loc = ctx.loc(id);
    let def = ctx.definition(id)?;
    match ctx.access(def)? {
        Access::Abs(abs) => {
            out.push(CodeInstr::new(CodeOp::Name(abs.label.clone()), loc));
        }
        Access::Rel(rel) => {
            let hops = ctx.hops(rel.depth)?;
            emit_frame_pointer(hops, loc, out);
            out.push(CodeInstr::new(CodeOp::Push(rel.offset), loc));
            out.push(CodeInstr::new(CodeOp::Oper(Oper::Add), loc));
        }
    }
    Ok(())
}

/// `REGN FP` followed by one `LOAD` per access link.
fn emit_frame_pointer(hops: usize, loc: Option<Span>, out: &mut Vec<CodeInstr>) {
    out.push(CodeInstr::new(CodeOp::Regn(Reg::Fp), loc));
    for _ in 0..hops {
        out.push(CodeInstr::new(CodeOp::Load, loc));
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Calls
// ══════════════════════════════════════════════════════════════════════════════

/// Arguments right to left, the callee's access link, its address, `CALL`.
fn emit_call(
    id: NodeId,
    args: &[Expr],
    ctx: &mut GenContext,
    out: &mut Vec<CodeInstr>,
) -> CodegenResult<()> {
    let loc = ctx.loc(id);
    let def = ctx.definition(id)?;
    let frame = ctx.frame(def)?;

    for arg in args.iter().rev() {
        emit_expr(arg, ctx, out)?;
    }

    // The access link is the FP of the function the callee is nested in.
    // Top-level callees do not use theirs and get the caller's FP.
    let hops = if frame.depth <= 1 || ctx.frames.is_empty() {
        0
    } else {
        ctx.hops(frame.depth - 1)?
    };
    emit_frame_pointer(hops, loc, out);

    out.push(CodeInstr::new(CodeOp::Name(frame.name.clone()), loc));
    out.push(CodeInstr::new(CodeOp::Call(Some(frame)), loc));
    Ok(())
}

// ══════════════════════════════════════════════════════════════════════════════
// Operators
// ══════════════════════════════════════════════════════════════════════════════

fn emit_unary(
    op: UnOp,
    operand: &Expr,
    id: NodeId,
    ctx: &mut GenContext,
    out: &mut Vec<CodeInstr>,
) -> CodegenResult<()> {
    let loc = ctx.loc(id);
    match op {
        UnOp::Add => emit_expr(operand, ctx, out)?,
        UnOp::Not => {
            emit_expr(operand, ctx, out)?;
            out.push(CodeInstr::new(CodeOp::Oper(Oper::Not), loc));
        }
        UnOp::Sub => {
            emit_expr(operand, ctx, out)?;
            out.push(CodeInstr::new(CodeOp::Oper(Oper::Neg), loc));
        }
        UnOp::AddrOf => {
            if !matches!(operand.kind, ExprKind::Var { .. }) {
                return Err(CodegenError::NotAddressable(ctx.span(id)));
            }
            emit_addr(operand, ctx, out)?;
        }
        UnOp::ValueAt => {
            emit_expr(operand, ctx, out)?;
            out.push(CodeInstr::new(CodeOp::Load, loc));
        }
    }
    Ok(())
}

/// Machine operator for a source operator. Comparisons map one to one;
/// `CJMP` takes the then-branch on non-zero.
pub fn binary_oper(op: BinOp) -> Oper {
    match op {
        BinOp::Or => Oper::Or,
        BinOp::And => Oper::And,
        BinOp::Eq => Oper::Equ,
        BinOp::Neq => Oper::Neq,
        BinOp::Gt => Oper::Gth,
        BinOp::Lt => Oper::Lth,
        BinOp::Ge => Oper::Geq,
        BinOp::Le => Oper::Leq,
        BinOp::Add => Oper::Add,
        BinOp::Sub => Oper::Sub,
        BinOp::Mul => Oper::Mul,
        BinOp::Div => Oper::Div,
        BinOp::Mod => Oper::Mod,
    }
}
