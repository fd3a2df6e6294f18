//! Statement code generation.
//!
//! Statements leave the operand stack as they found it, except the tail
//! expression statement of a function body, whose value becomes the
//! function's result.

use pins_types::ast::*;
use pins_types::instr::{CodeInstr, CodeOp};

use crate::compiler::GenContext;
use crate::error::CodegenResult;
use crate::expr::{emit_addr, emit_expr};

/// Emit a slice of statements. With `tail` set, the last statement is in
/// tail position.
pub fn emit_stmts(
    stmts: &[Stmt],
    tail: bool,
    ctx: &mut GenContext,
    out: &mut Vec<CodeInstr>,
) -> CodegenResult<()> {
    let last = stmts.len().saturating_sub(1);
    for (index, stmt) in stmts.iter().enumerate() {
        emit_stmt(stmt, tail && index == last, ctx, out)?;
    }
    Ok(())
}

/// Whether a statement list ends in an expression whose value is left on
/// the stack when emitted in tail position.
pub fn leaves_value(stmts: &[Stmt]) -> bool {
    match stmts.last().map(|stmt| &stmt.kind) {
        Some(StmtKind::Expr(_)) => true,
        Some(StmtKind::Let { stmts, .. }) => leaves_value(stmts),
        _ => false,
    }
}

/// Emit a single statement.
pub fn emit_stmt(
    stmt: &Stmt,
    tail: bool,
    ctx: &mut GenContext,
    out: &mut Vec<CodeInstr>,
) -> CodegenResult<()> {
    let start = out.len();
    match &stmt.kind {
        StmtKind::Expr(expr) => emit_expr_stmt(expr, tail, stmt.id, ctx, out)?,
        StmtKind::Assign { dst, src } => {
            emit_expr(src, ctx, out)?;
            emit_addr(dst, ctx, out)?;
            out.push(CodeInstr::new(CodeOp::Save, ctx.loc(stmt.id)));
        }
        StmtKind::If {
            cond,
            then_stmts,
            else_stmts,
        } => emit_if(cond, then_stmts, else_stmts, stmt.id, ctx, out)?,
        StmtKind::While { cond, stmts } => emit_while(cond, stmts, stmt.id, ctx, out)?,
        StmtKind::Let { defs, stmts } => emit_let(defs, stmts, tail, ctx, out)?,
    }
    ctx.record(stmt.id, out, start);
    Ok(())
}

// ══════════════════════════════════════════════════════════════════════════════
// Expression statement
// ══════════════════════════════════════════════════════════════════════════════

fn emit_expr_stmt(
    expr: &Expr,
    tail: bool,
    id: NodeId,
    ctx: &mut GenContext,
    out: &mut Vec<CodeInstr>,
) -> CodegenResult<()> {
    emit_expr(expr, ctx, out)?;
    if !tail {
        let loc = ctx.loc(id);
        out.push(CodeInstr::new(CodeOp::Push(4), loc));
        out.push(CodeInstr::new(CodeOp::Popn, loc));
    }
    Ok(())
}

// ══════════════════════════════════════════════════════════════════════════════
// Control flow
// ══════════════════════════════════════════════════════════════════════════════

/// ```text
///     cond; NAME else:n; NAME then:n; CJMP
/// then:n
///     then-stmts; NAME end:n; UJMP
/// else:n
///     else-stmts
/// end:n
/// ```
fn emit_if(
    cond: &Expr,
    then_stmts: &[Stmt],
    else_stmts: &[Stmt],
    id: NodeId,
    ctx: &mut GenContext,
    out: &mut Vec<CodeInstr>,
) -> CodegenResult<()> {
    let loc = ctx.loc(id);
    let n = ctx.fresh_label();
    let (then_label, else_label, end_label) =
        (format!("then:{n}"), format!("else:{n}"), format!("end:{n}"));

    emit_expr(cond, ctx, out)?;
    out.push(CodeInstr::new(CodeOp::Name(else_label.clone()), loc));
    out.push(CodeInstr::new(CodeOp::Name(then_label.clone()), loc));
    out.push(CodeInstr::new(CodeOp::Cjmp, loc));

    out.push(CodeInstr::new(CodeOp::Label(then_label), loc));
    emit_stmts(then_stmts, false, ctx, out)?;
    out.push(CodeInstr::new(CodeOp::Name(end_label.clone()), loc));
    out.push(CodeInstr::new(CodeOp::Ujmp, loc));

    out.push(CodeInstr::new(CodeOp::Label(else_label), loc));
    emit_stmts(else_stmts, false, ctx, out)?;
    out.push(CodeInstr::new(CodeOp::Label(end_label), loc));
    Ok(())
}

/// ```text
/// while:n
///     cond; NAME end:n; NAME do:n; CJMP
/// do:n
///     stmts; NAME while:n; UJMP
/// end:n
/// ```
fn emit_while(
    cond: &Expr,
    stmts: &[Stmt],
    id: NodeId,
    ctx: &mut GenContext,
    out: &mut Vec<CodeInstr>,
) -> CodegenResult<()> {
    let loc = ctx.loc(id);
    let n = ctx.fresh_label();
    let (while_label, do_label, end_label) =
        (format!("while:{n}"), format!("do:{n}"), format!("end:{n}"));

    out.push(CodeInstr::new(CodeOp::Label(while_label.clone()), loc));
    emit_expr(cond, ctx, out)?;
    out.push(CodeInstr::new(CodeOp::Name(end_label.clone()), loc));
    out.push(CodeInstr::new(CodeOp::Name(do_label.clone()), loc));
    out.push(CodeInstr::new(CodeOp::Cjmp, loc));

    out.push(CodeInstr::new(CodeOp::Label(do_label), loc));
    emit_stmts(stmts, false, ctx, out)?;
    out.push(CodeInstr::new(CodeOp::Name(while_label), loc));
    out.push(CodeInstr::new(CodeOp::Ujmp, loc));
    out.push(CodeInstr::new(CodeOp::Label(end_label), loc));
    Ok(())
}

// ══════════════════════════════════════════════════════════════════════════════
// Let block
// ══════════════════════════════════════════════════════════════════════════════

/// Variables are initialised before the block's statements; nested
/// functions are emitted after them, into their own code lists.
fn emit_let(
    defs: &[Def],
    stmts: &[Stmt],
    tail: bool,
    ctx: &mut GenContext,
    out: &mut Vec<CodeInstr>,
) -> CodegenResult<()> {
    for def in defs {
        if let Def::Var(var) = def {
            ctx.emit_local(var, out)?;
        }
    }
    emit_stmts(stmts, tail, ctx, out)?;
    for def in defs {
        if let Def::Fun(fun) = def {
            ctx.emit_fun(fun)?;
        }
    }
    Ok(())
}
