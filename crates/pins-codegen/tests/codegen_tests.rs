//! Integration tests for the PINS code generator.
//!
//! Tests validate:
//! - Bootstrap shape and function prologue/epilogue
//! - Constants, strings and the data segment
//! - Branch sequences for if/while and label uniqueness
//! - Access-link chains for nested functions
//! - Per-node instruction lists
//! - Internal-consistency errors
//! - Deterministic output

use std::collections::{HashMap, HashSet};

use pins_codegen::{generate, CodegenError, Image};
use pins_layout::organize;
use pins_types::ast::{BinOp, Def, NodeId, Stmt, UnOp};
use pins_types::attr::{AstBuilder, AttrAst};
use pins_types::instr::{CodeInstr, CodeOp, DataOp, Oper, Reg};

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn compile(ast: &AttrAst) -> Image {
    let layout = organize(ast).unwrap_or_else(|e| panic!("layout failed: {e}"));
    generate(ast, &layout).unwrap_or_else(|e| panic!("codegen failed: {e}"))
}

fn try_compile(ast: &AttrAst) -> Result<Image, CodegenError> {
    let layout = organize(ast).unwrap();
    generate(ast, &layout)
}

/// Declare a runtime service with `npars` parameters.
fn declare(b: &AstBuilder, name: &str, npars: usize) -> (NodeId, Def) {
    let id = b.reserve_fun(name);
    let pars = (0..npars).map(|i| b.par(&format!("a{i}"))).collect();
    (id, b.fun(id, pars, vec![]))
}

fn text(code: &[CodeInstr]) -> Vec<String> {
    code.iter().map(ToString::to_string).collect()
}

/// `fun main() = body`
fn with_main(b: AstBuilder, mut defs: Vec<Def>, body: Vec<Stmt>) -> AttrAst {
    let main = b.reserve_fun("main");
    defs.push(b.fun(main, vec![], body));
    b.finish(defs)
}

// ══════════════════════════════════════════════════════════════════════════════
// Program shape
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_bootstrap_then_main() {
    let b = AstBuilder::new();
    let body = vec![b.expr_stmt(b.int(42))];
    let image = compile(&with_main(b, vec![], body));
    assert_eq!(
        text(&image.code),
        vec![
            "PUSH 0",
            "NAME main",
            "CALL main",
            "PUSH 0",
            "PUSH 0",
            "NAME exit",
            "CALL",
            "LABEL main",
            "PUSH 0",
            "POPN",
            "PUSH 42",
            "PUSH 0",
            "RETN main",
        ]
    );
    assert!(image.data.is_empty());
    assert_eq!(image.code_size(), 5 + 5 + 1 + 5 + 5 + 5 + 1 + 5 + 1 + 5 + 5 + 1);
}

#[test]
fn test_prologue_reserves_locals_and_epilogue_pops_pars() {
    let b = AstBuilder::new();
    let f = b.reserve_fun("f");
    let (x, y) = (b.par("x"), b.par("y"));
    let v = b.var_def("v", vec![b.init(2, b.int_atom(0))]);
    let body = b.let_stmt(vec![v], vec![b.expr_stmt(b.int(0))]);
    let f_def = b.fun(f, vec![x, y], vec![body]);
    let main_body = vec![b.expr_stmt(b.call(f, vec![b.int(1), b.int(2)]))];
    let image = compile(&with_main(b, vec![f_def], main_body));

    let f_code = text(image.code_of(f).unwrap());
    assert_eq!(&f_code[..3], &["LABEL f", "PUSH -8", "POPN"]);
    assert_eq!(&f_code[f_code.len() - 2..], &["PUSH 8", "RETN f"]);
}

#[test]
fn test_missing_tail_value_returns_zero() {
    let b = AstBuilder::new();
    let g = b.var_def("g", vec![]);
    let gid = g.id();
    let body = vec![b.assign(b.var(gid), b.int(3))];
    let ast = with_main(b, vec![g], body);
    let image = compile(&ast);
    let main = ast.program.defs[1].id();
    let code = text(image.code_of(main).unwrap());
    assert_eq!(&code[code.len() - 3..], &["PUSH 0", "PUSH 0", "RETN main"]);
}

#[test]
fn test_non_tail_expression_is_discarded() {
    let b = AstBuilder::new();
    let (putint, decl) = declare(&b, "putint", 1);
    let first = b.expr_stmt(b.call(putint, vec![b.int(1)]));
    let first_id = first.id;
    let second = b.expr_stmt(b.int(0));
    let second_id = second.id;
    let image = compile(&with_main(b, vec![decl], vec![first, second]));

    let first_code = text(image.code_of(first_id).unwrap());
    assert_eq!(&first_code[first_code.len() - 2..], &["PUSH 4", "POPN"]);
    assert_eq!(text(image.code_of(second_id).unwrap()), vec!["PUSH 0"]);
}

#[test]
fn test_external_declarations_have_no_code() {
    let b = AstBuilder::new();
    let (putint, decl) = declare(&b, "putint", 1);
    let body = vec![b.expr_stmt(b.call(putint, vec![b.int(7)]))];
    let image = compile(&with_main(b, vec![decl], body));
    assert!(image.code_of(putint).is_none());
    let code = text(&image.code);
    assert!(code.contains(&"NAME putint".to_string()));
    assert!(code.contains(&"CALL putint".to_string()));
    assert!(!code.contains(&"LABEL putint".to_string()));
}

// ══════════════════════════════════════════════════════════════════════════════
// Data segment
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_global_reserves_storage_and_bootstrap_initialises() {
    let b = AstBuilder::new();
    let g = b.var_def("g", vec![b.init(3, b.int_atom(7))]);
    let gid = g.id();
    let body = vec![b.expr_stmt(b.var(gid))];
    let image = compile(&with_main(b, vec![g], body));

    let data: Vec<String> = image.data.iter().map(ToString::to_string).collect();
    assert_eq!(
        data,
        vec!["LABEL g", "SIZE 12", "LABEL :0", "DATA 1", "DATA 3", "DATA 1", "DATA 7"]
    );
    assert_eq!(&text(&image.code)[..3], &["NAME g", "NAME :0", "INIT"]);
    assert_eq!(image.data_size(), 12 + 16);
}

#[test]
fn test_string_constant() {
    let b = AstBuilder::new();
    let (putstr, decl) = declare(&b, "putstr", 1);
    let s = b.string("hi");
    let sid = s.id;
    let body = vec![b.expr_stmt(b.call(putstr, vec![s]))];
    let image = compile(&with_main(b, vec![decl], body));

    assert_eq!(text(image.code_of(sid).unwrap()), vec!["NAME :0"]);
    let data: Vec<DataOp> = image.data_of(sid).unwrap().iter().map(|d| d.op.clone()).collect();
    assert_eq!(
        data,
        vec![
            DataOp::Label(":0".into()),
            DataOp::Data(104),
            DataOp::Data(105),
            DataOp::Data(0),
        ]
    );
}

#[test]
fn test_local_initialised_per_activation() {
    let b = AstBuilder::new();
    let v = b.var_def("v", vec![b.init(1, b.char_atom('A'))]);
    let vid = v.id();
    let body = vec![b.let_stmt(vec![v], vec![b.expr_stmt(b.var(vid))])];
    let image = compile(&with_main(b, vec![], body));

    assert_eq!(
        text(image.code_of(vid).unwrap()),
        vec!["REGN FP", "PUSH -12", "OPER ADD", "NAME :0", "INIT"]
    );
    let data: Vec<String> = image.data_of(vid).unwrap().iter().map(ToString::to_string).collect();
    assert_eq!(data, vec!["LABEL :0", "DATA 1", "DATA 1", "DATA 1", "DATA 65"]);
}

// ══════════════════════════════════════════════════════════════════════════════
// Control flow
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_if_sequence() {
    let b = AstBuilder::new();
    let cond = b.binary(BinOp::Lt, b.int(1), b.int(2));
    let stmt = b.if_stmt(cond, vec![b.expr_stmt(b.int(10))], vec![b.expr_stmt(b.int(20))]);
    let sid = stmt.id;
    let image = compile(&with_main(b, vec![], vec![stmt]));

    assert_eq!(
        text(image.code_of(sid).unwrap()),
        vec![
            "PUSH 1", "PUSH 2", "OPER LTH", "NAME else:0", "NAME then:0", "CJMP",
            "LABEL then:0", "PUSH 10", "PUSH 4", "POPN", "NAME end:0", "UJMP",
            "LABEL else:0", "PUSH 20", "PUSH 4", "POPN", "LABEL end:0",
        ]
    );
}

#[test]
fn test_while_sequence() {
    let b = AstBuilder::new();
    let stmt = b.while_stmt(b.int(0), vec![]);
    let sid = stmt.id;
    let image = compile(&with_main(b, vec![], vec![stmt]));

    assert_eq!(
        text(image.code_of(sid).unwrap()),
        vec![
            "LABEL while:0", "PUSH 0", "NAME end:0", "NAME do:0", "CJMP",
            "LABEL do:0", "NAME while:0", "UJMP", "LABEL end:0",
        ]
    );
}

#[test]
fn test_labels_unique_across_program() {
    let b = AstBuilder::new();
    let f = b.reserve_fun("f");
    let loops = |b: &AstBuilder| {
        vec![
            b.while_stmt(b.int(0), vec![b.if_stmt(b.int(1), vec![], vec![])]),
            b.if_stmt(b.int(0), vec![b.while_stmt(b.int(0), vec![])], vec![]),
            b.expr_stmt(b.string("x")),
            b.expr_stmt(b.int(0)),
        ]
    };
    let f_def = b.fun(f, vec![], loops(&b));
    let body = loops(&b);
    let image = compile(&with_main(b, vec![f_def], body));

    let mut seen = HashSet::new();
    for instr in &image.code {
        if let CodeOp::Label(name) = &instr.op {
            assert!(seen.insert(name.clone()), "duplicate code label {name}");
        }
    }
    for instr in &image.data {
        if let DataOp::Label(name) = &instr.op {
            assert!(seen.insert(name.clone()), "duplicate data label {name}");
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Nested functions
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_access_link_chain_three_levels() {
    let b = AstBuilder::new();
    let f = b.reserve_fun("f");
    let g = b.reserve_fun("g");
    let h = b.reserve_fun("h");
    let x = b.par("x");
    let xid = x.id;

    let use_x = b.var(xid);
    let use_x_id = use_x.id;
    let self_call = b.call(h, vec![]);
    let self_call_id = self_call.id;
    let h_body = vec![
        b.if_stmt(b.int(0), vec![b.expr_stmt(self_call)], vec![]),
        b.expr_stmt(use_x),
    ];
    let h_def = b.fun(h, vec![], h_body);
    let call_h = b.call(h, vec![]);
    let call_h_id = call_h.id;
    let g_def = b.fun(g, vec![], vec![b.let_stmt(vec![h_def], vec![b.expr_stmt(call_h)])]);
    let call_g = b.call(g, vec![]);
    let call_g_id = call_g.id;
    let f_def = b.fun(f, vec![x], vec![b.let_stmt(vec![g_def], vec![b.expr_stmt(call_g)])]);
    let main_body = vec![b.expr_stmt(b.call(f, vec![b.int(5)]))];
    let image = compile(&with_main(b, vec![f_def], main_body));

    assert_eq!(
        text(image.code_of(use_x_id).unwrap()),
        vec!["REGN FP", "LOAD", "LOAD", "PUSH 4", "OPER ADD", "LOAD"]
    );
    assert_eq!(
        text(image.code_of(call_g_id).unwrap()),
        vec!["REGN FP", "NAME f.g", "CALL f.g"]
    );
    assert_eq!(
        text(image.code_of(call_h_id).unwrap()),
        vec!["REGN FP", "NAME f.g.h", "CALL f.g.h"]
    );
    assert_eq!(
        text(image.code_of(self_call_id).unwrap()),
        vec!["REGN FP", "LOAD", "NAME f.g.h", "CALL f.g.h"]
    );
}

#[test]
fn test_nested_functions_follow_parent_in_code_segment() {
    let b = AstBuilder::new();
    let outer = b.reserve_fun("outer");
    let inner = b.reserve_fun("inner");
    let inner_def = b.fun(inner, vec![], vec![b.expr_stmt(b.int(1))]);
    let outer_def = b.fun(
        outer,
        vec![],
        vec![b.let_stmt(vec![inner_def], vec![b.expr_stmt(b.call(inner, vec![]))])],
    );
    let body = vec![b.expr_stmt(b.call(outer, vec![]))];
    let image = compile(&with_main(b, vec![outer_def], body));

    let labels: Vec<&str> = image
        .source_map
        .entries
        .iter()
        .map(|e| e.label.as_str())
        .collect();
    assert_eq!(labels, vec!["outer", "outer.inner", "main"]);
    let main = image.source_map.find_by_address(image.code_size() - 1).unwrap();
    assert_eq!(main.label, "main");
}

#[test]
fn test_call_arguments_pushed_right_to_left() {
    let b = AstBuilder::new();
    let f = b.reserve_fun("f");
    let pars = vec![b.par("a"), b.par("b"), b.par("c")];
    let f_def = b.fun(f, pars, vec![b.expr_stmt(b.int(0))]);
    let call = b.call(f, vec![b.int(1), b.int(2), b.int(3)]);
    let cid = call.id;
    let stmt = b.expr_stmt(call);
    let image = compile(&with_main(b, vec![f_def], vec![stmt]));

    assert_eq!(
        text(image.code_of(cid).unwrap()),
        vec!["PUSH 3", "PUSH 2", "PUSH 1", "REGN FP", "NAME f", "CALL f"]
    );
}

// ══════════════════════════════════════════════════════════════════════════════
// Pointers
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_assignment_through_pointer() {
    let b = AstBuilder::new();
    let p = b.var_def("p", vec![]);
    let pid = p.id();
    let stmt = b.assign(b.value_at(b.var(pid)), b.int(5));
    let sid = stmt.id;
    let body = vec![stmt, b.expr_stmt(b.int(0))];
    let image = compile(&with_main(b, vec![p], body));

    assert_eq!(
        text(image.code_of(sid).unwrap()),
        vec!["PUSH 5", "NAME p", "LOAD", "SAVE"]
    );
}

#[test]
fn test_address_of_variable() {
    let b = AstBuilder::new();
    let x = b.var_def("x", vec![]);
    let xid = x.id();
    let addr = b.addr_of(b.var(xid));
    let aid = addr.id;
    let body = vec![b.expr_stmt(addr)];
    let image = compile(&with_main(b, vec![x], body));
    assert_eq!(text(image.code_of(aid).unwrap()), vec!["NAME x"]);
}

// ══════════════════════════════════════════════════════════════════════════════
// Errors
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_assign_to_non_lvalue() {
    let b = AstBuilder::new();
    let target = b.binary(BinOp::Add, b.int(1), b.int(2));
    let stmt = b.assign(target, b.int(3));
    let err = try_compile(&with_main(b, vec![], vec![stmt])).unwrap_err();
    assert!(matches!(err, CodegenError::NotAnLvalue(_)));
}

#[test]
fn test_address_of_non_variable() {
    let b = AstBuilder::new();
    let p = b.var_def("p", vec![]);
    let pid = p.id();
    let expr = b.addr_of(b.value_at(b.var(pid)));
    let body = vec![b.expr_stmt(expr)];
    let err = try_compile(&with_main(b, vec![p], body)).unwrap_err();
    assert!(matches!(err, CodegenError::NotAddressable(_)));
}

#[test]
fn test_missing_main() {
    let b = AstBuilder::new();
    let f = b.reserve_fun("f");
    let f_def = b.fun(f, vec![], vec![b.expr_stmt(b.int(0))]);
    let err = try_compile(&b.finish(vec![f_def])).unwrap_err();
    assert_eq!(err, CodegenError::NoEntryPoint);
}

#[test]
fn test_missing_definition_link() {
    let b = AstBuilder::new();
    let (putint, decl) = declare(&b, "putint", 1);
    let body = vec![b.expr_stmt(b.call(putint, vec![b.int(1)]))];
    let ast = with_main(b, vec![decl], body);
    let stripped = AttrAst::new(
        ast.program.clone(),
        HashMap::new(),
        HashMap::new(),
        HashMap::new(),
    );
    let err = try_compile(&stripped).unwrap_err();
    assert!(matches!(
        err,
        CodegenError::MissingAttribute { what: "definition", .. }
    ));
}

// ══════════════════════════════════════════════════════════════════════════════
// Determinism
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_codegen_determinism_100_iterations() {
    let build = || {
        let b = AstBuilder::new();
        let (putint, decl) = declare(&b, "putint", 1);
        let n = b.var_def("n", vec![b.init(1, b.int_atom(3))]);
        let nid = n.id();
        let body = vec![
            b.while_stmt(
                b.binary(BinOp::Gt, b.var(nid), b.int(0)),
                vec![
                    b.expr_stmt(b.call(putint, vec![b.var(nid)])),
                    b.assign(b.var(nid), b.binary(BinOp::Sub, b.var(nid), b.int(1))),
                ],
            ),
            b.expr_stmt(b.int(0)),
        ];
        compile(&with_main(b, vec![decl, n], body)).listing_text()
    };
    let first = build();
    for i in 0..100 {
        assert_eq!(first, build(), "Determinism failure at iteration {i}");
    }
}

#[test]
fn test_listing_text_has_one_line_per_instruction() {
    let b = AstBuilder::new();
    b.line(4);
    let g = b.var_def("g", vec![b.init(1, b.int_atom(9))]);
    let body = vec![b.expr_stmt(b.int(0))];
    let image = compile(&with_main(b, vec![g], body));
    let text = image.listing_text();
    let listing = image.listing();
    assert_eq!(text.lines().count(), listing.len());
    assert!(text.ends_with('\n'));
    let first = text.lines().next().unwrap();
    assert!(first.trim_start().starts_with("0:"), "got {first:?}");
    assert!(text.lines().any(|line| line.contains("# 4:")));
}

#[test]
fn test_operator_mapping_in_code() {
    let b = AstBuilder::new();
    let e = b.unary(
        UnOp::Not,
        b.binary(BinOp::Mod, b.int(7), b.unary(UnOp::Sub, b.int(2))),
    );
    let eid = e.id;
    let body = vec![b.expr_stmt(e)];
    let image = compile(&with_main(b, vec![], body));
    let ops: Vec<Oper> = image
        .code_of(eid)
        .unwrap()
        .iter()
        .filter_map(|i| match i.op {
            CodeOp::Oper(op) => Some(op),
            _ => None,
        })
        .collect();
    assert_eq!(ops, vec![Oper::Neg, Oper::Mod, Oper::Not]);
    assert!(image
        .code
        .iter()
        .all(|i| !matches!(i.op, CodeOp::Regn(Reg::Sp) | CodeOp::Regn(Reg::Pc))));
}
