use nova_config::StructureConfig;
use nova_decompile::{structure, Severity, StructureError};
use nova_decompile_ast::{CompareOp, Condition, Expr, Local, Ty};
use nova_flow::{BlockId, Terminator};
use pretty_assertions::assert_eq;

use super::fixtures::{blocks, branch, call, goto, less_than, render, structured, var};

#[test]
fn if_without_else_rejoins() {
    let (mut builder, bb) = blocks(3);
    builder.push_statement(bb[0], call("a"));
    builder.set_terminator(bb[0], branch(less_than(0, "x", 10), bb[1], bb[2]));
    builder.push_statement(bb[1], call("b"));
    builder.set_terminator(bb[1], goto(bb[2]));
    builder.push_statement(bb[2], call("c"));
    let graph = builder.build().unwrap();

    assert_eq!(
        render(&graph),
        "Log.a();\nif (x < 10) {\n    Log.b();\n}\nLog.c();\n"
    );
}

#[test]
fn if_else_with_join() {
    let (mut builder, bb) = blocks(4);
    builder.set_terminator(bb[0], branch(less_than(0, "x", 10), bb[1], bb[2]));
    builder.push_statement(bb[1], call("a"));
    builder.set_terminator(bb[1], goto(bb[3]));
    builder.push_statement(bb[2], call("b"));
    builder.set_terminator(bb[2], goto(bb[3]));
    builder.push_statement(bb[3], call("c"));
    let graph = builder.build().unwrap();

    assert_eq!(
        render(&graph),
        "if (x < 10) {\n    Log.a();\n} else {\n    Log.b();\n}\nLog.c();\n"
    );
}

#[test]
fn empty_then_arm_becomes_negated_test() {
    let (mut builder, bb) = blocks(3);
    builder.set_terminator(bb[0], branch(less_than(0, "x", 10), bb[2], bb[1]));
    builder.push_statement(bb[1], call("a"));
    builder.set_terminator(bb[1], goto(bb[2]));
    builder.push_statement(bb[2], call("b"));
    let graph = builder.build().unwrap();

    assert_eq!(
        render(&graph),
        "if (x >= 10) {\n    Log.a();\n}\nLog.b();\n"
    );
}

#[test]
fn early_return_is_not_nested() {
    let (mut builder, bb) = blocks(3);
    let negative = Condition::compare(CompareOp::Lt, var(0, "x"), Expr::int(0)).unwrap();
    builder.set_terminator(bb[0], branch(negative, bb[1], bb[2]));
    builder.set_terminator(
        bb[1],
        Terminator::Return {
            value: Some(Expr::int(0)),
        },
    );
    builder.push_statement(bb[2], call("a"));
    let graph = builder.build().unwrap();

    assert_eq!(
        render(&graph),
        "if (x < 0) {\n    return 0;\n}\nLog.a();\n"
    );
}

#[test]
fn throw_terminator_becomes_statement() {
    let (mut builder, bb) = blocks(1);
    builder.set_terminator(
        bb[0],
        Terminator::Throw {
            exception: Expr::local(Local::named(
                1,
                "err",
                Ty::object("java/lang/RuntimeException"),
            )),
        },
    );
    let graph = builder.build().unwrap();

    assert_eq!(render(&graph), "throw err;\n");
}

#[test]
fn throwing_a_primitive_is_rejected() {
    let (mut builder, bb) = blocks(1);
    builder.set_terminator(
        bb[0],
        Terminator::Throw {
            exception: Expr::int(1),
        },
    );
    let graph = builder.build().unwrap();

    let err = structure(&graph, &StructureConfig::default()).unwrap_err();
    assert!(
        matches!(err, StructureError::Constraint { block, .. } if block == bb[0]),
        "unexpected error: {err:?}"
    );
}

#[test]
fn unreachable_blocks_are_reported_and_dropped() {
    let (mut builder, bb) = blocks(2);
    builder.push_statement(bb[0], call("a"));
    builder.push_statement(bb[1], call("dead"));
    let graph = builder.build().unwrap();

    let out = structured(&graph);
    assert_eq!(out.body.to_string(), "Log.a();\n");
    assert_eq!(out.diagnostics.len(), 1);
    let diag = &out.diagnostics[0];
    assert_eq!(diag.severity, Severity::Info);
    assert_eq!(diag.code, "DECOMPILE_UNREACHABLE");
    assert_eq!(diag.block, Some(BlockId(1)));
}

#[test]
fn irreducible_cycle_is_rejected() {
    let (mut builder, bb) = blocks(4);
    builder.set_terminator(bb[0], branch(less_than(0, "x", 0), bb[1], bb[2]));
    builder.set_terminator(bb[1], goto(bb[2]));
    builder.set_terminator(bb[2], branch(less_than(1, "y", 0), bb[1], bb[3]));
    let graph = builder.build().unwrap();

    let err = structure(&graph, &StructureConfig::default()).unwrap_err();
    assert!(
        matches!(err, StructureError::Irreducible { .. }),
        "unexpected error: {err:?}"
    );
    assert!(err.block().is_some());
}
