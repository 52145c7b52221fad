use nova_config::StructureConfig;
use nova_decompile::structure;
use nova_decompile_ast::{
    Breakable, BreakableKind, CompareOp, Condition, Expr, Statement, StatementBlock,
};
use nova_flow::BlockGraph;
use pretty_assertions::assert_eq;

use super::fixtures::{
    assign, blocks, branch, call, checked, goto, increment, less_than, render, structured, var,
};

fn negative(index: u16, name: &str) -> Condition {
    Condition::compare(CompareOp::Lt, var(index, name), Expr::int(0)).unwrap()
}

/// `i = 0; while (i < 10) { a(); i++; }` as a compiler lays it out.
fn counted_loop() -> BlockGraph {
    let (mut builder, bb) = blocks(4);
    builder.push_statement(bb[0], assign(0, "i", 0));
    builder.set_terminator(bb[0], goto(bb[1]));
    builder.set_terminator(bb[1], branch(less_than(0, "i", 10), bb[2], bb[3]));
    builder.push_statement(bb[2], call("a"));
    builder.push_statement(bb[2], increment(0, "i"));
    builder.set_terminator(bb[2], goto(bb[1]));
    builder.build().unwrap()
}

#[test]
fn while_loop_with_break() {
    let (mut builder, bb) = blocks(4);
    builder.set_terminator(bb[0], goto(bb[1]));
    builder.set_terminator(bb[1], branch(less_than(0, "i", 10), bb[2], bb[3]));
    builder.push_statement(bb[2], call("a"));
    builder.set_terminator(bb[2], branch(negative(1, "x"), bb[3], bb[1]));
    builder.push_statement(bb[3], call("c"));
    let graph = builder.build().unwrap();

    let out = structured(&graph);
    assert_eq!(
        out.body.to_string(),
        "L0: while (i < 10) {\n    Log.a();\n    if (x < 0) {\n        break;\n    }\n}\nLog.c();\n"
    );

    let Some(Statement::While(node)) = out.body.get(0) else {
        panic!("expected a while loop, got {:?}", out.body);
    };
    let id = node.breakable_id();
    assert_eq!(out.registry.breaks(id).len(), 1);
    assert_eq!(out.registry.kind(id), Some(BreakableKind::While));
}

#[test]
fn counted_loop_becomes_for() {
    let out = structured(&counted_loop());
    assert_eq!(
        out.body.to_string(),
        "L0: for (i = 0; i < 10; i += 1) {\n    Log.a();\n}\n"
    );
    let kinds: Vec<_> = out.registry.breakables().map(|(_, kind)| kind).collect();
    assert_eq!(kinds, vec![BreakableKind::For]);
}

#[test]
fn for_recovery_can_be_disabled() {
    let config = StructureConfig {
        recover_for_loops: false,
        ..checked()
    };
    let out = structure(&counted_loop(), &config).unwrap();
    assert_eq!(
        out.body.to_string(),
        "i = 0;\nL0: while (i < 10) {\n    Log.a();\n    i += 1;\n}\n"
    );
}

#[test]
fn continue_into_shared_update_forces_for() {
    // 0: i = 0
    // 1: i < 10 ? 2 : 5
    // 2: x < 0 ? 6 : 3
    // 3: a(); goto 4
    // 4: i++; goto 1
    // 6: y < 0 ? 4 : 3
    let (mut builder, bb) = blocks(7);
    builder.push_statement(bb[0], assign(0, "i", 0));
    builder.set_terminator(bb[0], goto(bb[1]));
    builder.set_terminator(bb[1], branch(less_than(0, "i", 10), bb[2], bb[5]));
    builder.set_terminator(bb[2], branch(negative(1, "x"), bb[6], bb[3]));
    builder.push_statement(bb[3], call("a"));
    builder.set_terminator(bb[3], goto(bb[4]));
    builder.push_statement(bb[4], increment(0, "i"));
    builder.set_terminator(bb[4], goto(bb[1]));
    builder.set_terminator(bb[6], branch(negative(2, "y"), bb[4], bb[3]));
    let graph = builder.build().unwrap();

    for recover_for_loops in [true, false] {
        let config = StructureConfig {
            recover_for_loops,
            ..checked()
        };
        let out = structure(&graph, &config).unwrap();
        assert_eq!(
            out.body.to_string(),
            "L0: for (i = 0; i < 10; i += 1) {\n    if (x < 0) {\n        if (y < 0) {\n            continue;\n        }\n    }\n    Log.a();\n}\n"
        );
    }
}

#[test]
fn self_loop_becomes_do_while() {
    let (mut builder, bb) = blocks(3);
    builder.push_statement(bb[0], assign(0, "i", 0));
    builder.set_terminator(bb[0], goto(bb[1]));
    builder.push_statement(bb[1], call("a"));
    builder.push_statement(bb[1], increment(0, "i"));
    builder.set_terminator(bb[1], branch(less_than(0, "i", 10), bb[1], bb[2]));
    let graph = builder.build().unwrap();

    assert_eq!(
        render(&graph),
        "i = 0;\nL0: do {\n    Log.a();\n    i += 1;\n} while (i < 10);\n"
    );
}

#[test]
fn loop_exiting_from_the_middle_is_endless() {
    let (mut builder, bb) = blocks(4);
    builder.set_terminator(bb[0], goto(bb[1]));
    builder.push_statement(bb[1], call("a"));
    builder.set_terminator(bb[1], branch(negative(0, "x"), bb[2], bb[3]));
    builder.push_statement(bb[2], call("b"));
    builder.push_statement(bb[3], call("c"));
    builder.set_terminator(bb[3], goto(bb[1]));
    let graph = builder.build().unwrap();

    assert_eq!(
        render(&graph),
        "L0: while (true) {\n    Log.a();\n    if (x < 0) {\n        break;\n    }\n    Log.c();\n}\nLog.b();\n"
    );
}

#[test]
fn jump_to_outer_header_is_labelled_continue() {
    let (mut builder, bb) = blocks(7);
    builder.set_terminator(bb[0], goto(bb[1]));
    builder.set_terminator(bb[1], branch(less_than(0, "i", 10), bb[2], bb[6]));
    builder.set_terminator(bb[2], branch(less_than(1, "j", 10), bb[3], bb[5]));
    builder.set_terminator(bb[3], branch(negative(2, "x"), bb[1], bb[4]));
    builder.push_statement(bb[4], call("a"));
    builder.set_terminator(bb[4], goto(bb[2]));
    builder.push_statement(bb[5], call("b"));
    builder.set_terminator(bb[5], goto(bb[1]));
    let graph = builder.build().unwrap();

    let out = structured(&graph);
    assert_eq!(
        out.body.to_string(),
        "L0: while (i < 10) {\n    L1: while (j < 10) {\n        if (x < 0) {\n            continue L0;\n        }\n        Log.a();\n    }\n    Log.b();\n}\n"
    );
    let counts: Vec<usize> = out
        .registry
        .breakables()
        .map(|(id, _)| out.registry.breaks(id).len())
        .collect();
    assert_eq!(counts, vec![1, 0]);
}

#[test]
fn every_block_is_emitted_once() {
    let out = structured(&counted_loop());
    let mut calls = 0;
    count_calls(&out.body, &mut calls);
    assert_eq!(calls, 1);
}

fn count_calls(block: &StatementBlock, calls: &mut usize) {
    for stmt in block {
        if matches!(stmt, Statement::Expr(_)) {
            *calls += 1;
        }
        for child in stmt.child_blocks() {
            count_calls(child, calls);
        }
    }
}
