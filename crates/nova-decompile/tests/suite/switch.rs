use nova_decompile_ast::{Breakable, Statement};
use nova_flow::{BlockId, Terminator};
use pretty_assertions::assert_eq;

use super::fixtures::{blocks, call, goto, render, structured, var};

fn dispatch(cases: &[(i32, BlockId)], default: BlockId) -> Terminator {
    Terminator::Switch {
        discriminant: var(0, "x"),
        cases: cases.to_vec(),
        default,
    }
}

#[test]
fn shared_targets_and_fall_through() {
    let (mut builder, bb) = blocks(4);
    builder.set_terminator(bb[0], dispatch(&[(1, bb[1]), (2, bb[1]), (3, bb[2])], bb[3]));
    builder.push_statement(bb[1], call("a"));
    builder.set_terminator(bb[1], goto(bb[2]));
    builder.push_statement(bb[2], call("b"));
    builder.set_terminator(bb[2], goto(bb[3]));
    builder.push_statement(bb[3], call("c"));
    let graph = builder.build().unwrap();

    assert_eq!(
        render(&graph),
        "L0: switch (x) {\ncase 1:\ncase 2:\n    Log.a();\ncase 3:\n    Log.b();\n}\nLog.c();\n"
    );
}

#[test]
fn arm_that_falls_into_another_is_placed_before_it() {
    let (mut builder, bb) = blocks(4);
    builder.set_terminator(bb[0], dispatch(&[(1, bb[1]), (3, bb[2])], bb[3]));
    builder.push_statement(bb[1], call("a"));
    builder.set_terminator(bb[1], goto(bb[3]));
    builder.push_statement(bb[2], call("b"));
    builder.set_terminator(bb[2], goto(bb[1]));
    builder.push_statement(bb[3], call("c"));
    let graph = builder.build().unwrap();

    assert_eq!(
        render(&graph),
        "L0: switch (x) {\ncase 3:\n    Log.b();\ncase 1:\n    Log.a();\n}\nLog.c();\n"
    );
}

#[test]
fn arms_leaving_early_break() {
    let (mut builder, bb) = blocks(5);
    builder.set_terminator(bb[0], dispatch(&[(1, bb[1]), (2, bb[2])], bb[3]));
    builder.push_statement(bb[1], call("a"));
    builder.set_terminator(bb[1], goto(bb[4]));
    builder.push_statement(bb[2], call("b"));
    builder.set_terminator(bb[2], goto(bb[4]));
    builder.push_statement(bb[3], call("c"));
    builder.set_terminator(bb[3], goto(bb[4]));
    builder.push_statement(bb[4], call("d"));
    let graph = builder.build().unwrap();

    let out = structured(&graph);
    assert_eq!(
        out.body.to_string(),
        "L0: switch (x) {\ncase 1:\n    Log.a();\n    break;\ncase 2:\n    Log.b();\n    break;\ndefault:\n    Log.c();\n}\nLog.d();\n"
    );

    let Some(Statement::Switch(node)) = out.body.get(0) else {
        panic!("expected a switch, got {:?}", out.body);
    };
    assert_eq!(out.registry.breaks(node.breakable_id()).len(), 2);
    assert_eq!(node.arms().len(), 3);
    assert!(node.arms()[2].is_default());
}

#[test]
fn case_jumping_to_the_follow_block_breaks_when_default_differs() {
    let (mut builder, bb) = blocks(4);
    builder.set_terminator(bb[0], dispatch(&[(1, bb[3]), (2, bb[1])], bb[2]));
    builder.push_statement(bb[1], call("a"));
    builder.set_terminator(bb[1], goto(bb[3]));
    builder.push_statement(bb[2], call("d"));
    builder.set_terminator(bb[2], goto(bb[3]));
    builder.push_statement(bb[3], call("c"));
    let graph = builder.build().unwrap();

    let out = structured(&graph);
    assert_eq!(
        out.body.to_string(),
        "L0: switch (x) {\ncase 1:\n    break;\ncase 2:\n    Log.a();\n    break;\ndefault:\n    Log.d();\n}\nLog.c();\n"
    );

    let Some(Statement::Switch(node)) = out.body.get(0) else {
        panic!("expected a switch, got {:?}", out.body);
    };
    assert_eq!(out.registry.breaks(node.breakable_id()).len(), 2);
}

#[test]
fn cases_jumping_to_the_follow_block_vanish_with_the_default() {
    let (mut builder, bb) = blocks(3);
    builder.set_terminator(bb[0], dispatch(&[(1, bb[2]), (2, bb[1])], bb[2]));
    builder.push_statement(bb[1], call("a"));
    builder.set_terminator(bb[1], goto(bb[2]));
    builder.push_statement(bb[2], call("c"));
    let graph = builder.build().unwrap();

    assert_eq!(
        render(&graph),
        "L0: switch (x) {\ncase 2:\n    Log.a();\n}\nLog.c();\n"
    );
}
