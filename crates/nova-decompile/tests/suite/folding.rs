use nova_config::{DecompileConfig, FoldConfig};
use nova_decompile::fold::fold_signum_test;
use nova_decompile::{decompile_unit, fold, Folded, Unit};
use nova_decompile_ast::{
    CompareOp, Condition, DescriptorResolver, Expr, Invoke, InvokeKind, Local, New,
    NumberCompare, Statement, Ty,
};
use nova_flow::{BlockGraph, Terminator};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

use super::fixtures::{
    assign, blocks, branch, call, checked, goto, increment, less_than, structured, var,
};

const SB: &str = "java/lang/StringBuilder";

fn decompile(graph: BlockGraph) -> String {
    let config = DecompileConfig {
        structure: checked(),
        ..DecompileConfig::default()
    };
    let unit = Unit::new("demo", graph);
    decompile_unit(&unit, &DescriptorResolver, &config)
        .unwrap()
        .body
        .to_string()
}

fn negative(index: u16, name: &str) -> Condition {
    Condition::compare(CompareOp::Lt, var(index, name), Expr::int(0)).unwrap()
}

#[test]
fn guarded_continue_merges_into_one_test() {
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

    assert_eq!(
        decompile(builder.build().unwrap()),
        "L0: for (i = 0; i < 10; i += 1) {\n    if (x < 0 && y < 0) {\n        continue;\n    }\n    Log.a();\n}\n"
    );
}

#[test]
fn branch_assigning_one_local_becomes_ternary() {
    let (mut builder, bb) = blocks(4);
    builder.set_terminator(bb[0], branch(negative(0, "x"), bb[1], bb[2]));
    builder.push_statement(bb[1], assign(1, "y", 1));
    builder.set_terminator(bb[1], goto(bb[3]));
    builder.push_statement(bb[2], assign(1, "y", 2));
    builder.set_terminator(bb[2], goto(bb[3]));
    builder.set_terminator(
        bb[3],
        Terminator::Return {
            value: Some(var(1, "y")),
        },
    );

    assert_eq!(
        decompile(builder.build().unwrap()),
        "y = (x < 0 ? 1 : 2);\nreturn y;\n"
    );
}

#[test]
fn string_builder_chain_becomes_concatenation() {
    let name = Expr::local(Local::named(0, "name", Ty::string()));
    let seed: Expr = New::new(SB, "()V", Vec::new()).unwrap().into();
    let first: Expr = Invoke::new(
        InvokeKind::Virtual,
        SB,
        "append",
        "(Ljava/lang/String;)Ljava/lang/StringBuilder;",
        Some(seed),
        vec![name],
    )
    .unwrap()
    .into();
    let second: Expr = Invoke::new(
        InvokeKind::Virtual,
        SB,
        "append",
        "(I)Ljava/lang/StringBuilder;",
        Some(first),
        vec![Expr::int(1)],
    )
    .unwrap()
    .into();
    let text: Expr = Invoke::new(
        InvokeKind::Virtual,
        SB,
        "toString",
        "()Ljava/lang/String;",
        Some(second),
        Vec::new(),
    )
    .unwrap()
    .into();

    let (mut builder, bb) = blocks(1);
    builder.set_terminator(bb[0], Terminator::Return { value: Some(text) });

    assert_eq!(decompile(builder.build().unwrap()), "return name + 1;\n");
}

fn signum_branch() -> BlockGraph {
    let a = Expr::local(Local::named(0, "a", Ty::LONG));
    let b = Expr::local(Local::named(1, "b", Ty::LONG));
    let signum: Expr = NumberCompare::new(a, b).unwrap().into();
    let test = Condition::compare(CompareOp::Gt, signum, Expr::int(0)).unwrap();

    let (mut builder, bb) = blocks(3);
    builder.set_terminator(bb[0], branch(test, bb[1], bb[2]));
    builder.push_statement(bb[1], call("a"));
    builder.set_terminator(bb[1], goto(bb[2]));
    builder.build().unwrap()
}

#[test]
fn signum_test_folds_to_direct_comparison() {
    assert_eq!(
        decompile(signum_branch()),
        "if (b > a) {\n    Log.a();\n}\n"
    );
}

#[test]
fn reaching_the_pass_limit_keeps_the_unfolded_tree() {
    let body = structured(&signum_branch()).body;
    let config = FoldConfig {
        iteration_cap: 1,
        ..FoldConfig::default()
    };
    let out = fold(body.clone(), &config);

    assert_eq!(out.body, body);
    assert_eq!(out.passes, 1);
    assert_eq!(out.diagnostics.len(), 1);
    assert_eq!(out.diagnostics[0].code, "DECOMPILE_FOLD_CAP");
    assert!(out.body.to_string().contains("Integer.signum(b - a) > 0"));
}

#[test]
fn converged_folding_counts_the_quiet_pass() {
    let body = structured(&signum_branch()).body;
    let out = fold(body, &FoldConfig::default());
    assert_eq!(out.passes, 2);
    assert!(out.diagnostics.is_empty());
}

#[test]
fn disabled_folding_is_identity() {
    let body = structured(&signum_branch()).body;
    let config = FoldConfig {
        enabled: false,
        ..FoldConfig::default()
    };
    let out = fold(body.clone(), &config);
    assert_eq!(out.body, body);
    assert_eq!(out.passes, 0);
}

#[test]
fn individual_rules_can_be_switched_off() {
    let body = structured(&signum_branch()).body;
    let config = FoldConfig {
        comparators: false,
        ..FoldConfig::default()
    };
    let out = fold(body.clone(), &config);
    assert_eq!(out.body, body);
    assert_eq!(out.passes, 1);
}

fn long_local() -> impl Strategy<Value = Expr> {
    (0u16..4).prop_map(|index| Expr::local(Local::new(index, Ty::LONG)))
}

fn compare_op() -> impl Strategy<Value = CompareOp> {
    prop::sample::select(vec![
        CompareOp::Eq,
        CompareOp::Ne,
        CompareOp::Lt,
        CompareOp::Le,
        CompareOp::Gt,
        CompareOp::Ge,
    ])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn signum_tests_fold_to_one_form_either_way_round(
        op in compare_op(),
        left in long_local(),
        right in long_local(),
    ) {
        let signum: Expr = NumberCompare::new(left, right).unwrap().into();
        let zero_right = Condition::compare(op, signum.clone(), Expr::int(0)).unwrap();
        let zero_left = Condition::compare(op.flip(), Expr::int(0), signum).unwrap();

        let a = fold_signum_test(zero_right).unwrap();
        let b = fold_signum_test(zero_left).unwrap();
        prop_assert!(a.is_rewritten());
        prop_assert_eq!(&a, &b);

        let again = fold_signum_test(a.into_inner()).unwrap();
        prop_assert!(matches!(again, Folded::Kept(_)));
    }
}

#[test]
fn other_statements_survive_folding() {
    let body = structured(&signum_branch()).body;
    let out = fold(body, &FoldConfig::default());
    let Some(Statement::If(node)) = out.body.get(0) else {
        panic!("expected an if, got {:?}", out.body);
    };
    assert_eq!(node.then_block.len(), 1);
}
