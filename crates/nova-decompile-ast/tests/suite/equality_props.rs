use nova_decompile_ast::{
    Arithmetic, ArithmeticOp, CompareOp, Condition, Expr, Literal, Local, Negate, Ty,
};
use proptest::prelude::*;

const PROPTEST_CASES: u32 = 256;

fn arb_int_expr() -> impl Strategy<Value = Expr> {
    let leaf = prop_oneof![
        (0u16..4).prop_map(|index| Expr::local(Local::new(index, Ty::INT))),
        (0i32..100).prop_map(|value| Expr::literal(Literal::Int(value))),
    ];
    leaf.prop_recursive(6, 48, 2, |inner| {
        prop_oneof![
            (
                prop::sample::select(vec![ArithmeticOp::Add, ArithmeticOp::Sub, ArithmeticOp::Mul]),
                inner.clone(),
                inner.clone(),
            )
                .prop_map(|(op, left, right)| Expr::from(Arithmetic::new(op, left, right).unwrap())),
            inner.prop_map(|operand| Expr::from(Negate::new(operand).unwrap())),
        ]
    })
}

fn arb_condition() -> impl Strategy<Value = Condition> {
    let leaf = prop_oneof![
        (
            prop::sample::select(vec![
                CompareOp::Eq,
                CompareOp::Ne,
                CompareOp::Lt,
                CompareOp::Le,
                CompareOp::Gt,
                CompareOp::Ge,
            ]),
            arb_int_expr(),
            arb_int_expr(),
        )
            .prop_map(|(op, left, right)| Condition::compare(op, left, right).unwrap()),
        any::<bool>().prop_map(Condition::Constant),
    ];
    leaf.prop_recursive(3, 16, 3, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 2..4).prop_map(Condition::And),
            prop::collection::vec(inner, 2..4).prop_map(Condition::Or),
        ]
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(PROPTEST_CASES))]

    #[test]
    fn equality_is_reflexive_across_clones(expr in arb_int_expr()) {
        let copy = expr.clone();
        prop_assert!(expr == copy);
        prop_assert!(copy == expr);
    }

    #[test]
    fn equality_agrees_with_rendering(a in arb_int_expr(), b in arb_int_expr()) {
        // Rendering is injective over this grammar: non-negative literals, fully parenthesised.
        prop_assert_eq!(a == b, a.to_string() == b.to_string());
        prop_assert_eq!(a == b, b == a);
    }

    #[test]
    fn annotations_never_change_equality(expr in arb_int_expr()) {
        let annotated = expr.clone().with_annotation(Ty::Unknown);
        prop_assert!(annotated == expr);
    }

    #[test]
    fn negation_is_an_involution(condition in arb_condition()) {
        let twice = condition.clone().negate().negate();
        prop_assert_eq!(twice, condition);
    }
}
