use nova_config::DecompileConfig;
use nova_decompile::{decompile_unit, decompile_units, Severity, StructureError, Unit};
use nova_decompile_ast::{
    DescriptorResolver, Expr, FieldAccess, MapResolver, Statement, StatementBlock, Ty,
};
use nova_flow::{BlockGraph, Terminator};
use pretty_assertions::assert_eq;

use super::fixtures::{blocks, branch, call, checked, goto, less_than};

fn straight_line() -> BlockGraph {
    let (mut builder, bb) = blocks(2);
    builder.push_statement(bb[0], call("a"));
    builder.set_terminator(bb[0], goto(bb[1]));
    builder.push_statement(bb[1], call("a"));
    builder.build().unwrap()
}

fn irreducible() -> BlockGraph {
    let (mut builder, bb) = blocks(4);
    builder.set_terminator(bb[0], branch(less_than(0, "x", 0), bb[1], bb[2]));
    builder.set_terminator(bb[1], goto(bb[2]));
    builder.set_terminator(bb[2], branch(less_than(1, "y", 0), bb[1], bb[3]));
    builder.build().unwrap()
}

fn returns_field() -> BlockGraph {
    let field = FieldAccess::new_static("com/example/Counter", "count", "I").unwrap();
    let (mut builder, bb) = blocks(1);
    builder.set_terminator(
        bb[0],
        Terminator::Return {
            value: Some(field.into()),
        },
    );
    builder.build().unwrap()
}

fn returned_type(body: &StatementBlock) -> Option<Ty> {
    match body.last() {
        Some(Statement::Return(Some(value))) => value.annotation().cloned(),
        _ => None,
    }
}

#[test]
fn batch_keeps_order_and_isolates_failures() {
    let units = vec![
        Unit::new("ok", straight_line()),
        Unit::new("broken", irreducible()),
        Unit::new("also_ok", straight_line()),
    ];

    for (parallel_units, threads) in [(true, 2), (true, 0), (false, 0)] {
        let config = DecompileConfig {
            parallel_units,
            threads,
            structure: checked(),
            ..DecompileConfig::default()
        };
        let results = decompile_units(&units, &DescriptorResolver, &config);
        assert_eq!(results.len(), 3);

        let ok = results[0].as_ref().unwrap();
        assert_eq!(ok.name, "ok");
        assert_eq!(ok.body.to_string(), "Log.a();\nLog.a();\n");

        let err = results[1].as_ref().unwrap_err();
        assert_eq!(err.unit, "broken");
        assert!(matches!(err.source, StructureError::Irreducible { .. }));
        assert!(err.to_string().starts_with("failed to decompile `broken`:"));

        assert_eq!(results[2].as_ref().unwrap().name, "also_ok");
    }
}

#[test]
fn resolver_types_field_reads() {
    let resolver = MapResolver::new().with_field("com/example/Counter", "count", Ty::INT);
    let unit = Unit::new("read", returns_field());
    let out = decompile_unit(&unit, &resolver, &DecompileConfig::default()).unwrap();

    assert_eq!(returned_type(&out.body), Some(Ty::INT));
    assert!(out.diagnostics.is_empty());
}

#[test]
fn unresolved_members_degrade_to_unknown() {
    let unit = Unit::new("read", returns_field());
    let out = decompile_unit(&unit, &DescriptorResolver, &DecompileConfig::default()).unwrap();

    assert_eq!(returned_type(&out.body), Some(Ty::Unknown));
    assert_eq!(out.diagnostics.len(), 1);
    assert_eq!(out.diagnostics[0].severity, Severity::Warning);
    assert_eq!(out.diagnostics[0].code, "DECOMPILE_UNRESOLVED_FIELD");
}

#[test]
fn repeated_misses_are_reported_once() {
    let unit = Unit::new("calls", straight_line());
    let out = decompile_unit(&unit, &MapResolver::new(), &DecompileConfig::default()).unwrap();

    let codes: Vec<&str> = out.diagnostics.iter().map(|diag| diag.code).collect();
    assert_eq!(codes, vec!["DECOMPILE_UNRESOLVED_METHOD"]);
}

#[test]
fn descriptor_resolver_types_calls() {
    let unit = Unit::new("calls", straight_line());
    let out = decompile_unit(&unit, &DescriptorResolver, &DecompileConfig::default()).unwrap();

    assert!(out.diagnostics.is_empty());
    let Some(Statement::Expr(call)) = out.body.get(0) else {
        panic!("expected a call, got {:?}", out.body);
    };
    assert_eq!(call.annotation(), Some(&Ty::Void));
}

#[test]
fn literal_types_come_from_operands() {
    let (mut builder, bb) = blocks(1);
    builder.set_terminator(
        bb[0],
        Terminator::Return {
            value: Some(Expr::int(4)),
        },
    );
    let unit = Unit::new("four", builder.build().unwrap());
    let out = decompile_unit(&unit, &DescriptorResolver, &DecompileConfig::default()).unwrap();
    assert_eq!(returned_type(&out.body), Some(Ty::INT));
}
