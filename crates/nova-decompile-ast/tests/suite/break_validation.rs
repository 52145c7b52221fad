use nova_decompile_ast::{
    validate_breaks, validate_construct, BreakKind, BreakRegistry, BreakableKind, CompareOp,
    Condition, Expr, If, Local, RegistryError, Statement, StatementBlock, Switch, SwitchArm, Ty,
    While,
};

fn counter() -> Expr {
    Expr::local(Local::named(1, "i", Ty::INT))
}

fn below(limit: i32) -> Condition {
    Condition::compare(CompareOp::Lt, counter(), Expr::int(limit)).unwrap()
}

#[test]
fn registered_break_inside_its_loop_validates() {
    let mut registry = BreakRegistry::new();
    let lp = registry.declare(BreakableKind::While);
    let mut brk = registry.new_break(BreakKind::Break);
    registry.register_break(lp, &mut brk).unwrap();

    let body: StatementBlock = vec![Statement::If(If::new(
        below(5),
        vec![Statement::Break(brk)].into(),
        None,
    ))]
    .into();
    let tree: StatementBlock = vec![Statement::While(While::new(lp, Condition::Constant(true), body))].into();

    validate_breaks(&tree, &registry).unwrap();
}

#[test]
fn break_outside_its_target_is_rejected() {
    let mut registry = BreakRegistry::new();
    let lp = registry.declare(BreakableKind::While);
    let mut brk = registry.new_break(BreakKind::Break);
    registry.register_break(lp, &mut brk).unwrap();

    let tree: StatementBlock = vec![
        Statement::While(While::new(lp, below(3), StatementBlock::new())),
        Statement::Break(brk),
    ]
    .into();

    assert!(matches!(
        validate_breaks(&tree, &registry),
        Err(RegistryError::NotEnclosing { .. })
    ));
}

#[test]
fn unregistered_break_is_rejected() {
    let mut registry = BreakRegistry::new();
    let lp = registry.declare(BreakableKind::While);
    let brk = registry.new_break(BreakKind::Continue);
    let id = brk.id();

    let tree: StatementBlock =
        vec![Statement::While(While::new(lp, below(3), vec![Statement::Break(brk)].into()))].into();

    assert_eq!(
        validate_breaks(&tree, &registry),
        Err(RegistryError::Unregistered(id))
    );
}

#[test]
fn registry_entry_without_tree_break_is_stale() {
    let mut registry = BreakRegistry::new();
    let lp = registry.declare(BreakableKind::While);
    let mut brk = registry.new_break(BreakKind::Break);
    registry.register_break(lp, &mut brk).unwrap();

    let tree: StatementBlock =
        vec![Statement::While(While::new(lp, below(3), StatementBlock::new()))].into();

    assert!(matches!(
        validate_breaks(&tree, &registry),
        Err(RegistryError::StaleBreak { .. })
    ));
}

#[test]
fn raw_list_edits_are_detected() {
    let mut registry = BreakRegistry::new();
    let lp = registry.declare(BreakableKind::While);
    let mut brk = registry.new_break(BreakKind::Break);
    registry.register_break(lp, &mut brk).unwrap();
    registry.breaks_mut(lp).unwrap().clear();

    let tree: StatementBlock =
        vec![Statement::While(While::new(lp, below(3), vec![Statement::Break(brk)].into()))].into();

    assert!(matches!(
        validate_breaks(&tree, &registry),
        Err(RegistryError::Inconsistent { .. })
    ));
}

#[test]
fn nested_break_may_target_an_outer_loop_through_a_switch() {
    let mut registry = BreakRegistry::new();
    let outer = registry.declare(BreakableKind::While);
    let switch_id = registry.declare(BreakableKind::Switch);
    let mut leave_switch = registry.new_break(BreakKind::Break);
    registry.register_break(switch_id, &mut leave_switch).unwrap();
    let mut next_iteration = registry.new_break(BreakKind::Continue);
    registry.register_break(outer, &mut next_iteration).unwrap();

    let switch = Switch::new(
        switch_id,
        counter(),
        vec![
            SwitchArm::new(vec![0], vec![Statement::Break(next_iteration)].into()),
            SwitchArm::new(vec![1], vec![Statement::Break(leave_switch)].into()),
        ],
    )
    .unwrap();
    let tree: StatementBlock = vec![Statement::While(While::new(
        outer,
        below(10),
        vec![Statement::Switch(switch)].into(),
    ))]
    .into();

    validate_breaks(&tree, &registry).unwrap();
    assert_eq!(registry.breaks(outer).len(), 1);
    assert_eq!(registry.breaks(switch_id).len(), 1);
}

#[test]
fn construct_may_break_to_a_breakable_still_open_around_it() {
    let mut registry = BreakRegistry::new();
    let outer = registry.declare(BreakableKind::While);
    let inner = registry.declare(BreakableKind::While);
    let mut leave_outer = registry.new_break(BreakKind::Break);
    registry.register_break(outer, &mut leave_outer).unwrap();
    leave_outer.set_nested(true);

    let built = Statement::While(While::new(
        inner,
        below(3),
        vec![Statement::Break(leave_outer)].into(),
    ));

    validate_construct(&built, &registry, &[outer]).unwrap();
    assert!(matches!(
        validate_construct(&built, &registry, &[]),
        Err(RegistryError::NotEnclosing { .. })
    ));
}

#[test]
fn construct_missing_one_of_its_breaks_is_stale() {
    let mut registry = BreakRegistry::new();
    let lp = registry.declare(BreakableKind::While);
    let mut brk = registry.new_break(BreakKind::Break);
    registry.register_break(lp, &mut brk).unwrap();

    let built = Statement::While(While::new(lp, below(3), StatementBlock::new()));

    assert!(matches!(
        validate_construct(&built, &registry, &[]),
        Err(RegistryError::StaleBreak { .. })
    ));
}
