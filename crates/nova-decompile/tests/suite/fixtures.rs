use nova_config::StructureConfig;
use nova_decompile::{structure, StructuredBody};
use nova_decompile_ast::{
    Assignment, CompareOp, Condition, Expr, Increment, Invoke, InvokeKind, Local, Statement, Ty,
};
use nova_flow::{BlockGraph, BlockGraphBuilder, BlockId, Terminator};

pub fn var(index: u16, name: &str) -> Expr {
    Expr::local(Local::named(index, name, Ty::INT))
}

/// `Log.<name>()`, a side effect that is easy to spot in rendered output.
pub fn call(name: &str) -> Statement {
    let invoke = Invoke::new(InvokeKind::Static, "Log", name, "()V", None, Vec::new()).unwrap();
    Statement::Expr(invoke.into())
}

pub fn less_than(index: u16, name: &str, limit: i32) -> Condition {
    Condition::compare(CompareOp::Lt, var(index, name), Expr::int(limit)).unwrap()
}

pub fn assign(index: u16, name: &str, value: i32) -> Statement {
    Assignment::new(var(index, name), Expr::int(value))
        .unwrap()
        .into()
}

pub fn increment(index: u16, name: &str) -> Statement {
    Increment::new(Local::named(index, name, Ty::INT), 1)
        .unwrap()
        .into()
}

pub fn goto(target: BlockId) -> Terminator {
    Terminator::Goto { target }
}

pub fn branch(condition: Condition, then_target: BlockId, else_target: BlockId) -> Terminator {
    Terminator::If {
        condition,
        then_target,
        else_target,
    }
}

/// A builder with `count` blocks already allocated.
pub fn blocks(count: usize) -> (BlockGraphBuilder, Vec<BlockId>) {
    let mut builder = BlockGraphBuilder::new();
    let ids = (0..count).map(|_| builder.new_block()).collect();
    (builder, ids)
}

pub fn checked() -> StructureConfig {
    StructureConfig {
        validate_breaks: true,
        ..StructureConfig::default()
    }
}

pub fn structured(graph: &BlockGraph) -> StructuredBody {
    structure(graph, &checked()).unwrap()
}

pub fn render(graph: &BlockGraph) -> String {
    structured(graph).body.to_string()
}
