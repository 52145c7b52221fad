use std::collections::BTreeSet;

use nova_config::DECOMPILE_TARGET;
use nova_decompile_ast::{
    walk, ArithmeticOp, AstVisitor, BreakableId, BreakableKind, Condition, DoWhile, Expr,
    ExprKind, For, Literal, Node, Statement, StatementBlock, While,
};
use nova_flow::{BlockId, NaturalLoop, Terminator};

use super::{Context, Structurer};
use crate::error::StructureError;

/// How a loop tests its condition.
#[derive(Debug, Clone)]
enum LoopShape {
    /// The header holds nothing but the test.
    PreTested {
        condition: Condition,
        body_entry: BlockId,
        exit: BlockId,
    },
    /// The only latch holds the test.
    PostTested {
        latch: BlockId,
        condition: Condition,
        exit: BlockId,
    },
    Endless { exit: Option<BlockId> },
}

impl LoopShape {
    fn exit(&self) -> Option<BlockId> {
        match self {
            LoopShape::PreTested { exit, .. } | LoopShape::PostTested { exit, .. } => Some(*exit),
            LoopShape::Endless { exit } => *exit,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            LoopShape::PreTested { .. } => "pre-tested",
            LoopShape::PostTested { .. } => "post-tested",
            LoopShape::Endless { .. } => "endless",
        }
    }
}

impl Structurer<'_> {
    pub(super) fn structure_loop(
        &mut self,
        header: BlockId,
        stop: Option<BlockId>,
        out: &mut StatementBlock,
    ) -> Result<Option<BlockId>, StructureError> {
        self.entered_loops.insert(header);
        let Some(natural) = self.loops.get(header).cloned() else {
            return self.structure_block(header, stop, out);
        };

        let shape = self.classify_loop(&natural);
        let exit = shape.exit();
        let mut body = natural.body().clone();
        self.absorb_dominated(header, &mut body, exit);
        tracing::debug!(
            target: DECOMPILE_TARGET,
            header = %header,
            shape = shape.name(),
            blocks = body.len(),
            exit = ?exit,
            "structuring loop"
        );

        let statement = match shape {
            LoopShape::PreTested {
                condition,
                body_entry,
                exit,
            } => self.pre_tested(&natural, body, condition, body_entry, exit, out)?,
            LoopShape::PostTested {
                latch,
                condition,
                exit,
            } => self.post_tested(header, body, latch, condition, exit)?,
            LoopShape::Endless { exit } => self.endless(header, body, exit)?,
        };
        self.check_construct(&statement)?;
        out.push(statement);

        match exit {
            Some(exit) => self.flow_to(header, exit, stop, out),
            None => Ok(None),
        }
    }

    fn classify_loop(&self, natural: &NaturalLoop) -> LoopShape {
        let header = natural.header();
        let head = self.graph.block(header);
        let try_at_header = self.pending_try(header).is_some();

        if head.statements.is_empty() && !try_at_header {
            if let Terminator::If {
                condition,
                then_target,
                else_target,
            } = &head.terminator
            {
                match (natural.contains(*then_target), natural.contains(*else_target)) {
                    (true, false) => {
                        return LoopShape::PreTested {
                            condition: condition.clone(),
                            body_entry: *then_target,
                            exit: *else_target,
                        }
                    }
                    (false, true) => {
                        return LoopShape::PreTested {
                            condition: condition.clone().negate(),
                            body_entry: *else_target,
                            exit: *then_target,
                        }
                    }
                    _ => {}
                }
            }
        }

        if let [latch] = natural.latches() {
            let latch = *latch;
            let tail = self.graph.block(latch);
            // Statements in the latch run on every `continue` in source form,
            // so they are only safe when nothing else jumps there.
            let latch_ok = if latch == header {
                !try_at_header
            } else {
                tail.statements.is_empty() || self.graph.predecessors(latch).len() == 1
            };
            if latch_ok {
                if let Terminator::If {
                    condition,
                    then_target,
                    else_target,
                } = &tail.terminator
                {
                    if *then_target == header && !natural.contains(*else_target) {
                        return LoopShape::PostTested {
                            latch,
                            condition: condition.clone(),
                            exit: *else_target,
                        };
                    }
                    if *else_target == header && !natural.contains(*then_target) {
                        return LoopShape::PostTested {
                            latch,
                            condition: condition.clone().negate(),
                            exit: *then_target,
                        };
                    }
                }
            }
        }

        let exit = natural
            .exit_targets(self.graph)
            .into_iter()
            .filter(|block| self.reachable[block.index()])
            .max_by_key(|block| self.rpo_of(*block));
        LoopShape::Endless { exit }
    }

    /// Adds to `body` the blocks that can only be entered from inside the
    /// loop and never leave it except through `exit`, an enclosing jump
    /// target, or a `return`/`throw`.
    fn absorb_dominated(
        &self,
        header: BlockId,
        body: &mut BTreeSet<BlockId>,
        exit: Option<BlockId>,
    ) {
        let mut kept: BTreeSet<BlockId> = self
            .graph
            .block_ids()
            .filter(|block| {
                !body.contains(block)
                    && Some(*block) != exit
                    && self.reachable[block.index()]
                    && !self.is_taken(*block)
                    && self.in_region(*block)
                    && !self.is_jump_target(*block)
                    && self.effectively_dominated(header, *block)
            })
            .collect();

        loop {
            let escaping: Vec<BlockId> = kept
                .iter()
                .copied()
                .filter(|block| {
                    !self.graph.successors(*block).all(|succ| {
                        body.contains(&succ)
                            || kept.contains(&succ)
                            || Some(succ) == exit
                            || self.is_jump_target(succ)
                    })
                })
                .collect();
            if escaping.is_empty() {
                break;
            }
            for block in escaping {
                kept.remove(&block);
            }
        }

        let mut stack: Vec<BlockId> = kept
            .iter()
            .copied()
            .filter(|block| {
                self.graph
                    .predecessors(*block)
                    .iter()
                    .any(|pred| body.contains(pred))
                    || self.graph.handlers().iter().any(|row| {
                        row.handler == *block && body.iter().any(|inner| row.covers(*inner))
                    })
            })
            .collect();
        while let Some(block) = stack.pop() {
            if !body.insert(block) {
                continue;
            }
            stack.extend(
                self.graph
                    .successors(block)
                    .filter(|succ| kept.contains(succ) && !body.contains(succ)),
            );
        }
    }

    /// Dominance where a handler entry counts as dominated by whatever
    /// dominates the start of a range it protects.
    fn effectively_dominated(&self, header: BlockId, block: BlockId) -> bool {
        let mut current = Some(block);
        let mut steps = 0;
        while let Some(at) = current {
            if at == header {
                return true;
            }
            steps += 1;
            if steps > self.graph.len() {
                return false;
            }
            current = self.doms.immediate(at).or_else(|| {
                self.graph
                    .handlers()
                    .iter()
                    .find(|row| row.handler == at)
                    .map(|row| row.start)
            });
        }
        false
    }

    fn pre_tested(
        &mut self,
        natural: &NaturalLoop,
        body: BTreeSet<BlockId>,
        condition: Condition,
        body_entry: BlockId,
        exit: BlockId,
        out: &mut StatementBlock,
    ) -> Result<Statement, StructureError> {
        let header = natural.header();
        self.take_block(header)?;
        let update_block = self.update_block(natural, body_entry);
        let continue_target = update_block.unwrap_or(header);

        let id = self.registry.declare(BreakableKind::While);
        let ctx = Context::new(id, BreakableKind::While, Some(exit), Some(continue_target));
        let (mut loop_body, continues) = self.with_region(body, |this| {
            this.with_context(ctx, |this| {
                this.structure_arm(header, body_entry, Some(continue_target))
            })
        })?;

        // `continue` lands on the update block, so the loop must be a `for`
        // whatever the recovery setting says.
        if let Some(update_block) = update_block {
            let update = self.take_block(update_block)?.statements.first().cloned();
            let init = update
                .as_ref()
                .and_then(induction_local)
                .and_then(|local| take_init(out, local));
            self.mark_for(id, header)?;
            return Ok(For::new(id, init, condition, update, loop_body).into());
        }

        if self.config.recover_for_loops && continues == 0 {
            if let Some((init, update)) = recover_induction(&condition, &mut loop_body, out) {
                self.mark_for(id, header)?;
                return Ok(For::new(id, Some(init), condition, Some(update), loop_body).into());
            }
        }
        Ok(While::new(id, condition, loop_body).into())
    }

    fn post_tested(
        &mut self,
        header: BlockId,
        body: BTreeSet<BlockId>,
        latch: BlockId,
        condition: Condition,
        exit: BlockId,
    ) -> Result<Statement, StructureError> {
        let id = self.registry.declare(BreakableKind::DoWhile);
        let ctx = Context::new(id, BreakableKind::DoWhile, Some(exit), Some(latch));
        let (loop_body, _) = self.with_region(body, |this| {
            this.with_context(ctx, |this| {
                let mut block = StatementBlock::new();
                if latch != header {
                    let next = this.structure_block(header, Some(latch), &mut block)?;
                    this.structure_sequence(next, Some(latch), &mut block)?;
                }
                block.extend(this.take_block(latch)?.statements.iter().cloned());
                Ok(block)
            })
        })?;
        Ok(DoWhile::new(id, condition, loop_body).into())
    }

    fn endless(
        &mut self,
        header: BlockId,
        body: BTreeSet<BlockId>,
        exit: Option<BlockId>,
    ) -> Result<Statement, StructureError> {
        let id = self.registry.declare(BreakableKind::While);
        let ctx = Context::new(id, BreakableKind::While, exit, Some(header));
        let (loop_body, _) = self.with_region(body, |this| {
            this.with_context(ctx, |this| {
                let mut block = StatementBlock::new();
                let next = this.structure_block(header, Some(header), &mut block)?;
                this.structure_sequence(next, Some(header), &mut block)?;
                Ok(block)
            })
        })?;
        Ok(While::new(id, Condition::Constant(true), loop_body).into())
    }

    /// A shared latch holding one simple statement that every `continue`
    /// path runs before the test: the update clause of a `for`.
    fn update_block(&self, natural: &NaturalLoop, body_entry: BlockId) -> Option<BlockId> {
        let [latch] = natural.latches() else {
            return None;
        };
        let latch = *latch;
        if latch == natural.header() || latch == body_entry {
            return None;
        }
        let tail = self.graph.block(latch);
        let simple = matches!(
            tail.statements.as_slice(),
            [Statement::Expr(_) | Statement::Assign(_) | Statement::Increment(_)]
        );
        let jumps_back = matches!(tail.terminator, Terminator::Goto { target } if target == natural.header());
        (simple && jumps_back && self.graph.predecessors(latch).len() >= 2).then_some(latch)
    }

    fn mark_for(&mut self, id: BreakableId, header: BlockId) -> Result<(), StructureError> {
        self.registry
            .set_kind(id, BreakableKind::For)
            .map_err(|source| StructureError::Registry {
                block: header,
                source,
            })
    }
}

/// `i++`, `i += c` or `i = i ± c` with a non-zero integral constant.
fn induction_local(stmt: &Statement) -> Option<u16> {
    match stmt {
        Statement::Increment(inc) if inc.amount() != 0 => Some(inc.local().index),
        Statement::Assign(assign) => {
            let ExprKind::Local(target) = assign.target().kind() else {
                return None;
            };
            let ExprKind::Arithmetic(step) = assign.value().kind() else {
                return None;
            };
            if !matches!(step.op(), ArithmeticOp::Add | ArithmeticOp::Sub) {
                return None;
            }
            let ExprKind::Local(source) = step.left().kind() else {
                return None;
            };
            let constant = matches!(
                step.right().kind(),
                ExprKind::Literal(lit @ (Literal::Int(_) | Literal::Long(_))) if !lit.is_zero()
            );
            (source.index == target.index && constant).then_some(target.index)
        }
        _ => None,
    }
}

fn assigned_local(stmt: &Statement) -> Option<u16> {
    match stmt {
        Statement::Assign(assign) => match assign.target().kind() {
            ExprKind::Local(local) => Some(local.index),
            _ => None,
        },
        _ => None,
    }
}

/// Pops the assignment to `local` right before the loop, if there is one.
fn take_init(out: &mut StatementBlock, local: u16) -> Option<Statement> {
    if out.last().and_then(assigned_local) == Some(local) {
        out.pop()
    } else {
        None
    }
}

/// Turns `init; while (cond) { ...; step; }` into `for` parts when `step`
/// advances a local that `cond` reads and `init` assigns it.
fn recover_induction(
    condition: &Condition,
    body: &mut StatementBlock,
    out: &mut StatementBlock,
) -> Option<(Statement, Statement)> {
    let local = body.last().and_then(induction_local)?;
    if !condition_locals(condition).contains(&local) {
        return None;
    }
    if out.last().and_then(assigned_local) != Some(local) {
        return None;
    }
    let update = body.pop()?;
    let init = out.pop()?;
    Some((init, update))
}

fn condition_locals(condition: &Condition) -> BTreeSet<u16> {
    struct Locals(BTreeSet<u16>);

    impl AstVisitor for Locals {
        fn visit_expr(&mut self, expr: &Expr) {
            if let ExprKind::Local(local) = expr.kind() {
                self.0.insert(local.index);
            }
        }
    }

    let mut locals = Locals(BTreeSet::new());
    walk(Node::Condition(condition), &mut locals);
    locals.0
}
