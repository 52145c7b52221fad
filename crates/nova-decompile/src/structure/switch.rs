use nova_config::DECOMPILE_TARGET;
use nova_decompile_ast::{BreakableKind, Expr, Statement, StatementBlock, Switch, SwitchArm};
use nova_flow::BlockId;

use super::{Context, Structurer};
use crate::error::StructureError;

/// One arm before its body is structured.
#[derive(Debug, Clone)]
struct PendingArm {
    entry: BlockId,
    labels: Vec<i32>,
    is_default: bool,
    /// Labels whose target is the follow block; the body is a lone `break`.
    exits: bool,
}

impl Structurer<'_> {
    pub(super) fn structure_switch(
        &mut self,
        block: BlockId,
        discriminant: Expr,
        cases: &[(i32, BlockId)],
        default: BlockId,
        stop: Option<BlockId>,
        out: &mut StatementBlock,
    ) -> Result<Option<BlockId>, StructureError> {
        let merge = self.merge_point(block, stop);
        let arms = group_arms(cases, default, merge);
        let order = self.arm_order(block, &arms);
        tracing::trace!(
            target: DECOMPILE_TARGET,
            block = %block,
            arms = arms.len(),
            merge = ?merge,
            "switch"
        );

        let id = self.registry.declare(BreakableKind::Switch);
        let ctx = Context::new(id, BreakableKind::Switch, merge, None);
        let (bodies, _) = self.with_context(ctx, |this| {
            let mut bodies = Vec::with_capacity(order.len());
            for (pos, index) in order.iter().enumerate() {
                // A non-last arm ends where the next one begins, so falling
                // off its end is fall-through rather than a `break`.
                let arm_stop = match order.get(pos + 1) {
                    Some(next) => Some(arms[*next].entry),
                    None => merge.or(stop),
                };
                bodies.push(this.structure_arm(block, arms[*index].entry, arm_stop)?);
            }
            Ok(bodies)
        })?;

        let built = order
            .iter()
            .zip(bodies)
            .map(|(index, body)| {
                let arm = &arms[*index];
                if arm.is_default {
                    SwitchArm::default_arm(body)
                } else {
                    SwitchArm::new(arm.labels.clone(), body)
                }
            })
            .collect();
        let switch: Statement = Switch::new(id, discriminant, built)
            .map_err(|source| StructureError::Constraint { block, source })?
            .into();
        self.check_construct(&switch)?;
        out.push(switch);

        match merge {
            Some(merge) if Some(merge) != stop => self.flow_to(block, merge, stop, out),
            _ => Ok(None),
        }
    }

    /// Label order, except that an arm another arm falls into is placed
    /// directly after it.
    fn arm_order(&self, block: BlockId, arms: &[PendingArm]) -> Vec<usize> {
        let count = arms.len();
        let mut next: Vec<Option<usize>> = vec![None; count];
        let mut prev: Vec<Option<usize>> = vec![None; count];
        for (to, arm) in arms.iter().enumerate() {
            if arm.exits {
                continue;
            }
            for pred in self.graph.predecessors(arm.entry) {
                if *pred == block {
                    continue;
                }
                let from = (0..count).find(|from| {
                    *from != to
                        && !arms[*from].exits
                        && next[*from].is_none()
                        && self.doms.dominates(arms[*from].entry, *pred)
                });
                if let (Some(from), None) = (from, prev[to]) {
                    next[from] = Some(to);
                    prev[to] = Some(from);
                }
            }
        }

        let mut placed = vec![false; count];
        let mut order = Vec::with_capacity(count);
        for start in 0..count {
            if placed[start] {
                continue;
            }
            let mut head = start;
            let mut steps = 0;
            while let Some(before) = prev[head] {
                if placed[before] || steps > count {
                    break;
                }
                head = before;
                steps += 1;
            }
            let mut current = Some(head);
            while let Some(index) = current {
                if placed[index] {
                    break;
                }
                placed[index] = true;
                order.push(index);
                current = next[index];
            }
        }
        order
    }
}

/// One arm per distinct target, labels in table order. When the default
/// also reaches the follow block, cases that jump straight there need no arm;
/// otherwise they share an arm that only breaks. A default that shares an arm
/// with cases absorbs them.
fn group_arms(cases: &[(i32, BlockId)], default: BlockId, merge: Option<BlockId>) -> Vec<PendingArm> {
    let default_exits = Some(default) == merge;
    let mut arms: Vec<PendingArm> = Vec::new();
    for (label, target) in cases {
        let exits = Some(*target) == merge;
        if exits && default_exits {
            continue;
        }
        match arms.iter_mut().find(|arm| arm.entry == *target) {
            Some(arm) => arm.labels.push(*label),
            None => arms.push(PendingArm {
                entry: *target,
                labels: vec![*label],
                is_default: false,
                exits,
            }),
        }
    }
    if !default_exits {
        match arms.iter_mut().find(|arm| arm.entry == default) {
            Some(arm) => arm.is_default = true,
            None => arms.push(PendingArm {
                entry: default,
                labels: Vec::new(),
                is_default: true,
                exits: false,
            }),
        }
    }
    arms
}
