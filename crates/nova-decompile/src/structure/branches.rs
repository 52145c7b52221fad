use nova_config::DECOMPILE_TARGET;
use nova_decompile_ast::{Condition, If, Statement, StatementBlock};
use nova_flow::BlockId;

use super::Structurer;
use crate::error::StructureError;

impl Structurer<'_> {
    /// Follow block of the construct headed by `block`: the first block both
    /// paths reach again, or `stop` when the paths never rejoin inside the
    /// current region.
    pub(super) fn merge_point(&self, block: BlockId, stop: Option<BlockId>) -> Option<BlockId> {
        let usable = |candidate: BlockId| {
            candidate != block
                && self.in_region(candidate)
                && !self.is_taken(candidate)
                && !self.is_jump_target(candidate)
        };

        if let Some(post) = self.post_doms.immediate(block) {
            if usable(post) {
                return Some(post);
            }
        }

        // No usable post-dominator (one side leaves the region or jumps to a
        // `break`/`continue` target): fall back to the latest dominated join.
        self.doms
            .children(block)
            .into_iter()
            .filter(|child| usable(*child) && self.forward_preds(*child) >= 2)
            .max_by_key(|child| self.rpo_of(*child))
            .or(stop)
    }

    fn forward_preds(&self, block: BlockId) -> usize {
        let pos = self.rpo_of(block);
        self.graph
            .predecessors(block)
            .iter()
            .filter(|pred| self.rpo_of(**pred) < pos)
            .count()
    }

    pub(super) fn structure_if(
        &mut self,
        block: BlockId,
        condition: Condition,
        then_target: BlockId,
        else_target: BlockId,
        stop: Option<BlockId>,
        out: &mut StatementBlock,
    ) -> Result<Option<BlockId>, StructureError> {
        let merge = self.merge_point(block, stop);
        let arm_stop = merge.or(stop);
        tracing::trace!(
            target: DECOMPILE_TARGET,
            block = %block,
            merge = ?merge,
            "two-way branch"
        );

        let then_block = self.structure_arm(block, then_target, arm_stop)?;
        let else_block = self.structure_arm(block, else_target, arm_stop)?;
        let open_ended = merge.is_none() || merge == stop;
        push_if(condition, then_block, else_block, open_ended, out);

        match merge {
            Some(merge) if Some(merge) != stop => self.flow_to(block, merge, stop, out),
            _ => Ok(None),
        }
    }

    /// Structures one outgoing edge of `from` up to `stop`.
    pub(super) fn structure_arm(
        &mut self,
        from: BlockId,
        target: BlockId,
        stop: Option<BlockId>,
    ) -> Result<StatementBlock, StructureError> {
        let mut body = StatementBlock::new();
        let first = self.flow_to(from, target, stop, &mut body)?;
        self.structure_sequence(first, stop, &mut body)?;
        Ok(body)
    }
}

/// Emits the branch in its most direct form. When the paths do not rejoin and
/// one arm is a lone jump, the other arm follows the `if` unnested.
fn push_if(
    condition: Condition,
    then_block: StatementBlock,
    else_block: StatementBlock,
    open_ended: bool,
    out: &mut StatementBlock,
) {
    match (then_block.is_empty(), else_block.is_empty()) {
        (_, true) => out.push(If::new(condition, then_block, None).into()),
        (true, false) => out.push(If::new(condition.negate(), else_block, None).into()),
        (false, false) if open_ended && is_lone_jump(&then_block) => {
            out.push(If::new(condition, then_block, None).into());
            out.extend(else_block);
        }
        (false, false) if open_ended && is_lone_jump(&else_block) => {
            out.push(If::new(condition.negate(), else_block, None).into());
            out.extend(then_block);
        }
        (false, false) => out.push(If::new(condition, then_block, Some(else_block)).into()),
    }
}

fn is_lone_jump(block: &StatementBlock) -> bool {
    block.len() == 1 && block.last().is_some_and(Statement::is_terminal)
}
