//! Loop/switch identities and the relation between breaks and their targets.
//!
//! Statements never point at each other. A breakable construct carries a
//! [`BreakableId`], each [`Break`] carries a [`BreakId`], and the
//! [`BreakRegistry`] owns the two-way relation between them. Keeping the
//! relation in a single table means both directions are always updated
//! together; [`validate_breaks`] checks that a finished tree agrees with it.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::error::RegistryError;
use crate::stmt::{Statement, StatementBlock};

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BreakableId(u32);

impl BreakableId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for BreakableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BreakableId({})", self.0)
    }
}

impl fmt::Display for BreakableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BreakId(u32);

impl fmt::Debug for BreakId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BreakId({})", self.0)
    }
}

impl fmt::Display for BreakId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BreakableKind {
    While,
    DoWhile,
    For,
    Switch,
}

impl BreakableKind {
    #[must_use]
    pub fn is_loop(self) -> bool {
        !matches!(self, BreakableKind::Switch)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BreakKind {
    Break,
    Continue,
}

/// A `break` or `continue` statement.
///
/// The target is only ever set through the registry, so a break's view of its
/// target and the registry's view cannot drift apart through this type.
#[derive(Debug, Clone)]
pub struct Break {
    id: BreakId,
    kind: BreakKind,
    target: Option<BreakableId>,
    nested: bool,
}

impl Break {
    #[must_use]
    pub fn id(&self) -> BreakId {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> BreakKind {
        self.kind
    }

    #[must_use]
    pub fn target(&self) -> Option<BreakableId> {
        self.target
    }

    /// Whether the break crosses another breakable and so needs a label.
    #[must_use]
    pub fn is_nested(&self) -> bool {
        self.nested
    }

    pub fn set_nested(&mut self, nested: bool) {
        self.nested = nested;
    }
}

/// Statement forms a break may target.
pub trait Breakable {
    fn breakable_id(&self) -> BreakableId;

    fn breakable_kind(&self) -> BreakableKind;

    /// Live list of breaks targeting this construct, in registration order.
    fn breaks<'r>(&self, registry: &'r BreakRegistry) -> &'r [BreakId] {
        registry.breaks(self.breakable_id())
    }

    fn register_break(
        &self,
        registry: &mut BreakRegistry,
        brk: &mut Break,
    ) -> Result<(), RegistryError> {
        registry.register_break(self.breakable_id(), brk)
    }
}

#[derive(Debug, Clone)]
struct BreakableEntry {
    kind: BreakableKind,
    breaks: Vec<BreakId>,
}

#[derive(Debug, Clone, Default)]
pub struct BreakRegistry {
    breakables: Vec<BreakableEntry>,
    targets: BTreeMap<BreakId, BreakableId>,
    kinds: BTreeMap<BreakId, BreakKind>,
    next_break: u32,
}

impl BreakRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, kind: BreakableKind) -> BreakableId {
        let id = BreakableId(self.breakables.len() as u32);
        self.breakables.push(BreakableEntry {
            kind,
            breaks: Vec::new(),
        });
        id
    }

    /// Allocates an unregistered break with a fresh id.
    pub fn new_break(&mut self, kind: BreakKind) -> Break {
        let id = BreakId(self.next_break);
        self.next_break += 1;
        self.kinds.insert(id, kind);
        Break {
            id,
            kind,
            target: None,
            nested: false,
        }
    }

    #[must_use]
    pub fn kind(&self, id: BreakableId) -> Option<BreakableKind> {
        self.breakables.get(id.index()).map(|entry| entry.kind)
    }

    /// Changes a declared breakable's kind, e.g. once a loop shape is recognised.
    pub fn set_kind(&mut self, id: BreakableId, kind: BreakableKind) -> Result<(), RegistryError> {
        let has_continue = self
            .breaks(id)
            .iter()
            .any(|brk| self.kinds.get(brk) == Some(&BreakKind::Continue));
        let entry = self
            .breakables
            .get_mut(id.index())
            .ok_or(RegistryError::UnknownBreakable(id))?;
        if !kind.is_loop() && has_continue {
            return Err(RegistryError::KindChange { target: id, kind });
        }
        entry.kind = kind;
        Ok(())
    }

    pub fn breakables(&self) -> impl Iterator<Item = (BreakableId, BreakableKind)> + '_ {
        self.breakables
            .iter()
            .enumerate()
            .map(|(idx, entry)| (BreakableId(idx as u32), entry.kind))
    }

    /// Breaks currently targeting `id`; empty for unknown ids.
    #[must_use]
    pub fn breaks(&self, id: BreakableId) -> &[BreakId] {
        self.breakables
            .get(id.index())
            .map(|entry| entry.breaks.as_slice())
            .unwrap_or(&[])
    }

    /// Mutable access to the raw list. Edits here bypass the reverse index;
    /// [`validate_breaks`] reports any resulting disagreement.
    pub fn breaks_mut(&mut self, id: BreakableId) -> Option<&mut Vec<BreakId>> {
        self.breakables.get_mut(id.index()).map(|entry| &mut entry.breaks)
    }

    #[must_use]
    pub fn target_of(&self, brk: BreakId) -> Option<BreakableId> {
        self.targets.get(&brk).copied()
    }

    /// Records `brk` as targeting `target` and sets its target field.
    ///
    /// Registering a break on the target it already has is a no-op.
    pub fn register_break(
        &mut self,
        target: BreakableId,
        brk: &mut Break,
    ) -> Result<(), RegistryError> {
        self.check_target(target, brk)?;
        match brk.target {
            Some(current) if current == target => return Ok(()),
            Some(current) => {
                return Err(RegistryError::AlreadyTargeted {
                    brk: brk.id,
                    current,
                    requested: target,
                })
            }
            None => {}
        }
        self.link(target, brk);
        Ok(())
    }

    /// Moves `brk` to `new_target`. Validation happens before any state
    /// changes, so a failed retarget leaves both sides untouched.
    pub fn retarget(
        &mut self,
        brk: &mut Break,
        new_target: BreakableId,
    ) -> Result<(), RegistryError> {
        self.check_target(new_target, brk)?;
        self.unlink(brk);
        self.link(new_target, brk);
        Ok(())
    }

    /// Removes `brk` from its target, returning the old target.
    pub fn unregister(&mut self, brk: &mut Break) -> Option<BreakableId> {
        self.unlink(brk)
    }

    fn check_target(&self, target: BreakableId, brk: &Break) -> Result<(), RegistryError> {
        let kind = self
            .kind(target)
            .ok_or(RegistryError::UnknownBreakable(target))?;
        if brk.kind == BreakKind::Continue && !kind.is_loop() {
            return Err(RegistryError::ContinueTargetsSwitch {
                brk: brk.id,
                target,
            });
        }
        Ok(())
    }

    fn link(&mut self, target: BreakableId, brk: &mut Break) {
        if let Some(entry) = self.breakables.get_mut(target.index()) {
            entry.breaks.push(brk.id);
        }
        self.targets.insert(brk.id, target);
        brk.target = Some(target);
    }

    fn unlink(&mut self, brk: &mut Break) -> Option<BreakableId> {
        let previous = brk.target.take().or_else(|| self.targets.get(&brk.id).copied());
        self.targets.remove(&brk.id);
        if let Some(previous) = previous {
            if let Some(entry) = self.breakables.get_mut(previous.index()) {
                entry.breaks.retain(|id| *id != brk.id);
            }
        }
        previous
    }
}

/// Checks that every break in `body` is registered on an enclosing breakable
/// and that the registry lists exactly the breaks present in the tree.
pub fn validate_breaks(body: &StatementBlock, registry: &BreakRegistry) -> Result<(), RegistryError> {
    let walk = walk_breaks(body.iter(), registry, &[])?;

    for (target, _) in registry.breakables() {
        for brk in registry.breaks(target) {
            if !walk.seen.contains(brk) {
                return Err(RegistryError::StaleBreak { brk: *brk, target });
            }
            if registry.target_of(*brk) != Some(target) {
                return Err(RegistryError::Inconsistent {
                    brk: *brk,
                    found: Some(target),
                    recorded: registry.target_of(*brk),
                });
            }
        }
    }

    Ok(())
}

/// Checks one freshly built construct while its enclosing breakables, `open`
/// (outermost first), are still under construction.
///
/// Breaks inside `stmt` may target a breakable declared inside it or one of
/// `open`. Every break registered on a breakable declared inside `stmt` must
/// appear in it.
pub fn validate_construct(
    stmt: &Statement,
    registry: &BreakRegistry,
    open: &[BreakableId],
) -> Result<(), RegistryError> {
    let walk = walk_breaks(std::iter::once(stmt), registry, open)?;
    for target in walk.declared {
        for brk in registry.breaks(target) {
            if !walk.seen.contains(brk) {
                return Err(RegistryError::StaleBreak { brk: *brk, target });
            }
        }
    }
    Ok(())
}

struct BreakWalk {
    seen: HashSet<BreakId>,
    declared: Vec<BreakableId>,
}

fn walk_breaks<'a>(
    roots: impl DoubleEndedIterator<Item = &'a Statement>,
    registry: &BreakRegistry,
    open: &[BreakableId],
) -> Result<BreakWalk, RegistryError> {
    enum Step<'a> {
        Enter(&'a Statement),
        Leave,
    }

    let mut walk = BreakWalk {
        seen: HashSet::new(),
        declared: Vec::new(),
    };
    let mut enclosing: Vec<BreakableId> = open.to_vec();
    let mut stack: Vec<Step<'_>> = roots.rev().map(Step::Enter).collect();

    while let Some(step) = stack.pop() {
        let stmt = match step {
            Step::Enter(stmt) => stmt,
            Step::Leave => {
                enclosing.pop();
                continue;
            }
        };

        if let Statement::Break(brk) = stmt {
            if !walk.seen.insert(brk.id()) {
                return Err(RegistryError::DuplicateBreak(brk.id()));
            }
            let target = brk.target().ok_or(RegistryError::Unregistered(brk.id()))?;
            let recorded = registry.target_of(brk.id());
            if recorded != Some(target) || !registry.breaks(target).contains(&brk.id()) {
                return Err(RegistryError::Inconsistent {
                    brk: brk.id(),
                    found: Some(target),
                    recorded,
                });
            }
            if !enclosing.contains(&target) {
                return Err(RegistryError::NotEnclosing {
                    brk: brk.id(),
                    target,
                });
            }
            if brk.kind() == BreakKind::Continue && registry.kind(target) == Some(BreakableKind::Switch)
            {
                return Err(RegistryError::ContinueTargetsSwitch {
                    brk: brk.id(),
                    target,
                });
            }
            continue;
        }

        if let Some(breakable) = stmt.as_breakable() {
            enclosing.push(breakable.breakable_id());
            walk.declared.push(breakable.breakable_id());
            stack.push(Step::Leave);
        }
        for child in stmt.child_blocks().into_iter().rev() {
            stack.extend(child.iter().rev().map(Step::Enter));
        }
    }

    Ok(walk)
}
