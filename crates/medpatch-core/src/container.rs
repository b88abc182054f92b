//! Solution containers owned by entities.
//!
//! The patch engine reaches solutions only through the [`SolutionContainers`]
//! trait and re-queries handles on every operation, since containers can
//! change (or vanish) between calls. [`SolutionStore`] is the in-memory
//! implementation used by the reference host.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use slotmap::{SecondaryMap, SlotMap};

use crate::fixed::Fixed64;
use crate::id::{EntityId, ReagentId, SolutionId};
use crate::solution::Solution;

// ---------------------------------------------------------------------------
// Collaborator trait
// ---------------------------------------------------------------------------

/// Query and mutate entity-owned solutions.
pub trait SolutionContainers {
    /// Look up a named solution on an entity.
    fn solution(&self, entity: EntityId, name: &str) -> Option<SolutionId>;

    /// The solution an injection into `entity` should land in, if any.
    fn injectable_solution(&self, entity: EntityId) -> Option<SolutionId>;

    /// Read a solution by handle.
    fn get(&self, handle: SolutionId) -> Option<&Solution>;

    /// Remove up to `amount` from the solution. Returns what was removed
    /// (empty when the handle is stale).
    fn split(&mut self, handle: SolutionId, amount: Fixed64) -> Solution;

    /// Whether the container's admission rule accepts `solution`.
    fn can_add(&self, handle: SolutionId, solution: &Solution) -> bool;

    /// Add `solution`, handing it back if the container refuses it.
    fn try_add(&mut self, handle: SolutionId, solution: Solution) -> Result<(), Solution>;
}

// ---------------------------------------------------------------------------
// Admission rules
// ---------------------------------------------------------------------------

/// Which reagents a container admits on top of the volume check.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReagentFilter {
    #[default]
    Any,
    /// Only solutions made entirely of these reagents are admitted.
    Only(BTreeSet<ReagentId>),
}

impl ReagentFilter {
    pub fn admits(&self, solution: &Solution) -> bool {
        match self {
            ReagentFilter::Any => true,
            ReagentFilter::Only(allowed) => solution.reagents().all(|(r, _)| allowed.contains(&r)),
        }
    }
}

/// One entity-owned solution plus its container settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolutionSlot {
    pub owner: EntityId,
    pub name: String,
    /// Whether injections into the owner land here.
    pub injectable: bool,
    pub filter: ReagentFilter,
    pub solution: Solution,
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Arena of solutions indexed by owner.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SolutionStore {
    slots: SlotMap<SolutionId, SolutionSlot>,
    by_owner: SecondaryMap<EntityId, Vec<SolutionId>>,
}

impl SolutionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a named solution to `owner`. A solution with the same name on
    /// the same owner is replaced and its old handle becomes stale.
    pub fn insert(
        &mut self,
        owner: EntityId,
        name: impl Into<String>,
        solution: Solution,
        injectable: bool,
    ) -> SolutionId {
        let name = name.into();
        if let Some(old) = self.solution(owner, &name) {
            self.remove(old);
        }
        let id = self.slots.insert(SolutionSlot {
            owner,
            name,
            injectable,
            filter: ReagentFilter::Any,
            solution,
        });
        match self.by_owner.get_mut(owner) {
            Some(list) => list.push(id),
            None => {
                self.by_owner.insert(owner, vec![id]);
            }
        }
        id
    }

    /// Replace a container's admission rule. Returns false for stale handles.
    pub fn set_filter(&mut self, handle: SolutionId, filter: ReagentFilter) -> bool {
        match self.slots.get_mut(handle) {
            Some(slot) => {
                slot.filter = filter;
                true
            }
            None => false,
        }
    }

    pub fn slot(&self, handle: SolutionId) -> Option<&SolutionSlot> {
        self.slots.get(handle)
    }

    /// Direct mutable access, for hosts that edit payloads outside a transfer.
    pub fn get_mut(&mut self, handle: SolutionId) -> Option<&mut Solution> {
        self.slots.get_mut(handle).map(|s| &mut s.solution)
    }

    /// Remove one solution.
    pub fn remove(&mut self, handle: SolutionId) -> Option<SolutionSlot> {
        let slot = self.slots.remove(handle)?;
        if let Some(list) = self.by_owner.get_mut(slot.owner) {
            list.retain(|h| *h != handle);
        }
        Some(slot)
    }

    /// Remove every solution owned by `owner`.
    pub fn remove_owner(&mut self, owner: EntityId) -> usize {
        let Some(handles) = self.by_owner.remove(owner) else {
            return 0;
        };
        for handle in &handles {
            self.slots.remove(*handle);
        }
        handles.len()
    }

    /// Number of live solutions.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Volume of a named solution, zero when absent.
    pub fn volume_of(&self, owner: EntityId, name: &str) -> Fixed64 {
        self.solution(owner, name)
            .and_then(|h| self.get(h))
            .map(Solution::volume)
            .unwrap_or(Fixed64::ZERO)
    }
}

impl SolutionContainers for SolutionStore {
    fn solution(&self, entity: EntityId, name: &str) -> Option<SolutionId> {
        self.by_owner
            .get(entity)?
            .iter()
            .copied()
            .find(|h| self.slots.get(*h).is_some_and(|s| s.name == name))
    }

    fn injectable_solution(&self, entity: EntityId) -> Option<SolutionId> {
        self.by_owner
            .get(entity)?
            .iter()
            .copied()
            .find(|h| self.slots.get(*h).is_some_and(|s| s.injectable))
    }

    fn get(&self, handle: SolutionId) -> Option<&Solution> {
        self.slots.get(handle).map(|s| &s.solution)
    }

    fn split(&mut self, handle: SolutionId, amount: Fixed64) -> Solution {
        match self.slots.get_mut(handle) {
            Some(slot) => slot.solution.split(amount),
            None => Solution::new(Fixed64::ZERO),
        }
    }

    fn can_add(&self, handle: SolutionId, solution: &Solution) -> bool {
        self.slots
            .get(handle)
            .is_some_and(|s| s.filter.admits(solution) && s.solution.can_add_solution(solution))
    }

    fn try_add(&mut self, handle: SolutionId, solution: Solution) -> Result<(), Solution> {
        if !self.can_add(handle, &solution) {
            return Err(solution);
        }
        match self.slots.get_mut(handle) {
            Some(slot) => {
                slot.solution.add_solution(solution);
                Ok(())
            }
            None => Err(solution),
        }
    }
}
