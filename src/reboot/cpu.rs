//! CPU State Registry
//!
//! Fixed table of execution unit descriptors built at platform discovery and
//! never resized afterwards. Slots are kept sorted by unit id so lookups are
//! a binary search.

use alloc::boxed::Box;
use alloc::vec::Vec;

use super::types::{CpuState, ExecutionUnit, UnitId};

pub struct CpuRegistry {
    units: Box<[ExecutionUnit]>,
}

impl CpuRegistry {
    /// Build the registry from discovered units. Duplicate ids keep the
    /// first descriptor.
    pub fn new(mut units: Vec<ExecutionUnit>) -> Self {
        units.sort_by_key(|unit| unit.id);
        units.dedup_by_key(|unit| unit.id);
        crate::kdebug!("RESET: registry holds {} execution units", units.len());
        Self {
            units: units.into_boxed_slice(),
        }
    }

    /// Build the registry from a list of present thread ids, all starting in
    /// `initial`, with `guarded` ids excluded from coordination.
    ///
    /// Thread ids encode `core * threads_per_core + thread`; thread 0 of each
    /// core is its lead. See `ProcGen::threads_per_core`.
    pub fn discover<I>(
        ids: I,
        guarded: &[UnitId],
        initial: CpuState,
        threads_per_core: u32,
    ) -> Self
    where
        I: IntoIterator<Item = UnitId>,
    {
        let tpc = threads_per_core.max(1);
        let units = ids
            .into_iter()
            .map(|id| {
                ExecutionUnit::new(id, id.0 / tpc, id.0 % tpc == 0, guarded.contains(&id), initial)
            })
            .collect();
        Self::new(units)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn get(&self, id: UnitId) -> Option<&ExecutionUnit> {
        self.units
            .binary_search_by_key(&id, |unit| unit.id)
            .ok()
            .map(|idx| &self.units[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExecutionUnit> {
        self.units.iter()
    }

    /// Units taking part in the rendezvous.
    pub fn unguarded(&self) -> impl Iterator<Item = &ExecutionUnit> {
        self.units.iter().filter(|unit| !unit.guarded)
    }

    /// Every other thread on `id`'s physical core, guarded or not.
    pub fn siblings(&self, id: UnitId) -> impl Iterator<Item = &ExecutionUnit> {
        let core = self.get(id).map(|unit| unit.core);
        self.units
            .iter()
            .filter(move |unit| unit.id != id && Some(unit.core) == core)
    }

    /// Whether `id` runs the per-core work of its sibling group. A unit
    /// missing from the registry is the only thread of its core.
    pub fn is_lead(&self, id: UnitId) -> bool {
        self.get(id).map_or(true, |unit| unit.lead)
    }

    /// Count of unguarded units currently in `state`.
    pub fn count_in(&self, state: CpuState) -> usize {
        self.unguarded().filter(|unit| unit.state() == state).count()
    }
}
