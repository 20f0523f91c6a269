//! Reboot Type Definitions
//!
//! Execution unit descriptors, the per-unit state machine values, and the
//! terminal handoff tags returned by non-returning paths.

use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};

use super::error::CommitFailure;

/// Default bound for the first rendezvous barrier
pub const PRESENT_TIMEOUT_MS: u64 = 100;

/// NVRAM key gating fast reboot on generations where it is experimental
pub const FAST_RESET_NVRAM_KEY: &str = "experimental-fast-reset";
pub const FAST_RESET_NVRAM_VALUE: &str = "feeling-lucky";

/// Hardware thread identifier (processor identification register value)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitId(pub u32);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// Execution unit state
#[repr(u8)]
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum CpuState {
    Unknown = 0,
    /// Took the reset and is running the reset handler.
    Rebooting = 1,
    /// Reached the first rendezvous.
    Present = 2,
    /// Finished local cleanup.
    Active = 3,
    /// Handed to the operating system.
    Os = 4,
    Sleeping = 5,
    Disabled = 6,
}

impl CpuState {
    pub fn from_atomic(val: u8) -> Self {
        match val {
            1 => CpuState::Rebooting,
            2 => CpuState::Present,
            3 => CpuState::Active,
            4 => CpuState::Os,
            5 => CpuState::Sleeping,
            6 => CpuState::Disabled,
            _ => CpuState::Unknown,
        }
    }
}

/// One hardware thread.
///
/// `state` is written only by the owning unit; everyone else reads it.
pub struct ExecutionUnit {
    pub id: UnitId,
    /// Physical core (sibling group) id, fixed at discovery.
    pub core: u32,
    /// Leads per-core operations for its sibling group.
    pub lead: bool,
    /// Excluded from coordination (offline or faulty).
    pub guarded: bool,
    state: AtomicU8,
    /// Saved resume address; zero routes a reset into the fast reboot entry.
    resume_addr: AtomicU64,
    /// Core was left in fast sleep with a workaround applied.
    in_fast_sleep: AtomicBool,
}

impl ExecutionUnit {
    pub fn new(id: UnitId, core: u32, lead: bool, guarded: bool, initial: CpuState) -> Self {
        Self {
            id,
            core,
            lead,
            guarded,
            state: AtomicU8::new(initial as u8),
            resume_addr: AtomicU64::new(0),
            in_fast_sleep: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> CpuState {
        CpuState::from_atomic(self.state.load(Ordering::Acquire))
    }

    /// Raw store. Callers on the reboot path go through
    /// `RebootContext::set_own_state`, which adds the barriers.
    pub fn store_state(&self, state: CpuState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub fn resume_addr(&self) -> u64 {
        self.resume_addr.load(Ordering::Acquire)
    }

    pub fn set_resume_addr(&self, addr: u64) {
        self.resume_addr.store(addr, Ordering::Release);
    }

    pub fn in_fast_sleep(&self) -> bool {
        self.in_fast_sleep.load(Ordering::Acquire)
    }

    pub fn set_in_fast_sleep(&self, value: bool) {
        self.in_fast_sleep.store(value, Ordering::Release);
    }
}

impl fmt::Debug for ExecutionUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionUnit")
            .field("id", &self.id)
            .field("core", &self.core)
            .field("lead", &self.lead)
            .field("guarded", &self.guarded)
            .field("state", &self.state())
            .finish()
    }
}

/// Terminal result of a non-returning path.
///
/// A top-level driver treats any `Handoff` as the end of the current
/// process image: the code that produced it never resumes its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handoff {
    /// Secondary entered the generic job dispatch loop.
    JobLoop,
    /// Payload loader took over.
    Payload { resume: bool },
    /// Commit failed; the machine is left for external recovery.
    Stranded(CommitFailure),
    /// Post-commit failure fell back to a full cold reboot.
    ColdReboot,
    /// Post-commit failure with no cold reboot available.
    Halted,
}
