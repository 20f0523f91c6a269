//! Reboot Global State
//!
//! The context object shared by every execution unit taking part in a fast
//! reboot: the CPU registry, the release flag, the sticky disable reason,
//! and the attempt counter. Each field has a single writer:
//!
//! - unit state slots: the owning unit
//! - release flag and initiator: the orchestrating unit, during a reboot
//! - disable reason: any collaborator, before an attempt begins

use core::sync::atomic::{fence, AtomicBool, AtomicU32, AtomicU64, Ordering};

use spin::Once;

use super::cpu::CpuRegistry;
use super::types::{CpuState, UnitId, PRESENT_TIMEOUT_MS};

const NO_INITIATOR: u32 = u32::MAX;

pub struct RebootContext {
    registry: CpuRegistry,
    /// Set once the initiator has collected everyone; releases secondaries.
    release: AtomicBool,
    disable_reason: Once<&'static str>,
    epoch: AtomicU64,
    initiator: AtomicU32,
    present_timeout_ms: AtomicU64,
    experimental_opt_in: AtomicBool,
}

impl RebootContext {
    pub fn new(registry: CpuRegistry) -> Self {
        Self {
            registry,
            release: AtomicBool::new(false),
            disable_reason: Once::new(),
            epoch: AtomicU64::new(0),
            initiator: AtomicU32::new(NO_INITIATOR),
            present_timeout_ms: AtomicU64::new(PRESENT_TIMEOUT_MS),
            experimental_opt_in: AtomicBool::new(false),
        }
    }

    pub fn registry(&self) -> &CpuRegistry {
        &self.registry
    }

    /// Current state of `id`, or `None` for an unknown unit.
    pub fn state_of(&self, id: UnitId) -> Option<CpuState> {
        self.registry.get(id).map(|unit| unit.state())
    }

    /// Publish a new state for the calling unit, with a full barrier on
    /// both sides so observers also see everything written before it.
    pub fn set_own_state(&self, me: UnitId, state: CpuState) {
        let Some(unit) = self.registry.get(me) else {
            crate::kwarn!("RESET: state change for unknown unit {}", me);
            return;
        };
        fence(Ordering::SeqCst);
        unit.store_state(state);
        fence(Ordering::SeqCst);
    }

    /// Veto fast reboot for the rest of this boot session. The first
    /// non-empty reason wins; later calls are ignored.
    pub fn disable(&self, reason: &'static str) {
        if reason.is_empty() {
            return;
        }
        let mut installed = false;
        self.disable_reason.call_once(|| {
            installed = true;
            reason
        });
        if installed {
            crate::kinfo!("RESET: fast reboot disabled: {}", reason);
        }
    }

    pub fn disable_reason(&self) -> Option<&'static str> {
        self.disable_reason.get().copied()
    }

    pub fn released(&self) -> bool {
        self.release.load(Ordering::Acquire)
    }

    pub fn set_release(&self, value: bool) {
        self.release.store(value, Ordering::Release);
    }

    /// Number of attempts that went past the disable check.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    pub(crate) fn next_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn initiator(&self) -> Option<UnitId> {
        match self.initiator.load(Ordering::Acquire) {
            NO_INITIATOR => None,
            raw => Some(UnitId(raw)),
        }
    }

    pub(crate) fn set_initiator(&self, id: UnitId) {
        self.initiator.store(id.0, Ordering::Release);
    }

    pub fn present_timeout_ms(&self) -> u64 {
        self.present_timeout_ms.load(Ordering::Relaxed)
    }

    /// Barrier 1 is always bounded; zero is ignored.
    pub fn set_present_timeout_ms(&self, ms: u64) {
        if ms == 0 {
            crate::kwarn!(
                "RESET: ignoring zero present timeout, keeping {} ms",
                self.present_timeout_ms()
            );
            return;
        }
        self.present_timeout_ms.store(ms, Ordering::Relaxed);
    }

    /// Opt-in for generations where fast reboot is experimental, in
    /// addition to the NVRAM setting.
    pub fn experimental_opt_in(&self) -> bool {
        self.experimental_opt_in.load(Ordering::Relaxed)
    }

    pub fn set_experimental_opt_in(&self, value: bool) {
        self.experimental_opt_in.store(value, Ordering::Relaxed);
    }
}
