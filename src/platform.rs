//! Platform collaborator interfaces
//!
//! The reboot core never touches hardware directly. Everything it needs from
//! bus/register drivers, the call dispatcher, the interrupt controller and
//! the payload loader is expressed here, grouped by concern:
//!
//! - `Machine`: processor identity, quirks, timebase and NVRAM lookups
//! - `CallGate`: quiescing of externally issued platform calls
//! - `ResetControl`: parking secondaries and the broadcast system reset
//! - `InterruptControl`: local and global interrupt controller resets
//! - `CoreControl`: per-core and per-thread register state, split-core mode
//! - `PayloadControl`: global post-reboot cleanup and payload handoff
//!
//! Every method may be called concurrently from different execution units,
//! hence the `Sync` bound on all of them.

use core::fmt;

use crate::reboot::error::StatusCode;
use crate::reboot::types::UnitId;

/// Result type for collaborator calls that report a firmware status.
pub type PlatformResult = Result<(), StatusCode>;

/// Processor generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcGen {
    P8,
    P9,
    Other,
}

impl ProcGen {
    /// Whether this generation can dynamically split one physical core into
    /// independent logical sub-cores.
    pub const fn can_split_cores(self) -> bool {
        matches!(self, ProcGen::P8)
    }

    /// Whether the interrupt controller needs a one-time global reset
    /// between the two rendezvous barriers.
    pub const fn needs_global_interrupt_reset(self) -> bool {
        matches!(self, ProcGen::P9)
    }

    /// Whether fast reboot must be explicitly opted into via NVRAM.
    pub const fn fast_reboot_experimental(self) -> bool {
        matches!(self, ProcGen::P9)
    }

    /// Hardware threads per physical core, as encoded in thread ids.
    pub const fn threads_per_core(self) -> u32 {
        match self {
            ProcGen::P8 => 8,
            ProcGen::P9 => 4,
            ProcGen::Other => 1,
        }
    }
}

impl fmt::Display for ProcGen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcGen::P8 => write!(f, "P8"),
            ProcGen::P9 => write!(f, "P9"),
            ProcGen::Other => write!(f, "unknown"),
        }
    }
}

/// Platform quirks relevant to fast reboot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Quirks(u32);

impl Quirks {
    pub const NONE: Quirks = Quirks(0);
    /// Running on the functional simulator, which supports reset on any
    /// generation.
    pub const SIMULATOR_CALLOUTS: Quirks = Quirks(1 << 0);
    /// No direct thread controls; broadcast reset is impossible.
    pub const NO_DIRECT_CONTROLS: Quirks = Quirks(1 << 1);

    pub const fn contains(self, other: Quirks) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: Quirks) -> Quirks {
        Quirks(self.0 | other.0)
    }
}

/// Quiesce requests for the platform call dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuiesceMode {
    /// Hold new calls and wait for in-flight ones to drain.
    Hold,
    /// Resume normal dispatch.
    Resume,
    /// Resume dispatch, tagging subsequent calls as belonging to the new
    /// boot.
    ResumeFastReboot,
}

/// Firmware progress checkpoints reported to the service processor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FwProgress {
    StorageBusInit,
}

pub trait Machine: Sync {
    fn proc_gen(&self) -> ProcGen;

    fn quirks(&self) -> Quirks {
        Quirks::NONE
    }

    /// Compare an NVRAM configuration key against `value`.
    fn nvram_query_eq(&self, _key: &str, _value: &str) -> bool {
        false
    }

    /// Free-running timebase, in ticks.
    fn timebase(&self) -> u64;

    /// Timebase ticks per second.
    fn timebase_frequency(&self) -> u64;

    /// Polling hint issued inside busy-waits. Implementations lower the
    /// hardware thread priority or briefly yield; they must not block.
    fn relax(&self) {
        core::hint::spin_loop();
    }
}

pub trait CallGate: Sync {
    /// Returns false if in-flight calls did not drain in time.
    fn quiesce(&self, mode: QuiesceMode) -> bool;
}

pub trait ResetControl: Sync {
    /// Park every other unit in a wakeup-armed low-power state.
    fn prepare_all_for_reset(&self) -> bool;

    /// Copy the exception vectors and the reset entry to the fixed
    /// hardware entry address.
    fn install_reset_vectors(&self);

    /// Force every other unit to take a system reset at the fixed entry
    /// address. Units that take it enter the reset handler.
    fn broadcast_reset_others(&self, initiator: UnitId) -> PlatformResult;

    fn release_special_wakeups(&self);
}

pub trait InterruptControl: Sync {
    /// Discard latched interrupt presentation state on `unit`.
    fn reset_interrupt_presentation_local(&self, unit: UnitId);

    /// One-time reset of the global interrupt controller.
    fn reset_interrupt_controller_global(&self) {}

    fn set_sreset_enable(&self, _enable: bool) {}

    fn set_ipi_enable(&self, _enable: bool) {}

    /// Reset/EOI the service-processor interface interrupt.
    fn reset_service_interrupt(&self) {}
}

pub trait CoreControl: Sync {
    /// Whether `unit`'s physical core is currently split.
    fn core_split(&self, unit: UnitId) -> bool;

    /// Request the core to leave split mode. Hardware completes the
    /// transition asynchronously; poll `core_split` for confirmation.
    fn clear_core_split(&self, unit: UnitId);

    /// Update the shadow register copy consumed by platform low-power
    /// restore logic after the split-mode change.
    fn update_power_shadow(&self, _unit: UnitId) {}

    /// Arm wake-on-external-interrupt only.
    fn arm_wake_on_external(&self, unit: UnitId);

    /// Enter low-power wait. Returns when an external interrupt wakes the
    /// unit, which then re-enters the reset handler.
    fn enter_nap(&self, unit: UnitId);

    /// Targeted wake signal to one unit.
    fn kick(&self, target: UnitId);

    fn init_shared_registers(&self, _unit: UnitId) {}

    fn init_replicated_registers(&self, _unit: UnitId) {}

    /// Undo the fast-sleep workaround on `unit`'s core.
    fn fast_sleep_exit(&self, _unit: UnitId) {}

    fn cleanup_local_tlb(&self, _unit: UnitId) {}

    fn resync_time_base(&self, unit: UnitId);
}

pub trait PayloadControl: Sync {
    /// Last-minute global cleanups owned by the CPU layer.
    fn fast_reboot_complete(&self) {}

    fn preload_payload(&self);

    fn reset_consoles(&self) {}

    fn reset_storage_bus(&self) -> PlatformResult;

    fn report_progress(&self, _progress: FwProgress) {}

    /// Trigger a full cold reboot. Returns false if the platform has no
    /// cold-reboot entry point.
    fn cold_reboot(&self) -> bool {
        false
    }

    /// Load the payload and start it. Non-returning on hardware.
    fn load_and_start_payload(&self, resume: bool);
}

/// Everything the reboot core requires from the platform.
pub trait Platform:
    Machine + CallGate + ResetControl + InterruptControl + CoreControl + PayloadControl
{
}

impl<T> Platform for T where
    T: Machine + CallGate + ResetControl + InterruptControl + CoreControl + PayloadControl
{
}
