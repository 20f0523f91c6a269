//! Fast Reboot Subsystem
//!
//! Reinitialises every execution unit and resumes a new payload without a
//! power-on reset. The units share no messaging channel beyond the hardware
//! broadcast reset and memory, so the whole protocol is a pair of
//! rendezvous barriers over per-unit state words:
//!
//! ```text
//! initiator                           every other unit
//! ---------                           ----------------
//! preflight, quiesce, park others
//! install vectors, broadcast reset -> reset handler: [unsplit] -> Present
//! wait_all(Present, bounded)          spin on release flag
//! branch to reset handler -> Present
//! wait_all(Present), release ------>  cleanup -> Active -> job loop
//! cleanup -> Active
//! wait_all(Active), global cleanup
//! payload
//! ```
//!
//! # Module Organization
//!
//! - `types`: unit descriptors, `CpuState`, `Handoff`, constants
//! - `error`: failure classes and error enums
//! - `cpu`: the CPU state registry
//! - `state`: the shared `RebootContext`
//! - `barrier`: the wait-all primitive
//! - `unsplit`: split-core reunification
//! - `reset_entry`: the handler every unit runs after reset
//! - `orchestrator`: the initiator's sequence

pub mod barrier;
pub mod cpu;
pub mod error;
mod orchestrator;
pub mod reset_entry;
pub mod state;
pub mod types;
pub mod unsplit;

pub use barrier::wait_all;
pub use cpu::CpuRegistry;
pub use error::{CommitFailure, FailureClass, RebootError, StatusCode, Unsupported};
pub use orchestrator::attempt_fast_reboot;
pub use reset_entry::fast_reboot_entry;
pub use state::RebootContext;
pub use types::{
    CpuState, ExecutionUnit, Handoff, UnitId, FAST_RESET_NVRAM_KEY, FAST_RESET_NVRAM_VALUE,
    PRESENT_TIMEOUT_MS,
};
pub use unsplit::{unsplit_if_needed, SplitOutcome};
