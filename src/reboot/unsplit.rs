//! Core-Unsplit Coordinator
//!
//! On generations that can split one physical core into independent
//! sub-cores, a core must be whole again before its threads rendezvous.
//! The lead thread clears the split mode; hardware only completes the
//! transition once the sibling threads are napping, so siblings park first
//! and are kicked back through the reset handler afterwards.

use crate::platform::Platform;

use super::state::RebootContext;
use super::types::UnitId;

/// What the reset handler must do after the split check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitOutcome {
    /// Core was not split.
    NotSplit,
    /// Caller is the lead thread and the core is now unsplit.
    Unsplit,
    /// Caller is a sibling; it napped, was woken, and must re-enter the
    /// reset handler from the top.
    Rewoken,
}

pub fn unsplit_if_needed<P: Platform + ?Sized>(
    ctx: &RebootContext,
    platform: &P,
    me: UnitId,
) -> SplitOutcome {
    if !platform.core_split(me) {
        return SplitOutcome::NotSplit;
    }

    crate::kinfo!("RESET: CPU {} is split !", me);

    if !ctx.registry().is_lead(me) {
        platform.arm_wake_on_external(me);
        platform.enter_nap(me);
        return SplitOutcome::Rewoken;
    }

    crate::kinfo!("RESET: Primary {}, unsplitting...", me);

    platform.clear_core_split(me);
    platform.update_power_shadow(me);

    while platform.core_split(me) {
        platform.relax();
    }

    // Siblings rejoin the rendezvous on their own; no need to wait.
    crate::kinfo!("RESET: Waking unsplit secondaries of {}...", me);
    for sibling in ctx.registry().siblings(me).filter(|unit| !unit.guarded) {
        platform.kick(sibling.id);
    }

    SplitOutcome::Unsplit
}
