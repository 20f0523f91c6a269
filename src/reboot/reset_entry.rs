//! Secondary Reset Handler
//!
//! Every execution unit arrives here after the broadcast system reset,
//! including, last of all, the initiator that branched to the reset vector
//! itself. The handler drives the two rendezvous points:
//!
//! 1. every unit publishes `Present` and, except the initiator, spins on the
//!    release flag
//! 2. the initiator collects everyone, releases them, and waits for every
//!    unit to publish `Active` after its local cleanup
//!
//! Work between the two points only touches per-unit or per-core resources,
//! so units may interleave freely there.

use core::sync::atomic::{fence, Ordering};

use crate::platform::{FwProgress, Platform, ProcGen};

use super::barrier::wait_all;
use super::error::FailureClass;
use super::state::RebootContext;
use super::types::{CpuState, Handoff, UnitId};
use super::unsplit::{unsplit_if_needed, SplitOutcome};

/// Entry point reached by `me` at the fixed reset address.
///
/// Never returns on hardware; the returned `Handoff` says where control went.
pub fn fast_reboot_entry<P: Platform + ?Sized>(
    ctx: &RebootContext,
    platform: &P,
    me: UnitId,
) -> Handoff {
    let gen = platform.proc_gen();

    // A napping split-core sibling comes back through the reset vector, so
    // this loop stands in for re-entering the handler.
    loop {
        crate::kdebug!("RESET: CPU {} reset in", me);
        ctx.set_own_state(me, CpuState::Rebooting);

        // Drop stale interrupts first, or they fire while unsplitting.
        platform.reset_interrupt_presentation_local(me);

        if !gen.can_split_cores() {
            break;
        }
        match unsplit_if_needed(ctx, platform, me) {
            SplitOutcome::Rewoken => continue,
            SplitOutcome::NotSplit | SplitOutcome::Unsplit => break,
        }
    }

    ctx.set_own_state(me, CpuState::Present);

    if ctx.initiator() != Some(me) {
        while !ctx.released() {
            platform.relax();
        }
        fence(Ordering::SeqCst);

        cleanup_cpu_state(ctx, platform, me);
        ctx.set_own_state(me, CpuState::Active);
        return Handoff::JobLoop;
    }

    crate::kinfo!("RESET: Boot CPU waiting for everybody...");
    wait_all(ctx, platform, me, CpuState::Present, None);

    if gen.needs_global_interrupt_reset() {
        platform.reset_interrupt_controller_global();
    }

    crate::kinfo!("RESET: Releasing secondaries...");
    fence(Ordering::SeqCst);
    ctx.set_release(true);

    cleanup_cpu_state(ctx, platform, me);
    ctx.set_own_state(me, CpuState::Active);

    wait_all(ctx, platform, me, CpuState::Active, None);
    fence(Ordering::SeqCst);

    crate::kinfo!("RESET: All done, cleaning up...");
    ctx.set_release(false);

    post_reboot_cleanup(platform)
}

/// Per-core and per-thread register reinitialisation after release.
pub fn cleanup_cpu_state<P: Platform + ?Sized>(ctx: &RebootContext, platform: &P, me: UnitId) {
    if ctx.registry().is_lead(me) {
        platform.init_shared_registers(me);

        if platform.proc_gen() == ProcGen::P8 {
            if let Some(unit) = ctx.registry().get(me) {
                if unit.in_fast_sleep() {
                    crate::kdebug!("RESET: CPU {} in fast sleep undoing workarounds...", me);
                    platform.fast_sleep_exit(me);
                    unit.set_in_fast_sleep(false);
                }
            }
            platform.cleanup_local_tlb(me);
        }

        // Time base sync may have been lost across the reset.
        platform.resync_time_base(me);
    }

    platform.init_replicated_registers(me);
}

fn post_reboot_cleanup<P: Platform + ?Sized>(platform: &P) -> Handoff {
    platform.fast_reboot_complete();

    platform.set_sreset_enable(true);
    platform.set_ipi_enable(true);

    platform.preload_payload();
    platform.reset_consoles();

    if platform.proc_gen() == ProcGen::P8 {
        platform.reset_service_interrupt();
    }

    if let Err(status) = platform.reset_storage_bus() {
        crate::kerror!(
            "RESET: [{}] Fast reboot failed to reset storage bus ({})",
            FailureClass::PostCommit,
            status
        );
        // Past the point of no return: do what the caller would have done.
        if platform.cold_reboot() {
            return Handoff::ColdReboot;
        }
        crate::kfatal!("RESET: No cold reboot entry point, halting");
        return Handoff::Halted;
    }

    platform.report_progress(FwProgress::StorageBusInit);

    crate::kinfo!("RESET: Starting payload");
    platform.load_and_start_payload(true);
    Handoff::Payload { resume: true }
}
