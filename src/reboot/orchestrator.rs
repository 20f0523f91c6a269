//! Reboot Orchestrator
//!
//! Linear sequence run on the initiating unit. Everything up to parking
//! the secondaries can be undone; from the vector install onwards every
//! rollback would depend on hardware state the next step destroys, so
//! failures there are left for external recovery.

use core::sync::atomic::{fence, Ordering};
use core::time::Duration;

use crate::platform::{Platform, ProcGen, QuiesceMode, Quirks};

use super::barrier::wait_all;
use super::error::{CommitFailure, FailureClass, RebootError, Unsupported};
use super::reset_entry::fast_reboot_entry;
use super::state::RebootContext;
use super::types::{CpuState, Handoff, UnitId, FAST_RESET_NVRAM_KEY, FAST_RESET_NVRAM_VALUE};

/// Try to fast reboot the machine from unit `me`.
///
/// `Err` means the attempt was abandoned before the commit point and the
/// caller simply continues. `Ok` carries the terminal handoff: the caller's
/// process image is gone and the driver must not resume it.
pub fn attempt_fast_reboot<P: Platform + ?Sized>(
    ctx: &RebootContext,
    platform: &P,
    me: UnitId,
) -> Result<Handoff, RebootError> {
    if let Err(why) = check_supported(ctx, platform, me) {
        crate::kdebug!("RESET: Fast reboot {}", why);
        return Err(RebootError::Unsupported(why));
    }

    // Make sure every other unit has left platform calls.
    if !platform.quiesce(QuiesceMode::Hold) {
        return Err(abort(platform, RebootError::QuiesceTimeout));
    }

    if let Some(reason) = ctx.disable_reason() {
        return Err(abort(platform, RebootError::Disabled(reason)));
    }

    let epoch = ctx.next_epoch();
    crate::kinfo!("RESET: Initiating fast reboot {}...", epoch);

    ctx.set_initiator(me);
    ctx.set_release(false);
    fence(Ordering::SeqCst);

    // Park everybody except ourselves. Last point where recovery is tried.
    if !platform.prepare_all_for_reset() {
        return Err(abort(platform, RebootError::PrepareFailed));
    }

    // Special wakeups and quiesce are not undone on failure from here on:
    // the machine is going to a full IPL anyway.

    // A zero resume address routes the reset vector into the fast reboot
    // entry instead of a saved context.
    for unit in ctx.registry().unguarded() {
        unit.set_resume_addr(0);
    }
    platform.install_reset_vectors();

    if let Err(status) = platform.broadcast_reset_others(me) {
        return Ok(strand(CommitFailure::BroadcastFailed(status)));
    }

    let timeout = Duration::from_millis(ctx.present_timeout_ms());
    if !wait_all(ctx, platform, me, CpuState::Present, Some(timeout)) {
        return Ok(strand(CommitFailure::PresentTimeout));
    }

    crate::kdebug!("RESET: Releasing special wakeups...");
    platform.release_special_wakeups();

    // Calls from here on belong to the new boot.
    platform.quiesce(QuiesceMode::ResumeFastReboot);

    // Branch to the reset vector like everybody else.
    Ok(fast_reboot_entry(ctx, platform, me))
}

fn check_supported<P: Platform + ?Sized>(
    ctx: &RebootContext,
    platform: &P,
    me: UnitId,
) -> Result<(), Unsupported> {
    let gen = platform.proc_gen();
    let quirks = platform.quirks();

    if gen.fast_reboot_experimental()
        && !ctx.experimental_opt_in()
        && !platform.nvram_query_eq(FAST_RESET_NVRAM_KEY, FAST_RESET_NVRAM_VALUE)
    {
        return Err(Unsupported::ExperimentalNotEnabled);
    }

    if !quirks.contains(Quirks::SIMULATOR_CALLOUTS) && !matches!(gen, ProcGen::P8 | ProcGen::P9)
    {
        return Err(Unsupported::ProcessorGeneration(gen));
    }

    if quirks.contains(Quirks::NO_DIRECT_CONTROLS) {
        return Err(Unsupported::Quirk);
    }

    match ctx.registry().get(me) {
        Some(unit) if !unit.guarded => {}
        _ => return Err(Unsupported::Initiator),
    }
    // Siblings of a split initiator would nap until it unsplits the core,
    // which it only does after they report in.
    if gen.can_split_cores() && platform.core_split(me) {
        return Err(Unsupported::Initiator);
    }

    Ok(())
}

/// Recoverable abort: log, resume dispatch, hand the error back.
fn abort<P: Platform + ?Sized>(platform: &P, err: RebootError) -> RebootError {
    crate::kwarn!("RESET: [{}] {}", err.class(), err);
    platform.quiesce(QuiesceMode::Resume);
    err
}

fn strand(failure: CommitFailure) -> Handoff {
    crate::kerror!("RESET: [{}] Fast reboot {}", FailureClass::CommitPhase, failure);
    Handoff::Stranded(failure)
}
