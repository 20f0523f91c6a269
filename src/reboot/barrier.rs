//! Wait-barrier primitive

use core::sync::atomic::{fence, Ordering};
use core::time::Duration;

use crate::platform::Machine;

use super::state::RebootContext;
use super::types::{CpuState, UnitId};

/// Convert a duration to timebase ticks at the platform's frequency.
pub fn duration_to_tb<P: Machine + ?Sized>(platform: &P, duration: Duration) -> u64 {
    let ticks = duration.as_nanos() * platform.timebase_frequency() as u128 / 1_000_000_000;
    u64::try_from(ticks).unwrap_or(u64::MAX)
}

/// Spin until every unguarded unit other than `me` is in `target`.
///
/// `None` or a zero duration waits forever. Returns false as soon as the
/// deadline passes, without looking at the remaining units; the caller
/// cannot learn which unit was late and must abandon the attempt.
pub fn wait_all<P: Machine + ?Sized>(
    ctx: &RebootContext,
    platform: &P,
    me: UnitId,
    target: CpuState,
    timeout: Option<Duration>,
) -> bool {
    let deadline = timeout
        .filter(|t| !t.is_zero())
        .map(|t| platform.timebase().saturating_add(duration_to_tb(platform, t)));

    fence(Ordering::SeqCst);
    for unit in ctx.registry().unguarded() {
        if unit.id == me {
            continue;
        }

        while unit.state() != target {
            platform.relax();
            if let Some(end) = deadline {
                if platform.timebase() >= end {
                    crate::ktrace!("RESET: wait for {:?} timed out", target);
                    return false;
                }
            }
        }
    }
    fence(Ordering::SeqCst);

    true
}
