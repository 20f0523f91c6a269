//! Simulated multi-threaded processor complex
//!
//! Each execution unit that takes the broadcast reset becomes a std thread
//! running `fast_reboot_entry`. The rest of the machine is plain shared
//! state behind mutexes:
//!
//! - split-core control register: a core only reports unsplit after its
//!   lead requested it *and* every unguarded sibling is napping
//! - nap/wake: `kick` latches a pending wake that `enter_nap` consumes
//! - every collaborator call is appended to an event trace

use std::collections::{HashMap, HashSet};
use std::mem;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use fast_reboot::platform::{
    CallGate, CoreControl, FwProgress, InterruptControl, Machine, PayloadControl,
    PlatformResult, ProcGen, QuiesceMode, Quirks, ResetControl,
};
use fast_reboot::reboot::{
    fast_reboot_entry, CpuRegistry, CpuState, Handoff, RebootContext, UnitId,
};
use fast_reboot::{attempt_fast_reboot, RebootError};

/// Timebase ticks per second (one tick per nanosecond).
pub const SIM_TB_FREQ: u64 = 1_000_000_000;

/// Build a context for the given thread ids, all starting in `Os`, laid out
/// as 8-thread cores.
pub fn sim_context(ids: &[u32], guarded: &[u32]) -> Arc<RebootContext> {
    sim_context_smt(ids, guarded, ProcGen::P8.threads_per_core())
}

/// Same as `sim_context` with `threads_per_core` threads on each core.
pub fn sim_context_smt(ids: &[u32], guarded: &[u32], threads_per_core: u32) -> Arc<RebootContext> {
    let guarded: Vec<UnitId> = guarded.iter().copied().map(UnitId).collect();
    let registry = CpuRegistry::discover(
        ids.iter().copied().map(UnitId),
        &guarded,
        CpuState::Os,
        threads_per_core,
    );
    Arc::new(RebootContext::new(registry))
}

#[derive(Debug, Clone)]
pub struct SimConfig {
    pub gen: ProcGen,
    pub quirks: Quirks,
    /// NVRAM `key=value` settings visible to `nvram_query_eq`.
    pub nvram: Vec<(&'static str, &'static str)>,
    pub quiesce_hold_ok: bool,
    pub prepare_ok: bool,
    pub broadcast_status: PlatformResult,
    /// Units that never take the broadcast reset.
    pub stuck: Vec<UnitId>,
    /// Physical cores running split when the reset is broadcast.
    pub split_cores: Vec<u32>,
    pub storage_bus_status: PlatformResult,
    pub has_cold_reboot: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            gen: ProcGen::P8,
            quirks: Quirks::NONE,
            nvram: Vec::new(),
            quiesce_hold_ok: true,
            prepare_ok: true,
            broadcast_status: Ok(()),
            stuck: Vec::new(),
            split_cores: Vec::new(),
            storage_bus_status: Ok(()),
            has_cold_reboot: false,
        }
    }
}

#[derive(Default)]
struct CoreHw {
    split: HashSet<u32>,
    clear_requested: HashSet<u32>,
    armed: HashSet<UnitId>,
    napping: HashSet<UnitId>,
    wake_pending: HashSet<UnitId>,
}

pub struct SimMachine {
    config: SimConfig,
    ctx: Arc<RebootContext>,
    this: Weak<SimMachine>,
    start: Instant,
    hw: Mutex<CoreHw>,
    units: Mutex<Vec<(UnitId, JoinHandle<Handoff>)>>,
    events: Mutex<Vec<&'static str>>,
    handler_entries: Mutex<HashMap<UnitId, usize>>,
    time_base_resyncs: Mutex<Vec<UnitId>>,
    replicated_inits: Mutex<Vec<UnitId>>,
    shared_inits: Mutex<Vec<UnitId>>,
    fast_sleep_exits: Mutex<Vec<UnitId>>,
    payload_starts: Mutex<Vec<bool>>,
    naps: AtomicUsize,
    kicks: AtomicUsize,
    power_shadow_updates: AtomicUsize,
    global_irq_resets: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SimMachine {
    pub fn new(config: SimConfig, ctx: Arc<RebootContext>) -> Arc<Self> {
        let hw = CoreHw {
            split: config.split_cores.iter().copied().collect(),
            ..CoreHw::default()
        };
        Arc::new_cyclic(|this| Self {
            config,
            ctx,
            this: this.clone(),
            start: Instant::now(),
            hw: Mutex::new(hw),
            units: Mutex::new(Vec::new()),
            events: Mutex::new(Vec::new()),
            handler_entries: Mutex::new(HashMap::new()),
            time_base_resyncs: Mutex::new(Vec::new()),
            replicated_inits: Mutex::new(Vec::new()),
            shared_inits: Mutex::new(Vec::new()),
            fast_sleep_exits: Mutex::new(Vec::new()),
            payload_starts: Mutex::new(Vec::new()),
            naps: AtomicUsize::new(0),
            kicks: AtomicUsize::new(0),
            power_shadow_updates: AtomicUsize::new(0),
            global_irq_resets: AtomicUsize::new(0),
        })
    }

    pub fn ctx(&self) -> &RebootContext {
        &self.ctx
    }

    /// Run a fast reboot attempt on `initiator`.
    pub fn reboot(&self, initiator: u32) -> Result<Handoff, RebootError> {
        attempt_fast_reboot(&self.ctx, self, UnitId(initiator))
    }

    /// Wait for every unit thread started by the last broadcast.
    ///
    /// Only call this when the attempt got past barrier 1; stranded units
    /// spin forever.
    pub fn join_units(&self) -> Vec<(UnitId, Handoff)> {
        let units = mem::take(&mut *lock(&self.units));
        units
            .into_iter()
            .map(|(id, handle)| (id, handle.join().expect("unit thread panicked")))
            .collect()
    }

    pub fn states(&self) -> Vec<(UnitId, CpuState)> {
        self.ctx
            .registry()
            .iter()
            .map(|unit| (unit.id, unit.state()))
            .collect()
    }

    pub fn events(&self) -> Vec<&'static str> {
        lock(&self.events).clone()
    }

    pub fn count(&self, event: &str) -> usize {
        lock(&self.events).iter().filter(|e| **e == event).count()
    }

    /// Times `unit` entered the reset handler.
    pub fn handler_entries(&self, unit: u32) -> usize {
        lock(&self.handler_entries)
            .get(&UnitId(unit))
            .copied()
            .unwrap_or(0)
    }

    pub fn time_base_resyncs(&self) -> Vec<UnitId> {
        sorted(lock(&self.time_base_resyncs).clone())
    }

    pub fn replicated_inits(&self) -> Vec<UnitId> {
        sorted(lock(&self.replicated_inits).clone())
    }

    pub fn shared_inits(&self) -> Vec<UnitId> {
        sorted(lock(&self.shared_inits).clone())
    }

    pub fn fast_sleep_exits(&self) -> Vec<UnitId> {
        sorted(lock(&self.fast_sleep_exits).clone())
    }

    pub fn payload_starts(&self) -> Vec<bool> {
        lock(&self.payload_starts).clone()
    }

    pub fn naps(&self) -> usize {
        self.naps.load(Ordering::SeqCst)
    }

    pub fn kicks(&self) -> usize {
        self.kicks.load(Ordering::SeqCst)
    }

    pub fn power_shadow_updates(&self) -> usize {
        self.power_shadow_updates.load(Ordering::SeqCst)
    }

    pub fn global_irq_resets(&self) -> usize {
        self.global_irq_resets.load(Ordering::SeqCst)
    }

    pub fn is_core_split(&self, core: u32) -> bool {
        lock(&self.hw).split.contains(&core)
    }

    fn core_of(&self, unit: UnitId) -> Option<u32> {
        self.ctx.registry().get(unit).map(|unit| unit.core)
    }

    fn record(&self, event: &'static str) {
        lock(&self.events).push(event);
    }

    fn start_unit(&self, id: UnitId) {
        let Some(machine) = self.this.upgrade() else {
            return;
        };
        let ctx = Arc::clone(&self.ctx);
        let handle = thread::spawn(move || fast_reboot_entry(&ctx, &*machine, id));
        lock(&self.units).push((id, handle));
    }
}

fn sorted(mut ids: Vec<UnitId>) -> Vec<UnitId> {
    ids.sort();
    ids
}

impl Machine for SimMachine {
    fn proc_gen(&self) -> ProcGen {
        self.config.gen
    }

    fn quirks(&self) -> Quirks {
        self.config.quirks
    }

    fn nvram_query_eq(&self, key: &str, value: &str) -> bool {
        self.config
            .nvram
            .iter()
            .any(|(k, v)| *k == key && *v == value)
    }

    fn timebase(&self) -> u64 {
        self.start.elapsed().as_nanos() as u64
    }

    fn timebase_frequency(&self) -> u64 {
        SIM_TB_FREQ
    }

    fn relax(&self) {
        thread::yield_now();
    }
}

impl CallGate for SimMachine {
    fn quiesce(&self, mode: QuiesceMode) -> bool {
        match mode {
            QuiesceMode::Hold => {
                self.record("quiesce_hold");
                self.config.quiesce_hold_ok
            }
            QuiesceMode::Resume => {
                self.record("quiesce_resume");
                true
            }
            QuiesceMode::ResumeFastReboot => {
                self.record("quiesce_resume_fast_reboot");
                true
            }
        }
    }
}

impl ResetControl for SimMachine {
    fn prepare_all_for_reset(&self) -> bool {
        self.record("prepare");
        self.config.prepare_ok
    }

    fn install_reset_vectors(&self) {
        self.record("install_vectors");
    }

    fn broadcast_reset_others(&self, initiator: UnitId) -> PlatformResult {
        self.record("broadcast");
        self.config.broadcast_status?;

        for unit in self.ctx.registry().unguarded() {
            if unit.id == initiator || self.config.stuck.contains(&unit.id) {
                continue;
            }
            self.start_unit(unit.id);
        }
        Ok(())
    }

    fn release_special_wakeups(&self) {
        self.record("release_wakeups");
    }
}

impl InterruptControl for SimMachine {
    fn reset_interrupt_presentation_local(&self, unit: UnitId) {
        *lock(&self.handler_entries).entry(unit).or_insert(0) += 1;
    }

    fn reset_interrupt_controller_global(&self) {
        self.global_irq_resets.fetch_add(1, Ordering::SeqCst);
    }

    fn set_sreset_enable(&self, enable: bool) {
        if enable {
            self.record("sreset_enable");
        }
    }

    fn set_ipi_enable(&self, enable: bool) {
        if enable {
            self.record("ipi_enable");
        }
    }

    fn reset_service_interrupt(&self) {
        self.record("service_interrupt");
    }
}

impl CoreControl for SimMachine {
    fn core_split(&self, unit: UnitId) -> bool {
        let Some(core) = self.core_of(unit) else {
            return false;
        };
        let mut hw = lock(&self.hw);
        if !hw.split.contains(&core) {
            return false;
        }
        if !hw.clear_requested.contains(&core) {
            return true;
        }

        // Hardware finishes the unsplit only once every sibling naps.
        let siblings_napping = self
            .ctx
            .registry()
            .iter()
            .filter(|sibling| sibling.core == core && !sibling.lead && !sibling.guarded)
            .all(|sibling| hw.napping.contains(&sibling.id));
        if siblings_napping {
            hw.split.remove(&core);
            hw.clear_requested.remove(&core);
            return false;
        }
        true
    }

    fn clear_core_split(&self, unit: UnitId) {
        if let Some(core) = self.core_of(unit) {
            lock(&self.hw).clear_requested.insert(core);
        }
    }

    fn update_power_shadow(&self, _unit: UnitId) {
        self.power_shadow_updates.fetch_add(1, Ordering::SeqCst);
    }

    fn arm_wake_on_external(&self, unit: UnitId) {
        lock(&self.hw).armed.insert(unit);
    }

    fn enter_nap(&self, unit: UnitId) {
        {
            let mut hw = lock(&self.hw);
            assert!(hw.armed.remove(&unit), "unit {} napped without wakeup armed", unit);
            hw.napping.insert(unit);
        }
        self.naps.fetch_add(1, Ordering::SeqCst);

        loop {
            {
                let mut hw = lock(&self.hw);
                if hw.wake_pending.remove(&unit) {
                    hw.napping.remove(&unit);
                    return;
                }
            }
            thread::yield_now();
        }
    }

    fn kick(&self, target: UnitId) {
        self.kicks.fetch_add(1, Ordering::SeqCst);
        lock(&self.hw).wake_pending.insert(target);
    }

    fn init_shared_registers(&self, unit: UnitId) {
        lock(&self.shared_inits).push(unit);
    }

    fn init_replicated_registers(&self, unit: UnitId) {
        lock(&self.replicated_inits).push(unit);
    }

    fn fast_sleep_exit(&self, unit: UnitId) {
        lock(&self.fast_sleep_exits).push(unit);
    }

    fn cleanup_local_tlb(&self, _unit: UnitId) {}

    fn resync_time_base(&self, unit: UnitId) {
        lock(&self.time_base_resyncs).push(unit);
    }
}

impl PayloadControl for SimMachine {
    fn fast_reboot_complete(&self) {
        self.record("complete");
    }

    fn preload_payload(&self) {
        self.record("preload");
    }

    fn reset_consoles(&self) {
        self.record("consoles");
    }

    fn reset_storage_bus(&self) -> PlatformResult {
        self.record("storage_bus");
        self.config.storage_bus_status
    }

    fn report_progress(&self, progress: FwProgress) {
        match progress {
            FwProgress::StorageBusInit => self.record("progress_storage_bus"),
        }
    }

    fn cold_reboot(&self) -> bool {
        self.record("cold_reboot");
        self.config.has_cold_reboot
    }

    fn load_and_start_payload(&self, resume: bool) {
        self.record("payload");
        lock(&self.payload_starts).push(resume);
    }
}
