//! Scheduler — round-robin, один процессор
//! Scheduler — round-robin, single core
//!
//! Поток проходит / A thread goes through:
//!   New → Ready → Running → Ready …  → Exited
//!                     └─→ Blocked ─→ Ready
//!
//! Внешний слой прерываний решает, *когда* звать `tick()`; планировщик решает
//! только *кого* запускать: голову очереди, а уходящего — в хвост.
//! The interrupt layer decides *when* to call `tick()`; the scheduler only
//! decides *who* runs: the queue head, with the outgoing thread to the tail.
//!
//! Ядро работает с одним глобальным экземпляром через функции этого модуля;
//! тесты и встраивания строят свои `Scheduler` напрямую.
//! The kernel uses one global instance through this module's functions;
//! tests and embedders build their own `Scheduler` directly.

pub mod queue;
pub mod scheduler;
pub mod state;
pub mod thread;

use spin::Once;

pub use queue::ReadyQueue;
pub use scheduler::Scheduler;
pub use state::{SchedulerState, SwitchPlan};
pub use thread::{ThreadContext, ThreadEntry, ThreadHandle, ThreadId, ThreadState};

use crate::arch::Platform;
use crate::mm::stack::StackRegion;
use crate::{Error, Result, DEFAULT_MAX_THREADS, DEFAULT_STACK_SIZE};

// ── Конфигурация / Configuration ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Ёмкость пула управляющих блоков, включая загрузочный поток.
    /// Control block pool capacity, bootstrap thread included.
    pub max_threads:        usize,
    /// Размер стека для `spawn` / Stack size used by `spawn`
    pub default_stack_size: usize,
}

impl SchedulerConfig {
    pub const fn new() -> Self {
        Self {
            max_threads:        DEFAULT_MAX_THREADS,
            default_stack_size: DEFAULT_STACK_SIZE,
        }
    }

    pub const fn with_max_threads(mut self, max_threads: usize) -> Self {
        self.max_threads = max_threads;
        self
    }

    pub const fn with_default_stack_size(mut self, size: usize) -> Self {
        self.default_stack_size = size;
        self
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Счётчики / Counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub switches: u64,
    pub ticks:    u64,
    pub created:  u64,
    pub exited:   u64,
}

// ── Глобальный экземпляр ядра / The kernel's global instance ──────────────────

static KERNEL: Once<Scheduler<Platform>> = Once::new();

/// Инициализировать планировщик ядра ровно один раз.
/// Initialize the kernel scheduler exactly once.
pub fn init() -> Result<ThreadHandle> {
    init_with(SchedulerConfig::default())
}

pub fn init_with(config: SchedulerConfig) -> Result<ThreadHandle> {
    let mut fresh = false;
    let sched = KERNEL.try_call_once(|| {
        fresh = true;
        Scheduler::boot(config, Platform::new())
    })?;
    if !fresh {
        return Err(Error::AlreadyInitialized);
    }
    log::info!("sched: round-robin scheduler ready");
    Ok(sched.bootstrap_thread())
}

/// Глобальный экземпляр, если он уже поднят / The global instance, once up
pub fn kernel() -> Result<&'static Scheduler<Platform>> {
    KERNEL.get().ok_or(Error::NotInitialized)
}

pub fn create(entry: ThreadEntry, arg: usize, stack: StackRegion) -> Result<ThreadHandle> {
    kernel()?.create(entry, arg, stack)
}

pub fn spawn(entry: ThreadEntry, arg: usize) -> Result<ThreadHandle> {
    kernel()?.spawn(entry, arg)
}

pub fn mark_ready(thread: ThreadHandle) -> Result<()> {
    kernel()?.mark_ready(thread)
}

pub fn mark_not_ready(thread: ThreadHandle) {
    if let Ok(sched) = kernel() {
        sched.mark_not_ready(thread);
    }
}

/// Вызывается слоем прерываний таймера; до `init` ничего не делает.
/// Called by the timer interrupt layer; does nothing before `init`.
pub fn tick() {
    if let Ok(sched) = kernel() {
        sched.tick();
    }
}

pub fn yield_now() {
    if let Ok(sched) = kernel() {
        sched.yield_now();
    }
}

pub fn block_current() -> Result<()> {
    kernel()?.block_current();
    Ok(())
}

pub fn current() -> Option<ThreadHandle> {
    kernel().ok().map(|sched| sched.current())
}
