//! Scheduler — round-robin поверх `SchedulerState` и `switch_context`
//! Scheduler — round-robin on top of `SchedulerState` and `switch_context`
//!
//! Каждая операция: замаскировать прерывания → взять блокировку → изменить
//! состояние → отпустить блокировку → (переключиться) → вернуть прерывания.
//! Блокировка никогда не держится во время переключения.
//! Every operation: mask interrupts → take the lock → mutate state → drop the
//! lock → (switch) → restore interrupts. The lock is never held across a switch.

use alloc::vec::Vec;

use spin::Mutex;

use super::state::{SchedulerState, SwitchPlan};
use super::thread::{ThreadEntry, ThreadHandle, ThreadId, ThreadState};
use super::{SchedulerConfig, SchedulerStats};
use crate::arch::current::frame::{self, ExitRoute};
use crate::arch::{switch_context, Cpu, Platform, Registers};
use crate::mm::stack::{KernelStack, StackRegion};
use crate::Result;

pub struct Scheduler<C: Cpu = Platform> {
    state:  Mutex<SchedulerState>,
    cpu:    C,
    config: SchedulerConfig,
}

impl<C: Cpu> Scheduler<C> {
    /// initThreading: вызывающий поток становится загрузочным (Running).
    /// initThreading: the calling flow becomes the bootstrap thread (Running).
    pub fn boot(config: SchedulerConfig, cpu: C) -> Result<Self> {
        let state = SchedulerState::boot(&config)?;
        log::debug!("sched: up, {} control blocks", config.max_threads);
        Ok(Self { state: Mutex::new(state), cpu, config })
    }

    /// createThread. Поток в состоянии New; в очередь его ставит `mark_ready`.
    /// Регион стека остаётся за вызывающим.
    /// createThread. The thread is New; `mark_ready` puts it in the queue.
    /// The stack region stays with the caller.
    ///
    /// `&'static self`: адрес планировщика зашит в стартовый кадр потока.
    /// `&'static self`: the scheduler's address is baked into the thread's frame.
    pub fn create(&'static self, entry: ThreadEntry, arg: usize, stack: StackRegion) -> Result<ThreadHandle> {
        self.admit(entry, arg, &stack, None)
    }

    /// Выделить стек размера по умолчанию, создать поток и сразу поставить в очередь.
    /// Стек принадлежит потоку и освобождается после его выхода (или сразу,
    /// если создать поток не удалось).
    /// Allocate a default-sized stack, create the thread and queue it right away.
    /// The stack belongs to the thread and is freed after it exits (or at once
    /// if creation fails).
    pub fn spawn(&'static self, entry: ThreadEntry, arg: usize) -> Result<ThreadHandle> {
        let stack = KernelStack::allocate(self.config.default_stack_size)?;
        let region = stack.region();
        let thread = self.admit(entry, arg, &region, Some(stack))?;
        self.mark_ready(thread)?;
        Ok(thread)
    }

    fn admit(
        &'static self,
        entry: ThreadEntry,
        arg: usize,
        stack: &StackRegion,
        owned: Option<KernelStack>,
    ) -> Result<ThreadHandle> {
        let exit = ExitRoute {
            routine: thread_exit::<C> as *const () as usize as u64,
            context: self as *const Self as usize as u64,
        };
        let regs = frame::prepare(stack, entry, arg, exit)?;
        self.critical(|s| s.admit(regs, stack, owned))
    }

    /// threadIsReady / markReady
    pub fn mark_ready(&self, thread: ThreadHandle) -> Result<()> {
        self.critical(|s| s.thread_is_ready(thread))
    }

    /// threadNotReady / markNotReady
    pub fn mark_not_ready(&self, thread: ThreadHandle) {
        self.critical(|s| s.thread_not_ready(thread));
    }

    /// Round-robin переключение. Пустая очередь — текущий поток продолжает.
    /// Round-robin switch. With an empty queue the current thread carries on.
    pub fn schedule(&self) {
        let enabled = self.cpu.disable_interrupts();
        let plan = self.state.lock().rotate();
        if let Some(plan) = plan {
            self.switch(plan);
            // Сюда возвращаемся, когда нас снова выбрали
            // Back here once we are picked again
            self.state.lock().reap();
        }
        self.cpu.restore_interrupts(enabled);
    }

    /// Тик таймера от внешнего слоя прерываний / Timer tick from the interrupt layer
    pub fn tick(&self) {
        self.critical(|s| s.note_tick());
        self.schedule();
    }

    pub fn yield_now(&self) {
        self.schedule();
    }

    /// Уснуть до `mark_ready`. Если бежать больше некому — простаивать.
    /// Sleep until `mark_ready`. If nobody else can run, idle.
    pub fn block_current(&self) {
        let enabled = self.cpu.disable_interrupts();
        self.state.lock().block_current();
        loop {
            let plan = {
                let mut state = self.state.lock();
                if state.current_state() != ThreadState::Blocked {
                    break;
                }
                state.rotate()
            };
            match plan {
                Some(plan) => {
                    self.switch(plan);
                    self.state.lock().reap();
                    break;
                }
                None => self.idle(),
            }
        }
        self.cpu.restore_interrupts(enabled);
    }

    /// exitThread. Сюда попадает возврат из entry; можно вызвать и явно.
    /// exitThread. A return from entry lands here; it may also be called directly.
    pub fn exit_current(&self, code: usize) -> ! {
        self.cpu.disable_interrupts();
        self.state.lock().exit_current(code);
        loop {
            let plan = self.state.lock().rotate();
            match plan {
                Some(plan) => {
                    self.switch(plan);
                    panic!("exited thread was dispatched again");
                }
                None => self.idle(),
            }
        }
    }

    pub fn current(&self) -> ThreadHandle {
        self.critical(|s| s.current())
    }

    pub fn bootstrap_thread(&self) -> ThreadHandle {
        self.critical(|s| s.bootstrap())
    }

    pub fn thread_state(&self, thread: ThreadHandle) -> Result<ThreadState> {
        self.critical(|s| s.state_of(thread))
    }

    pub fn thread_id(&self, thread: ThreadHandle) -> Result<ThreadId> {
        self.critical(|s| s.thread(thread).map(|t| t.id()))
    }

    /// Снимок регистров потока, который сейчас не выполняется.
    /// Register snapshot of a thread that is not running right now.
    pub fn registers(&self, thread: ThreadHandle) -> Result<Registers> {
        self.critical(|s| s.thread(thread).map(|t| *t.registers()))
    }

    pub fn ready_len(&self) -> usize {
        self.critical(|s| s.ready().len())
    }

    pub fn ready_threads(&self) -> Vec<ThreadHandle> {
        self.critical(|s| s.ready().iter().collect())
    }

    pub fn live_threads(&self) -> usize {
        self.critical(|s| s.live_threads())
    }

    pub fn running_count(&self) -> usize {
        self.critical(|s| s.running_count())
    }

    pub fn stats(&self) -> SchedulerStats {
        self.critical(|s| s.stats())
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn cpu(&self) -> &C {
        &self.cpu
    }

    fn critical<R>(&self, f: impl FnOnce(&mut SchedulerState) -> R) -> R {
        let enabled = self.cpu.disable_interrupts();
        let out = f(&mut self.state.lock());
        self.cpu.restore_interrupts(enabled);
        out
    }

    fn switch(&self, plan: SwitchPlan) {
        debug_assert!(!self.cpu.interrupts_enabled());
        if plan.fresh {
            self.cpu.entering_new_thread();
        }
        // SAFETY: блокировка отпущена, прерывания замаскированы; `from` и `to`
        // указывают в пул, который не двигает блоки, а уходящий блок живёт
        // до следующего прохода (см. SchedulerState::reap).
        // The lock is released and interrupts are masked; `from` and `to` point
        // into the pool, which never moves blocks, and the outgoing block lives
        // until the next pass (see SchedulerState::reap).
        unsafe { switch_context(plan.from, plan.to) };
    }

    fn idle(&self) {
        log::trace!("sched: nothing ready, idling");
        self.cpu.wait_for_interrupt();
    }
}

/// Путь выхода: сюда прыгает возвратный трамплин, когда entry вернул `code`.
/// The exit path: the return shim jumps here once entry returned `code`.
extern "C" fn thread_exit<C: Cpu>(scheduler: *const Scheduler<C>, code: usize) -> ! {
    // SAFETY: `create` берёт `&'static self` и кладёт его адрес в кадр
    // `create` takes `&'static self` and stores its address in the frame
    let scheduler = unsafe { &*scheduler };
    scheduler.exit_current(code)
}
