//! Состояние планировщика и политика round-robin
//! Scheduler state and the round-robin policy
//!
//! Здесь нет ни ассемблера, ни прерываний: только решения «кто следующий».
//! Само переключение делает `Scheduler` по плану, который возвращает `rotate`.
//! No assembly and no interrupts here: only "who runs next" decisions.
//! `Scheduler` performs the switch from the plan `rotate` returns.

use super::queue::ReadyQueue;
use super::thread::{ThreadContext, ThreadHandle, ThreadId, ThreadState};
use super::{SchedulerConfig, SchedulerStats};
use crate::arch::Registers;
use crate::mm::pool::SlotPool;
use crate::mm::stack::{KernelStack, StackRegion};
use crate::{Error, Result};

/// Что переключать: куда сохранить уходящий поток и откуда взять следующий.
/// What to switch: where the outgoing thread is saved, where the next comes from.
///
/// Указатели смотрят в пул управляющих блоков, который никогда не двигает
/// выданные блоки, а уходящий блок живёт до следующего прохода планировщика.
/// The pointers point into the control block pool, which never moves blocks,
/// and the outgoing block lives until the next scheduling pass.
#[derive(Debug)]
pub struct SwitchPlan {
    pub from: *mut Registers,
    pub to:   *const Registers,
    pub prev: ThreadHandle,
    pub next: ThreadHandle,
    /// `next` ещё ни разу не выполнялся / `next` has never run before
    pub fresh: bool,
}

pub struct SchedulerState {
    threads:   SlotPool<ThreadContext>,
    ready:     ReadyQueue,
    current:   ThreadHandle,
    bootstrap: ThreadHandle,
    /// Завершившийся поток, с чьего стека мы ещё, возможно, не ушли.
    /// An exited thread whose stack we may not have left yet.
    zombie:    Option<ThreadHandle>,
    next_id:   u64,
    stats:     SchedulerStats,
}

impl SchedulerState {
    /// initThreading: пул, очередь и затравочный контекст текущего потока.
    /// initThreading: pool, queue and the seed context of the running flow.
    pub fn boot(config: &SchedulerConfig) -> Result<Self> {
        let mut threads = SlotPool::with_capacity(config.max_threads)?;
        let ready = ReadyQueue::with_capacity(config.max_threads)?;

        let seed = ThreadContext::bootstrap(ThreadId(0));
        let bootstrap = ThreadHandle(threads.allocate(seed)?);
        log::debug!("sched: bootstrap thread {} running", ThreadId(0));

        Ok(Self {
            threads,
            ready,
            current: bootstrap,
            bootstrap,
            zombie: None,
            next_id: 1,
            stats: SchedulerStats::default(),
        })
    }

    /// createThread, часть про управляющий блок: поток в состоянии New.
    /// `owned` — стек, который поток забирает себе; при ошибке он освобождается.
    /// createThread, the control block half: the thread starts out New.
    /// `owned` is a stack the thread takes over; on failure it is freed.
    pub fn admit(
        &mut self,
        regs: Registers,
        stack: &StackRegion,
        owned: Option<KernelStack>,
    ) -> Result<ThreadHandle> {
        self.reap();
        let id = ThreadId(self.next_id);
        let ctx = ThreadContext::suspended(id, regs, (stack.base(), stack.top()), owned);
        let handle = ThreadHandle(self.threads.allocate(ctx).map_err(|e| {
            log::warn!("sched: no control block for thread {}", id);
            e
        })?);
        self.next_id += 1;
        self.stats.created += 1;
        log::debug!("sched: created thread {} (stack {:#x}..{:#x})", id, stack.base(), stack.top());
        Ok(handle)
    }

    /// threadIsReady. Завершённые потоки отвергаются, текущий — no-op.
    /// threadIsReady. Exited threads are rejected, the current one is a no-op.
    pub fn thread_is_ready(&mut self, thread: ThreadHandle) -> Result<()> {
        let is_current = thread == self.current;
        let state = self.state_of(thread)?;
        match state {
            ThreadState::Exited => return Err(Error::ThreadExited),
            ThreadState::Running => {}
            // Разбудили раньше, чем он успел уйти с процессора
            // Woken before it managed to leave the CPU
            ThreadState::Blocked if is_current => self.context_mut(thread).state = ThreadState::Running,
            ThreadState::New | ThreadState::Blocked | ThreadState::Ready => self.enqueue(thread),
        }
        Ok(())
    }

    /// threadNotReady. Поток не в очереди (в т.ч. Running) — no-op.
    /// threadNotReady. A thread that is not queued (Running included) is a no-op.
    pub fn thread_not_ready(&mut self, thread: ThreadHandle) -> bool {
        if !self.ready.remove(thread) {
            return false;
        }
        self.context_mut(thread).state = ThreadState::Blocked;
        log::trace!("sched: thread {} no longer ready", self.context(thread).id);
        true
    }

    /// Текущий поток уходит в ожидание; следующий `rotate` его не вернёт в очередь.
    /// The current thread goes to sleep; the next `rotate` will not requeue it.
    pub fn block_current(&mut self) {
        let current = self.current;
        let ctx = self.context_mut(current);
        debug_assert_eq!(ctx.state, ThreadState::Running);
        ctx.state = ThreadState::Blocked;
        log::trace!("sched: thread {} blocked", ctx.id);
    }

    /// exitThread: терминальное состояние. Поток остаётся текущим до ближайшего
    /// `rotate`, а его блок освобождается ещё на проход позже.
    /// exitThread: terminal state. The thread stays current until the next
    /// `rotate`, and its block is freed one pass after that.
    pub fn exit_current(&mut self, code: usize) {
        let current = self.current;
        self.ready.remove(current);
        let ctx = self.context_mut(current);
        ctx.state = ThreadState::Exited;
        ctx.exit_code = Some(code);
        let id = ctx.id;
        self.stats.exited += 1;
        log::debug!("sched: thread {} exited with {}", id, code);
    }

    /// Шаги 1–3 schedule(): очередь пуста → `None`; иначе текущий поток в хвост
    /// (если он ещё Running), голова очереди становится текущей.
    /// Steps 1–3 of schedule(): empty queue → `None`; otherwise the current
    /// thread goes to the tail (if still Running) and the head becomes current.
    pub fn rotate(&mut self) -> Option<SwitchPlan> {
        self.reap();
        if self.ready.is_empty() {
            return None;
        }

        let prev = self.current;
        match self.context(prev).state {
            ThreadState::Running => self.enqueue(prev),
            ThreadState::Exited => self.zombie = Some(prev),
            ThreadState::Blocked => {}
            state => panic!("current thread in state {:?}", state),
        }

        let next = self.ready.dequeue_front()?;
        let ctx = self.context_mut(next);
        assert_eq!(ctx.state, ThreadState::Ready, "dispatching a thread that is not ready");
        ctx.state = ThreadState::Running;
        let fresh = ctx.dispatches == 0;
        ctx.dispatches += 1;
        self.current = next;
        self.stats.switches += 1;

        let from = &mut self.context_mut(prev).regs as *mut Registers;
        let to = &self.context(next).regs as *const Registers;
        log::trace!("sched: {} -> {}", self.context(prev).id, self.context(next).id);
        Some(SwitchPlan { from, to, prev, next, fresh })
    }

    /// Освободить блок зомби вместе с его собственным стеком.
    /// Вызывается только с чужого стека.
    /// Free the zombie's block along with the stack it owns.
    /// Only ever called from another stack.
    pub fn reap(&mut self) {
        if let Some(zombie) = self.zombie.take() {
            debug_assert_ne!(zombie, self.current);
            if let Some(ctx) = self.threads.release(zombie.0) {
                log::debug!("sched: reaped thread {} (stack freed: {})", ctx.id, ctx.owns_stack());
            }
        }
    }

    pub fn note_tick(&mut self) {
        self.stats.ticks += 1;
    }

    pub fn current(&self) -> ThreadHandle {
        self.current
    }

    pub fn current_state(&self) -> ThreadState {
        self.context(self.current).state
    }

    pub fn bootstrap(&self) -> ThreadHandle {
        self.bootstrap
    }

    /// `InvalidHandle` — чужой handle; `ThreadExited` — блок уже освобождён.
    /// `InvalidHandle`: a foreign handle. `ThreadExited`: its block is gone.
    pub fn thread(&self, thread: ThreadHandle) -> Result<&ThreadContext> {
        match self.threads.get(thread.0) {
            Some(ctx) => Ok(ctx),
            None if self.threads.issued(thread.0) => Err(Error::ThreadExited),
            None => Err(Error::InvalidHandle),
        }
    }

    pub fn state_of(&self, thread: ThreadHandle) -> Result<ThreadState> {
        self.thread(thread).map(ThreadContext::state)
    }

    pub fn ready(&self) -> &ReadyQueue {
        &self.ready
    }

    pub fn live_threads(&self) -> usize {
        self.threads.len()
    }

    pub fn running_count(&self) -> usize {
        self.threads.iter().filter(|(_, t)| t.state == ThreadState::Running).count()
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    fn enqueue(&mut self, thread: ThreadHandle) {
        self.ready.enqueue(thread);
        self.context_mut(thread).state = ThreadState::Ready;
    }

    // Внутренние handle всегда живые / Internal handles are always live
    fn context(&self, thread: ThreadHandle) -> &ThreadContext {
        match self.threads.get(thread.0) {
            Some(ctx) => ctx,
            None => panic!("scheduler lost track of thread {:?}", thread),
        }
    }

    fn context_mut(&mut self, thread: ThreadHandle) -> &mut ThreadContext {
        match self.threads.get_mut(thread.0) {
            Some(ctx) => ctx,
            None => panic!("scheduler lost track of thread {:?}", thread),
        }
    }
}
