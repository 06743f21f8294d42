//! Потоки: идентичность, состояние, снимок регистров
//! Threads: identity, state, register snapshot

use core::fmt;

use crate::arch::Registers;
use crate::mm::pool::SlotKey;
use crate::mm::stack::KernelStack;

/// Точка входа потока: `entry(arg) -> result`.
/// Thread entry point: `entry(arg) -> result`.
pub type ThreadEntry = extern "C" fn(usize) -> usize;

/// Уникальный, монотонно растущий номер потока.
/// Unique, monotonically assigned thread number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadId(pub u64);

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Ссылка на поток внутри одного планировщика.
/// A reference to a thread inside one scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThreadHandle(pub(crate) SlotKey);

/// Состояние потока / Thread state
///
/// ```text
/// New ──ready──▶ Ready ──schedule──▶ Running ──exit──▶ Exited
///                  ▲ │                 │  │
///                  │ └──not_ready──┐   │  └──block──┐
///                  │               ▼   ▼            ▼
///                  └─────ready──── Blocked ◀────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    /// Создан, ещё ни разу не стоял в очереди / Created, never queued
    New,
    /// В очереди готовых / In the ready queue
    Ready,
    Running,
    /// Снят с очереди и ждёт внешнего события / Off the queue, waiting
    Blocked,
    /// Терминальное / Terminal
    Exited,
}

/// Управляющий блок потока / Thread control block
#[derive(Debug)]
pub struct ThreadContext {
    pub(crate) id:         ThreadId,
    pub(crate) state:      ThreadState,
    pub(crate) regs:       Registers,
    /// [base, top) стека; у загрузочного потока его нет
    /// [base, top) of the stack; the bootstrap thread has none
    pub(crate) stack:      Option<(usize, usize)>,
    /// Стек из `spawn`; уходит в drop при освобождении блока.
    /// Stack from `spawn`; dropped when the block is released.
    pub(crate) owned:      Option<KernelStack>,
    pub(crate) dispatches: u64,
    pub(crate) exit_code:  Option<usize>,
}

impl ThreadContext {
    /// Контекст уже выполняющегося потока управления.
    /// Context of the flow of control that is already running.
    pub(crate) fn bootstrap(id: ThreadId) -> Self {
        Self {
            id,
            state:      ThreadState::Running,
            regs:       Registers::default(),
            stack:      None,
            owned:      None,
            dispatches: 1,
            exit_code:  None,
        }
    }

    pub(crate) fn suspended(
        id: ThreadId,
        regs: Registers,
        stack: (usize, usize),
        owned: Option<KernelStack>,
    ) -> Self {
        Self {
            id,
            state:      ThreadState::New,
            regs,
            stack:      Some(stack),
            owned,
            dispatches: 0,
            exit_code:  None,
        }
    }

    pub fn id(&self) -> ThreadId {
        self.id
    }

    pub fn state(&self) -> ThreadState {
        self.state
    }

    pub fn registers(&self) -> &Registers {
        &self.regs
    }

    pub fn stack(&self) -> Option<(usize, usize)> {
        self.stack
    }

    /// Владеет ли поток своим стеком / Whether the thread owns its stack
    pub fn owns_stack(&self) -> bool {
        self.owned.is_some()
    }

    /// Сколько раз поток получал процессор / How many times it got the CPU
    pub fn dispatches(&self) -> u64 {
        self.dispatches
    }

    pub fn exit_code(&self) -> Option<usize> {
        self.exit_code
    }
}
