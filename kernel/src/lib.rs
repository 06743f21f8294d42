//! threadcore — ядро кооперативной многозадачности
//! threadcore — cooperative multitasking core
//!
//! Потоки, переключение контекста и round-robin планировщик.
//! Threads, context switching and a round-robin scheduler.
//!
//! Слои / Layers:
//!   arch    — сохранение/восстановление регистров, маскирование прерываний
//!             register save/restore, interrupt masking
//!   mm      — пул управляющих блоков, стеки потоков
//!             control block pool, thread stacks
//!   sched   — ThreadContext, ReadyQueue, Scheduler
//!   logger  — `log` поверх последовательного порта / `log` over the serial port
//!
//! Крейт собирается и как часть образа ядра (no_std), и на хосте для тестов.
//! The crate builds both into a kernel image (no_std) and on a host for tests.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

// Box, Vec, VecDeque — глобальный аллокатор предоставляет ядро
// Box, Vec, VecDeque: the kernel image provides the global allocator
extern crate alloc;

use core::fmt;

pub mod arch;
pub mod drivers;
pub mod logger;
pub mod mm;
pub mod sched;

pub use sched::{
    SchedulerConfig, Scheduler, SchedulerStats, ThreadEntry, ThreadHandle, ThreadId, ThreadState,
};
pub use mm::stack::{KernelStack, StackRegion};

// ── Конфигурация / Configuration ──────────────────────────────────────────────

/// Ёмкость пула управляющих блоков по умолчанию.
/// Default capacity of the control block pool.
pub const DEFAULT_MAX_THREADS: usize = 64;

/// Размер стека потока по умолчанию (64 KiB).
/// Default thread stack size (64 KiB).
pub const DEFAULT_STACK_SIZE: usize = 64 * 1024;

/// Наименьший регион, в который помещается стартовый кадр.
/// Smallest region the bootstrap frame fits into.
pub const MIN_STACK_SIZE: usize = arch::current::frame::BOOTSTRAP_FRAME_BYTES;

// ── Ошибки / Errors ───────────────────────────────────────────────────────────

/// Ошибки ядра планировщика / Scheduler core errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Пул управляющих блоков или стековая память исчерпаны.
    /// Control block pool or stack memory exhausted.
    OutOfMemory,
    /// Стартовый кадр не помещается в переданный регион стека.
    /// The bootstrap frame does not fit the supplied stack region.
    StackTooSmall,
    /// Поток завершился; его нельзя снова поставить в очередь.
    /// The thread has exited and can never be queued again.
    ThreadExited,
    /// Handle не принадлежит этому планировщику.
    /// Handle does not belong to this scheduler.
    InvalidHandle,
    NotInitialized,
    AlreadyInitialized,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Error::OutOfMemory        => "out of memory",
            Error::StackTooSmall      => "stack region too small for the bootstrap frame",
            Error::ThreadExited       => "thread has exited",
            Error::InvalidHandle      => "invalid thread handle",
            Error::NotInitialized     => "scheduler not initialized",
            Error::AlreadyInitialized => "scheduler already initialized",
        };
        f.write_str(msg)
    }
}

pub type Result<T> = core::result::Result<T, Error>;
