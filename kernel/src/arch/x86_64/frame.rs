//! Стартовый кадр нового потока / A new thread's bootstrap frame
//!
//! От старших адресов к младшим / From high to low addresses:
//!
//! ```text
//!   top (выровнен на 16 / 16-aligned)
//!   ┌──────────────────────┐ top - 8    не используется / padding
//!   │ аргумент / argument  │ top - 16   16-aligned
//!   │ адрес возврата       │ top - 24   → threadcore_thread_return
//!   │ entry                │ top - 32   → threadcore_thread_start
//!   │ rbp = 0              │ top - 40   ← rsp сохранённого снимка / saved rsp
//!   └──────────────────────┘ top - 48   scratch для push rflags в switch
//! ```
//!
//! `switch_context` снимает rbp и делает `ret` в стартовый трамплин; тот берёт
//! аргумент в rdi и прыгает в entry (адрес в rbx). Когда entry возвращается,
//! `ret` попадает в возвратный трамплин, который передаёт rax пути выхода
//! (r14) вместе с указателем на планировщик (r13).
//!
//! `switch_context` pops rbp and `ret`s into the start shim; the shim loads the
//! argument into rdi and jumps to entry (address in rbx). When entry returns,
//! its `ret` lands in the return shim, which hands rax to the exit path (r14)
//! together with the scheduler pointer (r13).

use core::mem::size_of;
use core::ptr;

use super::interrupts::RFlags;
use super::switch::{thread_return_shim, thread_start_shim, Registers};
use crate::mm::stack::StackRegion;
use crate::sched::ThreadEntry;
use crate::{Error, Result};

const WORD: usize = size_of::<u64>();
const STACK_ALIGN: usize = 16;

/// Байт под кадр с учётом выравнивания вершины и scratch-слова.
/// Bytes the frame needs, counting top alignment and the scratch word.
pub const BOOTSTRAP_FRAME_BYTES: usize = 6 * WORD + STACK_ALIGN;

const ARG_OFFSET:    usize = 2 * WORD;
const RETURN_OFFSET: usize = 3 * WORD;
const ENTRY_OFFSET:  usize = 4 * WORD;
const FP_OFFSET:     usize = 5 * WORD;
const SCRATCH:       usize = 6 * WORD;

/// Куда попадает поток после возврата из entry.
/// Where a thread goes once its entry returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitRoute {
    /// `extern "C" fn(context, result) -> !`
    pub routine: u64,
    /// Первый аргумент `routine` / First argument of `routine`
    pub context: u64,
}

/// Четыре слова кадра, прочитанные обратно (для диагностики и тестов).
/// The four frame words read back (for diagnostics and tests).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapFrame {
    pub argument:       u64,
    pub return_address: u64,
    pub entry:          u64,
    pub frame_pointer:  u64,
}

/// Записать стартовый кадр в `stack` и вернуть снимок регистров для первого
/// переключения. Размер стека сверх самого кадра не проверяется.
/// Write the bootstrap frame into `stack` and return the register snapshot for
/// the first switch. Stack size beyond the frame itself is not checked.
pub fn prepare(
    stack: &StackRegion,
    entry: ThreadEntry,
    arg: usize,
    exit: ExitRoute,
) -> Result<Registers> {
    let base = stack.base();
    let top = stack.top() & !(STACK_ALIGN - 1);
    if top < base + SCRATCH {
        return Err(Error::StackTooSmall);
    }

    let fp_slot = top - FP_OFFSET;
    // SAFETY: StackRegion гарантирует запись в [base, base + len), а
    // [top - 40, top - 8) лежит внутри / StackRegion guarantees writes to
    // [base, base + len), and [top - 40, top - 8) lies inside it.
    unsafe {
        ptr::write((top - ARG_OFFSET)    as *mut u64, arg as u64);
        ptr::write((top - RETURN_OFFSET) as *mut u64, thread_return_shim());
        ptr::write((top - ENTRY_OFFSET)  as *mut u64, thread_start_shim());
        ptr::write(fp_slot               as *mut u64, 0);
    }

    Ok(Registers {
        rsp:    fp_slot as u64,
        rbp:    0,
        rbx:    entry as *const () as usize as u64,
        r12:    0,
        r13:    exit.context,
        r14:    exit.routine,
        r15:    0,
        rflags: RFlags::THREAD_START.bits(),
    })
}

/// Прочитать кадр, на который указывает снимок ещё не запущенного потока.
/// Read the frame a not-yet-started thread's snapshot points at.
///
/// # Safety
/// `regs` получен из `prepare`, поток ещё ни разу не выполнялся, стек жив.
/// `regs` came from `prepare`, the thread has never run, its stack is alive.
pub unsafe fn read_back(regs: &Registers) -> BootstrapFrame {
    let sp = regs.rsp as *const u64;
    unsafe {
        BootstrapFrame {
            frame_pointer:  ptr::read(sp),
            entry:          ptr::read(sp.add(1)),
            return_address: ptr::read(sp.add(2)),
            argument:       ptr::read(sp.add(3)),
        }
    }
}
