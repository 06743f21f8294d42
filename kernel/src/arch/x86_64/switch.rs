//! Переключение контекста — x86_64 System V
//! Context switch — x86_64 System V
//!
//! Единственное место, где регистры сохраняются и восстанавливаются вручную.
//! The only place where registers are saved and restored by hand.
//!
//! Контракт / Contract:
//!   * вызывается с замаскированными прерываниями / called with interrupts masked;
//!   * сохраняет rbp на стеке уходящего потока, затем rsp и callee-saved
//!     регистры в `from` / pushes rbp on the outgoing stack, then stores rsp and
//!     the callee-saved registers into `from`;
//!   * загружает `to`, снимает rbp со стека и делает `ret` — поэтому вершина
//!     сохранённого стека всегда [rbp][адрес возврата]
//!     loads `to`, pops rbp and `ret`s — so a saved stack top is always
//!     [rbp][return address].
//!
//! Для нового потока этот `ret` попадает в `threadcore_thread_start`
//! (см. `frame.rs`). For a fresh thread this `ret` lands in
//! `threadcore_thread_start` (see `frame.rs`).

use core::arch::global_asm;
use core::mem::{offset_of, size_of};

/// Снимок регистров потока, пока он не выполняется.
/// A thread's register snapshot while it is not running.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Registers {
    pub rsp:    u64, // 0x00 указатель стека / stack pointer
    pub rbp:    u64, // 0x08 указатель кадра / frame pointer
    pub rbx:    u64, // 0x10 ┐
    pub r12:    u64, // 0x18 │
    pub r13:    u64, // 0x20 │ callee-saved
    pub r14:    u64, // 0x28 │
    pub r15:    u64, // 0x30 ┘
    pub rflags: u64, // 0x38
}

const _: () = {
    assert!(size_of::<Registers>() == 0x40);
    assert!(offset_of!(Registers, rsp)    == 0x00);
    assert!(offset_of!(Registers, rbp)    == 0x08);
    assert!(offset_of!(Registers, rbx)    == 0x10);
    assert!(offset_of!(Registers, r15)    == 0x30);
    assert!(offset_of!(Registers, rflags) == 0x38);
};

impl Registers {
    pub fn stack_pointer(&self) -> usize {
        self.rsp as usize
    }

    pub fn frame_pointer(&self) -> usize {
        self.rbp as usize
    }

    /// rbx, r12–r15 в порядке сохранения / in save order
    pub fn callee_saved(&self) -> [u64; 5] {
        [self.rbx, self.r12, self.r13, self.r14, self.r15]
    }
}

global_asm!(
    r#"
.pushsection .text

.global threadcore_switch_context
.p2align 4
threadcore_switch_context:
    push rbp
    mov [rdi + 0x00], rsp
    mov [rdi + 0x08], rbp
    mov [rdi + 0x10], rbx
    mov [rdi + 0x18], r12
    mov [rdi + 0x20], r13
    mov [rdi + 0x28], r14
    mov [rdi + 0x30], r15
    pushfq
    pop qword ptr [rdi + 0x38]

    mov rsp, [rsi + 0x00]
    mov rbx, [rsi + 0x10]
    mov r12, [rsi + 0x18]
    mov r13, [rsi + 0x20]
    mov r14, [rsi + 0x28]
    mov r15, [rsi + 0x30]
    push qword ptr [rsi + 0x38]
    popfq
    pop rbp
    ret

/* A fresh thread's first entry: [rsp] = exit, [rsp + 8] = argument, rbx = entry */
.global threadcore_thread_start
.p2align 4
threadcore_thread_start:
    mov rdi, [rsp + 8]
    jmp rbx

/* entry returned: rax = result, r13 = scheduler, r14 = exit path */
.global threadcore_thread_return
.p2align 4
threadcore_thread_return:
    mov rdi, r13
    mov rsi, rax
    and rsp, -16
    call r14
    ud2

.popsection
"#
);

extern "C" {
    fn threadcore_switch_context(from: *mut Registers, to: *const Registers);
    fn threadcore_thread_start();
    fn threadcore_thread_return();
}

/// Сохранить текущий контекст в `from` и продолжить выполнение из `to`.
/// Save the running context into `from` and resume execution from `to`.
///
/// Возвращается, когда кто-то переключится обратно на `from`.
/// Returns once someone switches back to `from`.
///
/// # Safety
/// - `from` пишется, `to` читается; оба указывают на живые `Registers`
///   `from` is written and `to` is read; both point to live `Registers`.
/// - `to` получен предыдущим переключением или `frame::prepare`, и его стек жив.
///   `to` was produced by an earlier switch or by `frame::prepare`, and its
///   stack is still alive.
/// - Прерывания замаскированы / Interrupts are masked.
#[inline]
pub unsafe fn switch_context(from: *mut Registers, to: *const Registers) {
    unsafe { threadcore_switch_context(from, to) }
}

/// Адрес стартового трамплина (слот «entry» стартового кадра).
/// Address of the start shim (the "entry" slot of the bootstrap frame).
pub fn thread_start_shim() -> u64 {
    threadcore_thread_start as *const () as usize as u64
}

/// Адрес возвратного трамплина (слот «адрес возврата» стартового кадра).
/// Address of the return shim (the "return address" slot of the bootstrap frame).
pub fn thread_return_shim() -> u64 {
    threadcore_thread_return as *const () as usize as u64
}
