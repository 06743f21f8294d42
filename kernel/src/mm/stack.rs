//! Стеки потоков / Thread stacks
//!
//! Регион, переданный в `create`, принадлежит вызывающему: тот держит его
//! живым, пока поток не завершится. Стек, выделенный в `spawn`, принадлежит
//! потоку и освобождается вместе с его управляющим блоком.
//! A region passed to `create` belongs to the caller, who keeps it alive until
//! the thread has exited. A stack allocated by `spawn` belongs to the thread
//! and is freed together with its control block.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::ptr::NonNull;

use crate::{Error, Result};

/// Непрерывный регион памяти под стек / A contiguous stack memory range
#[derive(Debug)]
pub struct StackRegion {
    base: NonNull<u8>,
    len:  usize,
}

impl StackRegion {
    /// # Safety
    /// `[base, base + len)` доступен для записи и не используется ничем,
    /// кроме потока, которому регион будет отдан, пока тот не завершится.
    /// `[base, base + len)` is writable and used by nothing but the thread it
    /// is handed to, until that thread has exited.
    pub unsafe fn from_raw_parts(base: NonNull<u8>, len: usize) -> Self {
        Self { base, len }
    }

    /// Статический буфер — типичный случай для стеков ядра.
    /// A static buffer — the usual case for kernel stacks.
    pub fn from_static(mem: &'static mut [u8]) -> Self {
        let len = mem.len();
        // Срез никогда не даёт нулевой указатель / A slice never yields null
        let base = NonNull::new(mem.as_mut_ptr()).unwrap_or(NonNull::dangling());
        Self { base, len }
    }

    pub fn base(&self) -> usize {
        self.base.as_ptr() as usize
    }

    /// Первый адрес за концом региона / First address past the region
    pub fn top(&self) -> usize {
        self.base() + self.len
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains(&self, addr: usize) -> bool {
        (self.base()..self.top()).contains(&addr)
    }
}

/// Стек из кучи ядра. Память освобождается при drop.
/// A stack carved from the kernel heap. The memory is freed on drop.
///
/// Хранится как сырой указатель: пока стек отдан потоку, в него пишут
/// через `StackRegion`, а не через ссылку.
/// Held as a raw pointer: while a thread runs on it, writes go through the
/// `StackRegion`, not through a reference.
#[derive(Debug)]
pub struct KernelStack {
    mem: NonNull<[u8]>,
}

// SAFETY: KernelStack единолично владеет своим буфером
// KernelStack is the sole owner of its buffer
unsafe impl Send for KernelStack {}

impl KernelStack {
    /// Выделить обнулённый стек. `OutOfMemory`, если куча не может его дать.
    /// Allocate a zeroed stack. `OutOfMemory` if the heap cannot provide it.
    pub fn allocate(size: usize) -> Result<Self> {
        let mut mem = Vec::new();
        mem.try_reserve_exact(size).map_err(|_| Error::OutOfMemory)?;
        mem.resize(size, 0u8);
        Ok(Self { mem: NonNull::from(Box::leak(mem.into_boxed_slice())) })
    }

    pub fn len(&self) -> usize {
        self.mem.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mem.len() == 0
    }

    /// Одолжить регион. Он действителен, пока жив этот `KernelStack`.
    /// Lend the region. It stays valid for as long as this `KernelStack` lives.
    pub fn region(&self) -> StackRegion {
        // SAFETY: буфер наш и живёт до drop / the buffer is ours until drop
        unsafe { StackRegion::from_raw_parts(self.mem.cast::<u8>(), self.len()) }
    }

    /// Отдать стек навсегда, без освобождения.
    /// Give the stack away for good, never freeing it.
    pub fn leak(self) -> StackRegion {
        let region = self.region();
        core::mem::forget(self);
        region
    }
}

impl Drop for KernelStack {
    fn drop(&mut self) {
        // SAFETY: получен из Box::leak в `allocate` / came from Box::leak in `allocate`
        drop(unsafe { Box::from_raw(self.mem.as_ptr()) });
    }
}
