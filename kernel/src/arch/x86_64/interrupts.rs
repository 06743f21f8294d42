//! Прерывания x86_64: RFLAGS, cli/sti/hlt
//! x86_64 interrupts: RFLAGS, cli/sti/hlt

use core::arch::asm;

use bitflags::bitflags;

use crate::arch::Cpu;

bitflags! {
    /// Регистр флагов / Flags register
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RFlags: u64 {
        const CARRY          = 1 << 0;
        /// Всегда 1 / Always set
        const RESERVED_1     = 1 << 1;
        const ZERO           = 1 << 6;
        const SIGN           = 1 << 7;
        const TRAP           = 1 << 8;
        /// IF — прерывания разрешены / interrupts enabled
        const INTERRUPT_FLAG = 1 << 9;
        const DIRECTION      = 1 << 10;
        const OVERFLOW       = 1 << 11;
    }
}

impl RFlags {
    /// Флаги нового потока: стартует с разрешёнными прерываниями (0x202).
    /// A fresh thread's flags: it starts with interrupts enabled (0x202).
    pub const THREAD_START: Self =
        Self::from_bits_retain(Self::RESERVED_1.bits() | Self::INTERRUPT_FLAG.bits());
}

/// Прочитать RFLAGS (непривилегированная операция).
/// Read RFLAGS (unprivileged).
#[inline]
pub fn read_rflags() -> RFlags {
    let raw: u64;
    unsafe { asm!("pushfq", "pop {}", out(reg) raw, options(nomem, preserves_flags)) };
    RFlags::from_bits_retain(raw)
}

/// Настоящий процессор в ring 0.
/// The real processor in ring 0.
#[derive(Debug, Default)]
pub struct Native;

impl Native {
    pub const fn new() -> Self {
        Self
    }
}

impl Cpu for Native {
    fn disable_interrupts(&self) -> bool {
        let was = read_rflags().contains(RFlags::INTERRUPT_FLAG);
        unsafe { asm!("cli", options(nomem, nostack)) };
        was
    }

    fn restore_interrupts(&self, enabled: bool) {
        if enabled {
            unsafe { asm!("sti", options(nomem, nostack)) };
        }
    }

    fn interrupts_enabled(&self) -> bool {
        read_rflags().contains(RFlags::INTERRUPT_FLAG)
    }

    fn wait_for_interrupt(&self) {
        // sti откладывает IF на одну инструкцию — hlt не пропустит прерывание
        // sti delays IF by one instruction, so hlt cannot miss the wakeup
        unsafe { asm!("sti", "hlt", "cli", options(nomem, nostack)) };
    }
}
