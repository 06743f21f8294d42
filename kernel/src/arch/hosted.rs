//! Hosted CPU — запуск ядра планировщика внутри обычного процесса
//! Hosted CPU — running the scheduler core inside an ordinary process
//!
//! `cli`/`sti`/`hlt` привилегированы, поэтому флаг IF эмулируется.
//! Само переключение контекста непривилегированно и работает как есть.
//! `cli`/`sti`/`hlt` are privileged, so the IF flag is emulated.
//! The context switch itself is unprivileged and runs unchanged.

use core::sync::atomic::{AtomicBool, Ordering};

use super::Cpu;

/// Эмулированный флаг прерываний, свой у каждого экземпляра.
/// Emulated interrupt flag, one per instance.
#[derive(Debug)]
pub struct Hosted {
    enabled: AtomicBool,
}

impl Hosted {
    pub const fn new() -> Self {
        Self { enabled: AtomicBool::new(true) }
    }
}

impl Default for Hosted {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu for Hosted {
    fn disable_interrupts(&self) -> bool {
        self.enabled.swap(false, Ordering::AcqRel)
    }

    fn restore_interrupts(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    fn interrupts_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    fn wait_for_interrupt(&self) {
        // Некому прислать прерывание — просто крутимся
        // Nobody delivers interrupts here, just spin
        core::hint::spin_loop();
    }

    fn entering_new_thread(&self) {
        self.enabled.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_masking_restores_outer_state() {
        let cpu = Hosted::new();
        assert!(cpu.interrupts_enabled());

        let outer = cpu.disable_interrupts();
        let inner = cpu.disable_interrupts();
        assert!(outer);
        assert!(!inner);
        assert!(!cpu.interrupts_enabled());

        cpu.restore_interrupts(inner);
        assert!(!cpu.interrupts_enabled());
        cpu.restore_interrupts(outer);
        assert!(cpu.interrupts_enabled());
    }

    #[test]
    fn a_new_thread_starts_with_interrupts_enabled() {
        let cpu = Hosted::new();
        cpu.disable_interrupts();
        cpu.entering_new_thread();
        assert!(cpu.interrupts_enabled());
    }
}
