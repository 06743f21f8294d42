//! Kernel-space drivers
//!
//! Ровно то, что нужно для журнала / Exactly what logging needs:
//!   - UART/Serial — вывод `log` в терминал QEMU / `log` output to the QEMU terminal

#[cfg(target_arch = "x86_64")]
pub mod serial;
