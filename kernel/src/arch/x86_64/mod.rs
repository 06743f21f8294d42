//! x86_64 — переключение контекста и прерывания
//! x86_64 — context switch and interrupts

pub mod frame;
pub mod interrupts;
pub mod switch;

pub use interrupts::{Native, RFlags};
