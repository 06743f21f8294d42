//! HAL — Hardware Abstraction Layer
//!
//! Выбираем реализацию в зависимости от целевой архитектуры.
//! Select implementation based on target architecture.
//!
//! Здесь живёт всё, что трогает регистры напрямую: переключение контекста,
//! стартовый кадр нового потока, маскирование прерываний.
//! Everything that touches registers directly lives here: the context switch,
//! a new thread's bootstrap frame, interrupt masking.

#[cfg(target_arch = "x86_64")]
pub mod x86_64;
#[cfg(target_arch = "x86_64")]
pub use self::x86_64 as current;

#[cfg(not(target_arch = "x86_64"))]
compile_error!("threadcore: context switching is implemented for x86_64 only");

pub mod hosted;

pub use current::switch::{switch_context, Registers};

/// Управление прерываниями одного ядра.
/// Interrupt control of a single core.
///
/// Планировщик маскирует прерывания на время любой мутации очереди и на время
/// самого переключения; это единственная синхронизация на одном ядре.
/// The scheduler masks interrupts around every queue mutation and around the
/// switch itself; on a single core that is the only synchronization needed.
pub trait Cpu: Sync {
    /// Замаскировать прерывания, вернуть прежнее состояние (true = были включены).
    /// Mask interrupts, returning the previous state (true = were enabled).
    fn disable_interrupts(&self) -> bool;

    /// Вернуть состояние, полученное от `disable_interrupts`.
    /// Restore the state returned by `disable_interrupts`.
    fn restore_interrupts(&self, enabled: bool);

    fn interrupts_enabled(&self) -> bool;

    /// Простой: разрешить прерывания, ждать одного, снова замаскировать.
    /// Idle: enable interrupts, wait for one, mask them again.
    fn wait_for_interrupt(&self);

    /// Вызывается прямо перед первым переключением на новый поток.
    /// Новый поток стартует с IF = 1: на железе это делает `popfq` из его
    /// стартового снимка, эмуляции нужно выставить флаг самой.
    /// Called right before the first switch into a new thread. A new thread
    /// starts with IF = 1: on hardware `popfq` loads it from the bootstrap
    /// snapshot, an emulation has to set the flag itself.
    fn entering_new_thread(&self) {}
}

/// Платформа по умолчанию: голое железо → `Native`, хост → `Hosted`.
/// Default platform: bare metal → `Native`, hosted → `Hosted`.
#[cfg(target_os = "none")]
pub type Platform = current::Native;
#[cfg(not(target_os = "none"))]
pub type Platform = hosted::Hosted;
