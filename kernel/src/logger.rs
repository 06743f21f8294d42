//! Журнал — `log` фасад поверх любого приёмника строк
//! Logging — the `log` facade over any line sink
//!
//! Формат строки / Line format: `[LEVEL] target: message`

use core::fmt;

use log::{LevelFilter, Log, Metadata, Record};

/// Приёмник одной отформатированной строки (без перевода строки).
/// Sink for one formatted line (no trailing newline).
pub type Sink = fn(fmt::Arguments<'_>);

/// Одна строка журнала / One log line
pub struct Line<'a, 'r>(pub &'a Record<'r>);

impl fmt::Display for Line<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:<5}] {}: {}", self.0.level(), self.0.target(), self.0.args())
    }
}

pub struct KernelLogger {
    sink: Sink,
}

impl KernelLogger {
    pub const fn new(sink: Sink) -> Self {
        Self { sink }
    }
}

impl Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            (self.sink)(format_args!("{}", Line(record)));
        }
    }

    fn flush(&self) {}
}

#[cfg(target_arch = "x86_64")]
static SERIAL_LOGGER: KernelLogger = KernelLogger::new(crate::drivers::serial::write_line);

/// Поднять COM1 и направить в него `log` (только голое железо: порты
/// ввода-вывода привилегированы). Bring up COM1 and route `log` into it
/// (bare metal only: port I/O is privileged).
#[cfg(target_arch = "x86_64")]
pub fn init(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    crate::drivers::serial::init();
    log::set_logger(&SERIAL_LOGGER)?;
    log::set_max_level(level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::{String, ToString};
    use core::fmt::Write;
    use log::Level;
    use spin::Mutex;

    static CAPTURED: Mutex<String> = Mutex::new(String::new());

    fn capture(args: fmt::Arguments<'_>) {
        let mut out = CAPTURED.lock();
        out.write_fmt(args).ok();
        out.push('\n');
    }

    #[test]
    fn line_carries_level_target_and_message() {
        let record = Record::builder()
            .level(Level::Warn)
            .target("sched")
            .args(format_args!("thread 3 exited"))
            .build();
        assert_eq!(Line(&record).to_string(), "[WARN ] sched: thread 3 exited");
    }

    #[test]
    fn logger_forwards_formatted_lines_to_its_sink() {
        let logger = KernelLogger::new(capture);
        let record = Record::builder()
            .level(Level::Error)
            .target("t")
            .args(format_args!("boom"))
            .build();

        log::set_max_level(LevelFilter::Trace);
        logger.log(&record);
        assert!(CAPTURED.lock().contains("[ERROR] t: boom\n"));
    }
}
