//! UART Serial driver — COM1 (0x3F8)
//!
//! Приёмник журнала на голом железе.
//! The log sink on bare metal: `qemu-system-x86_64 -serial stdio ...`

use core::arch::asm;
use core::fmt;

use spin::Mutex;

const COM1: u16 = 0x3F8;

/// Line Status Register: регистр передачи пуст / transmit holding register empty
const LSR_THR_EMPTY: u8 = 0x20;

unsafe fn outb(port: u16, val: u8) {
    unsafe { asm!("out dx, al", in("dx") port, in("al") val, options(nomem, nostack, preserves_flags)) };
}

unsafe fn inb(port: u16) -> u8 {
    let val: u8;
    unsafe { asm!("in al, dx", out("al") val, in("dx") port, options(nomem, nostack, preserves_flags)) };
    val
}

pub struct SerialPort {
    base: u16,
}

impl SerialPort {
    pub const fn new(base: u16) -> Self {
        Self { base }
    }

    /// 115200 бод, 8N1, FIFO. / 115200 baud, 8N1, FIFO.
    pub fn init(&mut self) {
        let b = self.base;
        unsafe {
            outb(b + 1, 0x00); // Отключить прерывания UART / Disable UART interrupts
            outb(b + 3, 0x80); // DLAB
            outb(b,     0x01); // Делитель 1 → 115200 / Divisor 1 → 115200
            outb(b + 1, 0x00);
            outb(b + 3, 0x03); // 8 бит, без чётности, 1 стоп-бит / 8N1
            outb(b + 2, 0xC7); // FIFO, 14-byte threshold
            outb(b + 4, 0x0B);
        }
    }

    fn send(&mut self, byte: u8) {
        unsafe {
            while inb(self.base + 5) & LSR_THR_EMPTY == 0 {
                core::hint::spin_loop();
            }
            outb(self.base, byte);
        }
    }
}

impl fmt::Write for SerialPort {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            if byte == b'\n' {
                self.send(b'\r');
            }
            self.send(byte);
        }
        Ok(())
    }
}

static COM1_PORT: Mutex<SerialPort> = Mutex::new(SerialPort::new(COM1));

pub fn init() {
    COM1_PORT.lock().init();
}

/// Вывести одну строку журнала в COM1 / Write one log line to COM1
pub fn write_line(args: fmt::Arguments<'_>) {
    use fmt::Write;
    let mut port = COM1_PORT.lock();
    port.write_fmt(args).ok();
    port.write_str("\n").ok();
}
