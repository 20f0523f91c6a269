use core::fmt::{self, Write};
use core::sync::atomic::{AtomicUsize, Ordering};

use spin::Mutex;
use uart_16550::MmioSerialPort;

use crate::logger::{LogLevel, LogSink};

static CONSOLE_BASE: AtomicUsize = AtomicUsize::new(0);

struct SerialPortWrapper {
    port: Option<MmioSerialPort>,
}

impl SerialPortWrapper {
    const fn new() -> Self {
        Self { port: None }
    }

    fn ensure_init(&mut self) {
        if self.port.is_none() {
            let base = CONSOLE_BASE.load(Ordering::Acquire);
            if base == 0 {
                return;
            }
            // SAFETY: `init` is the only writer of CONSOLE_BASE and its
            // caller guarantees the address maps a 16550 register block.
            let mut port = unsafe { MmioSerialPort::new(base) };
            port.init();
            self.port = Some(port);
        }
    }

    fn write_fmt(&mut self, args: fmt::Arguments<'_>) {
        self.ensure_init();
        if let Some(ref mut port) = self.port {
            port.write_fmt(args).ok();
        }
    }
}

static SERIAL1: Mutex<SerialPortWrapper> = Mutex::new(SerialPortWrapper::new());

/// Point the console at the UART register block at `base`.
///
/// # Safety
///
/// `base` must be the mapped MMIO address of a 16550-compatible UART that no
/// other code drives concurrently.
pub unsafe fn init(base: usize) {
    CONSOLE_BASE.store(base, Ordering::Release);
    SERIAL1.lock().ensure_init();
}

pub(crate) fn _print(args: fmt::Arguments<'_>) {
    SERIAL1.lock().write_fmt(args);
}

/// Log sink writing colored lines to the serial console.
pub struct SerialSink {
    /// Reads the free-running timebase.
    pub timebase: fn() -> u64,
    /// Timebase ticks per second.
    pub frequency: u64,
}

impl LogSink for SerialSink {
    fn write_line(&self, level: LogLevel, line: &str) {
        _print(format_args!(
            "{color}{line}\x1b[0m\n",
            color = level.serial_color(),
            line = line
        ));
    }

    fn timestamp_us(&self) -> u64 {
        if self.frequency == 0 {
            return 0;
        }
        let ticks = (self.timebase)() as u128;
        (ticks * 1_000_000 / self.frequency as u128) as u64
    }
}
