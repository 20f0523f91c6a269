//! Log capture sink
//!
//! Installs itself as the library's log sink and keeps every line in memory.
//! The logger is process-global, so tests asserting on captured lines must
//! run `#[serial]`.

use fast_reboot::logger::{self, LogLevel, LogSink};
use lazy_static::lazy_static;
use spin::{Mutex, MutexGuard};

lazy_static! {
    static ref LINES: Mutex<Vec<(LogLevel, String)>> = Mutex::new(Vec::new());
}

struct CaptureSink;

impl LogSink for CaptureSink {
    fn write_line(&self, level: LogLevel, line: &str) {
        lines_lock().push((level, line.to_string()));
    }
}

static SINK: CaptureSink = CaptureSink;

fn lines_lock() -> MutexGuard<'static, Vec<(LogLevel, String)>> {
    LINES.lock()
}

/// Install the capture sink, open the level filter fully, drop old lines.
pub fn install() {
    logger::init(&SINK);
    logger::set_max_level(LogLevel::TRACE);
    clear();
}

pub fn clear() {
    lines_lock().clear();
}

pub fn lines() -> Vec<String> {
    lines_lock().iter().map(|(_, line)| line.clone()).collect()
}

pub fn lines_at(level: LogLevel) -> Vec<String> {
    lines_lock()
        .iter()
        .filter(|(lvl, _)| *lvl == level)
        .map(|(_, line)| line.clone())
        .collect()
}

pub fn contains(needle: &str) -> bool {
    lines_lock().iter().any(|(_, line)| line.contains(needle))
}

pub fn count(needle: &str) -> usize {
    lines_lock()
        .iter()
        .filter(|(_, line)| line.contains(needle))
        .count()
}
