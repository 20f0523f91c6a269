//! Fast reboot firmware core
//!
//! Reinitialises every execution unit of a multi-threaded processor complex
//! and hands control to a new payload without a full power-on reset.
//!
//! The crate is `no_std` + `alloc`: hardware access is supplied by the
//! embedding firmware through the traits in [`platform`], and the CPU
//! rendezvous protocol lives in [`reboot`].

#![no_std]

extern crate alloc;

pub mod config;
pub mod logger;
pub mod platform;
pub mod reboot;
#[cfg(feature = "serial_console")]
pub mod serial;

pub use config::RebootConfig;
pub use platform::Platform;
pub use reboot::{attempt_fast_reboot, Handoff, RebootContext, RebootError};

#[macro_export]
macro_rules! klog {
    ($level:expr, $($arg:tt)*) => {{
        $crate::logger::log($level, format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! kfatal {
    ($($arg:tt)*) => {{
        $crate::klog!($crate::logger::LogLevel::FATAL, $($arg)*);
    }};
}

#[macro_export]
macro_rules! kerror {
    ($($arg:tt)*) => {{
        $crate::klog!($crate::logger::LogLevel::ERROR, $($arg)*);
    }};
}

#[macro_export]
macro_rules! kwarn {
    ($($arg:tt)*) => {{
        $crate::klog!($crate::logger::LogLevel::WARN, $($arg)*);
    }};
}

#[macro_export]
macro_rules! kinfo {
    ($($arg:tt)*) => {{
        $crate::klog!($crate::logger::LogLevel::INFO, $($arg)*);
    }};
}

#[macro_export]
macro_rules! kdebug {
    ($($arg:tt)*) => {{
        $crate::klog!($crate::logger::LogLevel::DEBUG, $($arg)*);
    }};
}

#[macro_export]
macro_rules! ktrace {
    ($($arg:tt)*) => {{
        $crate::klog!($crate::logger::LogLevel::TRACE, $($arg)*);
    }};
}
