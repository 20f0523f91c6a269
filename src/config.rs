//! Fast reboot configuration
//!
//! Parsed from the firmware command line or an NVRAM-style line of
//! whitespace-separated `key=value` tokens:
//!
//! - `experimental-fast-reset=feeling-lucky`: opt in on generations where
//!   fast reboot is experimental
//! - `fast-reboot-timeout-ms=<n>`: bound for the first rendezvous barrier;
//!   must be non-zero since that barrier is never unbounded
//! - `fast-reboot=0|off|no|false`: veto fast reboot for this boot
//! - `log=<level>` / `loglevel=<level>`: logger max level

use crate::logger::{self, LogLevel};
use crate::reboot::{RebootContext, FAST_RESET_NVRAM_KEY, FAST_RESET_NVRAM_VALUE, PRESENT_TIMEOUT_MS};

/// Disable reason installed when the configuration turns fast reboot off
pub const DISABLED_BY_CONFIG: &str = "disabled by configuration";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebootConfig {
    pub present_timeout_ms: u64,
    pub experimental_fast_reset: bool,
    pub enabled: bool,
    pub log_level: Option<LogLevel>,
}

impl RebootConfig {
    pub const fn new() -> Self {
        Self {
            present_timeout_ms: PRESENT_TIMEOUT_MS,
            experimental_fast_reset: false,
            enabled: true,
            log_level: None,
        }
    }

    pub fn parse(cmdline: &str) -> Self {
        let mut config = Self::new();

        for arg in cmdline.split_whitespace() {
            let Some((key, value)) = arg.split_once('=') else {
                continue;
            };

            if key == FAST_RESET_NVRAM_KEY {
                config.experimental_fast_reset = value == FAST_RESET_NVRAM_VALUE;
            } else if key == "fast-reboot-timeout-ms" {
                match value.parse::<u64>() {
                    Ok(ms) if ms > 0 => config.present_timeout_ms = ms,
                    _ => crate::kwarn!(
                        "Config: bad fast-reboot-timeout-ms '{}', keeping {}",
                        value,
                        config.present_timeout_ms
                    ),
                }
            } else if key == "fast-reboot" {
                config.enabled = !matches!(value, "0" | "off" | "no" | "false");
            }
        }

        config.log_level = logger::parse_level_directive(cmdline);
        config
    }

    /// Push the configuration into the shared context and the logger.
    pub fn apply(&self, ctx: &RebootContext) {
        if let Some(level) = self.log_level {
            logger::set_max_level(level);
        }

        ctx.set_present_timeout_ms(self.present_timeout_ms);
        ctx.set_experimental_opt_in(self.experimental_fast_reset);

        if !self.enabled {
            ctx.disable(DISABLED_BY_CONFIG);
        }

        crate::kdebug!(
            "Config: fast reboot {} (timeout {} ms, experimental {})",
            if self.enabled { "enabled" } else { "disabled" },
            self.present_timeout_ms,
            self.experimental_fast_reset
        );
    }
}

impl Default for RebootConfig {
    fn default() -> Self {
        Self::new()
    }
}
