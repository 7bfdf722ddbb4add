// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Provides [`ShimConfig`], the load time configuration of the driver.
//!
//! The configuration is read from two variables in the driver's vendor namespace (see
//! [`crate::system::variable::SECUREFAKE_GUID`]):
//! - `SecureFakeDisable`, a boolean. If it is set, the driver loads without hooking anything.
//! - `SecureFakeLogLevel`, a byte from 0 (off) to 5 (trace). Anything above 5 is trace.
//!
//! Both are optional. The configuration is read before the hook is installed, so it always reaches the firmware.

use log::{LevelFilter, warn};
use uefi::{CStr16, cstr16};

use crate::system::variable::{UefiVariable, get_variable};

/// The variable that disables the hook.
const DISABLE_VARIABLE: &CStr16 = cstr16!("SecureFakeDisable");

/// The variable that sets the log level.
const LOG_LEVEL_VARIABLE: &CStr16 = cstr16!("SecureFakeLogLevel");

/// The log level when none is configured.
pub const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Info;

/// The load time configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShimConfig {
    /// If the hook should be installed.
    pub enabled: bool,

    /// The maximum level of log messages.
    pub log_level: LevelFilter,
}

impl Default for ShimConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_level: DEFAULT_LOG_LEVEL,
        }
    }
}

impl ShimConfig {
    /// Read the configuration from UEFI variables.
    ///
    /// A variable that cannot be read is treated as absent, so this never fails.
    #[must_use = "Has no effect if the result is unused"]
    pub fn load() -> Self {
        Self::from_raw(read_or_warn(DISABLE_VARIABLE), read_or_warn(LOG_LEVEL_VARIABLE))
    }

    /// Build the configuration from the raw variable contents, where None is a missing variable.
    #[must_use = "Has no effect if the result is unused"]
    pub fn from_raw(disable: Option<bool>, log_level: Option<u8>) -> Self {
        Self {
            enabled: !disable.unwrap_or(false),
            log_level: log_level.map_or(DEFAULT_LOG_LEVEL, level_from_byte),
        }
    }
}

/// Convert a configured byte to a [`LevelFilter`].
#[must_use = "Has no effect if the result is unused"]
pub const fn level_from_byte(level: u8) -> LevelFilter {
    match level {
        0 => LevelFilter::Off,
        1 => LevelFilter::Error,
        2 => LevelFilter::Warn,
        3 => LevelFilter::Info,
        4 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Read a variable, logging and ignoring errors.
fn read_or_warn<T: UefiVariable>(name: &CStr16) -> Option<T> {
    get_variable(name, None).unwrap_or_else(|e| {
        warn!("Could not read {name}, using the default: {e}");
        None
    })
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(ShimConfig::from_raw(None, None), ShimConfig::default());
        assert!(ShimConfig::default().enabled);
        assert_eq!(ShimConfig::default().log_level, LevelFilter::Info);
    }

    #[test]
    fn test_disable() {
        assert!(!ShimConfig::from_raw(Some(true), None).enabled);
        assert!(ShimConfig::from_raw(Some(false), None).enabled);
    }

    #[test]
    fn test_levels() {
        assert_eq!(level_from_byte(0), LevelFilter::Off);
        assert_eq!(level_from_byte(2), LevelFilter::Warn);
        assert_eq!(level_from_byte(5), LevelFilter::Trace);
        assert_eq!(level_from_byte(200), LevelFilter::Trace);
        assert_eq!(ShimConfig::from_raw(None, Some(1)).log_level, LevelFilter::Error);
    }

    proptest! {
        #[test]
        fn levels_are_ordered(x in 0u8..=5) {
            prop_assert!(level_from_byte(x) < level_from_byte(x.saturating_add(1)) || x == 5);
        }

        #[test]
        fn doesnt_panic(disable in any::<Option<bool>>(), level in any::<Option<u8>>()) {
            let _ = ShimConfig::from_raw(disable, level);
        }
    }
}
