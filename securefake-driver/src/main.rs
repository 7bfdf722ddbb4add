// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! A UEFI runtime driver that makes Secure Boot look enabled.
//!
//! Once loaded, every `GetVariable` call for `SecureBoot`, `SecureBootEnable`, `CustomMode`, `VendorKeys` or
//! `VendorKeysNv` is answered with the value a platform in standard Secure Boot mode would report, both for the rest
//! of boot and for the operating system afterwards. Every other variable is read from the firmware as usual.
//!
//! The driver can be disabled without removing it by setting the `SecureFakeDisable` variable, see
//! [`securefake_core::config`].

#![no_main]
#![no_std]

use log::{error, info};
use securefake_core::{
    ShimResult,
    config::{DEFAULT_LOG_LEVEL, ShimConfig},
    system::{firmware, log_backend::UefiLogger},
};
use uefi::prelude::*;

/// The global logging instance.
static LOGGER: UefiLogger = UefiLogger::new();

/// The actual main function of the driver, which returns a [`Result`].
///
/// # Errors
///
/// May return an `Error` if the image could not be made permanent, or the shim could not be installed.
fn main_func() -> ShimResult<()> {
    uefi::helpers::init()?;
    let _ = log::set_logger(&LOGGER).map(|()| log::set_max_level(DEFAULT_LOG_LEVEL));

    let config = ShimConfig::load();
    log::set_max_level(config.log_level);

    if !config.enabled {
        info!("SecureFakeDisable is set, not hooking GetVariable");
        return Ok(());
    }

    firmware::install()?;
    info!("SecureFake loaded");
    Ok(())
}

/// The main function of the driver.
#[entry]
fn main() -> Status {
    match main_func() {
        Ok(()) => Status::SUCCESS,
        Err(e) => {
            error!("Failed to load SecureFake: {e}");
            e.status()
        }
    }
}
