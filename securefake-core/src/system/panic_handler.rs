// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Panic handler for a driver that may still be running after the OS has taken over.
//!
//! This is enabled when the `panic_handler` feature is enabled, in case the user wanted to roll their
//! own panic handler implementation or for fuzzing/testing.
//!
//! While boot services are available the panic is printed, and the system is shut down after 10 seconds. After that,
//! there is no console to print to and no safe way to reach the reset service, so the handler halts in place.

#![cfg(feature = "panic_handler")]
use core::fmt::Write;

use crate::system::log_backend;

/// The panic handler.
#[panic_handler]
fn panic_handler(info: &core::panic::PanicInfo) -> ! {
    if !log_backend::is_suspended() {
        uefi::system::with_stdout(|stdout| {
            let _ = writeln!(stdout, "[PANIC]: {info}");
            let _ = writeln!(stdout, "Shutting down in 10 seconds");
        });
        uefi::boot::stall(10_000_000);
        uefi::runtime::reset(
            uefi::runtime::ResetType::SHUTDOWN,
            uefi::Status::ABORTED,
            None,
        );
    }

    loop {
        core::hint::spin_loop();
    }
}
