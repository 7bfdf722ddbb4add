// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Simple UEFI backend for the [`log`] crate.
//!
//! The console is a boot service, so once [`suspend`] is called every record is dropped. Suspending also turns the
//! global max level off, so that the `log` macros stop before they reach the registered logger, whose address is not
//! converted at the virtual address change.

use core::{
    fmt::Write,
    sync::atomic::{AtomicBool, Ordering},
};

use log::{Metadata, Record};
use uefi::{runtime, system::with_stdout};

/// Set once boot services have ended.
static SUSPENDED: AtomicBool = AtomicBool::new(false);

/// Stop writing to the console for good.
pub fn suspend() {
    SUSPENDED.store(true, Ordering::Relaxed);
    log::set_max_level(log::LevelFilter::Off);
}

/// If [`suspend`] was called.
#[must_use = "Has no effect if the result is unused"]
pub fn is_suspended() -> bool {
    SUSPENDED.load(Ordering::Relaxed)
}

/// A simple logging backend for UEFI.
#[derive(Default)]
pub struct UefiLogger;

impl UefiLogger {
    /// Constructs a new [`UefiLogger`].
    #[must_use = "Has no effect if the result is unused"]
    pub const fn new() -> Self {
        Self
    }
}

impl log::Log for UefiLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level() && !is_suspended()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let time = runtime::get_time().unwrap_or(runtime::Time::invalid());
            let level = record.level();
            let file = record.file().unwrap_or_default();
            let line = record.line().unwrap_or_default();
            let args = record.args();
            with_stdout(|stdout| {
                let _ = stdout.write_fmt(format_args!("[{time} {level} {file}:{line}] - {args}\n"));
            });
        }
    }

    fn flush(&self) {}
}
