// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Provides [`ShimError`], which encapsulates other errors

use thiserror::Error;
use uefi::Status;

/// An `Error` resulting from setting up the shim.
///
/// These only ever happen while the driver is being loaded. Once the hook is installed, nothing it does can fail in a
/// way that is reported through this type; the hook only speaks in [`Status`] codes to its callers.
#[derive(Error, Debug)]
pub enum ShimError {
    /// An error with UEFI, or a service from the [`uefi`] crate.
    #[error("UEFI Error")]
    Uefi(#[from] uefi::Error),

    /// The slot to be hooked was empty, or the table could not be resealed.
    #[error("Service table slot could not be patched")]
    SlotUnavailable,

    /// The shim was already installed once.
    #[error("Shim already installed")]
    AlreadyInstalled,

    /// A boot service was requested after `ExitBootServices`.
    #[error("Boot services are no longer available")]
    BootServicesEnded,

    /// The system table was not set up before the shim was installed.
    #[error("System table is not available")]
    NoSystemTable,
}

impl ShimError {
    /// The [`Status`] to hand back to the firmware when this error aborts the driver load.
    #[must_use = "Has no effect if the result is unused"]
    pub fn status(&self) -> Status {
        match self {
            Self::Uefi(e) => e.status(),
            Self::SlotUnavailable => Status::NOT_FOUND,
            Self::AlreadyInstalled => Status::ALREADY_STARTED,
            Self::BootServicesEnded => Status::UNSUPPORTED,
            Self::NoSystemTable => Status::LOAD_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_passthrough() {
        let e = ShimError::from(uefi::Error::new(Status::OUT_OF_RESOURCES, ()));
        assert_eq!(e.status(), Status::OUT_OF_RESOURCES);
    }

    #[test]
    fn test_setup_errors_are_errors() {
        for e in [
            ShimError::SlotUnavailable,
            ShimError::AlreadyInstalled,
            ShimError::BootServicesEnded,
            ShimError::NoSystemTable,
        ] {
            assert!(e.status().is_error());
        }
    }
}
