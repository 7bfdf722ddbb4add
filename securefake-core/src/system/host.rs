// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! The services the shim needs from its environment.
//!
//! Everything the hook mechanism does to the outside world is done through [`Host`]. On real firmware this is
//! [`crate::system::firmware::FirmwareHost`], which talks to the boot and runtime services tables. In tests it is a
//! mock that records what was asked of it.

use core::{ffi::c_void, fmt};

use uefi::boot::Tpl;

use crate::{ShimResult, hook::ShimContext};

/// The lifecycle signals the shim subscribes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signal {
    /// `SetVirtualAddressMap` is about to convert runtime pointers.
    VirtualAddressChange,

    /// `ExitBootServices` was called.
    ExitBootServices,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VirtualAddressChange => f.write_str("VirtualAddressChange"),
            Self::ExitBootServices => f.write_str("ExitBootServices"),
        }
    }
}

/// The environment a [`ShimContext`] runs in.
///
/// Methods marked as boot services may only be called before [`Host::release_boot_services`].
pub trait Host: Sized {
    /// A handle to a subscription made with [`Host::subscribe`].
    type Event;

    /// Make the image holding the shim impossible to unload. Boot service.
    ///
    /// Called before anything is hooked, since a failed load would otherwise unload code that the firmware still
    /// points to.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the image could not be pinned.
    fn pin_image(&self) -> ShimResult<()>;

    /// Raise the task priority level to `tpl`, returning the previous level. Boot service.
    fn raise_tpl(&self, tpl: Tpl) -> Tpl;

    /// Restore a task priority level returned by [`Host::raise_tpl`]. Boot service.
    fn restore_tpl(&self, tpl: Tpl);

    /// Calculate the CRC32 of `bytes` the same way the firmware checks its tables. Boot service.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the firmware rejects the request, or boot services have ended.
    fn calculate_crc32(&self, bytes: &[u8]) -> ShimResult<u32>;

    /// Subscribe `context` to `signal`. Boot service.
    ///
    /// When the signal fires, the matching lifecycle method of `context` is called.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the event could not be created.
    fn subscribe(
        &self,
        signal: Signal,
        context: &'static ShimContext<Self>,
    ) -> ShimResult<Self::Event>;

    /// Close a subscription. Boot service.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the event could not be closed.
    fn unsubscribe(&self, event: Self::Event) -> ShimResult<()>;

    /// Convert a pointer for the virtual address map that is being installed.
    ///
    /// This is a runtime service, and is only meaningful from inside the virtual address change notification.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the pointer is not part of the new address map.
    ///
    /// # Safety
    ///
    /// `pointer` must point into memory that is being mapped by the firmware, such as the code of a runtime image.
    unsafe fn relocate(&self, pointer: &mut *const c_void) -> ShimResult<()>;

    /// Forget every handle to boot services. Called once, when `ExitBootServices` is signaled.
    fn release_boot_services(&self);
}
