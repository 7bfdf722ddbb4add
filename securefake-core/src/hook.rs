// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! The `GetVariable` hook.
//!
//! A runtime driver cannot give the hook any context: the function that is put into the runtime services table must
//! have exactly the `GetVariable` signature. What the hook needs to know (where the original service is, what phase
//! the firmware is in) is therefore kept in a single [`ShimContext`], which lives for the rest of the firmware's life.
//!
//! Installing the hook is done in the following order:
//! 1. Make the image that holds the hook impossible to unload.
//! 2. Subscribe to the virtual address change and exit boot services signals.
//! 3. Swap the `GetVariable` slot of the runtime services table with [`patcher::TablePatcher`].
//! 4. Store the original `GetVariable` in the context.
//!
//! If any step fails, the steps before it are undone, and nothing is left hooked.

use core::{cell::Cell, ffi::c_void, ptr::NonNull};

use log::{debug, info, warn};
use uefi::boot::Tpl;

use crate::{
    ShimResult,
    error::ShimError,
    hook::{
        interceptor::GetVariableFn,
        lifecycle::Phase,
        patcher::{PriorityGuard, TableHeader, TablePatcher},
    },
    system::host::{Host, Signal},
};

pub mod exceptions;
pub mod interceptor;
pub mod lifecycle;
pub mod patcher;

/// Everything the hook knows about itself.
///
/// The context is only ever written by [`ShimContext::install`] and the two lifecycle notifications, which the
/// firmware never runs concurrently with each other. The interceptor only reads it.
pub struct ShimContext<H: Host> {
    /// The environment the shim runs in.
    host: H,

    /// The `GetVariable` that was in the table before the hook. Relocated once, at the virtual address change.
    original: Cell<Option<NonNull<c_void>>>,

    /// Where the firmware is in its lifecycle.
    phase: Cell<Phase>,

    /// The subscription to [`Signal::VirtualAddressChange`].
    virtual_event: Cell<Option<H::Event>>,

    /// The subscription to [`Signal::ExitBootServices`].
    exit_event: Cell<Option<H::Event>>,
}

impl<H: Host> ShimContext<H> {
    /// Create a context that has not hooked anything yet.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn new(host: H) -> Self {
        Self {
            host,
            original: Cell::new(None),
            phase: Cell::new(Phase::Init),
            virtual_event: Cell::new(None),
            exit_event: Cell::new(None),
        }
    }

    /// The environment the shim runs in.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// The current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.phase.get()
    }

    /// The original function the hook forwards to, if it was installed.
    pub fn original(&self) -> Option<NonNull<c_void>> {
        self.original.get()
    }

    /// Install `replacement` into the `GetVariable` slot of a table.
    ///
    /// The context must be `'static`, because the lifecycle notifications keep a pointer to it.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the shim was already installed, the image could not be pinned, a subscription could
    /// not be made, or the slot could not be patched. In every case nothing is left installed.
    ///
    /// # Safety
    ///
    /// `header` must point to a live service table of `header_size` bytes, and `slot` to a function pointer inside it.
    /// The table must stay mapped for as long as the firmware runs.
    pub unsafe fn install(
        &'static self,
        header: NonNull<TableHeader>,
        slot: NonNull<*const c_void>,
        replacement: GetVariableFn,
    ) -> ShimResult<()> {
        if self.original.get().is_some() || self.phase.get() != Phase::Init {
            return Err(ShimError::AlreadyInstalled);
        }

        // the notifications and the hook live in this image, so it must outlive any failure below
        self.host.pin_image()?;

        let virtual_event = self.host.subscribe(Signal::VirtualAddressChange, self)?;
        let exit_event = match self.host.subscribe(Signal::ExitBootServices, self) {
            Ok(event) => event,
            Err(e) => {
                let _ = self.host.unsubscribe(virtual_event);
                return Err(e);
            }
        };
        self.virtual_event.set(Some(virtual_event));
        self.exit_event.set(Some(exit_event));
        debug!("Subscribed to lifecycle signals");

        // the original has to be stored before anything can observe the patched slot
        let guard = PriorityGuard::raise(&self.host, Tpl::HIGH_LEVEL);
        let patcher = TablePatcher::new(&self.host);

        // SAFETY: the caller guarantees that header and slot point into a live table
        let original = unsafe { patcher.install(header, slot, replacement as *const c_void) };
        self.original.set(original);
        drop(guard);

        if original.is_none() {
            warn!("Could not patch service table slot at {:p}", slot.as_ptr());
            self.cancel_subscriptions();
            return Err(ShimError::SlotUnavailable);
        }

        // SAFETY: same table as above
        if let Ok(valid) = unsafe { patcher.verify(header) } {
            debug!("Table checksum valid after patch: {valid}");
        }

        info!("Hooked service table slot at {:p}", slot.as_ptr());
        Ok(())
    }

    /// Close both subscriptions, after a failed install.
    fn cancel_subscriptions(&self) {
        if let Some(event) = self.virtual_event.take() {
            let _ = self.host.unsubscribe(event);
        }
        if let Some(event) = self.exit_event.take() {
            let _ = self.host.unsubscribe(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;

    use uefi::Status;

    use super::*;
    use crate::{
        hook::patcher::tests::MockTable,
        system::host::mock::MockHost,
    };

    /// A stand-in for the hook itself.
    unsafe extern "efiapi" fn replacement(
        _name: *const u16,
        _vendor: *const uefi::Guid,
        _attributes: *mut u32,
        _data_size: *mut usize,
        _data: *mut u8,
    ) -> Status {
        Status::SUCCESS
    }

    fn leak(host: MockHost) -> &'static ShimContext<MockHost> {
        Box::leak(Box::new(ShimContext::new(host)))
    }

    #[test]
    fn test_install_hooks_and_subscribes() {
        let shim = leak(MockHost::default());
        let mut table = MockTable::new();
        let before = table.get_variable;
        let (header, slot) = table.pointers();

        // SAFETY: the mock table is live for the whole test
        unsafe { shim.install(header, slot, replacement) }
            .expect("install into a valid table should succeed");

        assert_eq!(shim.original().map(|x| x.as_ptr().cast_const()), Some(before));
        assert_eq!(table.get_variable, replacement as *const c_void);
        assert!(table.checksum_valid());
        assert_eq!(shim.host().subscribed.borrow().len(), 2);
        assert_eq!(shim.host().tpl.get(), Tpl::APPLICATION);
        assert_eq!(shim.host().peak_tpl.get(), Tpl::HIGH_LEVEL);
        assert!(shim.host().pinned.get());
    }

    #[test]
    fn test_failed_pin_leaves_everything_alone() {
        let shim = leak(MockHost {
            fail_pin: true,
            ..MockHost::default()
        });
        let mut table = MockTable::new();
        let pristine = table.clone();
        let (header, slot) = table.pointers();

        // SAFETY: the mock table is live for the whole test
        let result = unsafe { shim.install(header, slot, replacement) };

        assert!(matches!(result, Err(ShimError::Uefi(_))));
        assert_eq!(table, pristine);
        assert!(shim.original().is_none());
        assert!(shim.host().subscribed.borrow().is_empty());
    }

    #[test]
    fn test_failed_reseal_is_reported_after_priority_drops() {
        let shim = leak(MockHost {
            fail_crc: true,
            ..MockHost::default()
        });
        let mut table = MockTable::new();
        let pristine = table.clone();
        let (header, slot) = table.pointers();

        // SAFETY: the mock table is live for the whole test
        let result = unsafe { shim.install(header, slot, replacement) };

        assert!(matches!(result, Err(ShimError::SlotUnavailable)));
        assert_eq!(table, pristine);
        assert!(shim.original().is_none());
        assert_eq!(shim.host().closed.borrow().len(), 2);
        assert_eq!(shim.host().tpl.get(), Tpl::APPLICATION);
    }

    #[test]
    fn test_install_after_transition_is_rejected() {
        let shim = leak(MockHost::default());
        shim.on_exit_boot_services();
        let mut table = MockTable::new();
        let pristine = table.clone();
        let (header, slot) = table.pointers();

        // SAFETY: the mock table is live for the whole test
        let result = unsafe { shim.install(header, slot, replacement) };

        assert!(matches!(result, Err(ShimError::AlreadyInstalled)));
        assert_eq!(table, pristine);
        assert!(!shim.host().pinned.get());
    }

    #[test]
    fn test_install_twice_is_rejected() {
        let shim = leak(MockHost::default());
        let mut table = MockTable::new();
        let (header, slot) = table.pointers();

        // SAFETY: the mock table is live for the whole test
        unsafe { shim.install(header, slot, replacement) }
            .expect("first install should succeed");
        // SAFETY: as above
        let second = unsafe { shim.install(header, slot, replacement) };

        assert!(matches!(second, Err(ShimError::AlreadyInstalled)));
        assert_eq!(shim.host().subscribed.borrow().len(), 2);
    }

    #[test]
    fn test_failed_subscription_leaves_table_alone() {
        for signal in [Signal::VirtualAddressChange, Signal::ExitBootServices] {
            let shim = leak(MockHost::failing(signal));
            let mut table = MockTable::new();
            let pristine = table.clone();
            let (header, slot) = table.pointers();

            // SAFETY: the mock table is live for the whole test
            let result = unsafe { shim.install(header, slot, replacement) };

            assert!(matches!(result, Err(ShimError::Uefi(_))));
            assert_eq!(table, pristine);
            assert!(shim.original().is_none());

            // whatever was subscribed must have been closed again
            let subscribed: Vec<usize> =
                shim.host().subscribed.borrow().iter().map(|(_, id)| *id).collect();
            assert_eq!(*shim.host().closed.borrow(), subscribed);
        }
    }

    #[test]
    fn test_empty_slot_is_unavailable() {
        let shim = leak(MockHost::default());
        let mut table = MockTable::new();
        table.get_variable = core::ptr::null();
        table.reseal();
        let pristine = table.clone();
        let (header, slot) = table.pointers();

        // SAFETY: the mock table is live for the whole test
        let result = unsafe { shim.install(header, slot, replacement) };

        assert!(matches!(result, Err(ShimError::SlotUnavailable)));
        assert_eq!(table, pristine);
        assert_eq!(shim.host().closed.borrow().len(), 2);
        assert_eq!(shim.host().tpl.get(), Tpl::APPLICATION);
    }
}
