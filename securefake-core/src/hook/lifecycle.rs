// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Following the firmware from boot time into runtime.
//!
//! Two things happen to a runtime driver after it is loaded:
//! - `ExitBootServices` is called. From then on, boot services (events, priority levels, the console) are gone.
//! - `SetVirtualAddressMap` is called. Every pointer the driver keeps into runtime memory has to be converted,
//!   or the next call through it faults.
//!
//! The shim is notified of both through event groups. On real firmware `ExitBootServices` always comes first, but
//! both orders are handled, and both end up in [`Phase::Frozen`]. Each notification only has an effect once.

use log::{info, warn};

use crate::{hook::ShimContext, system::host::Host};

/// Where the firmware is in its lifecycle, as far as the shim is concerned.
///
/// ```text
///             virtual address change
///     Init ---------------------------> AddressSpaceFixed
///      |                                       |
///      | exit boot services                    | exit boot services
///      v                                       v
///   RuntimeOnly --------------------------> Frozen
///             virtual address change
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    /// Loaded, in physical mode, with boot services.
    #[default]
    Init,

    /// Pointers were converted for the virtual address map, boot services are still there.
    AddressSpaceFixed,

    /// Boot services have ended, still in physical mode.
    RuntimeOnly,

    /// Both transitions happened. Nothing changes anymore.
    Frozen,
}

impl Phase {
    /// If the virtual address map has been applied.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn is_virtual(self) -> bool {
        matches!(self, Self::AddressSpaceFixed | Self::Frozen)
    }

    /// If boot services have ended.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn is_runtime_only(self) -> bool {
        matches!(self, Self::RuntimeOnly | Self::Frozen)
    }

    /// The phase after the virtual address change, or [`None`] if it already happened.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn after_virtual_address_change(self) -> Option<Self> {
        match self {
            Self::Init => Some(Self::AddressSpaceFixed),
            Self::RuntimeOnly => Some(Self::Frozen),
            Self::AddressSpaceFixed | Self::Frozen => None,
        }
    }

    /// The phase after boot services end, or [`None`] if they already did.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn after_exit_boot_services(self) -> Option<Self> {
        match self {
            Self::Init => Some(Self::RuntimeOnly),
            Self::AddressSpaceFixed => Some(Self::Frozen),
            Self::RuntimeOnly | Self::Frozen => None,
        }
    }
}

impl<H: Host> ShimContext<H> {
    /// Handle the virtual address change notification.
    ///
    /// Converts the original `GetVariable` for the new address map, and forgets the subscription. If the conversion
    /// fails, the original is forgotten too, and forwarded calls fail with `DEVICE_ERROR`. A second notification does
    /// nothing.
    pub fn on_virtual_address_change(&self) {
        let phase = self.phase.get();
        let Some(next) = phase.after_virtual_address_change() else {
            return;
        };

        if let Some(event) = self.virtual_event.take()
            && !phase.is_runtime_only()
        {
            // closing is a boot service, so after ExitBootServices the handle is only dropped
            let _ = self.host.unsubscribe(event);
        }

        if let Some(original) = self.original.get() {
            let mut pointer = original.as_ptr().cast_const();

            // SAFETY: the original GetVariable is part of a runtime image, which is mapped by SetVirtualAddressMap
            match unsafe { self.host.relocate(&mut pointer) } {
                Ok(()) => self.original.set(core::ptr::NonNull::new(pointer.cast_mut())),
                Err(e) => {
                    // a physical address is not callable after the switch, so forwarding has to fail instead
                    self.original.set(None);
                    if !phase.is_runtime_only() {
                        warn!("Could not relocate GetVariable, forwarding disabled: {e}");
                    }
                }
            }
        }

        self.phase.set(next);
    }

    /// Handle the exit boot services notification.
    ///
    /// Closes the subscription and lets go of boot services. A second notification does nothing.
    pub fn on_exit_boot_services(&self) {
        let Some(next) = self.phase.get().after_exit_boot_services() else {
            return;
        };

        info!("Boot services ending, shim is now runtime only");
        if let Some(event) = self.exit_event.take() {
            let _ = self.host.unsubscribe(event);
        }
        self.host.release_boot_services();

        self.phase.set(next);
    }
}

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;

    use uefi::{Guid, Status};

    use super::*;
    use crate::{
        hook::patcher::tests::MockTable,
        system::host::{
            Signal,
            mock::{MockHost, RELOCATION_OFFSET},
        },
    };

    /// A stand-in for the hook.
    unsafe extern "efiapi" fn hook(
        _name: *const u16,
        _vendor: *const Guid,
        _attributes: *mut u32,
        _data_size: *mut usize,
        _data: *mut u8,
    ) -> Status {
        Status::SUCCESS
    }

    fn installed_shim() -> &'static ShimContext<MockHost> {
        installed_shim_on(MockHost::default())
    }

    fn installed_shim_on(host: MockHost) -> &'static ShimContext<MockHost> {
        let shim: &'static ShimContext<MockHost> = Box::leak(Box::new(ShimContext::new(host)));
        let table = Box::leak(Box::new(MockTable::new()));
        let (header, slot) = table.pointers();

        // SAFETY: the table is leaked, so it lives forever
        unsafe { shim.install(header, slot, hook) }.expect("install should succeed");
        shim
    }

    fn original_addr(shim: &ShimContext<MockHost>) -> Option<usize> {
        shim.original().map(|x| x.as_ptr().addr())
    }

    #[test]
    fn test_transitions() {
        assert_eq!(Phase::Init.after_virtual_address_change(), Some(Phase::AddressSpaceFixed));
        assert_eq!(Phase::Init.after_exit_boot_services(), Some(Phase::RuntimeOnly));
        assert_eq!(Phase::AddressSpaceFixed.after_exit_boot_services(), Some(Phase::Frozen));
        assert_eq!(Phase::RuntimeOnly.after_virtual_address_change(), Some(Phase::Frozen));
        assert_eq!(Phase::AddressSpaceFixed.after_virtual_address_change(), None);
        assert_eq!(Phase::RuntimeOnly.after_exit_boot_services(), None);
        assert_eq!(Phase::Frozen.after_virtual_address_change(), None);
        assert_eq!(Phase::Frozen.after_exit_boot_services(), None);
    }

    #[test]
    fn test_flags_are_monotonic() {
        let all = [Phase::Init, Phase::AddressSpaceFixed, Phase::RuntimeOnly, Phase::Frozen];
        for phase in all {
            for next in [
                phase.after_virtual_address_change(),
                phase.after_exit_boot_services(),
            ]
            .into_iter()
            .flatten()
            {
                assert!(!phase.is_virtual() || next.is_virtual());
                assert!(!phase.is_runtime_only() || next.is_runtime_only());
                assert_ne!(phase, next);
            }
        }
    }

    #[test]
    fn test_virtual_then_exit() {
        let shim = installed_shim();
        let before = original_addr(shim).expect("installed shim has an original");
        assert!(!shim.phase().is_virtual() && !shim.phase().is_runtime_only());

        shim.on_virtual_address_change();
        assert_eq!(shim.phase(), Phase::AddressSpaceFixed);
        assert!(shim.phase().is_virtual() && !shim.phase().is_runtime_only());
        assert_eq!(original_addr(shim), Some(before + RELOCATION_OFFSET));

        shim.on_exit_boot_services();
        assert_eq!(shim.phase(), Phase::Frozen);
        assert!(shim.phase().is_virtual() && shim.phase().is_runtime_only());
        assert!(shim.host().released.get());

        // both subscriptions were closed, since boot services were still there each time
        let host = shim.host();
        let virtual_event = host.event_for(Signal::VirtualAddressChange).expect("subscribed at install");
        let exit_event = host.event_for(Signal::ExitBootServices).expect("subscribed at install");
        assert_eq!(*host.closed.borrow(), [virtual_event, exit_event]);
    }

    #[test]
    fn test_exit_then_virtual() {
        let shim = installed_shim();
        let before = original_addr(shim).expect("installed shim has an original");

        shim.on_exit_boot_services();
        assert_eq!(shim.phase(), Phase::RuntimeOnly);
        assert!(!shim.phase().is_virtual() && shim.phase().is_runtime_only());

        shim.on_virtual_address_change();
        assert_eq!(shim.phase(), Phase::Frozen);
        assert_eq!(original_addr(shim), Some(before + RELOCATION_OFFSET));

        // only the exit subscription could be closed, the other handle was dropped
        let host = shim.host();
        let exit_event = host.event_for(Signal::ExitBootServices).expect("subscribed at install");
        assert_eq!(*host.closed.borrow(), [exit_event]);
    }

    #[test]
    fn test_relocation_is_one_shot() {
        let shim = installed_shim();
        let before = original_addr(shim).expect("installed shim has an original");

        shim.on_virtual_address_change();
        shim.on_virtual_address_change();
        assert_eq!(shim.host().relocations.get(), 1);
        assert_eq!(shim.host().closed.borrow().len(), 1);
        assert_eq!(original_addr(shim), Some(before + RELOCATION_OFFSET));

        shim.on_exit_boot_services();
        shim.on_virtual_address_change();
        assert_eq!(shim.host().relocations.get(), 1);
        assert_eq!(original_addr(shim), Some(before + RELOCATION_OFFSET));
    }

    #[test]
    fn test_failed_relocation_forgets_original() {
        let unrelocatable = || MockHost {
            fail_relocate: true,
            ..MockHost::default()
        };

        let shim = installed_shim_on(unrelocatable());
        shim.on_virtual_address_change();
        assert_eq!(shim.phase(), Phase::AddressSpaceFixed);
        assert!(shim.original().is_none());

        let shim = installed_shim_on(unrelocatable());
        shim.on_exit_boot_services();
        shim.on_virtual_address_change();
        assert_eq!(shim.phase(), Phase::Frozen);
        assert!(shim.original().is_none());
    }

    #[test]
    fn test_exit_is_one_shot() {
        let shim = installed_shim();

        shim.on_exit_boot_services();
        shim.on_exit_boot_services();
        assert_eq!(shim.host().closed.borrow().len(), 1);
        assert_eq!(shim.phase(), Phase::RuntimeOnly);
    }
}
