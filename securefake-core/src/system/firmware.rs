// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! The binding of the shim to real firmware.
//!
//! [`FirmwareHost`] implements [`Host`] on top of the raw boot and runtime services tables. The shim installed by
//! [`install`] is kept in a static, because the `GetVariable` hook cannot receive a context: it has to have exactly
//! the signature of the service it replaces. The lifecycle notifications do get a context, and are handed a pointer to
//! that same static.
//!
//! # Safety
//!
//! Everything in here calls through raw firmware function pointers. These calls are safe as long as the system table
//! that the `uefi` crate was initialized with is valid, which the firmware guarantees for a loaded image, and as long
//! as boot services are not used after `ExitBootServices`, which [`FirmwareHost`] guards against.

use core::{
    cell::{Cell, OnceCell},
    ffi::c_void,
    ptr::{self, NonNull},
};

use log::{debug, info};
use uefi::{
    Event, Guid, Handle, Status, StatusExt,
    boot::{self, EventType, Tpl},
    guid,
    proto::loaded_image::LoadedImage,
};
use uefi_raw::table::{boot::BootServices, runtime::RuntimeServices};

use crate::{
    ShimResult,
    error::ShimError,
    hook::{ShimContext, patcher::TableHeader},
    system::{
        host::{Host, Signal},
        log_backend,
    },
};

/// The event group signaled by `SetVirtualAddressMap`.
const VIRTUAL_ADDRESS_CHANGE_GROUP: Guid = guid!("13fa7698-c831-49c7-87ea-8f43fcc25196");

/// The event group signaled by `ExitBootServices`.
const EXIT_BOOT_SERVICES_GROUP: Guid = guid!("27abf055-b1b8-4c26-8048-748f37baa2df");

/// The shim, for the lifetime of the firmware.
///
/// The hook can only find its context through a static. To limit what that static can do, it may only be set once.
static SHIM: ShimRegistry = ShimRegistry {
    inner: OnceCell::new(),
};

/// Holds the one [`ShimContext`] that is installed into the firmware.
struct ShimRegistry {
    /// The installed shim.
    inner: OnceCell<ShimContext<FirmwareHost>>,
}

// SAFETY: uefi is a single threaded environment there is no notion of thread safety
unsafe impl Sync for ShimRegistry {}

/// A [`Host`] backed by the firmware's service tables.
pub struct FirmwareHost {
    /// The boot services table, until `ExitBootServices`.
    boot_services: Cell<Option<NonNull<BootServices>>>,

    /// The runtime services table.
    runtime_services: NonNull<RuntimeServices>,
}

impl FirmwareHost {
    /// Create a host from the system table the `uefi` crate was initialized with.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the system table was not set, or is missing one of the service tables.
    pub fn new() -> ShimResult<Self> {
        let system_table = uefi::table::system_table_raw().ok_or(ShimError::NoSystemTable)?;

        // SAFETY: the system table pointer was set by the entry point, and is valid while the image is loaded
        let system_table = unsafe { system_table.as_ref() };

        Ok(Self {
            boot_services: Cell::new(Some(
                NonNull::new(system_table.boot_services).ok_or(ShimError::NoSystemTable)?,
            )),
            runtime_services: NonNull::new(system_table.runtime_services)
                .ok_or(ShimError::NoSystemTable)?,
        })
    }

    /// The boot services table, if boot services have not ended.
    fn boot_services(&self) -> ShimResult<&BootServices> {
        let boot_services = self.boot_services.get().ok_or(ShimError::BootServicesEnded)?;

        // SAFETY: the pointer came from the system table, and is cleared before boot services end
        Ok(unsafe { boot_services.as_ref() })
    }
}

impl Host for FirmwareHost {
    type Event = Event;

    fn pin_image(&self) -> ShimResult<()> {
        self.boot_services()?;
        let mut loaded_image = boot::open_protocol_exclusive::<LoadedImage>(boot::image_handle())?;

        // SAFETY: the unload handler has the signature the firmware expects, and lives as long as the image
        unsafe { loaded_image.set_unload(refuse_unload) };
        Ok(())
    }

    fn raise_tpl(&self, tpl: Tpl) -> Tpl {
        match self.boot_services() {
            // SAFETY: raising the priority level has no preconditions
            Ok(boot_services) => unsafe { (boot_services.raise_tpl)(tpl) },
            Err(_) => tpl,
        }
    }

    fn restore_tpl(&self, tpl: Tpl) {
        if let Ok(boot_services) = self.boot_services() {
            // SAFETY: the level came from raise_tpl, so it is not above the current level
            unsafe { (boot_services.restore_tpl)(tpl) };
        }
    }

    fn calculate_crc32(&self, bytes: &[u8]) -> ShimResult<u32> {
        let boot_services = self.boot_services()?;
        let mut crc = 0;

        // SAFETY: the slice is valid for its length, and crc is a valid place to write to
        let status = unsafe {
            (boot_services.calculate_crc32)(bytes.as_ptr().cast(), bytes.len(), &raw mut crc)
        };
        status.to_result()?;
        Ok(crc)
    }

    fn subscribe(
        &self,
        signal: Signal,
        context: &'static ShimContext<Self>,
    ) -> ShimResult<Event> {
        self.boot_services()?;

        let notify: boot::EventNotifyFn = match signal {
            Signal::VirtualAddressChange => virtual_address_change_notify,
            Signal::ExitBootServices => exit_boot_services_notify,
        };
        let group: &'static Guid = match signal {
            Signal::VirtualAddressChange => &VIRTUAL_ADDRESS_CHANGE_GROUP,
            Signal::ExitBootServices => &EXIT_BOOT_SERVICES_GROUP,
        };

        // SAFETY: the notify functions match the context they are given, which is 'static
        let event = unsafe {
            boot::create_event_ex(
                EventType::NOTIFY_SIGNAL,
                Tpl::NOTIFY,
                Some(notify),
                Some(NonNull::from(context).cast()),
                Some(NonNull::from(group)),
            )
        }?;
        debug!("Subscribed to {signal}");
        Ok(event)
    }

    fn unsubscribe(&self, event: Event) -> ShimResult<()> {
        self.boot_services()?;
        Ok(boot::close_event(event)?)
    }

    unsafe fn relocate(&self, pointer: &mut *const c_void) -> ShimResult<()> {
        // SAFETY: the runtime services table stays valid, and ConvertPointer is meant to be called from here
        let status = unsafe {
            (self.runtime_services.as_ref().convert_pointer)(0, ptr::from_mut(pointer).cast())
        };
        Ok(status.to_result()?)
    }

    fn release_boot_services(&self) {
        self.boot_services.set(None);
        log_backend::suspend();
    }
}

/// The notification for [`Signal::VirtualAddressChange`].
///
/// # Safety
///
/// `context` must be the pointer given to `create_event_ex` in [`FirmwareHost::subscribe`].
unsafe extern "efiapi" fn virtual_address_change_notify(
    _event: Event,
    context: Option<NonNull<c_void>>,
) {
    if let Some(context) = context {
        // SAFETY: the context was created from a &'static ShimContext<FirmwareHost>
        let shim = unsafe { context.cast::<ShimContext<FirmwareHost>>().as_ref() };
        shim.on_virtual_address_change();
    }
}

/// The notification for [`Signal::ExitBootServices`].
///
/// # Safety
///
/// `context` must be the pointer given to `create_event_ex` in [`FirmwareHost::subscribe`].
unsafe extern "efiapi" fn exit_boot_services_notify(_event: Event, context: Option<NonNull<c_void>>) {
    if let Some(context) = context {
        // SAFETY: the context was created from a &'static ShimContext<FirmwareHost>
        let shim = unsafe { context.cast::<ShimContext<FirmwareHost>>().as_ref() };
        shim.on_exit_boot_services();
    }
}

/// The `GetVariable` that is put into the runtime services table.
///
/// # Safety
///
/// Called by the firmware and the operating system with the `GetVariable` contract.
unsafe extern "efiapi" fn get_variable_hook(
    name: *const u16,
    vendor: *const Guid,
    attributes: *mut u32,
    data_size: *mut usize,
    data: *mut u8,
) -> Status {
    match SHIM.inner.get() {
        // SAFETY: the arguments are passed on exactly as the caller gave them
        Some(shim) => unsafe { shim.get_variable(name, vendor, attributes, data_size, data) },
        None => Status::DEVICE_ERROR,
    }
}

/// Hook `GetVariable` in the runtime services table.
///
/// The driver image is made impossible to unload first, since the hook and the lifecycle notifications live in it.
///
/// # Errors
///
/// May return an `Error` if the shim was already installed, the system table is missing, the image could not be made
/// permanent, an event could not be created, or the table could not be patched. If this returns an `Error`, nothing is
/// hooked.
pub fn install() -> ShimResult<()> {
    let host = FirmwareHost::new()?;
    let runtime_services = host.runtime_services.as_ptr();

    SHIM.inner
        .set(ShimContext::new(host))
        .map_err(|_| ShimError::AlreadyInstalled)?;
    let shim = SHIM.inner.get().ok_or(ShimError::AlreadyInstalled)?;

    let header = NonNull::new(runtime_services.cast::<TableHeader>()).ok_or(ShimError::NoSystemTable)?;
    // SAFETY: runtime_services is non null, so is the address of one of its fields
    let slot = unsafe { NonNull::new_unchecked((&raw mut (*runtime_services).get_variable).cast()) };

    // SAFETY: the runtime services table starts with a table header, lives as long as the firmware, and
    // get_variable is one of its slots
    unsafe { shim.install(header, slot, get_variable_hook) }?;
    info!("GetVariable -> {:p}", get_variable_hook as *const c_void);

    Ok(())
}

/// The unload handler for the driver image, which never lets it go.
extern "efiapi" fn refuse_unload(_image_handle: Handle) -> Status {
    Status::ACCESS_DENIED
}
