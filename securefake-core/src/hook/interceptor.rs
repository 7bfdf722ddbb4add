// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! The replacement `GetVariable`.
//!
//! Every call is sorted into one of two [`Response`]s by its variable name. Names in the exception list get their
//! canned value written straight into the caller's buffer. Everything else goes to the original `GetVariable`,
//! unchanged, and whatever the original returns is returned unchanged.
//!
//! `GetVariable` may be called at up to `TPL_CALLBACK` during boot, and from the operating system afterwards, so
//! nothing in here blocks, allocates or logs above debug level.

use core::mem::size_of;

use log::debug;
use uefi::{Guid, Status};

use crate::{
    hook::{
        ShimContext,
        exceptions::{ExceptionEntry, lookup_raw},
    },
    system::host::Host,
};

/// The signature of the `GetVariable` runtime service.
pub type GetVariableFn = unsafe extern "efiapi" fn(
    name: *const u16,
    vendor: *const Guid,
    attributes: *mut u32,
    data_size: *mut usize,
    data: *mut u8,
) -> Status;

/// What to do with one call.
#[derive(Debug)]
pub enum Response {
    /// Answer with the canned value of an entry.
    Canned(&'static ExceptionEntry),

    /// Hand the call to the original service.
    Forward,
}

impl Response {
    /// Decide what to do with a call for the variable `name`.
    ///
    /// A null name is forwarded, so that the original service can reject it.
    ///
    /// # Safety
    ///
    /// `name` must either be null or point to a nul terminated UCS-2 string.
    pub unsafe fn classify(name: *const u16) -> Self {
        if name.is_null() {
            return Self::Forward;
        }

        // SAFETY: the caller guarantees a nul terminated string
        match unsafe { lookup_raw(name) } {
            Some(entry) => Self::Canned(entry),
            None => Self::Forward,
        }
    }
}

impl ExceptionEntry {
    /// Write the canned value of the entry into a caller's buffer, following the `GetVariable` contract.
    ///
    /// If the buffer is too small, the required size is written back to `data_size`.
    ///
    /// # Safety
    ///
    /// `attributes` must be null or writable, `data_size` must be null or writable, and `data` must be null or
    /// writable for `*data_size` bytes.
    pub unsafe fn answer(&self, attributes: *mut u32, data_size: *mut usize, data: *mut u8) -> Status {
        const REQUIRED: usize = size_of::<u8>();

        // SAFETY: the caller guarantees that data_size is null or writable
        let Some(data_size) = (unsafe { data_size.as_mut() }) else {
            return Status::INVALID_PARAMETER;
        };

        if *data_size < REQUIRED {
            *data_size = REQUIRED;
            return Status::BUFFER_TOO_SMALL;
        }
        if data.is_null() {
            return Status::INVALID_PARAMETER;
        }

        // SAFETY: data is non null and the caller guarantees it is writable for at least REQUIRED bytes
        unsafe { data.write(self.value) };
        *data_size = REQUIRED;

        // SAFETY: the caller guarantees that attributes is null or writable
        if let Some(attributes) = unsafe { attributes.as_mut() } {
            *attributes = self.attributes.bits();
        }

        Status::SUCCESS
    }
}

impl<H: Host> ShimContext<H> {
    /// Handle one `GetVariable` call.
    ///
    /// # Safety
    ///
    /// The arguments must satisfy the `GetVariable` contract, as they would for the original service.
    pub unsafe fn get_variable(
        &self,
        name: *const u16,
        vendor: *const Guid,
        attributes: *mut u32,
        data_size: *mut usize,
        data: *mut u8,
    ) -> Status {
        // SAFETY: GetVariable requires the name to be a nul terminated string
        match unsafe { Response::classify(name) } {
            Response::Canned(entry) => {
                debug!("Answering {} with {}", entry.name, entry.value);
                // SAFETY: the caller upholds the GetVariable contract for the buffers
                unsafe { entry.answer(attributes, data_size, data) }
            }
            Response::Forward => {
                // SAFETY: the arguments are passed on exactly as they were received
                unsafe { self.forward(name, vendor, attributes, data_size, data) }
            }
        }
    }

    /// Call the original `GetVariable`.
    ///
    /// The original is read on every call, since it changes at the virtual address change.
    ///
    /// # Safety
    ///
    /// The arguments must satisfy the `GetVariable` contract.
    unsafe fn forward(
        &self,
        name: *const u16,
        vendor: *const Guid,
        attributes: *mut u32,
        data_size: *mut usize,
        data: *mut u8,
    ) -> Status {
        let Some(original) = self.original.get() else {
            return Status::DEVICE_ERROR; // the hook cannot be in the table without an original
        };

        // SAFETY: the original pointer was taken from the GetVariable slot of the table, so it has this signature
        let original =
            unsafe { core::mem::transmute::<*mut core::ffi::c_void, GetVariableFn>(original.as_ptr()) };

        // SAFETY: the caller upholds the GetVariable contract
        unsafe { original(name, vendor, attributes, data_size, data) }
    }
}
