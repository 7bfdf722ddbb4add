// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Swap a function pointer inside a UEFI service table.
//!
//! Every UEFI service table starts with an `EFI_TABLE_HEADER`, which carries the size of the whole table and a CRC32
//! over it. The firmware (and anything that wants to be sure it is talking to the real firmware) checks that CRC32, so
//! a hook that changes one slot must reseal the table afterwards. Done this way, the patched table is exactly as valid
//! as the original one.
//!
//! The swap and the reseal happen at `TPL_HIGH_LEVEL`, so that nothing can call into the table while it is halfway
//! updated.
//!
//! # Safety
//!
//! This is the only module that writes to memory owned by the firmware. It uses unsafe in 3 places:
//!
//! 1. Reading and writing the slot. The caller of [`TablePatcher::install`] guarantees that the slot is a function
//!    pointer inside the table.
//! 2. Writing the CRC32 field of the header. The header is at the start of the table, which is live.
//! 3. Viewing the table as bytes for the CRC32. The header says how many bytes the table has, and the firmware is
//!    trusted on that, like everywhere else.

use core::{ffi::c_void, ptr::NonNull};

use uefi::boot::Tpl;

use crate::{ShimResult, system::host::Host};

/// The `EFI_TABLE_HEADER` at the start of every service table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct TableHeader {
    /// Identifies the table.
    pub signature: u64,

    /// The revision of the UEFI specification the table conforms to.
    pub revision: u32,

    /// The size of the entire table, including this header.
    pub header_size: u32,

    /// The CRC32 of the entire table, calculated with this field set to 0.
    pub crc32: u32,

    /// Must be 0.
    pub reserved: u32,
}

/// Raises the task priority level, and restores it when dropped.
pub struct PriorityGuard<'h, H: Host> {
    /// The host that raised the level.
    host: &'h H,

    /// The level to go back to.
    previous: Tpl,
}

impl<'h, H: Host> PriorityGuard<'h, H> {
    /// Raise the task priority level of `host` to `tpl` until the guard is dropped.
    #[must_use = "The level is restored as soon as the guard is dropped"]
    pub fn raise(host: &'h H, tpl: Tpl) -> Self {
        let previous = host.raise_tpl(tpl);
        Self { host, previous }
    }
}

impl<H: Host> Drop for PriorityGuard<'_, H> {
    fn drop(&mut self) {
        self.host.restore_tpl(self.previous);
    }
}

/// Installs function pointers into checksummed tables.
pub struct TablePatcher<'h, H: Host> {
    /// The host providing the priority levels and CRC32.
    host: &'h H,
}

impl<'h, H: Host> TablePatcher<'h, H> {
    /// Create a patcher that uses `host`.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn new(host: &'h H) -> Self {
        Self { host }
    }

    /// Put `replacement` into `slot`, and reseal the table at `header`.
    ///
    /// Returns what was previously in the slot. If the slot was empty or `replacement` is null, nothing is done and
    /// [`None`] is returned. If the table could not be resealed, it is left exactly as it was and [`None`] is returned.
    ///
    /// Installing twice composes: the second install returns the first replacement.
    ///
    /// Nothing is logged, since this runs at `TPL_HIGH_LEVEL` where the console may not be used.
    ///
    /// # Safety
    ///
    /// `header` must point to a live table of `header_size` bytes, and `slot` to a function pointer inside that table.
    /// Nothing else may be accessing the table at the same time, other than through the firmware's own services.
    pub unsafe fn install(
        &self,
        header: NonNull<TableHeader>,
        slot: NonNull<*const c_void>,
        replacement: *const c_void,
    ) -> Option<NonNull<c_void>> {
        if replacement.is_null() {
            return None;
        }

        let _guard = PriorityGuard::raise(self.host, Tpl::HIGH_LEVEL);

        // SAFETY: the caller guarantees that slot is a function pointer inside a live table
        let original = NonNull::new(unsafe { slot.read() }.cast_mut())?;
        // SAFETY: see above
        unsafe { slot.write(replacement) };

        // SAFETY: the caller guarantees that header is the start of a live table
        let previous_crc = unsafe { header.read() }.crc32;

        // SAFETY: see above
        if unsafe { self.reseal(header) }.is_err() {
            // SAFETY: same slot and header as above
            unsafe {
                slot.write(original.as_ptr());
                (*header.as_ptr()).crc32 = previous_crc;
            }
            return None;
        }

        Some(original)
    }

    /// Recalculate the CRC32 of the table at `header`.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the host could not calculate the CRC32. The CRC32 field is left zeroed in that case.
    ///
    /// # Safety
    ///
    /// `header` must point to a live table of `header_size` bytes.
    pub unsafe fn reseal(&self, header: NonNull<TableHeader>) -> ShimResult<()> {
        // SAFETY: the caller guarantees that header is the start of a live table
        unsafe { (*header.as_ptr()).crc32 = 0 };

        // SAFETY: the caller guarantees that the table is header_size bytes long
        let crc = self.host.calculate_crc32(unsafe { table_bytes(header) })?;

        // SAFETY: see above
        unsafe { (*header.as_ptr()).crc32 = crc };
        Ok(())
    }

    /// Check that the CRC32 stored in the table at `header` matches its contents.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the host could not calculate the CRC32.
    ///
    /// # Safety
    ///
    /// `header` must point to a live table of `header_size` bytes, which may be written to.
    pub unsafe fn verify(&self, header: NonNull<TableHeader>) -> ShimResult<bool> {
        let _guard = PriorityGuard::raise(self.host, Tpl::HIGH_LEVEL);

        // SAFETY: the caller guarantees that header is the start of a live table
        let stored = unsafe { header.read() }.crc32;
        // SAFETY: see above
        unsafe { (*header.as_ptr()).crc32 = 0 };

        // SAFETY: the caller guarantees that the table is header_size bytes long
        let crc = self.host.calculate_crc32(unsafe { table_bytes(header) });

        // SAFETY: see above
        unsafe { (*header.as_ptr()).crc32 = stored };
        Ok(crc? == stored)
    }
}

/// View a table as the bytes its header claims it has.
///
/// # Safety
///
/// `header` must point to a live table of `header_size` bytes, that is not written to while the slice lives.
unsafe fn table_bytes<'a>(header: NonNull<TableHeader>) -> &'a [u8] {
    // SAFETY: the caller guarantees that header is the start of a live table
    let size = unsafe { header.read() }.header_size as usize;
    // SAFETY: see above
    unsafe { core::slice::from_raw_parts(header.as_ptr().cast::<u8>(), size) }
}
