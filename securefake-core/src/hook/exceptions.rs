// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! The variables that are answered without asking the firmware.
//!
//! Each entry is a variable name and the single byte it should read as. The names are compared including their nul
//! terminator, so `SecureBootEnableX` does not match `SecureBootEnable`, and `SecureBoot` does not match
//! `SecureBootEnable`. The vendor GUID is not compared.
//!
//! To answer another variable, append it to [`EXCEPTIONS`].

use uefi::{CStr16, cstr16, runtime::VariableAttributes};

/// One variable with a canned value.
#[derive(Debug)]
pub struct ExceptionEntry {
    /// The name of the variable.
    pub name: &'static CStr16,

    /// The value the variable reads as.
    pub value: u8,

    /// The attributes the variable reports.
    pub attributes: VariableAttributes,
}

impl ExceptionEntry {
    /// Compare the entry against a variable name given as UCS-2 code units.
    ///
    /// Only as many units are pulled from `name` as needed to decide. Because the comparison includes the nul
    /// terminator of the entry, a `name` that is nul terminated is never read past its terminator.
    pub fn matches(&self, mut name: impl Iterator<Item = u16>) -> bool {
        self.name
            .to_u16_slice_with_nul()
            .iter()
            .all(|&expected| name.next() == Some(expected))
    }
}

/// Attributes of a variable that is stored by the platform setup.
const SETUP_ATTRIBUTES: VariableAttributes =
    VariableAttributes::NON_VOLATILE.union(VariableAttributes::BOOTSERVICE_ACCESS);

/// Attributes of a volatile global variable.
const GLOBAL_ATTRIBUTES: VariableAttributes =
    VariableAttributes::BOOTSERVICE_ACCESS.union(VariableAttributes::RUNTIME_ACCESS);

/// Secure Boot is enabled.
pub const SECURE_BOOT_ENABLE: u8 = 1;

/// Secure Boot is in standard mode, not custom mode.
pub const STANDARD_SECURE_BOOT_MODE: u8 = 0;

/// The Secure Boot keys were not modified outside of the platform vendor's mechanism.
pub const VENDOR_KEYS_VALID: u8 = 1;

/// Every variable the hook answers by itself.
pub static EXCEPTIONS: &[ExceptionEntry] = &[
    ExceptionEntry {
        name: cstr16!("SecureBootEnable"),
        value: SECURE_BOOT_ENABLE,
        attributes: SETUP_ATTRIBUTES,
    },
    ExceptionEntry {
        name: cstr16!("CustomMode"),
        value: STANDARD_SECURE_BOOT_MODE,
        attributes: SETUP_ATTRIBUTES,
    },
    ExceptionEntry {
        name: cstr16!("VendorKeysNv"),
        value: VENDOR_KEYS_VALID,
        attributes: SETUP_ATTRIBUTES,
    },
    ExceptionEntry {
        name: cstr16!("SecureBoot"),
        value: SECURE_BOOT_ENABLE,
        attributes: GLOBAL_ATTRIBUTES,
    },
    ExceptionEntry {
        name: cstr16!("VendorKeys"),
        value: VENDOR_KEYS_VALID,
        attributes: GLOBAL_ATTRIBUTES,
    },
];

/// Find the entry for a variable name given as UCS-2 code units.
pub fn lookup<I>(name: I) -> Option<&'static ExceptionEntry>
where
    I: Iterator<Item = u16> + Clone,
{
    EXCEPTIONS.iter().find(|entry| entry.matches(name.clone()))
}

/// Find the entry for a variable name.
pub fn lookup_name(name: &CStr16) -> Option<&'static ExceptionEntry> {
    lookup(name.to_u16_slice_with_nul().iter().copied())
}

/// Find the entry for a variable name given as code units, which may or may not be nul terminated.
///
/// A name without a terminator is treated as if it ended where the slice does.
pub fn lookup_units(name: &[u16]) -> Option<&'static ExceptionEntry> {
    lookup(name.iter().copied().chain(core::iter::once(0)))
}

/// Find the entry for a nul terminated variable name passed by a caller of the service.
///
/// # Safety
///
/// `name` must be non null and point to a nul terminated UCS-2 string.
pub unsafe fn lookup_raw(name: *const u16) -> Option<&'static ExceptionEntry> {
    lookup((0..).map(move |i| {
        // SAFETY: the caller guarantees a nul terminated string, and `matches` never reads past the terminator
        unsafe { name.add(i).read_unaligned() }
    }))
}
