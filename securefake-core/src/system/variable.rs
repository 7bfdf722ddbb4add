// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! UEFI variable storage helpers.
//!
//! These load and store a value in a UEFI variable in the driver's own vendor namespace. They go through the runtime
//! services table, so while the shim is installed they are answered by the hook like any other caller.

use alloc::{vec, vec::Vec};
use uefi::{
    CStr16, Status, guid,
    runtime::{self, VariableAttributes, VariableVendor},
};

use crate::ShimResult;

/// The custom variable namespace for the driver.
pub const SECUREFAKE_GUID: uefi::Guid = guid!("8c9f3e2a-6b41-4d7e-9a35-0f2c1d5b7e64");

/// A value that can be stored in a UEFI variable.
///
/// This is a type that can be converted into and from a fixed number of little endian bytes.
pub trait UefiVariable: Sized {
    /// The number of bytes the value takes up.
    const SIZE: usize;

    /// Convert `Self` to a vector of bytes.
    fn to_bytes(self) -> Vec<u8>;

    /// Convert bytes to `Self`, if there are exactly [`UefiVariable::SIZE`] of them.
    fn from_bytes(bytes: &[u8]) -> Option<Self>;
}

impl UefiVariable for u8 {
    const SIZE: usize = 1;

    fn to_bytes(self) -> Vec<u8> {
        vec![self]
    }
    fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [x] => Some(*x),
            _ => None,
        }
    }
}

impl UefiVariable for bool {
    const SIZE: usize = 1;

    fn to_bytes(self) -> Vec<u8> {
        vec![u8::from(self)]
    }
    fn from_bytes(bytes: &[u8]) -> Option<Self> {
        u8::from_bytes(bytes).map(|x| x > 0)
    }
}

impl UefiVariable for u32 {
    const SIZE: usize = size_of::<Self>();

    fn to_bytes(self) -> Vec<u8> {
        self.to_le_bytes().to_vec()
    }
    fn from_bytes(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(Self::from_le_bytes)
    }
}

/// Sets a UEFI variable to a [`UefiVariable`] given the name.
///
/// If None is specified for the vendor, then the variable is stored in the driver's namespace at GUID
/// `8c9f3e2a-6b41-4d7e-9a35-0f2c1d5b7e64`. If None is specified for the attributes, the variable is non volatile and
/// only accessible during boot.
///
/// Passing None for value will result in the variable being deleted.
///
/// # Errors
///
/// May return an `Error` for many reasons, see [`runtime::set_variable`]
pub fn set_variable<T: UefiVariable>(
    name: &CStr16,
    vendor: Option<VariableVendor>,
    attrs: Option<VariableAttributes>,
    value: Option<T>,
) -> ShimResult<()> {
    let vendor = vendor.unwrap_or(VariableVendor(SECUREFAKE_GUID));
    let attrs = attrs.unwrap_or(VariableAttributes::NON_VOLATILE | VariableAttributes::BOOTSERVICE_ACCESS);
    let value = value.map_or_else(Vec::new, UefiVariable::to_bytes);
    Ok(runtime::set_variable(name, &vendor, attrs, &value)?)
}

/// Gets a UEFI variable of a [`UefiVariable`] given the name.
///
/// If None is specified for the vendor, then the variable is looked up in the driver's namespace at GUID
/// `8c9f3e2a-6b41-4d7e-9a35-0f2c1d5b7e64`.
///
/// Returns None if the variable does not exist, or is not the size of `T`.
///
/// # Errors
///
/// May return an `Error` for many reasons, see [`runtime::get_variable`]
pub fn get_variable<T: UefiVariable>(
    name: &CStr16,
    vendor: Option<VariableVendor>,
) -> ShimResult<Option<T>> {
    let mut buf = vec![0; T::SIZE];
    let vendor = vendor.unwrap_or(VariableVendor(SECUREFAKE_GUID));
    match runtime::get_variable(name, &vendor, &mut buf) {
        Ok((var, _)) => Ok(T::from_bytes(var)),
        Err(e) if matches!(e.status(), Status::NOT_FOUND | Status::BUFFER_TOO_SMALL) => Ok(None),
        Err(e) => Err(e.to_err_without_payload().into()),
    }
}
