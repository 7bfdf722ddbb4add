// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! The `securefake` library crate.
//!
//! This contains everything needed to hook a slot of a UEFI service table from a runtime driver and keep the hook
//! alive across `ExitBootServices` and `SetVirtualAddressMap`. The hook that is actually installed answers a small set
//! of Secure Boot state variables with fixed values, and forwards every other `GetVariable` call to the firmware.
//!
//! The mechanism is split the following way:
//! - [`hook::patcher`] swaps a pointer inside a checksummed table.
//! - [`hook::interceptor`] is the replacement `GetVariable`.
//! - [`hook::lifecycle`] follows the firmware through its phase transitions.
//! - [`hook::exceptions`] is the list of variables that get a canned answer.
//!
//! Firmware access goes through the [`system::host::Host`] trait, so that all of the above can be tested on the host
//! with a mock. The real binding is [`system::firmware`].
//!
//! An example driver using this crate can be found in `securefake-driver`.
//!
//! ## MSRV
//!
//! The minimum supported rust version is 1.88.0.

#![cfg_attr(not(any(fuzzing, test, doctest)), no_std)]

/// The primary result type that wraps around [`crate::error::ShimError`].
pub type ShimResult<T> = Result<T, crate::error::ShimError>;

pub mod config;
pub mod error;
pub mod hook;
pub mod system;

extern crate alloc;
