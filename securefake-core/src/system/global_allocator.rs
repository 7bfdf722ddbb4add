// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Use the UEFI pool allocator as the global allocator.
//!
//! This is enabled when the `global_allocator` feature is enabled. The core itself only allocates while the driver is
//! loading; the hook never allocates, since pool memory is a boot service.

#![cfg(feature = "global_allocator")]
use uefi::allocator::Allocator;

/// The UEFI global allocator.
#[global_allocator]
static ALLOCATOR: Allocator = Allocator;
