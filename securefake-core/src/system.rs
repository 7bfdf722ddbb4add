// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! System re-exports

pub mod firmware;
pub mod host;
pub mod log_backend;
pub mod variable;

mod global_allocator;
mod panic_handler;
