// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Build script for `securefake-driver`.
//!
//! Links the image as a runtime driver, so the firmware keeps it in runtime memory after `ExitBootServices`. Host
//! builds are left alone.

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    if std::env::var("CARGO_CFG_TARGET_OS").is_ok_and(|os| os == "uefi") {
        println!("cargo:rustc-link-arg-bins=/subsystem:efi_runtime_driver");
    }
}
