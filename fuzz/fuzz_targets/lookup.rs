// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let name: Vec<u16> = data
        .chunks_exact(2)
        .map(|x| u16::from_le_bytes([x[0], x[1]]))
        .collect();

    if let Some(entry) = securefake_core::hook::exceptions::lookup_units(&name) {
        // anything that matches has to be the entry's name, up to the first nul
        let end = name.iter().position(|&x| x == 0).unwrap_or(name.len());
        assert_eq!(&name[..end], entry.name.to_u16_slice());
    }
});
