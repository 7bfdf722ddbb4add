#![no_main]
#![no_std]

// Integration tests for securefake, run on firmware with the driver image next to this one.

// DISCLAIMER: This code extensively uses unwrap and expect, as any errors in testing should be treated as fatal.

use securefake_core::{ShimResult, system::log_backend::UefiLogger};
use uefi::{
    prelude::*,
    println,
    proto::console::text::{Input, Key},
    runtime::{self, ResetType},
};

use crate::{
    canned::{test_buffer_too_small, test_canned_values},
    forward::test_forwarding,
    load::load_driver,
};

mod canned;
mod forward;
mod load;

static LOGGER: UefiLogger = UefiLogger::new();

fn main_func() -> ShimResult<()> {
    uefi::helpers::init()?;
    log::set_logger(&LOGGER)
        .map(|()| log::set_max_level(log::LevelFilter::Info))
        .expect("Failed to set logger"); // set up logger so that errors produced by the library will get caught as well

    test_forwarding()?; // before the driver, so the firmware's own answers are known
    load_driver()?;
    test_canned_values();
    test_buffer_too_small();
    test_forwarding()?;

    println!("All tests passed");
    Ok(())
}

#[entry]
fn main() -> Status {
    main_func().unwrap_or_else(|e| panic!("Failed to run test: {e}"));
    println!("Press a key to shut down");
    let _ = read_key();
    runtime::reset(ResetType::SHUTDOWN, Status::SUCCESS, None);
}

fn read_key() -> Key {
    let handle = boot::get_handle_for_protocol::<Input>().unwrap();
    let mut input = boot::open_protocol_exclusive::<Input>(handle).unwrap();
    let mut events = [input.wait_for_key_event().unwrap()];
    boot::wait_for_event(&mut events).unwrap();
    input.read_key().unwrap().unwrap()
}
