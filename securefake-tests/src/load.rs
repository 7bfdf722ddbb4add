use securefake_core::ShimResult;
use uefi::{
    CStr16, Status,
    boot::{self, LoadImageSource},
    cstr16,
    fs::FileSystem,
    println,
};

const DRIVER_PATH: &CStr16 = cstr16!("\\securefake.efi");

pub fn load_driver() -> ShimResult<()> {
    let driver = {
        let mut fs = FileSystem::new(boot::get_image_file_system(boot::image_handle())?);
        fs.read(DRIVER_PATH)
            .unwrap_or_else(|e| panic!("Could not read {DRIVER_PATH}: {e}"))
    }; // fs dropped here

    let handle = boot::load_image(
        boot::image_handle(),
        LoadImageSource::FromBuffer {
            buffer: &driver,
            file_path: None,
        },
    )?;
    boot::start_image(handle)?;
    println!("Loaded {DRIVER_PATH}");

    // the driver must refuse to be unloaded while its hook is live
    let unload = boot::unload_image(handle);
    assert_eq!(unload.map_err(|e| e.status()), Err(Status::ACCESS_DENIED));
    println!("Driver refused to unload");
    Ok(())
}
