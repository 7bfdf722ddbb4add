use securefake_core::{
    ShimResult,
    system::variable::{get_variable, set_variable},
};
use uefi::{CStr16, cstr16, println};

const VARIABLE_NAME: &CStr16 = cstr16!("SecureFakeTestVariable");
const VARIABLE_CONTENT: u32 = 0x5ec0_b007;

pub fn test_forwarding() -> ShimResult<()> {
    set_variable(VARIABLE_NAME, None, None, Some(VARIABLE_CONTENT))?;
    assert_eq!(get_variable::<u32>(VARIABLE_NAME, None)?, Some(VARIABLE_CONTENT));

    set_variable::<u32>(VARIABLE_NAME, None, None, None)?;
    assert_eq!(get_variable::<u32>(VARIABLE_NAME, None)?, None);

    println!("Variables outside the exception list are read from the firmware");
    Ok(())
}
