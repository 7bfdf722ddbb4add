use uefi::{
    CStr16, Status, cstr16, println,
    runtime::{self, VariableAttributes, VariableVendor},
};

const EXPECTED: [(&CStr16, u8); 5] = [
    (cstr16!("SecureBootEnable"), 1),
    (cstr16!("CustomMode"), 0),
    (cstr16!("VendorKeysNv"), 1),
    (cstr16!("SecureBoot"), 1),
    (cstr16!("VendorKeys"), 1),
];

pub fn test_canned_values() {
    for (name, value) in EXPECTED {
        let mut buf = [0xa5; 4];
        let (data, attributes) = runtime::get_variable(name, &VariableVendor::GLOBAL_VARIABLE, &mut buf)
            .unwrap_or_else(|e| panic!("{name} should be answered by the driver: {:?}", e.status()));
        assert_eq!(data, [value], "{name} has the wrong value");
        assert!(attributes.contains(VariableAttributes::BOOTSERVICE_ACCESS));
        println!("{name} = {value}");
    }

    // the vendor is not part of the match
    let mut buf = [0; 1];
    let (data, _) = runtime::get_variable(
        cstr16!("SecureBoot"),
        &VariableVendor::IMAGE_SECURITY_DATABASE,
        &mut buf,
    )
    .expect("SecureBoot should be answered under any vendor");
    assert_eq!(data, [1]);
}

pub fn test_buffer_too_small() {
    let mut buf = [];
    let e = runtime::get_variable(cstr16!("SecureBoot"), &VariableVendor::GLOBAL_VARIABLE, &mut buf)
        .expect_err("An empty buffer cannot hold the value");
    assert_eq!(e.status(), Status::BUFFER_TOO_SMALL);
    assert_eq!(*e.data(), Some(1));
    println!("Empty buffer reports a required size of 1");
}
