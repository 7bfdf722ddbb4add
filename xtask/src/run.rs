use duct::cmd;

use crate::build::build_all_crates;

const TARGET: &str = "x86_64-unknown-uefi";

pub fn run_tests(ovmf_code: Option<&str>, release: bool) -> anyhow::Result<()> {
    let profile = if release { "release-lto" } else { "debug" };
    let driver = format!("target/{TARGET}/{profile}/securefake.efi");
    let tests = format!("target/{TARGET}/{profile}/securefake-tests.efi");

    let mut run_args = vec!["-d"];

    if let Some(ovmf_code) = ovmf_code {
        run_args.extend(["-b", ovmf_code]);
    }

    run_args.extend(["-f", driver.as_str(), tests.as_str()]);

    cmd!("cargo", "install", "uefi-run").run()?; // will not install if its already installed
    build_all_crates(release, TARGET)?;
    if let Err(e) = cmd("uefi-run", run_args).run() {
        println!(
            "hint: if the error was that the PC BIOS could not be loaded, you may have to specify ovmf-code"
        );
        return Err(e.into());
    }
    Ok(())
}
