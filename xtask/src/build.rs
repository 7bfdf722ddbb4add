use duct::cmd;

/// The crates that are built for the UEFI target.
pub const UEFI_CRATES: [&str; 2] = ["securefake-driver", "securefake-tests"];

pub fn build_all_crates(release: bool, target: &str) -> anyhow::Result<()> {
    let mut build_args = vec!["build", "--target", target];

    for package in UEFI_CRATES {
        build_args.extend(["--package", package]);
    }

    if release {
        build_args.extend(["--profile", "release-lto"]);
    }

    cmd("cargo", build_args).run()?;
    Ok(())
}
