use clap::Subcommand;
use duct::cmd;

#[derive(Subcommand)]
pub enum Test {
    /// Only run clippy
    Clippy,

    /// Only run unit tests
    Unit,
}

pub fn test_crate(command: Option<Test>) -> anyhow::Result<()> {
    match command {
        Some(Test::Clippy) => clippy()?,
        Some(Test::Unit) => unit()?,
        None => {
            clippy()?;
            unit()?;
        }
    }
    Ok(())
}

fn clippy() -> anyhow::Result<()> {
    cmd!("cargo", "clippy", "--package", "securefake-core", "--", "-C", "panic=abort").run()?;
    Ok(())
}

fn unit() -> anyhow::Result<()> {
    cmd!("cargo", "test", "--package", "securefake-core", "--lib").run()?;
    Ok(())
}
