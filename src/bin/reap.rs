use anyhow::Result;

fn main() -> Result<()> {
    // Leave through exit() so the deferred cleanup hook runs
    let code = scratchguard::cli::run()?;
    std::process::exit(code)
}
