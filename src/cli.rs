use crate::config::settings::CleanupConfig;
use crate::exit::ShutdownSignals;
use crate::report::Verbosity;
use crate::safety::Deleter;
use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::{Command, ExitStatus};

#[derive(Parser, Debug)]
#[command(name = "reap", author, version, about, long_about = None)]
/// Run a command and delete scratch paths once it finishes
struct Cli {
    /// File or directory to delete on exit (repeatable)
    #[arg(short = 'p', long = "path", value_name = "PATH", required = true)]
    paths: Vec<PathBuf>,

    /// Verbosity threshold; deletion messages are emitted at the configured level (default 3)
    #[arg(short, long, value_name = "LEVEL", default_value_t = 0)]
    verbose: u8,

    /// JSON cleanup configuration
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Clean up immediately after the command and print a JSON report on stdout
    #[arg(long)]
    json: bool,

    /// Leave the paths in place when the command fails
    #[arg(long)]
    keep_on_failure: bool,

    /// Command and arguments to run before cleanup
    #[arg(last = true, value_name = "COMMAND")]
    command: Vec<String>,
}

/// Exit status to propagate for a finished child
fn status_code(status: ExitStatus) -> i32 {
    status
        .code()
        .or_else(|| status.signal().map(|sig| 128 + sig))
        .unwrap_or(1)
}

fn load_config(path: Option<&PathBuf>) -> Result<CleanupConfig> {
    let config = match path {
        Some(path) => CleanupConfig::load_from_file(path)?,
        None => CleanupConfig::default(),
    };
    Ok(config.with_env_overrides()?)
}

/// Entry point for the `reap` binary. Returns the exit code the process
/// should leave with; the caller must exit through `std::process::exit` so
/// deferred cleanup fires.
pub fn run() -> Result<i32> {
    env_logger::init();

    let cli = Cli::parse();
    let signals = ShutdownSignals::install().context("installing signal handlers")?;
    let config = load_config(cli.config.as_ref())?;

    let reporter = Verbosity::new(cli.verbose).with_echo(true);
    let deleter = Deleter::with_config(cli.paths.iter().cloned(), reporter, config);

    let code = match cli.command.split_first() {
        Some((program, args)) if !signals.shutdown_requested() => {
            let status = Command::new(program)
                .args(args)
                .status()
                .with_context(|| format!("failed to start '{}'", program))?;
            info!("'{}' finished with {}", program, status);
            status_code(status)
        }
        Some((program, _)) => {
            warn!("Shutdown requested before '{}' started", program);
            signals.exit_code().unwrap_or(1)
        }
        None => 0,
    };

    if signals.shutdown_requested() {
        info!(
            "Shutdown requested by {:?}; cleaning up before exit",
            signals.signal()
        );
    }

    if cli.keep_on_failure && code != 0 {
        for path in deleter.disarm() {
            eprintln!("reap: keeping {}", path.display());
        }
        return Ok(code);
    }

    if cli.json {
        let report = deleter.cleanup();
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(if report.is_clean() { code } else { code.max(1) });
    }

    deleter.defer_to_exit()?;
    Ok(code)
}
