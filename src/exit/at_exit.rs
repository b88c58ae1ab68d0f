/// Process-wide exit hooks backed by the C runtime's `atexit`
///
/// One trampoline is installed on first registration. When the process
/// exits normally (`std::process::exit` or returning from `main`) queued
/// hooks run last-in first-out, each at most once. Killed or aborted
/// processes never reach them.
use crate::config::types::{CleanupError, Result};
use log::{debug, warn};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

type Hook = Box<dyn FnOnce() + Send>;

static HOOKS: Mutex<Vec<Hook>> = Mutex::new(Vec::new());

static INSTALLED: OnceLock<std::result::Result<(), String>> = OnceLock::new();

fn hooks() -> MutexGuard<'static, Vec<Hook>> {
    HOOKS.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Install the `atexit` trampoline (idempotent)
pub fn install() -> Result<()> {
    INSTALLED
        .get_or_init(|| {
            let rc = unsafe { libc::atexit(run_at_exit) };
            if rc == 0 {
                debug!("Exit hook trampoline installed");
                Ok(())
            } else {
                Err(format!("atexit registration failed with code {}", rc))
            }
        })
        .clone()
        .map_err(CleanupError::Hook)
}

/// Queue `hook` to run at normal process exit.
///
/// The hook is queued even if the trampoline cannot be installed, so a host
/// can still drain it with [`run_now`].
pub fn register<F>(hook: F) -> Result<()>
where
    F: FnOnce() + Send + 'static,
{
    hooks().push(Box::new(hook));
    install()
}

/// Number of hooks still queued
pub fn pending() -> usize {
    hooks().len()
}

/// Run every queued hook now, newest first, and return how many ran.
///
/// The queue lock is released while a hook runs, so hooks may register
/// further hooks; those run in the same drain. A panicking hook is logged
/// and the drain continues.
pub fn run_now() -> usize {
    let mut ran = 0;
    loop {
        let next = hooks().pop();
        let Some(hook) = next else {
            break;
        };

        if panic::catch_unwind(AssertUnwindSafe(hook)).is_err() {
            warn!("Exit hook panicked; continuing with remaining hooks");
        }
        ran += 1;
    }
    ran
}

extern "C" fn run_at_exit() {
    let ran = run_now();
    if ran > 0 {
        debug!("Ran {} exit hook(s)", ran);
    }
}
