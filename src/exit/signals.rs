use crate::config::types::Result;
use log::info;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
/// Turns SIGINT/SIGTERM/SIGHUP into a shutdown request.
///
/// Exit hooks only fire on normal termination. A host that installs these
/// handlers can notice the request, leave `main` through its ordinary path
/// and so still get its scratch paths removed.
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

/// Set by the signal handler
static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Last signal received, 0 if none
static SIGNAL_RECEIVED: AtomicI32 = AtomicI32::new(0);

const HANDLED: [Signal; 3] = [Signal::SIGINT, Signal::SIGTERM, Signal::SIGHUP];

pub struct ShutdownSignals;

impl ShutdownSignals {
    /// Install the handlers. Call early in `main`, before spawning threads.
    pub fn install() -> Result<Self> {
        let action = SigAction::new(
            SigHandler::Handler(Self::handle),
            SaFlags::SA_RESTART,
            SigSet::empty(),
        );

        for sig in HANDLED {
            unsafe { signal::sigaction(sig, &action) }?;
        }

        info!("Shutdown signal handlers installed (SIGINT, SIGTERM, SIGHUP)");
        Ok(Self)
    }

    /// Async-signal-safe: atomics only
    extern "C" fn handle(signal: libc::c_int) {
        SIGNAL_RECEIVED.store(signal, Ordering::SeqCst);
        SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
    }

    pub fn shutdown_requested(&self) -> bool {
        SHUTDOWN_REQUESTED.load(Ordering::SeqCst)
    }

    /// Signal that requested shutdown, if any
    pub fn signal(&self) -> Option<Signal> {
        match SIGNAL_RECEIVED.load(Ordering::SeqCst) {
            0 => None,
            raw => Signal::try_from(raw).ok(),
        }
    }

    /// Conventional exit status for a shutdown caused by `signal`
    pub fn exit_code(&self) -> Option<i32> {
        self.signal().map(|sig| 128 + sig as i32)
    }
}
