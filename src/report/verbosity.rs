/// Reporters used by the cleanup registry for verbose diagnostics
use log::{debug, info, trace, warn};
use std::io::Write;

/// Logging capability injected into a `Deleter`.
///
/// `log` receives verbose diagnostics tagged with a numeric level (higher is
/// more detailed). `error` receives cleanup failures and is independent of
/// the verbosity threshold.
pub trait Reporter: Send + Sync {
    fn log(&self, message: &str, level: u8);

    fn error(&self, message: &str) {
        warn!("{}", message);
        let _ = writeln!(std::io::stderr(), "{}", message);
    }
}

/// Drops every verbose message
#[derive(Debug, Clone, Copy, Default)]
pub struct Ignore;

impl Reporter for Ignore {
    fn log(&self, _message: &str, _level: u8) {}
}

/// Threshold reporter: a message is emitted when its level is at or below
/// the threshold.
#[derive(Debug, Clone, Copy)]
pub struct Verbosity {
    threshold: u8,
    echo: bool,
}

impl Verbosity {
    pub fn new(threshold: u8) -> Self {
        Self {
            threshold,
            echo: false,
        }
    }

    /// Also write accepted messages to stderr
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    pub fn accepts(&self, level: u8) -> bool {
        level <= self.threshold
    }
}

impl Reporter for Verbosity {
    fn log(&self, message: &str, level: u8) {
        if !self.accepts(level) {
            return;
        }

        match level {
            0 | 1 => info!("{}", message),
            2 | 3 => debug!("{}", message),
            _ => trace!("{}", message),
        }

        if self.echo {
            let _ = writeln!(std::io::stderr(), "{}", message);
        }
    }
}

impl<F> Reporter for F
where
    F: Fn(&str, u8) + Send + Sync,
{
    fn log(&self, message: &str, level: u8) {
        self(message, level)
    }
}
