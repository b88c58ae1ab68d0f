/// Exit-time cleanup registry
///
/// A `Deleter` owns an ordered list of scratch paths and deletes them once,
/// best-effort, when the process winds down:
/// - dropped at the end of its owning scope (end of `main`, early return,
///   `?` propagation, panic unwinding), or
/// - handed to the process exit hook with [`Deleter::defer_to_exit`], or
/// - adopted by an explicit [`crate::exit::ExitHooks`] coordinator.
///
/// Failures are reported as `Caught an exception during cleanup: ...` and
/// never propagate; the remaining paths are still attempted.
use crate::config::settings::CleanupConfig;
use crate::config::types::{CleanupError, PathKind, Result};
use crate::exit::at_exit;
use crate::report::{Ignore, Reporter};
use crate::safety::outcome::{CleanupOutcome, CleanupReport};
use crate::safety::removal;
use log::{debug, info, warn};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Prefix of every failure message written to the error stream
pub const FAILURE_PREFIX: &str = "Caught an exception during cleanup";

pub struct Deleter {
    paths: Mutex<Vec<PathBuf>>,
    reporter: Box<dyn Reporter>,
    config: CleanupConfig,
    /// Set once the cleanup action has run; freezes the path list and
    /// makes the drop-time action a no-op
    ran: AtomicBool,
    /// Cleared by `disarm`
    armed: AtomicBool,
}

impl Deleter {
    /// Register `paths` for deletion, reporting through `reporter`
    pub fn new<I, P, R>(paths: I, reporter: R) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
        R: Reporter + 'static,
    {
        Self::with_config(paths, reporter, CleanupConfig::default())
    }

    pub fn with_config<I, P, R>(paths: I, reporter: R, config: CleanupConfig) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
        R: Reporter + 'static,
    {
        let paths: Vec<PathBuf> = paths.into_iter().map(Into::into).collect();
        debug!("Registered {} path(s) for cleanup", paths.len());

        Self {
            paths: Mutex::new(paths),
            reporter: Box::new(reporter),
            config,
            ran: AtomicBool::new(false),
            armed: AtomicBool::new(true),
        }
    }

    /// Register a single path
    pub fn single<P, R>(path: P, reporter: R) -> Self
    where
        P: Into<PathBuf>,
        R: Reporter + 'static,
    {
        Self::new([path.into()], reporter)
    }

    /// Register `paths` with the ignore reporter
    pub fn quiet<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self::new(paths, Ignore)
    }

    /// Add another path. Ignored (with a warning) once cleanup has run.
    pub fn push<P: Into<PathBuf>>(&self, path: P) {
        let path = path.into();
        let mut paths = self.lock_paths();
        if self.ran.load(Ordering::SeqCst) {
            warn!(
                "Cleanup already ran, not registering {}",
                path.display()
            );
            return;
        }
        paths.push(path);
    }

    /// Registered paths, in registration order
    pub fn paths(&self) -> Vec<PathBuf> {
        self.lock_paths().clone()
    }

    pub fn config(&self) -> &CleanupConfig {
        &self.config
    }

    /// Whether the cleanup action has run at least once
    pub fn has_run(&self) -> bool {
        self.ran.load(Ordering::SeqCst)
    }

    /// Give up on deleting anything and hand the paths back
    pub fn disarm(self) -> Vec<PathBuf> {
        self.armed.store(false, Ordering::SeqCst);
        let paths = std::mem::take(&mut *self.lock_paths());
        info!("Cleanup disarmed, keeping {} path(s)", paths.len());
        paths
    }

    /// Hand this registry to the process exit hook.
    ///
    /// The cleanup action then runs when the process exits normally
    /// (`std::process::exit` or returning from `main`). If the runtime hook
    /// cannot be installed the registry stays queued for
    /// [`at_exit::run_now`] and the error is returned.
    pub fn defer_to_exit(self) -> Result<()> {
        at_exit::register(move || {
            let report = self.cleanup();
            debug!(
                "Exit cleanup finished: {} removed, {} failed",
                report.removed().len(),
                report.failures().len()
            );
        })
    }

    /// The cleanup action.
    ///
    /// Deletes every registered path in order and returns what happened to
    /// each one. Safe to call repeatedly: later calls find the paths gone and
    /// record them as absent.
    pub fn cleanup(&self) -> CleanupReport {
        let paths = {
            let paths = self.lock_paths();
            self.ran.store(true, Ordering::SeqCst);
            paths.clone()
        };

        let mut report = CleanupReport::new();
        if !self.armed.load(Ordering::SeqCst) {
            return report;
        }

        for path in &paths {
            let outcome = self.cleanup_path(path);
            report.record(path, outcome);
        }
        report
    }

    fn cleanup_path(&self, path: &Path) -> CleanupOutcome {
        let attempt =
            panic::catch_unwind(AssertUnwindSafe(|| self.try_cleanup_path(path)));

        let error = match attempt {
            Ok(Ok(outcome)) => return outcome,
            Ok(Err(e)) => e.to_string(),
            Err(payload) => format!(
                "panic while removing {}: {}",
                path.display(),
                panic_message(&payload)
            ),
        };

        let message = format!("{}: {}", FAILURE_PREFIX, error);
        if self.config.echo_errors {
            self.reporter.error(&message);
        } else {
            warn!("{}", message);
        }
        CleanupOutcome::Failed { error }
    }

    fn try_cleanup_path(&self, path: &Path) -> Result<CleanupOutcome> {
        let kind = removal::classify(path).map_err(|e| {
            CleanupError::Filesystem(format!("Failed to inspect {}: {}", path.display(), e))
        })?;

        let level = self.config.verbose_level;
        match kind {
            PathKind::File => {
                self.reporter
                    .log(&format!("Deleting file: {}", path.display()), level);
                removal::remove_file(path)?;
            }
            PathKind::Directory => {
                self.reporter
                    .log(&format!("Deleting tree: {}", path.display()), level);
                removal::remove_tree(path, self.config.removal_policy())?;
            }
            PathKind::Symlink => {
                self.reporter
                    .log(&format!("Deleting link: {}", path.display()), level);
                removal::remove_link(path)?;
            }
            PathKind::Other => {
                debug!("Not deleting {} ({})", path.display(), kind);
                return Ok(CleanupOutcome::Skipped { kind });
            }
            PathKind::Absent => return Ok(CleanupOutcome::Absent),
        }

        Ok(CleanupOutcome::Removed { kind })
    }

    fn lock_paths(&self) -> MutexGuard<'_, Vec<PathBuf>> {
        self.paths.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Deleter {
    fn drop(&mut self) {
        if !self.ran.load(Ordering::SeqCst) {
            self.cleanup();
        }
    }
}

impl fmt::Debug for Deleter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deleter")
            .field("paths", &self.paths())
            .field("config", &self.config)
            .field("ran", &self.has_run())
            .finish_non_exhaustive()
    }
}

/// Delete `path` when the process exits normally
pub fn delete_on_exit<P, R>(path: P, reporter: R) -> Result<()>
where
    P: Into<PathBuf>,
    R: Reporter + 'static,
{
    Deleter::single(path, reporter).defer_to_exit()
}

fn panic_message(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;

    type Log = Arc<Mutex<Vec<(String, u8)>>>;

    fn recording() -> (Log, impl Fn(&str, u8) + Send + Sync + 'static) {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        (log, move |message: &str, level: u8| {
            sink.lock().unwrap().push((message.to_string(), level));
        })
    }

    #[test]
    fn test_removes_files_and_trees() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        let tree = dir.path().join("bdir");
        fs::write(&file, b"a").unwrap();
        fs::create_dir_all(tree.join("nested/deeper")).unwrap();
        fs::write(tree.join("x.txt"), b"x").unwrap();
        fs::write(tree.join("nested/deeper/y.txt"), b"y").unwrap();

        let (log, reporter) = recording();
        let deleter = Deleter::new([&file, &tree], reporter);
        let report = deleter.cleanup();

        assert!(!file.exists());
        assert!(!tree.exists());
        assert_eq!(report.removed().len(), 2);
        assert!(report.is_clean());

        let log = log.lock().unwrap();
        assert_eq!(
            *log,
            vec![
                (format!("Deleting file: {}", file.display()), 3),
                (format!("Deleting tree: {}", tree.display()), 3),
            ]
        );
    }

    #[test]
    fn test_missing_paths_are_skipped_silently() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("never-created");
        let file = dir.path().join("real.txt");
        fs::write(&file, b"r").unwrap();

        let (log, reporter) = recording();
        let deleter = Deleter::new([&missing, &file], reporter);
        let report = deleter.cleanup();

        assert!(!file.exists());
        assert_eq!(report.outcome_for(&missing), Some(&CleanupOutcome::Absent));
        assert!(report.is_clean());
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_second_cleanup_finds_everything_absent() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("once.txt");
        fs::write(&file, b"1").unwrap();

        let deleter = Deleter::quiet([&file]);
        let first = deleter.cleanup();
        let second = deleter.cleanup();

        assert_eq!(first.removed().len(), 1);
        assert!(second.removed().is_empty());
        assert!(second.is_clean());
        assert_eq!(second.outcome_for(&file), Some(&CleanupOutcome::Absent));
    }

    #[test]
    fn test_empty_registry_is_noop() {
        let (log, reporter) = recording();
        let deleter = Deleter::new(Vec::<PathBuf>::new(), reporter);
        let report = deleter.cleanup();

        assert!(report.is_empty());
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_drop_runs_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("scoped.txt");
        fs::write(&file, b"s").unwrap();

        {
            let _deleter = Deleter::single(&file, Ignore);
            assert!(file.exists());
        }

        assert!(!file.exists());
    }

    #[test]
    fn test_drop_after_cleanup_does_not_rerun() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("late.txt");

        let deleter = Deleter::quiet([&file]);
        deleter.cleanup();
        // Recreated after the cleanup action already ran
        fs::write(&file, b"late").unwrap();
        drop(deleter);

        assert!(file.exists());
    }

    #[test]
    fn test_push_before_and_after_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.txt");
        let second = dir.path().join("second.txt");
        fs::write(&first, b"1").unwrap();

        let deleter = Deleter::quiet(Vec::<PathBuf>::new());
        deleter.push(&first);
        assert_eq!(deleter.paths(), vec![first.clone()]);

        deleter.cleanup();
        assert!(!first.exists());

        deleter.push(&second);
        assert_eq!(deleter.paths(), vec![first]);
    }

    #[test]
    fn test_disarm_keeps_paths() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("keep.txt");
        fs::write(&file, b"k").unwrap();

        let deleter = Deleter::quiet([&file]);
        let kept = deleter.disarm();

        assert_eq!(kept, vec![file.clone()]);
        assert!(file.exists());
    }

    #[test]
    fn test_panicking_reporter_does_not_stop_later_paths() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.txt");
        let second = dir.path().join("second.txt");
        fs::write(&first, b"1").unwrap();
        fs::write(&second, b"2").unwrap();

        let poisoned = first.display().to_string();
        let reporter = move |message: &str, _level: u8| {
            if message.ends_with(&poisoned) {
                panic!("reporter blew up");
            }
        };

        let mut config = CleanupConfig::default();
        config.echo_errors = false;
        let deleter = Deleter::with_config([&first, &second], reporter, config);
        let report = deleter.cleanup();

        assert!(first.exists());
        assert!(!second.exists());
        let failures = report.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, first.as_path());
        assert!(failures[0].1.contains("reporter blew up"));
    }

    #[test]
    fn test_custom_verbose_level() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("lvl.txt");
        fs::write(&file, b"l").unwrap();

        let (log, reporter) = recording();
        let mut config = CleanupConfig::default();
        config.verbose_level = 5;
        let deleter = Deleter::with_config([&file], reporter, config);
        deleter.cleanup();

        assert_eq!(log.lock().unwrap()[0].1, 5);
    }
}
