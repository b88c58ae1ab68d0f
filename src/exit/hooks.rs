/// Explicit, host-owned shutdown coordinator
use crate::safety::registry::Deleter;
use log::{info, warn};
use std::panic::{self, AssertUnwindSafe};

/// Cleanup handler run by [`ExitHooks`]
pub struct CleanupHandler {
    name: String,
    cleanup_fn: Box<dyn FnOnce() + Send>,
}

impl CleanupHandler {
    pub fn new<F>(name: impl Into<String>, cleanup_fn: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            name: name.into(),
            cleanup_fn: Box::new(cleanup_fn),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the handler; a panic is caught and reported as `false`
    pub fn run(self) -> bool {
        let name = self.name;
        match panic::catch_unwind(AssertUnwindSafe(self.cleanup_fn)) {
            Ok(()) => true,
            Err(_) => {
                warn!("Cleanup handler '{}' panicked", name);
                false
            }
        }
    }
}

/// Owns a set of cleanup handlers and runs them once, newest first.
///
/// The host keeps this value alive for the life of `main` and either calls
/// [`ExitHooks::run`] explicitly or lets it drop, which runs whatever is
/// still registered.
#[derive(Default)]
pub struct ExitHooks {
    handlers: Vec<CleanupHandler>,
}

impl ExitHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a cleanup closure
    pub fn register<F>(&mut self, name: impl Into<String>, cleanup_fn: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.handlers.push(CleanupHandler::new(name, cleanup_fn));
    }

    /// Take ownership of a registry; its cleanup action runs with the hooks
    pub fn adopt(&mut self, deleter: Deleter) {
        let name = format!("deleter({} paths)", deleter.paths().len());
        self.register(name, move || {
            let report = deleter.cleanup();
            if !report.is_clean() {
                warn!(
                    "Cleanup left {} path(s) behind",
                    report.failures().len()
                );
            }
        });
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run all handlers newest first; returns how many completed without panicking
    pub fn run(mut self) -> usize {
        self.drain()
    }

    fn drain(&mut self) -> usize {
        if self.handlers.is_empty() {
            return 0;
        }

        info!("Running {} cleanup handler(s)", self.handlers.len());
        let mut completed = 0;
        while let Some(handler) = self.handlers.pop() {
            if handler.run() {
                completed += 1;
            }
        }
        info!("Cleanup complete");
        completed
    }
}

impl Drop for ExitHooks {
    fn drop(&mut self) {
        self.drain();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_handlers_run_lifo() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut hooks = ExitHooks::new();
        for name in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            hooks.register(name, move || order.lock().unwrap().push(name));
        }
        assert_eq!(hooks.len(), 3);

        assert_eq!(hooks.run(), 3);
        assert_eq!(*order.lock().unwrap(), vec!["third", "second", "first"]);
    }

    #[test]
    fn test_panicking_handler_does_not_block_others() {
        let ran = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&ran);

        let mut hooks = ExitHooks::new();
        hooks.register("survivor", move || *flag.lock().unwrap() = true);
        hooks.register("boom", || panic!("handler failure"));

        assert_eq!(hooks.run(), 1);
        assert!(*ran.lock().unwrap());
    }

    #[test]
    fn test_drop_runs_adopted_deleters() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("adopted.txt");
        let tree = dir.path().join("adopted-dir");
        fs::write(&file, b"a").unwrap();
        fs::create_dir_all(tree.join("inner")).unwrap();

        {
            let mut hooks = ExitHooks::new();
            hooks.adopt(Deleter::quiet([&file]));
            hooks.adopt(Deleter::quiet([&tree]));
            assert!(file.exists());
            assert!(tree.exists());
        }

        assert!(!file.exists());
        assert!(!tree.exists());
    }

    #[test]
    fn test_empty_hooks() {
        let hooks = ExitHooks::new();
        assert!(hooks.is_empty());
        assert_eq!(hooks.run(), 0);
    }
}
