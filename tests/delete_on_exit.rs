//! `delete_on_exit` queues onto the process-wide exit hook.
//!
//! Kept in its own test binary with a single test: the hook queue is
//! shared by the whole process.

use scratchguard::exit::at_exit;
use scratchguard::{delete_on_exit, Deleter, Ignore};
use std::fs;
use std::sync::{Arc, Mutex};

#[test]
fn test_deferred_registries_run_lifo_on_drain() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("single.txt");
    let tree = dir.path().join("tree");
    fs::write(&file, b"s").unwrap();
    fs::create_dir_all(tree.join("a/b")).unwrap();
    fs::write(tree.join("a/b/c.txt"), b"c").unwrap();

    let order = Arc::new(Mutex::new(Vec::new()));

    let seen = Arc::clone(&order);
    delete_on_exit(&file, move |message: &str, _level: u8| {
        seen.lock().unwrap().push(message.to_string());
    })
    .unwrap();

    let seen = Arc::clone(&order);
    Deleter::new([&tree], move |message: &str, _level: u8| {
        seen.lock().unwrap().push(message.to_string());
    })
    .defer_to_exit()
    .unwrap();

    Deleter::new(Vec::<std::path::PathBuf>::new(), Ignore)
        .defer_to_exit()
        .unwrap();

    // Nothing happens until the hooks run
    assert!(file.exists());
    assert!(tree.exists());
    assert_eq!(at_exit::pending(), 3);

    assert_eq!(at_exit::run_now(), 3);

    assert!(!file.exists());
    assert!(!tree.exists());
    assert_eq!(
        *order.lock().unwrap(),
        vec![
            format!("Deleting tree: {}", tree.display()),
            format!("Deleting file: {}", file.display()),
        ]
    );
    assert_eq!(at_exit::pending(), 0);
}
