use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use once_cell::sync::Lazy;
use print_quote_core::{config::SettingsManager, core::Managers, storage::JsonStorage};
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Creates isolated managers backed by a unique data directory for each test.
pub fn setup_test_env() -> (Managers, JsonStorage, SettingsManager, PathBuf) {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);

    let storage = JsonStorage::new(Some(base.clone()), Some(3)).expect("create json storage");
    let managers = Managers::open(Arc::new(storage.clone()));
    let settings = SettingsManager::open(&base).expect("open settings for temp dir");

    (managers, storage, settings, base)
}

#[allow(dead_code)]
pub fn reopen(storage: &JsonStorage) -> Managers {
    Managers::open(Arc::new(storage.clone()))
}
