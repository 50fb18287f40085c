use dirs::home_dir;
use std::{
    env, fs,
    path::{Path, PathBuf},
};

use super::errors::Result;

const DEFAULT_DIR_NAME: &str = ".print_quote";
const HOME_ENV: &str = "PRINT_QUOTE_HOME";
const BACKUP_DIR: &str = "backups";
const SETTINGS_FILE: &str = "settings.json";
const PREFERENCES_FILE: &str = "user_preferences.json";
const ANALYTICS_FILE: &str = "analytics.json";
const AUTH_FILE: &str = "auth.json";
const TEMPLATE_DIR: &str = "templates";

/// Resolves the on-disk layout of the application data directory.
pub struct PathResolver;

impl PathResolver {
    /// Data directory, honoring `PRINT_QUOTE_HOME` before falling back to `~/.print_quote`.
    pub fn base_dir() -> PathBuf {
        if let Some(custom) = env::var_os(HOME_ENV) {
            return PathBuf::from(custom);
        }
        home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_DIR_NAME)
    }

    pub fn resolve_base(root: Option<PathBuf>) -> PathBuf {
        root.unwrap_or_else(Self::base_dir)
    }

    pub fn backup_dir_in(base: &Path) -> PathBuf {
        base.join(BACKUP_DIR)
    }

    pub fn settings_file_in(base: &Path) -> PathBuf {
        base.join(SETTINGS_FILE)
    }

    pub fn preferences_file_in(base: &Path) -> PathBuf {
        base.join(PREFERENCES_FILE)
    }

    pub fn analytics_file_in(base: &Path) -> PathBuf {
        base.join(ANALYTICS_FILE)
    }

    pub fn auth_file_in(base: &Path) -> PathBuf {
        base.join(AUTH_FILE)
    }

    pub fn template_dir_in(base: &Path) -> PathBuf {
        base.join(TEMPLATE_DIR)
    }
}

/// Creates `path` and any missing parents.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn ensure_dir_creates_nested_directories() {
        let temp = tempdir().expect("temp dir");
        let nested = temp.path().join("a").join("b");
        ensure_dir(&nested).expect("create nested");
        assert!(nested.is_dir());
    }

    #[test]
    fn explicit_root_wins_over_environment() {
        let root = PathBuf::from("/tmp/quotes-root");
        assert_eq!(PathResolver::resolve_base(Some(root.clone())), root);
        assert_eq!(
            PathResolver::settings_file_in(&root),
            root.join("settings.json")
        );
    }
}
