use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use crate::core::{
    errors::QuoteError,
    utils::{ensure_dir, PathResolver},
};

use super::{Result, StorageBackend};

const BACKUP_PREFIX: &str = "full_backup";
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const BACKUP_INFO_FILE: &str = "backup_info.json";
const TMP_SUFFIX: &str = "tmp";
const DEFAULT_RETENTION: usize = 10;

/// Every document the application keeps in its data directory.
pub const DATA_FILES: &[&str] = &[
    "quotes.json",
    "settings.json",
    "projects.json",
    "clients.json",
    "materials.json",
    "printers.json",
    "tasks.json",
    "budgets.json",
    "transactions.json",
    "analytics.json",
    "user_preferences.json",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackupInfo {
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub files: Vec<String>,
    pub app_version: String,
}

/// Flat-file JSON storage rooted at the application data directory.
#[derive(Clone, Debug)]
pub struct JsonStorage {
    root: PathBuf,
    backups_dir: PathBuf,
    retention: usize,
}

impl JsonStorage {
    pub fn new(root: Option<PathBuf>, retention: Option<usize>) -> Result<Self> {
        let root = PathResolver::resolve_base(root);
        ensure_dir(&root)?;
        let backups_dir = PathResolver::backup_dir_in(&root);
        Ok(Self {
            root,
            backups_dir,
            retention: retention.unwrap_or(DEFAULT_RETENTION).max(1),
        })
    }

    pub fn new_default() -> Result<Self> {
        Self::new(None, None)
    }

    pub fn base_dir(&self) -> &Path {
        &self.root
    }

    pub fn backups_dir(&self) -> &Path {
        &self.backups_dir
    }

    /// Copies every existing data document into a new timestamped backup folder.
    pub fn backup_all(&self, note: Option<&str>) -> Result<BackupInfo> {
        ensure_dir(&self.backups_dir)?;
        let created_at = Utc::now();
        let mut name = format!(
            "{}_{}",
            BACKUP_PREFIX,
            created_at.format(BACKUP_TIMESTAMP_FORMAT)
        );
        if let Some(label) = sanitize_backup_note(note) {
            name.push('_');
            name.push_str(&label);
        }
        let name = self.unique_backup_name(name);
        let dir = self.backups_dir.join(&name);
        ensure_dir(&dir)?;

        let mut files = Vec::new();
        for file in DATA_FILES {
            let source = self.root.join(file);
            if source.exists() {
                fs::copy(&source, dir.join(file))?;
                files.push((*file).to_string());
            }
        }

        let info = BackupInfo {
            name,
            created_at,
            note: note.map(str::trim).filter(|n| !n.is_empty()).map(String::from),
            files,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
        };
        let json = serde_json::to_string_pretty(&info)?;
        write_atomic(&dir.join(BACKUP_INFO_FILE), &json)?;
        tracing::info!(backup = %info.name, files = info.files.len(), "backup created");
        self.prune_backups()?;
        Ok(info)
    }

    /// Lists backups, newest first. Folders without readable metadata are skipped.
    pub fn list_backups(&self) -> Result<Vec<BackupInfo>> {
        if !self.backups_dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.backups_dir)? {
            let path = entry?.path();
            if !path.is_dir() {
                continue;
            }
            let contents = match fs::read_to_string(path.join(BACKUP_INFO_FILE)) {
                Ok(value) => value,
                Err(_) => continue,
            };
            match serde_json::from_str::<BackupInfo>(&contents) {
                Ok(info) => entries.push(info),
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "unreadable backup metadata");
                }
            }
        }
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    /// Copies the documents of `backup_name` back over the live data directory.
    pub fn restore_backup(&self, backup_name: &str) -> Result<Vec<String>> {
        let dir = self.backups_dir.join(backup_name);
        let info_path = dir.join(BACKUP_INFO_FILE);
        if !info_path.exists() {
            return Err(QuoteError::StorageError(format!(
                "backup `{}` not found",
                backup_name
            )));
        }
        let info: BackupInfo = serde_json::from_str(&fs::read_to_string(&info_path)?)?;
        for file in &info.files {
            let contents = fs::read_to_string(dir.join(file))?;
            self.write(file, &contents)?;
        }
        tracing::info!(backup = backup_name, files = info.files.len(), "backup restored");
        Ok(info.files)
    }

    pub fn delete_backup(&self, backup_name: &str) -> Result<()> {
        let dir = self.backups_dir.join(backup_name);
        if !dir.join(BACKUP_INFO_FILE).exists() {
            return Err(QuoteError::StorageError(format!(
                "backup `{}` not found",
                backup_name
            )));
        }
        fs::remove_dir_all(dir)?;
        Ok(())
    }

    fn prune_backups(&self) -> Result<()> {
        let backups = self.list_backups()?;
        for stale in backups.iter().skip(self.retention) {
            let _ = fs::remove_dir_all(self.backups_dir.join(&stale.name));
        }
        Ok(())
    }

    fn unique_backup_name(&self, base: String) -> String {
        if !self.backups_dir.join(&base).exists() {
            return base;
        }
        let mut counter = 2;
        loop {
            let candidate = format!("{}_{}", base, counter);
            if !self.backups_dir.join(&candidate).exists() {
                return candidate;
            }
            counter += 1;
        }
    }
}

impl StorageBackend for JsonStorage {
    fn read(&self, file_name: &str) -> Result<Option<String>> {
        let path = self.location(file_name);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn write(&self, file_name: &str, contents: &str) -> Result<()> {
        replace_file(&self.location(file_name), contents)
    }

    fn location(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }
}

fn sanitize_backup_note(note: Option<&str>) -> Option<String> {
    let raw = note?.trim();
    let mut sanitized = String::new();
    let mut pending_dash = false;
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !sanitized.is_empty() {
                sanitized.push('-');
            }
            pending_dash = false;
            sanitized.push(ch.to_ascii_lowercase());
        } else if ch.is_whitespace() || matches!(ch, '-' | '.' | '_') {
            pending_dash = true;
        }
    }
    (!sanitized.is_empty()).then_some(sanitized)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

/// Writes `data` to a sibling temp file, then renames it over `path`.
pub(crate) fn replace_file(path: &Path, data: &str) -> Result<()> {
    let tmp = tmp_path(path);
    write_atomic(&tmp, data)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn write_atomic(path: &Path, data: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn storage_with_temp_dir(retention: usize) -> (JsonStorage, TempDir) {
        let temp = TempDir::new().expect("temp dir");
        let storage = JsonStorage::new(Some(temp.path().to_path_buf()), Some(retention))
            .expect("json storage");
        (storage, temp)
    }

    #[test]
    fn missing_document_reads_as_none() {
        let (storage, _guard) = storage_with_temp_dir(3);
        assert!(storage.read("quotes.json").expect("read").is_none());
    }

    #[test]
    fn write_replaces_document_and_leaves_no_tmp_file() {
        let (storage, guard) = storage_with_temp_dir(3);
        storage.write("quotes.json", "[1]").expect("first write");
        storage.write("quotes.json", "[2]").expect("second write");
        assert_eq!(
            storage.read("quotes.json").expect("read").as_deref(),
            Some("[2]")
        );
        assert!(!guard.path().join("quotes.json.tmp").exists());
    }

    #[test]
    fn backup_and_restore_roundtrip() {
        let (storage, _guard) = storage_with_temp_dir(3);
        storage.write("clients.json", "[\"before\"]").expect("write");
        let info = storage.backup_all(Some("Before Import")).expect("backup");
        assert!(info.name.ends_with("_before-import"));
        assert_eq!(info.files, vec!["clients.json".to_string()]);

        storage.write("clients.json", "[\"after\"]").expect("overwrite");
        let restored = storage.restore_backup(&info.name).expect("restore");
        assert_eq!(restored, vec!["clients.json".to_string()]);
        assert_eq!(
            storage.read("clients.json").expect("read").as_deref(),
            Some("[\"before\"]")
        );
    }

    #[test]
    fn retention_prunes_oldest_backups() {
        let (storage, _guard) = storage_with_temp_dir(2);
        storage.write("tasks.json", "[]").expect("write");
        let first = storage.backup_all(None).expect("first");
        storage.backup_all(None).expect("second");
        storage.backup_all(None).expect("third");
        let backups = storage.list_backups().expect("list");
        assert_eq!(backups.len(), 2);
        assert!(backups.iter().all(|info| info.name != first.name));
        assert!(backups[0].created_at >= backups[1].created_at);
    }

    #[test]
    fn restoring_unknown_backup_fails() {
        let (storage, _guard) = storage_with_temp_dir(2);
        let err = storage.restore_backup("missing").expect_err("should fail");
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn sanitize_note_collapses_separators() {
        assert_eq!(
            sanitize_backup_note(Some("  Month end... v2 ")),
            Some("month-end-v2".to_string())
        );
        assert_eq!(sanitize_backup_note(Some("   ")), None);
    }
}
