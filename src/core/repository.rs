//! Load-all/save-all collection of one entity type mirrored to a single JSON document.
//!
//! The repository owns the authoritative in-memory list. Every mutation rewrites the
//! whole document; a failed write is reported but the in-memory change is kept and
//! never retried. Reads never touch the disk except through [`Repository::reload`].

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use crate::core::errors::{QuoteError, Result};
use crate::domain::common::matches_query;
use crate::storage::StorageBackend;

/// A persisted domain object.
pub trait Entity: Clone + Serialize + DeserializeOwned {
    /// Document holding the whole collection.
    const FILE_NAME: &'static str;
    /// Human label used in messages and logs.
    const KIND: &'static str;
    /// Typed partial update accepted by [`Repository::update`].
    type Patch;

    fn id(&self) -> Uuid;

    /// Refreshes `updated_at`.
    fn touch(&mut self);

    /// Case-insensitive uniqueness key, for types that enforce one.
    fn natural_key(&self) -> Option<&str> {
        None
    }

    /// Text fields consulted by [`Repository::search`].
    fn search_fields(&self) -> Vec<&str>;

    fn apply_patch(&mut self, patch: Self::Patch);
}

pub struct Repository<T: Entity> {
    storage: Arc<dyn StorageBackend>,
    items: Vec<T>,
}

impl<T: Entity> Repository<T> {
    /// Reads the backing document. Missing, empty, or unreadable documents yield an
    /// empty collection.
    pub fn open(storage: Arc<dyn StorageBackend>) -> Self {
        let items = load_items::<T>(storage.as_ref());
        Self { storage, items }
    }

    /// Discards the in-memory list and re-reads the backing document.
    pub fn reload(&mut self) {
        self.items = load_items::<T>(self.storage.as_ref());
    }

    pub fn all(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    /// Looks an entity up by its natural key, ignoring case and surrounding whitespace.
    pub fn find_by_key(&self, key: &str) -> Option<&T> {
        let wanted = normalize_key(key);
        self.items
            .iter()
            .find(|item| item.natural_key().map(normalize_key).as_deref() == Some(wanted.as_str()))
    }

    pub fn filter<P>(&self, predicate: P) -> Vec<&T>
    where
        P: Fn(&T) -> bool,
    {
        self.items.iter().filter(|item| predicate(item)).collect()
    }

    pub fn search(&self, query: &str) -> Vec<&T> {
        self.items
            .iter()
            .filter(|item| matches_query(&item.search_fields(), query))
            .collect()
    }

    pub fn insert(&mut self, entity: T) -> Result<&T> {
        self.ensure_unique(&entity, None)?;
        tracing::debug!(kind = T::KIND, id = %entity.id(), "inserting entity");
        self.items.push(entity);
        self.persist()?;
        let index = self.items.len() - 1;
        Ok(&self.items[index])
    }

    /// Inserts every entity whose natural key is free, persisting once.
    /// Returns how many were added.
    pub fn insert_many(&mut self, entities: Vec<T>) -> Result<usize> {
        let mut added = 0;
        for entity in entities {
            if self.ensure_unique(&entity, None).is_err() {
                tracing::warn!(
                    kind = T::KIND,
                    key = entity.natural_key().unwrap_or_default(),
                    "skipping duplicate entity"
                );
                continue;
            }
            self.items.push(entity);
            added += 1;
        }
        if added > 0 {
            self.persist()?;
        }
        Ok(added)
    }

    pub fn update(&mut self, id: Uuid, patch: T::Patch) -> Result<&T> {
        self.modify(id, |entity| {
            entity.apply_patch(patch);
            Ok(())
        })?;
        self.get(id).ok_or_else(|| QuoteError::not_found(T::KIND, id))
    }

    /// Applies `change` to a copy of the entity. The copy replaces the stored entity
    /// only when `change` succeeds and the natural key stays unique.
    pub fn modify<R, F>(&mut self, id: Uuid, change: F) -> Result<R>
    where
        F: FnOnce(&mut T) -> Result<R>,
    {
        let index = self.position(id)?;
        let mut draft = self.items[index].clone();
        let outcome = change(&mut draft)?;
        self.ensure_unique(&draft, Some(id))?;
        draft.touch();
        self.items[index] = draft;
        tracing::debug!(kind = T::KIND, id = %id, "entity updated");
        self.persist()?;
        Ok(outcome)
    }

    pub fn delete(&mut self, id: Uuid) -> Result<T> {
        let index = self.position(id)?;
        let removed = self.items.remove(index);
        tracing::debug!(kind = T::KIND, id = %id, "entity deleted");
        self.persist()?;
        Ok(removed)
    }

    /// Rewrites the whole backing document from the in-memory list.
    pub fn persist(&self) -> Result<()> {
        let outcome = serde_json::to_string_pretty(&self.items)
            .map_err(QuoteError::from)
            .and_then(|json| self.storage.write(T::FILE_NAME, &json));
        outcome.map_err(|err| {
            tracing::error!(file = T::FILE_NAME, error = %err, "error saving collection");
            QuoteError::StorageError(format!("error saving {}: {}", T::FILE_NAME, err))
        })
    }

    fn position(&self, id: Uuid) -> Result<usize> {
        self.items
            .iter()
            .position(|item| item.id() == id)
            .ok_or_else(|| QuoteError::not_found(T::KIND, id))
    }

    fn ensure_unique(&self, candidate: &T, exclude: Option<Uuid>) -> Result<()> {
        let Some(key) = candidate.natural_key() else {
            return Ok(());
        };
        let normalized = normalize_key(key);
        let duplicate = self.items.iter().any(|item| {
            exclude.map_or(true, |id| item.id() != id)
                && item.natural_key().map(normalize_key).as_deref() == Some(normalized.as_str())
        });
        if duplicate {
            Err(QuoteError::already_exists(T::KIND, key.trim()))
        } else {
            Ok(())
        }
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

fn load_items<T: Entity>(storage: &dyn StorageBackend) -> Vec<T> {
    let raw = match storage.read(T::FILE_NAME) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(err) => {
            tracing::warn!(file = T::FILE_NAME, error = %err, "could not read collection");
            return Vec::new();
        }
    };
    if raw.trim().is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<Vec<T>>(&raw) {
        Ok(items) => {
            tracing::debug!(file = T::FILE_NAME, count = items.len(), "collection loaded");
            items
        }
        Err(err) => {
            tracing::warn!(
                file = T::FILE_NAME,
                error = %err,
                "malformed collection, starting empty"
            );
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Client, ClientPatch, Material};
    use crate::storage::JsonStorage;
    use std::{fs, path::PathBuf};
    use tempfile::TempDir;

    fn storage_in_temp_dir() -> (Arc<dyn StorageBackend>, TempDir) {
        let temp = TempDir::new().expect("temp dir");
        let storage =
            JsonStorage::new(Some(temp.path().to_path_buf()), None).expect("json storage");
        (Arc::new(storage), temp)
    }

    struct ReadOnlyStorage;

    impl StorageBackend for ReadOnlyStorage {
        fn read(&self, _file_name: &str) -> Result<Option<String>> {
            Ok(None)
        }

        fn write(&self, _file_name: &str, _contents: &str) -> Result<()> {
            Err(QuoteError::StorageError("disk is read-only".into()))
        }

        fn location(&self, file_name: &str) -> PathBuf {
            PathBuf::from(file_name)
        }
    }

    #[test]
    fn saved_entity_survives_reload_unchanged() {
        let (storage, _guard) = storage_in_temp_dir();
        let mut repo: Repository<Material> = Repository::open(storage.clone());
        let mut material = Material::new("PLA Premium", "PLA", 25.0);
        material.stock_quantity = 3.5;
        material.notes = "matte black".into();
        let saved = repo.insert(material).expect("insert").clone();

        let reopened: Repository<Material> = Repository::open(storage);
        assert_eq!(reopened.get(saved.id), Some(&saved));
    }

    #[test]
    fn malformed_document_falls_back_to_empty() {
        let (storage, guard) = storage_in_temp_dir();
        fs::write(guard.path().join("clients.json"), "{ not json").expect("write garbage");
        let repo: Repository<Client> = Repository::open(storage);
        assert!(repo.is_empty());
    }

    #[test]
    fn duplicate_natural_key_is_rejected_case_insensitively() {
        let (storage, _guard) = storage_in_temp_dir();
        let mut repo: Repository<Client> = Repository::open(storage);
        repo.insert(Client::new("Acme")).expect("first insert");
        let err = repo.insert(Client::new("  ACME ")).expect_err("duplicate");
        assert!(err.to_string().contains("already exists"));
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn deleting_unknown_id_leaves_document_untouched() {
        let (storage, guard) = storage_in_temp_dir();
        let mut repo: Repository<Client> = Repository::open(storage);
        repo.insert(Client::new("Keep Me")).expect("insert");
        let path = guard.path().join("clients.json");
        let before = fs::read_to_string(&path).expect("read before");

        let err = repo.delete(Uuid::new_v4()).expect_err("unknown id");
        assert!(err.to_string().contains("not found"));
        assert_eq!(fs::read_to_string(&path).expect("read after"), before);
    }

    #[test]
    fn update_refreshes_timestamp_and_keeps_id() {
        let (storage, _guard) = storage_in_temp_dir();
        let mut repo: Repository<Client> = Repository::open(storage);
        let created = repo.insert(Client::new("Studio")).expect("insert").clone();
        let patch = ClientPatch {
            email: Some("hi@studio.test".into()),
            ..ClientPatch::default()
        };
        let updated = repo.update(created.id, patch).expect("update");
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.email, "hi@studio.test");
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(updated.created_at, created.created_at);
    }

    #[test]
    fn rename_onto_existing_key_is_rejected() {
        let (storage, _guard) = storage_in_temp_dir();
        let mut repo: Repository<Client> = Repository::open(storage);
        repo.insert(Client::new("Alpha")).expect("alpha");
        let beta = repo.insert(Client::new("Beta")).expect("beta").id;
        let patch = ClientPatch {
            name: Some("alpha".into()),
            ..ClientPatch::default()
        };
        assert!(repo.update(beta, patch).is_err());
        assert_eq!(repo.get(beta).map(|c| c.name.as_str()), Some("Beta"));
    }

    #[test]
    fn failed_save_keeps_in_memory_state() {
        let mut repo: Repository<Client> = Repository::open(Arc::new(ReadOnlyStorage));
        let err = repo.insert(Client::new("Offline")).expect_err("save fails");
        assert!(err.to_string().contains("error saving clients.json"));
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn search_matches_company_case_insensitively() {
        let (storage, _guard) = storage_in_temp_dir();
        let mut repo: Repository<Client> = Repository::open(storage);
        let mut client = Client::new("Juan");
        client.company = "Empresa XYZ S.A.".into();
        repo.insert(client).expect("insert");
        repo.insert(Client::new("Other")).expect("insert other");
        let found = repo.search("xyz");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Juan");
    }

    #[test]
    fn reload_picks_up_external_changes() {
        let (storage, _guard) = storage_in_temp_dir();
        let mut first: Repository<Client> = Repository::open(storage.clone());
        let mut second: Repository<Client> = Repository::open(storage);
        first.insert(Client::new("Written Elsewhere")).expect("insert");
        assert!(second.is_empty());
        second.reload();
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn rejected_modification_changes_nothing() {
        let (storage, _guard) = storage_in_temp_dir();
        let mut repo: Repository<Material> = Repository::open(storage);
        let id = repo
            .insert(Material::new("PETG", "PETG", 30.0))
            .expect("insert")
            .id;
        let result: Result<()> = repo.modify(id, |material| {
            material.stock_quantity = 99.0;
            Err(QuoteError::InvalidInput("nope".into()))
        });
        assert!(result.is_err());
        assert_eq!(repo.get(id).map(|m| m.stock_quantity), Some(0.0));
    }
}
