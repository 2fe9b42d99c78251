//! Filesystem-backed storage.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::{MemoryStore, SessionStore, StorageScope, StoreError};

/// Durable scope on disk, ephemeral scope in memory.
///
/// Each durable key is one file under the storage directory. Writes go to a
/// sibling temp file that is renamed over the target, so a key is either the
/// old value or the new one, never a partial write.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    ephemeral: MemoryStore,
}

impl FileStore {
    /// Create a store rooted at `dir`. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ephemeral: MemoryStore::new(),
        }
    }

    /// Directory holding the durable scope.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    fn write_durable(&self, key: &str, value: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;

        let target = self.path_for(key);
        let staging = self.dir.join(format!(".{key}.tmp"));
        {
            let mut file = fs::File::create(&staging)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&staging, &target)?;
        Ok(())
    }
}

impl SessionStore for FileStore {
    fn read(&self, scope: StorageScope, key: &str) -> Result<Option<String>, StoreError> {
        match scope {
            StorageScope::Ephemeral => self.ephemeral.read(scope, key),
            StorageScope::Durable => match fs::read_to_string(self.path_for(key)) {
                Ok(value) => Ok(Some(value)),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            },
        }
    }

    fn write(&self, scope: StorageScope, key: &str, value: &str) -> Result<(), StoreError> {
        match scope {
            StorageScope::Ephemeral => self.ephemeral.write(scope, key, value),
            StorageScope::Durable => self.write_durable(key, value),
        }
    }

    fn remove(&self, scope: StorageScope, key: &str) -> Result<(), StoreError> {
        match scope {
            StorageScope::Ephemeral => self.ephemeral.remove(scope, key),
            StorageScope::Durable => match fs::remove_file(self.path_for(key)) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rental_desk_core::SessionToken;

    use super::*;
    use crate::store::{keys, test_support};

    #[test]
    fn test_durable_scope_survives_new_store() {
        let dir = tempfile::tempdir().unwrap();
        let user = test_support::customer();

        let store = FileStore::new(dir.path().join("session"));
        store.set_user(&user, StorageScope::Durable).unwrap();
        store
            .set_token(&SessionToken::new("tok"), StorageScope::Durable)
            .unwrap();
        drop(store);

        let reopened = FileStore::new(dir.path().join("session"));
        assert_eq!(reopened.get_user().unwrap(), Some(user));
        assert_eq!(reopened.get_token().unwrap().unwrap().expose(), "tok");
    }

    #[test]
    fn test_ephemeral_scope_does_not_survive_new_store() {
        let dir = tempfile::tempdir().unwrap();

        let store = FileStore::new(dir.path());
        store
            .set_token(&SessionToken::new("tok"), StorageScope::Ephemeral)
            .unwrap();
        assert!(store.get_token().unwrap().is_some());
        assert!(!dir.path().join(keys::TOKEN).exists());
        drop(store);

        let reopened = FileStore::new(dir.path());
        assert!(reopened.get_token().unwrap().is_none());
    }

    #[test]
    fn test_clear_removes_files_and_tolerates_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("never-created"));
        store.clear().unwrap();

        let store = FileStore::new(dir.path());
        store
            .set_token(&SessionToken::new("tok"), StorageScope::Durable)
            .unwrap();
        store.clear().unwrap();
        assert!(!dir.path().join(keys::TOKEN).exists());
        assert!(store.is_scope_empty(StorageScope::Durable).unwrap());
    }

    #[test]
    fn test_write_leaves_no_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store
            .set_token(&SessionToken::new("tok"), StorageScope::Durable)
            .unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec![keys::TOKEN.to_owned()]);
    }
}
