//! In-process storage backend.

use std::collections::HashMap;
use std::sync::Mutex;

use super::{SessionStore, StorageScope, StoreError};

/// Both scopes held in process memory.
///
/// Used directly in tests and as the ephemeral half of [`super::FileStore`].
/// An optional per-scope byte quota mimics browser storage limits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<(StorageScope, String), String>>,
    quota: Option<usize>,
}

impl MemoryStore {
    /// Create an empty, unbounded store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store whose scopes each hold at most `bytes` bytes of
    /// values.
    #[must_use]
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: Mutex::default(),
            quota: Some(bytes),
        }
    }

    fn used_bytes(
        entries: &HashMap<(StorageScope, String), String>,
        scope: StorageScope,
        excluding: &str,
    ) -> usize {
        entries
            .iter()
            .filter(|((s, k), _)| *s == scope && k != excluding)
            .map(|(_, v)| v.len())
            .sum()
    }
}

impl SessionStore for MemoryStore {
    fn read(&self, scope: StorageScope, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(&(scope, key.to_owned())).cloned())
    }

    fn write(&self, scope: StorageScope, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;

        if let Some(quota) = self.quota
            && Self::used_bytes(&entries, scope, key) + value.len() > quota
        {
            return Err(StoreError::QuotaExceeded {
                key: key.to_owned(),
                scope,
            });
        }

        entries.insert((scope, key.to_owned()), value.to_owned());
        Ok(())
    }

    fn remove(&self, scope: StorageScope, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.remove(&(scope, key.to_owned()));
        Ok(())
    }
}
