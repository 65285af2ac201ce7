//! Persisted browser state (cookies and local storage) between runs.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use pubcid_common::clock::Clock;
use pubcid_common::storage::{BrowserStorage, MemoryCookieJar, MemoryLocalStore, StoredCookie};
use serde::{Deserialize, Serialize};

use crate::error::CliError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserState {
    #[serde(default)]
    pub cookies: BTreeMap<String, StoredCookie>,
    #[serde(default)]
    pub local_storage: BTreeMap<String, String>,
}

impl BrowserState {
    /// Load the state file, starting empty when it does not exist yet.
    pub fn load(path: &Path) -> Result<Self, CliError> {
        if !path.exists() {
            log::debug!("No browser state at {}, starting empty", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            CliError::Document(format!("Invalid browser state {}: {}", path.display(), e))
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), CliError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Open the state as a live page.
    pub fn open(self, clock: Arc<dyn Clock>) -> Page {
        let cookie_jar = Arc::new(MemoryCookieJar::from_entries(self.cookies, clock.clone()));
        let local_store = Arc::new(MemoryLocalStore::from_items(self.local_storage));
        let storage = BrowserStorage::new(cookie_jar.clone(), local_store.clone(), clock);
        Page {
            cookie_jar,
            local_store,
            storage,
        }
    }
}

/// Storage backends for one emulated page load.
pub struct Page {
    cookie_jar: Arc<MemoryCookieJar>,
    local_store: Arc<MemoryLocalStore>,
    storage: BrowserStorage,
}

impl Page {
    pub fn storage(&self) -> &BrowserStorage {
        &self.storage
    }

    /// Snapshot of what the page left behind. Expired cookies are dropped.
    pub fn close(&self) -> BrowserState {
        BrowserState {
            cookies: self.cookie_jar.entries(),
            local_storage: self.local_store.items(),
        }
    }
}
