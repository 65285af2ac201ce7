//! Local storage adapter.
//!
//! Values are stored verbatim. An expiry is a sibling item `<key>_exp`
//! holding a GMT date string; an item without a sibling never expires.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use error_stack::Report;

use crate::clock::Clock;
use crate::constants::{EXPIRY_SUFFIX, GMT_DATE_FORMAT};
use crate::error::PubcidError;

use super::StorageAdapter;

/// Raw item API of a local storage area.
pub trait LocalStore: Send + Sync {
    fn is_available(&self) -> bool;

    /// # Errors
    ///
    /// Returns an error if the storage area cannot be read.
    fn get_item(&self, key: &str) -> Result<Option<String>, Report<PubcidError>>;

    /// # Errors
    ///
    /// Returns an error if the storage area rejects the write (quota, disabled).
    fn set_item(&self, key: &str, value: &str) -> Result<(), Report<PubcidError>>;

    /// # Errors
    ///
    /// Returns an error if the storage area cannot be modified.
    fn remove_item(&self, key: &str) -> Result<(), Report<PubcidError>>;
}

#[derive(Clone)]
pub struct LocalStorage {
    store: Arc<dyn LocalStore>,
    clock: Arc<dyn Clock>,
}

impl LocalStorage {
    #[must_use]
    pub fn new(store: Arc<dyn LocalStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    fn expiry_key(key: &str) -> String {
        format!("{key}{EXPIRY_SUFFIX}")
    }

    fn try_set(
        &self,
        key: &str,
        value: &str,
        expiry_minutes: Option<i64>,
    ) -> Result<(), Report<PubcidError>> {
        let expires = expiry_minutes
            .map(|minutes| expires_at(self.clock.now(), minutes))
            .transpose()?;

        self.store.set_item(key, value)?;
        let expiry_key = Self::expiry_key(key);
        match expires {
            Some(expires) => {
                let written = self
                    .store
                    .set_item(&expiry_key, &expires.format(GMT_DATE_FORMAT).to_string());
                if written.is_err() {
                    self.store.remove_item(key)?;
                }
                written
            }
            None => self.store.remove_item(&expiry_key),
        }
    }

    fn try_get(&self, key: &str) -> Result<Option<String>, Report<PubcidError>> {
        let Some(expires) = self.store.get_item(&Self::expiry_key(key))? else {
            return self.store.get_item(key);
        };

        match parse_expiry(&expires) {
            Some(at) if at > self.clock.now() => self.store.get_item(key),
            _ => {
                log::debug!("Local storage item '{}' expired at '{}'", key, expires);
                self.try_remove(key)?;
                Ok(None)
            }
        }
    }

    fn try_remove(&self, key: &str) -> Result<(), Report<PubcidError>> {
        self.store.remove_item(key)?;
        self.store.remove_item(&Self::expiry_key(key))
    }
}

impl StorageAdapter for LocalStorage {
    fn is_available(&self) -> bool {
        self.store.is_available()
    }

    fn set(&self, key: &str, value: &str, expiry_minutes: Option<i64>) {
        if let Err(e) = self.try_set(key, value, expiry_minutes) {
            log::warn!("Failed to write local storage item '{}': {:?}", key, e);
        }
    }

    fn get(&self, key: &str) -> Option<String> {
        self.try_get(key).unwrap_or_else(|e| {
            log::warn!("Failed to read local storage item '{}': {:?}", key, e);
            None
        })
    }

    fn remove(&self, key: &str) {
        if let Err(e) = self.try_remove(key) {
            log::warn!("Failed to remove local storage item '{}': {:?}", key, e);
        }
    }
}

/// `now + minutes`, capped at the last second a GMT date string can carry.
///
/// Years past 9999 would format with a sign and never parse back.
pub(crate) fn expires_at(
    now: DateTime<Utc>,
    minutes: i64,
) -> Result<DateTime<Utc>, Report<PubcidError>> {
    let latest = latest_expiry();
    match Duration::try_minutes(minutes).and_then(|delta| now.checked_add_signed(delta)) {
        Some(expires) => Ok(expires.min(latest)),
        None if minutes > 0 => Ok(latest),
        None => Err(Report::new(PubcidError::Storage {
            message: format!("expiry of {minutes} minutes is out of range"),
        })),
    }
}

fn latest_expiry() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(9999, 12, 31)
        .and_then(|date| date.and_hms_opt(23, 59, 59))
        .map_or(DateTime::<Utc>::MAX_UTC, |latest| latest.and_utc())
}

/// Accepts the GMT form we write as well as RFC 3339.
fn parse_expiry(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// In-memory local storage area.
///
/// `quota_bytes` bounds the summed length of keys and values, mirroring
/// the browser's `QuotaExceededError`.
#[derive(Debug, Default)]
pub struct MemoryLocalStore {
    items: Mutex<BTreeMap<String, String>>,
    disabled: bool,
    quota_bytes: Option<usize>,
}

impl MemoryLocalStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_items(items: BTreeMap<String, String>) -> Self {
        Self {
            items: Mutex::new(items),
            ..Self::default()
        }
    }

    /// A store whose every access fails, like a browser with storage blocked.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            disabled: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_quota(mut self, quota_bytes: usize) -> Self {
        self.quota_bytes = Some(quota_bytes);
        self
    }

    /// Snapshot of the stored items.
    #[must_use]
    pub fn items(&self) -> BTreeMap<String, String> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_enabled(&self) -> Result<(), Report<PubcidError>> {
        if self.disabled {
            return Err(Report::new(PubcidError::Storage {
                message: "local storage is disabled".to_string(),
            }));
        }
        Ok(())
    }
}

impl LocalStore for MemoryLocalStore {
    fn is_available(&self) -> bool {
        !self.disabled
    }

    fn get_item(&self, key: &str) -> Result<Option<String>, Report<PubcidError>> {
        self.ensure_enabled()?;
        Ok(self.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), Report<PubcidError>> {
        self.ensure_enabled()?;
        let mut items = self.lock();

        if let Some(quota) = self.quota_bytes {
            let used: usize = items
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if used + key.len() + value.len() > quota {
                return Err(Report::new(PubcidError::Storage {
                    message: format!("quota of {quota} bytes exceeded writing '{key}'"),
                }));
            }
        }

        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), Report<PubcidError>> {
        self.ensure_enabled()?;
        self.lock().remove(key);
        Ok(())
    }
}
