//! Key/value storage backends for the identifier.
//!
//! Two interchangeable adapters implement [`StorageAdapter`]:
//!
//! - [`cookie::CookieStorage`]: first-party cookies, expiry enforced by the jar
//! - [`local::LocalStorage`]: local storage, expiry kept in a `<key>_exp` sibling
//!
//! Both sit on top of a small trait describing the raw browser API
//! ([`cookie::DocumentCookie`], [`local::LocalStore`]) so the host decides what
//! actually backs them. Adapters swallow backend errors: they are logged and
//! reads degrade to `None`.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::clock::Clock;

pub mod cookie;
pub mod local;

pub use self::cookie::{CookieStorage, DocumentCookie, MemoryCookieJar, StoredCookie};
pub use self::local::{LocalStorage, LocalStore, MemoryLocalStore};

/// Contract shared by the cookie and local storage adapters.
pub trait StorageAdapter: Send + Sync {
    /// Capability check (cookies enabled / local storage reachable).
    fn is_available(&self) -> bool;

    /// Store `value` under `key`. When `expiry_minutes` is set the value
    /// expires that many minutes from now.
    fn set(&self, key: &str, value: &str, expiry_minutes: Option<i64>);

    /// Returns the value if present and unexpired.
    fn get(&self, key: &str) -> Option<String>;

    fn remove(&self, key: &str);
}

/// Storage backend names accepted in the `type` preference list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    Html5,
    Cookie,
}

impl StorageType {
    /// Parse a single entry of the preference list. Unknown names yield `None`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "html5" => Some(Self::Html5),
            "cookie" => Some(Self::Cookie),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Html5 => "html5",
            Self::Cookie => "cookie",
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two adapters available on a page.
#[derive(Clone)]
pub struct BrowserStorage {
    cookies: CookieStorage,
    local: LocalStorage,
}

impl BrowserStorage {
    #[must_use]
    pub fn new(
        document: Arc<dyn DocumentCookie>,
        local_store: Arc<dyn LocalStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            cookies: CookieStorage::new(document, clock.clone()),
            local: LocalStorage::new(local_store, clock),
        }
    }

    #[must_use]
    pub fn cookies(&self) -> &CookieStorage {
        &self.cookies
    }

    #[must_use]
    pub fn local(&self) -> &LocalStorage {
        &self.local
    }

    #[must_use]
    pub fn adapter(&self, kind: StorageType) -> &dyn StorageAdapter {
        match kind {
            StorageType::Html5 => &self.local,
            StorageType::Cookie => &self.cookies,
        }
    }

    #[must_use]
    pub fn is_available(&self, kind: StorageType) -> bool {
        self.adapter(kind).is_available()
    }
}

impl fmt::Debug for BrowserStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowserStorage")
            .field("cookies_enabled", &self.cookies.is_available())
            .field("local_storage_available", &self.local.is_available())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::tests::TestBrowser;

    #[test]
    fn test_storage_type_from_name() {
        assert_eq!(StorageType::from_name("html5"), Some(StorageType::Html5));
        assert_eq!(StorageType::from_name(" cookie "), Some(StorageType::Cookie));
        assert_eq!(StorageType::from_name("bogus"), None);
        assert_eq!(StorageType::from_name("HTML5"), None);
    }

    #[test]
    fn test_storage_type_display() {
        assert_eq!(StorageType::Html5.to_string(), "html5");
        assert_eq!(StorageType::Cookie.to_string(), "cookie");
    }

    #[test]
    fn test_adapter_selects_backend() {
        let browser = TestBrowser::new();
        let storage = browser.storage();

        storage.adapter(StorageType::Cookie).set("k", "from-cookie", None);
        storage.adapter(StorageType::Html5).set("k", "from-local", None);

        assert_eq!(storage.cookies().get("k").as_deref(), Some("from-cookie"));
        assert_eq!(storage.local().get("k").as_deref(), Some("from-local"));
    }

    #[test]
    fn test_availability_follows_backends() {
        let browser = TestBrowser::new();
        browser.cookie_jar.set_enabled(false);

        let storage = browser.storage();
        assert!(!storage.is_available(StorageType::Cookie));
        assert!(storage.is_available(StorageType::Html5));
    }
}
