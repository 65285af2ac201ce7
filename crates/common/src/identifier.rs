//! Identifier read/write policy across the two storage backends.

use uuid::Uuid;

use crate::storage::{BrowserStorage, StorageAdapter, StorageType};

/// Generates a fresh publisher common id.
#[must_use]
pub fn generate_pubcid() -> String {
    Uuid::new_v4().to_string()
}

/// Reads `name` from the configured backend.
///
/// With local storage preferred the cookie is consulted when local storage
/// has nothing. Empty values and the stringified `"undefined"`/`"null"` are
/// treated as absent.
#[must_use]
pub fn read_value(storage: &BrowserStorage, backend: StorageType, name: &str) -> Option<String> {
    let value = match backend {
        StorageType::Cookie => storage.cookies().get(name),
        StorageType::Html5 => storage
            .local()
            .get(name)
            .filter(|v| !v.is_empty())
            .or_else(|| storage.cookies().get(name)),
    };

    value.filter(|v| !v.is_empty() && v != "undefined" && v != "null")
}

/// Writes `value` to the configured backend only.
pub fn write_value(
    storage: &BrowserStorage,
    backend: StorageType,
    name: &str,
    value: &str,
    expiry_minutes: i64,
) {
    if name.is_empty() || value.is_empty() {
        log::debug!("Skipping write of empty pubcid name or value");
        return;
    }
    storage.adapter(backend).set(name, value, Some(expiry_minutes));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryLocalStore;
    use crate::test_support::tests::TestBrowser;

    #[test]
    fn test_generate_pubcid_is_uuid_v4() {
        let id = generate_pubcid();
        let parsed = Uuid::parse_str(&id).expect("should be a uuid");
        assert_eq!(parsed.get_version_num(), 4);
        assert_ne!(id, generate_pubcid());
    }

    #[test]
    fn test_cookie_backend_reads_cookie_only() {
        let browser = TestBrowser::new();
        let storage = browser.storage();
        storage.local().set("_pubcid", "local-id", None);

        assert_eq!(read_value(&storage, StorageType::Cookie, "_pubcid"), None);

        storage.cookies().set("_pubcid", "cookie-id", Some(60));
        assert_eq!(
            read_value(&storage, StorageType::Cookie, "_pubcid").as_deref(),
            Some("cookie-id")
        );
    }

    #[test]
    fn test_html5_backend_prefers_local_storage() {
        let browser = TestBrowser::new();
        let storage = browser.storage();
        storage.local().set("_pubcid", "local-id", None);
        storage.cookies().set("_pubcid", "cookie-id", Some(60));

        assert_eq!(
            read_value(&storage, StorageType::Html5, "_pubcid").as_deref(),
            Some("local-id")
        );
    }

    #[test]
    fn test_html5_backend_falls_back_to_cookie() {
        let browser = TestBrowser::new();
        let storage = browser.storage();
        storage.cookies().set("_pubcid", "cookie-id", Some(60));

        assert_eq!(
            read_value(&storage, StorageType::Html5, "_pubcid").as_deref(),
            Some("cookie-id")
        );
    }

    #[test]
    fn test_html5_backend_falls_back_when_local_storage_blocked() {
        let browser = TestBrowser::with_local_store(MemoryLocalStore::disabled());
        let storage = browser.storage();
        storage.cookies().set("_pubcid", "cookie-id", Some(60));

        assert_eq!(
            read_value(&storage, StorageType::Html5, "_pubcid").as_deref(),
            Some("cookie-id")
        );
    }

    #[test]
    fn test_stringified_null_is_absent() {
        let browser = TestBrowser::new();
        let storage = browser.storage();

        storage.cookies().set("_pubcid", "undefined", Some(60));
        assert_eq!(read_value(&storage, StorageType::Cookie, "_pubcid"), None);

        storage.local().set("_pubcid", "null", None);
        storage.cookies().remove("_pubcid");
        assert_eq!(read_value(&storage, StorageType::Html5, "_pubcid"), None);
    }

    #[test]
    fn test_write_value_targets_single_backend() {
        let browser = TestBrowser::new();
        let storage = browser.storage();

        write_value(&storage, StorageType::Cookie, "_pubcid", "abc", 60);
        assert!(browser.cookie_jar.entries().contains_key("_pubcid"));
        assert!(browser.local_store.items().is_empty());

        write_value(&storage, StorageType::Html5, "_other", "def", 60);
        assert_eq!(
            browser.local_store.items().get("_other").map(String::as_str),
            Some("def")
        );
        assert!(!browser.cookie_jar.entries().contains_key("_other"));
    }

    #[test]
    fn test_write_value_ignores_empty() {
        let browser = TestBrowser::new();
        let storage = browser.storage();

        write_value(&storage, StorageType::Html5, "_pubcid", "", 60);
        write_value(&storage, StorageType::Html5, "", "abc", 60);
        assert!(browser.local_store.items().is_empty());
    }
}
