use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use cookie::Cookie;
use error_stack::{Report, ResultExt};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::constants::GMT_DATE_FORMAT;
use crate::error::PubcidError;

use super::local::expires_at;
use super::StorageAdapter;

const EXPIRED_DATE: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

/// The page's `document.cookie` accessor.
pub trait DocumentCookie: Send + Sync {
    fn cookies_enabled(&self) -> bool;

    /// Returns the `name=value; name2=value2` view of the visible cookies.
    ///
    /// # Errors
    ///
    /// Returns an error if the cookie jar cannot be read.
    fn read(&self) -> Result<String, Report<PubcidError>>;

    /// Applies a single `Set-Cookie`-style assignment.
    ///
    /// # Errors
    ///
    /// Returns an error if the assignment is rejected.
    fn write(&self, cookie: &str) -> Result<(), Report<PubcidError>>;
}

#[derive(Clone)]
pub struct CookieStorage {
    document: Arc<dyn DocumentCookie>,
    clock: Arc<dyn Clock>,
}

impl CookieStorage {
    #[must_use]
    pub fn new(document: Arc<dyn DocumentCookie>, clock: Arc<dyn Clock>) -> Self {
        Self { document, clock }
    }

    fn try_set(
        &self,
        name: &str,
        value: &str,
        expiry_minutes: Option<i64>,
    ) -> Result<(), Report<PubcidError>> {
        let mut cookie = format!("{}={}; path=/", name, urlencoding::encode(value));
        if let Some(minutes) = expiry_minutes {
            let expires = expires_at(self.clock.now(), minutes)?;
            cookie.push_str(&format!("; expires={}", expires.format(GMT_DATE_FORMAT)));
        }
        self.document.write(&cookie)
    }

    fn try_get(&self, name: &str) -> Result<Option<String>, Report<PubcidError>> {
        let header = self.document.read()?;
        Ok(find_cookie(&header, name))
    }
}

impl StorageAdapter for CookieStorage {
    fn is_available(&self) -> bool {
        self.document.cookies_enabled()
    }

    fn set(&self, key: &str, value: &str, expiry_minutes: Option<i64>) {
        if let Err(e) = self.try_set(key, value, expiry_minutes) {
            log::warn!("Failed to write cookie '{}': {:?}", key, e);
        }
    }

    fn get(&self, key: &str) -> Option<String> {
        self.try_get(key).unwrap_or_else(|e| {
            log::warn!("Failed to read cookie '{}': {:?}", key, e);
            None
        })
    }

    fn remove(&self, key: &str) {
        let cookie = format!("{key}=; path=/; expires={EXPIRED_DATE}");
        if let Err(e) = self.document.write(&cookie) {
            log::warn!("Failed to remove cookie '{}': {:?}", key, e);
        }
    }
}

/// First cookie called `name` in a `document.cookie` string, url-decoded.
fn find_cookie(header: &str, name: &str) -> Option<String> {
    if name.is_empty() || header.trim().is_empty() {
        return None;
    }

    let cookie = Cookie::split_parse(header.trim())
        .filter_map(Result::ok)
        .find(|c| c.name() == name)?;

    match urlencoding::decode(cookie.value()) {
        Ok(decoded) => Some(decoded.into_owned()),
        Err(e) => {
            log::warn!("Cookie '{}' is not valid percent-encoded UTF-8: {}", name, e);
            Some(cookie.value().to_string())
        }
    }
}

/// A cookie held by [`MemoryCookieJar`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
}

/// In-memory cookie jar with browser expiry semantics.
///
/// Writes are parsed as `Set-Cookie` strings; `max-age` wins over `expires`
/// and a cookie whose expiry is not in the future is deleted. Expired
/// cookies disappear from reads.
pub struct MemoryCookieJar {
    cookies: Mutex<BTreeMap<String, StoredCookie>>,
    enabled: AtomicBool,
    clock: Arc<dyn Clock>,
}

impl MemoryCookieJar {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::from_entries(BTreeMap::new(), clock)
    }

    #[must_use]
    pub fn from_entries(entries: BTreeMap<String, StoredCookie>, clock: Arc<dyn Clock>) -> Self {
        Self {
            cookies: Mutex::new(entries),
            enabled: AtomicBool::new(true),
            clock,
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Unexpired cookies.
    #[must_use]
    pub fn entries(&self) -> BTreeMap<String, StoredCookie> {
        let now = self.clock.now();
        let mut cookies = self.lock();
        cookies.retain(|_, c| c.expires.map_or(true, |at| at > now));
        cookies.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, StoredCookie>> {
        self.cookies.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_enabled(&self) -> Result<(), Report<PubcidError>> {
        if !self.cookies_enabled() {
            return Err(Report::new(PubcidError::Storage {
                message: "cookies are disabled".to_string(),
            }));
        }
        Ok(())
    }
}

impl DocumentCookie for MemoryCookieJar {
    fn cookies_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    fn read(&self) -> Result<String, Report<PubcidError>> {
        self.ensure_enabled()?;
        Ok(self
            .entries()
            .iter()
            .map(|(name, c)| format!("{}={}", name, c.value))
            .collect::<Vec<_>>()
            .join("; "))
    }

    fn write(&self, cookie: &str) -> Result<(), Report<PubcidError>> {
        self.ensure_enabled()?;

        let parsed = Cookie::parse(cookie).change_context(PubcidError::Storage {
            message: format!("invalid cookie assignment '{cookie}'"),
        })?;

        let expires = match parsed.max_age() {
            Some(max_age) => Duration::try_seconds(max_age.whole_seconds())
                .and_then(|delta| self.clock.now().checked_add_signed(delta)),
            None => parsed
                .expires_datetime()
                .and_then(|at| DateTime::from_timestamp(at.unix_timestamp(), 0)),
        };

        let mut cookies = self.lock();
        if expires.is_some_and(|at| at <= self.clock.now()) {
            cookies.remove(parsed.name());
        } else {
            cookies.insert(
                parsed.name().to_string(),
                StoredCookie {
                    value: parsed.value().to_string(),
                    expires,
                },
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::tests::{test_clock, TestBrowser};

    /// Records raw assignments instead of applying them.
    #[derive(Default)]
    struct RecordingDocument {
        writes: Mutex<Vec<String>>,
    }

    impl DocumentCookie for RecordingDocument {
        fn cookies_enabled(&self) -> bool {
            true
        }

        fn read(&self) -> Result<String, Report<PubcidError>> {
            Ok(String::new())
        }

        fn write(&self, cookie: &str) -> Result<(), Report<PubcidError>> {
            self.writes
                .lock()
                .expect("writes lock")
                .push(cookie.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_cookie_assignment_strings() {
        let document = Arc::new(RecordingDocument::default());
        let cookies = CookieStorage::new(document.clone(), Arc::new(test_clock()));

        cookies.set("_pubcid", "a b/c", Some(60));
        cookies.set("session", "1", None);
        cookies.remove("_pubcid");

        assert_eq!(
            *document.writes.lock().expect("writes lock"),
            vec![
                "_pubcid=a%20b%2Fc; path=/; expires=Thu, 01 Oct 2026 13:00:00 GMT".to_string(),
                "session=1; path=/".to_string(),
                "_pubcid=; path=/; expires=Thu, 01 Jan 1970 00:00:00 GMT".to_string(),
            ]
        );
    }

    #[test]
    fn test_set_writes_path_and_expires() {
        let browser = TestBrowser::new();
        let storage = browser.storage();

        storage.cookies().set("_pubcid", "a b/c", Some(60));

        let entries = browser.cookie_jar.entries();
        let stored = entries.get("_pubcid").expect("cookie should be stored");
        assert_eq!(stored.value, "a%20b%2Fc");
        assert_eq!(
            stored.expires,
            Some(browser.clock.now() + Duration::minutes(60))
        );
    }

    #[test]
    fn test_set_then_get_decodes_value() {
        let browser = TestBrowser::new();
        let storage = browser.storage();

        storage.cookies().set("_pubcid", "a b/c", Some(60));
        assert_eq!(storage.cookies().get("_pubcid").as_deref(), Some("a b/c"));
    }

    #[test]
    fn test_cookie_expires_with_clock() {
        let browser = TestBrowser::new();
        let storage = browser.storage();

        storage.cookies().set("_pubcid", "abc", Some(5));
        browser.clock.advance(Duration::minutes(6));

        assert_eq!(storage.cookies().get("_pubcid"), None);
        assert!(browser.cookie_jar.entries().is_empty());
    }

    #[test]
    fn test_past_expiry_deletes_cookie() {
        let browser = TestBrowser::new();
        let storage = browser.storage();

        storage.cookies().set("_pubcid", "abc", Some(60));
        storage.cookies().set("_pubcid", "abc", Some(-60));
        assert_eq!(storage.cookies().get("_pubcid"), None);
    }

    #[test]
    fn test_session_cookie_without_expiry() {
        let browser = TestBrowser::new();
        let storage = browser.storage();

        storage.cookies().set("session", "1", None);
        browser.clock.advance(Duration::days(3650));
        assert_eq!(storage.cookies().get("session").as_deref(), Some("1"));
    }

    #[test]
    fn test_remove_expires_cookie() {
        let browser = TestBrowser::new();
        let storage = browser.storage();

        storage.cookies().set("_pubcid", "abc", Some(60));
        storage.cookies().remove("_pubcid");
        assert_eq!(storage.cookies().get("_pubcid"), None);
    }

    #[test]
    fn test_disabled_cookies_degrade_to_absent() {
        let browser = TestBrowser::new();
        browser.cookie_jar.set_enabled(false);
        let storage = browser.storage();

        assert!(!storage.cookies().is_available());
        storage.cookies().set("_pubcid", "abc", Some(60));
        assert_eq!(storage.cookies().get("_pubcid"), None);
    }

    #[test]
    fn test_max_age_wins_over_expires() {
        let jar = MemoryCookieJar::new(Arc::new(test_clock()));
        jar.write("a=1; max-age=0; expires=Tue, 19 Oct 2027 10:00:00 GMT")
            .expect("write should succeed");
        assert!(jar.entries().is_empty());
    }

    #[test]
    fn test_find_cookie() {
        assert_eq!(
            find_cookie("c1=v1; _pubcid=abc; c2=v2", "_pubcid").as_deref(),
            Some("abc")
        );
        assert_eq!(
            find_cookie("c1=v1;_pubcid = abc", "_pubcid").as_deref(),
            Some("abc")
        );
        assert_eq!(find_cookie("c1=v1", "_pubcid"), None);
        assert_eq!(find_cookie("", "_pubcid"), None);
        assert_eq!(find_cookie("_pubcid=abc", ""), None);
    }

    #[test]
    fn test_find_cookie_does_not_match_prefix() {
        assert_eq!(find_cookie("_pubcid_optout=1", "_pubcid"), None);
    }

    #[test]
    fn test_find_cookie_keeps_undecodable_value() {
        assert_eq!(find_cookie("k=%FF", "k").as_deref(), Some("%FF"));
    }

    #[test]
    fn test_read_joins_cookies() {
        let jar = MemoryCookieJar::new(Arc::new(test_clock()));
        jar.write("b=2; path=/").expect("write should succeed");
        jar.write("a=1; path=/").expect("write should succeed");
        assert_eq!(jar.read().expect("read should succeed"), "a=1; b=2");
    }
}
