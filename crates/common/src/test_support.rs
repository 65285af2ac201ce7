#[cfg(test)]
pub mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};

    use crate::bid_request::BidRequestConfig;
    use crate::clock::ManualClock;
    use crate::settings::Settings;
    use crate::storage::{BrowserStorage, MemoryCookieJar, MemoryLocalStore};

    /// 2026-10-01 12:00:00 UTC.
    pub fn test_clock() -> ManualClock {
        ManualClock::new(
            Utc.with_ymd_and_hms(2026, 10, 1, 12, 0, 0)
                .single()
                .expect("valid test date"),
        )
    }

    /// A fresh page with empty cookies and local storage sharing one clock.
    pub struct TestBrowser {
        pub clock: Arc<ManualClock>,
        pub cookie_jar: Arc<MemoryCookieJar>,
        pub local_store: Arc<MemoryLocalStore>,
    }

    impl TestBrowser {
        pub fn new() -> Self {
            Self::with_local_store(MemoryLocalStore::new())
        }

        pub fn with_local_store(local_store: MemoryLocalStore) -> Self {
            let clock = Arc::new(test_clock());
            Self {
                cookie_jar: Arc::new(MemoryCookieJar::new(clock.clone())),
                local_store: Arc::new(local_store),
                clock,
            }
        }

        pub fn storage(&self) -> BrowserStorage {
            BrowserStorage::new(
                self.cookie_jar.clone(),
                self.local_store.clone(),
                self.clock.clone(),
            )
        }
    }

    pub fn crate_test_settings_str() -> String {
        r#"
            [pubcid]
            enable = true
            exp_interval = 1440
            type = "cookie"
            read_only = false

            [logging]
            level = "debug"
            "#
        .to_string()
    }

    pub fn create_test_settings() -> Settings {
        let toml_str = crate_test_settings_str();
        Settings::from_toml(&toml_str).expect("Invalid config")
    }

    /// Two ad units with three bids between them.
    pub fn create_test_bid_request() -> BidRequestConfig {
        serde_json::from_str(
            r#"{
                "timeout": 1000,
                "adUnits": [
                    {
                        "code": "header-banner",
                        "mediaTypes": { "banner": { "sizes": [[728, 90]] } },
                        "bids": [
                            { "bidder": "appnexus", "params": { "placementId": 13144370 } },
                            { "bidder": "rubicon", "params": { "accountId": 1001 },
                              "crumbs": { "src": "existing" } }
                        ]
                    },
                    {
                        "code": "sidebar",
                        "bids": [
                            { "bidder": "openx", "params": { "unit": "5391" } }
                        ]
                    }
                ]
            }"#,
        )
        .expect("valid test bid request")
    }
}
