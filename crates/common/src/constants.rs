/// Storage key holding the publisher common id.
pub const PUBCID_KEY: &str = "_pubcid";

/// Presence of this key in either backend disables pubcid for the browser.
pub const PUBCID_OPT_OUT_KEY: &str = "_pubcid_optout";

/// Suffix of the sibling key that stores a local storage expiry timestamp.
pub const EXPIRY_SUFFIX: &str = "_exp";

/// Configuration topic the module listens on.
pub const PUBCID_CONFIG_TOPIC: &str = "pubcid";

/// Key of the identifier inside a bid's `crumbs`.
pub const PUBCID_CRUMB: &str = "pubcid";

/// One year, in minutes.
pub const DEFAULT_EXPIRY_INTERVAL_MINUTES: i64 = 525_600;

pub const DEFAULT_STORAGE_TYPES: &str = "html5,cookie";

/// `strftime` pattern matching the browser's `Date.toUTCString()`.
pub const GMT_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";
