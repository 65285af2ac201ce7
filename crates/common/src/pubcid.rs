//! Publisher common id module.
//!
//! Wires the identifier policy into the host:
//!
//! 1. [`PubcidConfig::from_options`] turns raw `pubcid` options into a
//!    resolved configuration, choosing the first available storage backend.
//! 2. [`PubcidHook`] is the request-bids interceptor that reads, creates or
//!    refreshes the id and attaches it to every bid as `crumbs.pubcid`.
//! 3. [`init_pubcid`] subscribes the hook to configuration changes and
//!    registers it unless the browser has opted out.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::bid_request::BidRequestConfig;
use crate::constants::{
    DEFAULT_EXPIRY_INTERVAL_MINUTES, DEFAULT_STORAGE_TYPES, PUBCID_CONFIG_TOPIC, PUBCID_CRUMB,
    PUBCID_KEY, PUBCID_OPT_OUT_KEY,
};
use crate::hooks::{Continuation, RequestBidsHook};
use crate::host::Host;
use crate::identifier::{generate_pubcid, read_value, write_value};
use crate::storage::{BrowserStorage, StorageAdapter, StorageType};

const PUBCID_HOOK_NAME: &str = "pubcid";

/// Raw `pubcid` options as delivered by the host configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PubcidOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable: Option<bool>,
    #[serde(default, alias = "exp_interval", skip_serializing_if = "Option::is_none")]
    pub exp_interval: Option<ExpInterval>,
    /// Comma separated backend preference, e.g. `"html5,cookie"`. Values
    /// that are not strings are dropped so the default preference applies.
    #[serde(
        default,
        rename = "type",
        deserialize_with = "deserialize_storage_type",
        skip_serializing_if = "Option::is_none"
    )]
    #[validate(length(min = 1))]
    pub storage_type: Option<String>,
    #[serde(default, alias = "read_only", skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
}

/// Expiry interval in minutes, in whatever shape the page supplied it.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ExpInterval {
    Integer(i64),
    Float(f64),
    Text(String),
    /// Any other shape; resolves to the default interval.
    Other(Value),
}

impl ExpInterval {
    /// Integer value, parsed like `parseInt(value, 10)`.
    #[must_use]
    pub fn minutes(&self) -> Option<i64> {
        match self {
            Self::Integer(minutes) => Some(*minutes),
            #[allow(clippy::cast_possible_truncation)]
            Self::Float(minutes) if minutes.is_finite() => Some(minutes.trunc() as i64),
            Self::Float(_) => None,
            Self::Text(text) => parse_integer_prefix(text),
            Self::Other(_) => None,
        }
    }
}

fn deserialize_storage_type<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(types)) => Ok(Some(types)),
        Some(other) => {
            log::warn!(
                "Invalid pubcid type {}, using default of '{}'",
                other,
                DEFAULT_STORAGE_TYPES
            );
            Ok(None)
        }
    }
}

/// Leading optionally-signed decimal digits of `text`, ignoring leading
/// whitespace. `"90 minutes"` is 90; `"abc"` is `None`.
fn parse_integer_prefix(text: &str) -> Option<i64> {
    let trimmed = text.trim_start();
    let digits_start = usize::from(trimmed.starts_with(['+', '-']));
    let digits_len = trimmed[digits_start..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits_len == 0 {
        return None;
    }
    trimmed[..digits_start + digits_len].parse().ok()
}

/// Resolved module configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PubcidConfig {
    pub enabled: bool,
    /// Expiry interval in minutes.
    pub interval: i64,
    /// Backend picked from the preference list. `None` leaves the module inert.
    pub storage: Option<StorageType>,
    pub read_only: bool,
}

impl PubcidConfig {
    /// Apply defaults to `options` and resolve the storage backend against
    /// what `storage` reports as available.
    #[must_use]
    pub fn from_options(options: &PubcidOptions, storage: &BrowserStorage) -> Self {
        let interval = match &options.exp_interval {
            None => DEFAULT_EXPIRY_INTERVAL_MINUTES,
            Some(raw) => raw.minutes().unwrap_or_else(|| {
                log::warn!(
                    "Invalid pubcid expInterval {:?}, using default of {} minutes",
                    raw,
                    DEFAULT_EXPIRY_INTERVAL_MINUTES
                );
                DEFAULT_EXPIRY_INTERVAL_MINUTES
            }),
        };

        let preference = options
            .storage_type
            .as_deref()
            .unwrap_or(DEFAULT_STORAGE_TYPES);
        let backend = preference
            .split(',')
            .filter_map(StorageType::from_name)
            .find(|kind| storage.is_available(*kind));

        if backend.is_none() {
            log::warn!(
                "No usable pubcid storage in '{}', pubcid is inactive",
                preference
            );
        }

        Self {
            enabled: options.enable.unwrap_or(true),
            interval,
            storage: backend,
            read_only: options.read_only.unwrap_or(false),
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.enabled && self.storage.is_some()
    }
}

/// Page-level identifier source that takes precedence over storage.
pub trait PageIdProvider: Send + Sync {
    fn get_id(&self) -> Option<String>;
}

/// The request-bids interceptor.
///
/// [`init_pubcid`] shares it as an `Arc` between the pipeline and the
/// configuration subscription; `config` is swapped in place on updates.
pub struct PubcidHook {
    config: RwLock<PubcidConfig>,
    storage: BrowserStorage,
    page_id_provider: Option<Arc<dyn PageIdProvider>>,
    id_generator: fn() -> String,
}

impl PubcidHook {
    #[must_use]
    pub fn new(config: PubcidConfig, storage: BrowserStorage) -> Self {
        Self {
            config: RwLock::new(config),
            storage,
            page_id_provider: None,
            id_generator: generate_pubcid,
        }
    }

    #[must_use]
    pub fn with_page_id_provider(mut self, provider: Arc<dyn PageIdProvider>) -> Self {
        self.page_id_provider = Some(provider);
        self
    }

    #[must_use]
    pub fn with_id_generator(mut self, generator: fn() -> String) -> Self {
        self.id_generator = generator;
        self
    }

    #[must_use]
    pub fn config(&self) -> PubcidConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Re-run the configuration setter with new options.
    pub fn configure(&self, options: &PubcidOptions) {
        let resolved = PubcidConfig::from_options(options, &self.storage);
        log::debug!("Applying pubcid configuration {:?}", resolved);
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = resolved;
    }

    /// Current id under `config`: from the page provider when present,
    /// otherwise from storage, creating or refreshing it unless read-only.
    #[must_use]
    pub fn resolve_pubcid(&self, config: &PubcidConfig) -> Option<String> {
        if let Some(provider) = &self.page_id_provider {
            return provider.get_id().filter(|id| !id.is_empty());
        }

        let backend = config.storage?;
        let existing = read_value(&self.storage, backend, PUBCID_KEY);
        if config.read_only {
            return existing;
        }

        match existing {
            Some(id) => {
                write_value(&self.storage, backend, PUBCID_KEY, &id, config.interval);
                Some(id)
            }
            None => {
                let fresh = (self.id_generator)();
                log::debug!("Generated new pubcid {}", fresh);
                write_value(&self.storage, backend, PUBCID_KEY, &fresh, config.interval);
                let confirmed = read_value(&self.storage, backend, PUBCID_KEY);
                if confirmed.is_none() {
                    log::warn!("New pubcid could not be persisted to {}", backend);
                }
                confirmed
            }
        }
    }

    /// Attach the id to every bid of `request`. Returns the id used.
    pub fn decorate(&self, request: &mut BidRequestConfig) -> Option<String> {
        let config = self.config();
        if !config.is_active() {
            return None;
        }

        let pubcid = self.resolve_pubcid(&config)?;
        for bid in request.bids_mut() {
            bid.set_crumb(PUBCID_CRUMB, pubcid.clone());
        }
        Some(pubcid)
    }
}

impl fmt::Debug for PubcidHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PubcidHook")
            .field("config", &self.config())
            .field("storage", &self.storage)
            .field("page_id_provider", &self.page_id_provider.is_some())
            .finish()
    }
}

impl<T> RequestBidsHook<T> for PubcidHook {
    fn hook_name(&self) -> &'static str {
        PUBCID_HOOK_NAME
    }

    fn call(&self, request: &mut BidRequestConfig, next: Continuation<'_, T>) -> T {
        self.decorate(request);
        next(request)
    }
}

/// Whether either available backend carries the opt-out marker.
#[must_use]
pub fn is_opted_out(storage: &BrowserStorage) -> bool {
    has_opt_out_marker(storage.cookies()) || has_opt_out_marker(storage.local())
}

fn has_opt_out_marker(adapter: &dyn StorageAdapter) -> bool {
    adapter.is_available()
        && adapter
            .get(PUBCID_OPT_OUT_KEY)
            .is_some_and(|v| !v.is_empty())
}

/// What the host hands the module at wiring time.
#[derive(Clone)]
pub struct PubcidEnvironment {
    pub storage: BrowserStorage,
    pub page_id_provider: Option<Arc<dyn PageIdProvider>>,
}

impl PubcidEnvironment {
    #[must_use]
    pub fn new(storage: BrowserStorage) -> Self {
        Self {
            storage,
            page_id_provider: None,
        }
    }

    #[must_use]
    pub fn with_page_id_provider(mut self, provider: Arc<dyn PageIdProvider>) -> Self {
        self.page_id_provider = Some(provider);
        self
    }
}

/// Subscribe to `pubcid` configuration and register the hook on `host`.
///
/// The hook starts from default options. Returns `None`, leaving the
/// request-bids chain untouched, when the opt-out marker is present.
pub fn init_pubcid<T>(host: &mut Host<T>, environment: PubcidEnvironment) -> Option<Arc<PubcidHook>> {
    let config = PubcidConfig::from_options(&PubcidOptions::default(), &environment.storage);
    let mut hook = PubcidHook::new(config, environment.storage.clone());
    if let Some(provider) = environment.page_id_provider {
        hook = hook.with_page_id_provider(provider);
    }
    let hook = Arc::new(hook);

    let listener = hook.clone();
    host.config_mut()
        .subscribe(PUBCID_CONFIG_TOPIC, move |value: &Value| {
            match serde_json::from_value::<PubcidOptions>(value.clone()) {
                Ok(options) => listener.configure(&options),
                Err(e) => log::warn!("Ignoring malformed pubcid configuration: {}", e),
            }
        });

    if is_opted_out(&environment.storage) {
        log::info!("pubcid opt-out marker present, hook not registered");
        return None;
    }

    host.before(hook.clone());
    Some(hook)
}
