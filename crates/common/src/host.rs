//! Host-side collaborators the module plugs into.
//!
//! - [`HostConfig`]: merged configuration document with topic subscriptions
//! - [`Host`]: owns the configuration and the request-bids pipeline

use std::sync::Arc;

use error_stack::Report;
use serde_json::{Map, Value};

use crate::bid_request::BidRequestConfig;
use crate::error::PubcidError;
use crate::hooks::{RequestBidsHook, RequestBidsPipeline};

type ConfigListener = Box<dyn Fn(&Value) + Send + Sync>;

/// Configuration document shared by the host and its modules.
///
/// Subscribers are notified for their topic on every later `set_config`
/// call that carries that topic; subscribing does not replay the current
/// value.
#[derive(Default)]
pub struct HostConfig {
    document: Map<String, Value>,
    listeners: Vec<(String, ConfigListener)>,
}

impl HostConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, topic: &str, listener: F)
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.listeners.push((topic.to_string(), Box::new(listener)));
    }

    /// Merge the top-level keys of `options` into the document and notify
    /// subscribers of each key.
    ///
    /// # Errors
    ///
    /// Returns an error if `options` is not a JSON object.
    pub fn set_config(&mut self, options: Value) -> Result<(), Report<PubcidError>> {
        let Value::Object(options) = options else {
            return Err(Report::new(PubcidError::Configuration {
                message: "setConfig options must be an object".to_string(),
            }));
        };

        for (topic, value) in options {
            for (_, listener) in self.listeners.iter().filter(|(t, _)| *t == topic) {
                listener(&value);
            }
            self.document.insert(topic, value);
        }
        Ok(())
    }

    #[must_use]
    pub fn get(&self, topic: &str) -> Option<&Value> {
        self.document.get(topic)
    }
}

/// The bidding host. `T` is what its request-bids function returns.
pub struct Host<T> {
    config: HostConfig,
    request_bids: RequestBidsPipeline<T>,
}

impl<T> Default for Host<T> {
    fn default() -> Self {
        Self {
            config: HostConfig::new(),
            request_bids: RequestBidsPipeline::new(),
        }
    }
}

impl<T> Host<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut HostConfig {
        &mut self.config
    }

    /// Register a hook on the request-bids interception point.
    pub fn before(&mut self, hook: Arc<dyn RequestBidsHook<T>>) {
        self.request_bids.before(hook);
    }

    #[must_use]
    pub fn request_bids_hooks(&self) -> Vec<&'static str> {
        self.request_bids.hook_names()
    }

    /// Run the registered hooks, then `dispatch`.
    pub fn request_bids<F>(&self, request: &mut BidRequestConfig, dispatch: F) -> T
    where
        F: FnMut(&mut BidRequestConfig) -> T,
    {
        self.request_bids.run(request, dispatch)
    }
}
