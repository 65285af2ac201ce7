//! Interception point run before bid requests are dispatched.
//!
//! Hooks registered with [`RequestBidsPipeline::before`] run in registration
//! order. Each receives the request and a continuation covering the rest of
//! the chain, ending in the host's own request-bids function. A hook that
//! does not call its continuation stops the chain.

use std::sync::Arc;

use crate::bid_request::BidRequestConfig;

/// Remainder of the chain handed to a hook.
pub type Continuation<'a, T> = &'a mut dyn FnMut(&mut BidRequestConfig) -> T;

/// A "before request bids" interceptor.
pub trait RequestBidsHook<T>: Send + Sync {
    /// Identifier for logging/diagnostics.
    fn hook_name(&self) -> &'static str;

    /// Inspect or modify `request`, then return the result of `next`.
    fn call(&self, request: &mut BidRequestConfig, next: Continuation<'_, T>) -> T;
}

pub struct RequestBidsPipeline<T> {
    hooks: Vec<Arc<dyn RequestBidsHook<T>>>,
}

impl<T> Default for RequestBidsPipeline<T> {
    fn default() -> Self {
        Self { hooks: Vec::new() }
    }
}

impl<T> RequestBidsPipeline<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `hook` to run before the request-bids function.
    pub fn before(&mut self, hook: Arc<dyn RequestBidsHook<T>>) {
        log::debug!("Registering request-bids hook '{}'", hook.hook_name());
        self.hooks.push(hook);
    }

    #[must_use]
    pub fn hook_names(&self) -> Vec<&'static str> {
        self.hooks.iter().map(|hook| hook.hook_name()).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Run the chain with `terminal` as the final step.
    pub fn run<F>(&self, request: &mut BidRequestConfig, mut terminal: F) -> T
    where
        F: FnMut(&mut BidRequestConfig) -> T,
    {
        dispatch(&self.hooks, request, &mut terminal)
    }
}

fn dispatch<T>(
    hooks: &[Arc<dyn RequestBidsHook<T>>],
    request: &mut BidRequestConfig,
    terminal: &mut dyn FnMut(&mut BidRequestConfig) -> T,
) -> T {
    match hooks.split_first() {
        Some((hook, rest)) => hook.call(request, &mut |req| dispatch(rest, req, &mut *terminal)),
        None => terminal(request),
    }
}
