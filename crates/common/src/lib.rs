//! Publisher common id (pubcid) for ad bid requests.
//!
//! This crate generates, persists and injects a publisher-scoped first-party
//! identifier into bid requests before the bidding host dispatches them.
//!
//! # Modules
//!
//! - [`bid_request`]: Bid request, ad unit and bid models
//! - [`clock`]: Injectable wall clock for expiry decisions
//! - [`constants`]: Storage keys and defaults
//! - [`error`]: Error types and error handling utilities
//! - [`hooks`]: The "before request bids" interceptor chain
//! - [`host`]: Host configuration subscriptions and request-bids entry point
//! - [`identifier`]: Read/write policy across storage backends
//! - [`pubcid`]: Configuration setter, request hook and initialization
//! - [`settings`]: Configuration management and validation
//! - [`storage`]: Cookie and local storage adapters
//! - [`test_support`]: Testing utilities and mocks

pub mod bid_request;
pub mod clock;
pub mod constants;
pub mod error;
pub mod hooks;
pub mod host;
pub mod identifier;
pub mod pubcid;
pub mod settings;
pub mod storage;
pub mod test_support;
