//! Error types for the pubcid module.
//!
//! Errors travel as [`error_stack::Report<PubcidError>`] so callers get the
//! full context chain. Storage errors never leave the adapters; they are
//! logged there and turned into "value absent".

use derive_more::{Display, Error};

#[derive(Debug, Display, Error)]
pub enum PubcidError {
    #[display("Configuration error: {message}")]
    Configuration { message: String },

    #[display("Storage error: {message}")]
    Storage { message: String },

    #[display("Bid request error: {message}")]
    BidRequest { message: String },
}
