//! Bid request model passed through the request-bids hooks.
//!
//! Only the fields the module touches are typed. Everything else is kept in
//! the flattened `extra` maps so a decorated request serializes back with
//! all of the caller's fields intact.

use error_stack::{Report, ResultExt};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::PUBCID_CRUMB;
use crate::error::PubcidError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidRequestConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad_units: Option<Vec<AdUnit>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A slot on the page and the bidders asked to fill it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdUnit {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub bids: Vec<Bid>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    #[serde(default)]
    pub bidder: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crumbs: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Bid {
    #[must_use]
    pub fn new(bidder: impl Into<String>) -> Self {
        Self {
            bidder: bidder.into(),
            ..Self::default()
        }
    }

    /// Adds or replaces one crumb, keeping the others.
    pub fn set_crumb(&mut self, key: &str, value: impl Into<Value>) {
        self.crumbs
            .get_or_insert_with(Map::new)
            .insert(key.to_string(), value.into());
    }

    #[must_use]
    pub fn pubcid(&self) -> Option<&str> {
        self.crumbs
            .as_ref()
            .and_then(|crumbs| crumbs.get(PUBCID_CRUMB))
            .and_then(Value::as_str)
    }
}

impl BidRequestConfig {
    /// Parse a request from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if `json` is not a valid bid request document.
    pub fn from_json(json: &str) -> Result<Self, Report<PubcidError>> {
        serde_json::from_str(json).change_context(PubcidError::BidRequest {
            message: "Failed to parse bid request".to_string(),
        })
    }

    /// # Errors
    ///
    /// Returns an error if the request cannot be serialized.
    pub fn to_json_pretty(&self) -> Result<String, Report<PubcidError>> {
        serde_json::to_string_pretty(self).change_context(PubcidError::BidRequest {
            message: "Failed to serialize bid request".to_string(),
        })
    }

    /// Every bid of every ad unit.
    pub fn bids_mut(&mut self) -> impl Iterator<Item = &mut Bid> {
        self.ad_units
            .iter_mut()
            .flatten()
            .flat_map(|unit| unit.bids.iter_mut())
    }

    pub fn bids(&self) -> impl Iterator<Item = &Bid> {
        self.ad_units
            .iter()
            .flatten()
            .flat_map(|unit| unit.bids.iter())
    }
}
