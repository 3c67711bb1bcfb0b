//! Inbound webhook events
//!
//! The secret manager posts a JSON array of events. Only `item_name` drives
//! any behaviour; the other fields are decoded for logging.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::Error;

/// One secret-management event
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    /// Event identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<i64>,
    /// Severity level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_level: Option<String>,
    /// Event type tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    /// Name (path) of the secret item the event is about
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_name: Option<String>,
    /// Item identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<i64>,
    /// Item type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
    /// Free-form payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<BTreeMap<String, String>>,
}

impl Event {
    /// Non-empty item name, if present
    pub fn item_name(&self) -> Option<&str> {
        self.item_name.as_deref().filter(|name| !name.is_empty())
    }
}

/// Decode a request body into an ordered batch of events.
///
/// The body must be a JSON array; anything else is a decode error.
pub fn decode_events(body: &[u8]) -> Result<Vec<Event>, Error> {
    serde_json::from_slice(body).map_err(|e| Error::decode(format!("invalid event batch: {e}")))
}
