//! Reference matching for ExternalSecret specs
//!
//! An ExternalSecret references an item either through `spec.data[].remoteRef.key`
//! or `spec.dataFrom[].extract.key`. The two paths compare keys differently:
//! `data` keys ignore one leading `/` on either side, `dataFrom` keys must be
//! byte-for-byte equal.

use serde_json::Value;
use tracing::{debug, warn};

use crate::document::{nested_slice, nested_str};

/// Remove exactly one leading path separator
fn trim_separator(key: &str) -> &str {
    key.strip_prefix('/').unwrap_or(key)
}

/// Whether the ExternalSecret `document` references `item_name`.
///
/// `spec.data` is scanned first; `spec.dataFrom` is only read when no `data`
/// entry matched. `es_name` is used for diagnostics only.
pub fn references_item(document: &Value, item_name: &str, es_name: &str) -> bool {
    match nested_slice(document, &["spec", "data"]) {
        Ok(Some(entries)) => {
            if data_references_item(entries, item_name, es_name) {
                return true;
            }
        }
        Ok(None) => {}
        Err(e) => {
            warn!(external_secret = %es_name, error = %e, "Ignoring malformed spec.data");
        }
    }

    match nested_slice(document, &["spec", "dataFrom"]) {
        Ok(Some(entries)) => data_from_references_item(entries, item_name, es_name),
        Ok(None) => false,
        Err(e) => {
            warn!(external_secret = %es_name, error = %e, "Ignoring malformed spec.dataFrom");
            false
        }
    }
}

/// Scan `spec.data` entries for a `remoteRef.key` equal to `item_name`,
/// ignoring a single leading `/` on both sides.
pub fn data_references_item(entries: &[Value], item_name: &str, es_name: &str) -> bool {
    let wanted = trim_separator(item_name);

    for (index, entry) in entries.iter().enumerate() {
        let key = match nested_str(entry, &["remoteRef", "key"]) {
            Ok(Some(key)) => key,
            Ok(None) => {
                warn!(external_secret = %es_name, index, "remoteRef.key not found in data entry");
                continue;
            }
            Err(e) => {
                warn!(external_secret = %es_name, index, error = %e, "Invalid data entry");
                continue;
            }
        };

        debug!(external_secret = %es_name, key = %key, "Found key in data[]");

        if trim_separator(key) == wanted {
            return true;
        }
    }
    false
}

/// Scan `spec.dataFrom` entries for an `extract.key` exactly equal to `item_name`.
pub fn data_from_references_item(entries: &[Value], item_name: &str, es_name: &str) -> bool {
    for (index, entry) in entries.iter().enumerate() {
        let key = match nested_str(entry, &["extract", "key"]) {
            Ok(Some(key)) => key,
            Ok(None) => {
                warn!(external_secret = %es_name, index, "extract.key not found in dataFrom entry");
                continue;
            }
            Err(e) => {
                warn!(external_secret = %es_name, index, error = %e, "Invalid dataFrom entry");
                continue;
            }
        };

        debug!(external_secret = %es_name, key = %key, "Found key in dataFrom[]");

        // Exact comparison, no separator trimming (see module docs)
        if key == item_name {
            return true;
        }
    }
    false
}
