//! Results of store operations, and the flattened view used for listings.
//!
//! [`StoreResult`] is what [`Store::handle`](crate::Store::handle) returns;
//! its `Display` impl is the text a CLI prints.

use std::fmt;

use crate::value::{Map, Value};

/// Result of a store operation. Returned to the caller for display.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreResult {
    /// Every leaf as a dotted key and its display text.
    Listing { entries: Vec<(String, String)> },
    KeyValue { key: String, value: Value },
    Missing { key: String },
    ValueSet { key: String, value: Value, saved: bool },
    ValueUnset { key: String, existed: bool, saved: bool },
    /// New value of an incremented or decremented key.
    Counter { key: String, value: i64, saved: bool },
    Cleared { saved: bool },
    /// The tree rendered in some format.
    Exported(String),
}

impl fmt::Display for StoreResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreResult::Listing { entries } => {
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{key} = {value}")?;
                }
                Ok(())
            }
            StoreResult::KeyValue { key, value } => write!(f, "{key} = {value}"),
            StoreResult::Missing { key } => write!(f, "{key} is not set"),
            StoreResult::ValueSet { key, value, saved } => {
                write!(f, "Set {key} = {value}")?;
                unsaved(f, *saved)
            }
            StoreResult::ValueUnset {
                key,
                existed,
                saved,
            } => {
                if *existed {
                    write!(f, "Unset {key}")?;
                } else {
                    write!(f, "{key} was not set")?;
                }
                unsaved(f, *saved)
            }
            StoreResult::Counter { key, value, saved } => {
                write!(f, "{key} = {value}")?;
                unsaved(f, *saved)
            }
            StoreResult::Cleared { saved } => {
                write!(f, "Cleared all keys")?;
                unsaved(f, *saved)
            }
            StoreResult::Exported(text) => write!(f, "{text}"),
        }
    }
}

fn unsaved(f: &mut fmt::Formatter<'_>, saved: bool) -> fmt::Result {
    if saved {
        Ok(())
    } else {
        write!(f, " (not saved)")
    }
}

/// Split a dotted key into path segments.
pub fn segments(key: &str) -> Vec<&str> {
    key.split('.').collect()
}

/// Flatten a tree into dotted-key/display-text pairs, in document order.
///
/// Non-empty mappings are descended into. Everything else, including lists
/// and empty mappings, is a leaf rendered with [`Value`]'s `Display`.
pub fn flatten(tree: &Map) -> Vec<(String, String)> {
    let mut out = Vec::new();
    flatten_into(tree, "", &mut out);
    out
}

fn flatten_into(map: &Map, prefix: &str, out: &mut Vec<(String, String)>) {
    for (key, value) in map {
        let full_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Map(nested) if !nested.is_empty() => flatten_into(nested, &full_key, out),
            leaf => out.push((full_key, leaf.to_string())),
        }
    }
}
