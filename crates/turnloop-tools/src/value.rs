//! The dynamic-typed tool result value.
//!
//! Modeled as a tagged variant rather than collapsing back to a single
//! dictionary, per the design note on dynamic-typed tool I/O: `Ok{data}` or
//! `Err{ToolError}`, where `data` covers scalars, lists, maps, and a
//! multimodal block list.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A tool result's payload shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StructuredValue {
    /// Absence of a value.
    Null,
    /// A boolean scalar.
    Bool(bool),
    /// A numeric scalar.
    Number(serde_json::Number),
    /// A text scalar.
    String(String),
    /// An ordered list. Lists are returned verbatim by the Tool Executor —
    /// they represent multimodal content blocks and are never compacted.
    List(Vec<StructuredValue>),
    /// A string-keyed map.
    Map(BTreeMap<String, StructuredValue>),
}

impl StructuredValue {
    /// Whether this value is the `List` variant.
    #[must_use]
    pub fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    /// Render the value as a display string, the same representation used
    /// before compaction thresholds are measured.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => n.to_string(),
            Self::String(s) => s.clone(),
            Self::List(_) | Self::Map(_) => {
                serde_json::to_string_pretty(self).unwrap_or_default()
            }
        }
    }

    /// Interpret the value as a list of maps, for the search-shaped
    /// compaction path.
    #[must_use]
    pub fn as_list(&self) -> Option<&[StructuredValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Fetch a string field if this value is a map.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self {
            Self::Map(map) => match map.get(key) {
                Some(Self::String(s)) => Some(s.as_str()),
                _ => None,
            },
            _ => None,
        }
    }
}

impl From<String> for StructuredValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for StructuredValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_are_never_collapsed() {
        let value = StructuredValue::List(vec!["a".into(), "b".into()]);
        assert!(value.is_list());
    }

    #[test]
    fn get_str_only_works_on_maps() {
        let mut map = BTreeMap::new();
        map.insert("title".to_string(), StructuredValue::from("hello"));
        let value = StructuredValue::Map(map);
        assert_eq!(value.get_str("title"), Some("hello"));
        assert_eq!(value.get_str("missing"), None);
    }
}
