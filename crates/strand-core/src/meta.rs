//! Event metadata

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::clock::Created;

/// Metadata attached to every stored event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    /// Logical timestamp, unique within one log
    pub created: Created,
    /// Local insertion order, assigned by the log on acceptance (starts at 1)
    #[serde(default)]
    pub added: u64,
    /// Caller-supplied fields preserved opaquely
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Meta {
    /// Create metadata for a not-yet-accepted event
    pub fn new(created: Created) -> Self {
        Self {
            created,
            added: 0,
            extra: Map::new(),
        }
    }

    /// Whether the log has accepted this entry
    pub fn is_accepted(&self) -> bool {
        self.added > 0
    }

    /// Get a caller-supplied field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}

/// Metadata supplied by the caller of `add`
///
/// Anything left unset is filled in by the log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetaOverrides {
    /// Explicit logical timestamp, e.g. one received from another replica
    pub created: Option<Created>,
    /// Extra fields to keep alongside the event
    pub extra: Map<String, Value>,
}

impl MetaOverrides {
    /// Create empty overrides
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an explicit `created` tuple
    pub fn created(created: impl Into<Created>) -> Self {
        Self {
            created: Some(created.into()),
            extra: Map::new(),
        }
    }

    /// Add an extra field
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Build full metadata, taking `created` from the overrides or from `fallback`
    pub fn into_meta(self, fallback: impl FnOnce() -> Created) -> Meta {
        Meta {
            created: self.created.unwrap_or_else(fallback),
            added: 0,
            extra: self.extra,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_into_meta_keeps_supplied_created() {
        let meta = MetaOverrides::created([100]).into_meta(|| panic!("timer must not be used"));
        assert_eq!(meta.created, Created::from([100]));
        assert_eq!(meta.added, 0);
        assert!(!meta.is_accepted());
    }

    #[test]
    fn test_into_meta_uses_fallback() {
        let meta = MetaOverrides::new().into_meta(|| Created::from([7]));
        assert_eq!(meta.created, Created::from([7]));
    }

    #[test]
    fn test_extra_fields_are_flattened() {
        let mut meta = MetaOverrides::created([1])
            .with("reasons", json!(["sync"]))
            .into_meta(|| Created::from([0]));
        meta.added = 4;

        let value = serde_json::to_value(&meta).unwrap();
        assert_eq!(value, json!({ "created": [1], "added": 4, "reasons": ["sync"] }));

        let back: Meta = serde_json::from_value(value).unwrap();
        assert_eq!(back, meta);
        assert_eq!(back.get("reasons"), Some(&json!(["sync"])));
    }
}
