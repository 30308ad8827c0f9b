//! Alert record types

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Identifier of a tracked repository, usually `owner/name`
pub type EntityId = String;

/// Full state snapshot, keyed by entity.
///
/// A `BTreeMap` keeps keys sorted so serialization is byte-stable.
pub type StateSnapshot = BTreeMap<EntityId, AlertRecord>;

/// Persisted per-entity alert flag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRecord {
    /// Whether the public alert has ever fired. Never reset once true.
    pub alert_sent: bool,
}

impl AlertRecord {
    /// Record for an entity that has never alerted
    pub fn pending() -> Self {
        Self { alert_sent: false }
    }

    /// Record for an entity whose alert has fired
    pub fn sent() -> Self {
        Self { alert_sent: true }
    }
}

/// Result of a single visibility probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Confirmed public by the status source
    Public,
    /// Absent, private, inaccessible, or the probe failed
    NotPublic,
}

impl Visibility {
    pub fn is_public(self) -> bool {
        matches!(self, Visibility::Public)
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Visibility::Public => write!(f, "public"),
            Visibility::NotPublic => write!(f, "not public"),
        }
    }
}

/// Notification target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyTarget {
    /// Log to tracing
    Log,
    /// Slack-compatible incoming webhook
    Webhook { url: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_wire_format() {
        let json = serde_json::to_string(&AlertRecord::sent()).unwrap();
        assert_eq!(json, r#"{"alert_sent":true}"#);

        let record: AlertRecord = serde_json::from_str(r#"{"alert_sent":false}"#).unwrap();
        assert_eq!(record, AlertRecord::pending());
    }

    #[test]
    fn test_record_requires_flag() {
        assert!(serde_json::from_str::<AlertRecord>("{}").is_err());
        assert!(serde_json::from_str::<AlertRecord>(r#"{"alert_sent":"yes"}"#).is_err());
    }

    #[test]
    fn test_snapshot_keys_sorted() {
        let mut snapshot = StateSnapshot::new();
        snapshot.insert("b/y".to_string(), AlertRecord::pending());
        snapshot.insert("a/x".to_string(), AlertRecord::sent());

        let keys: Vec<_> = snapshot.keys().cloned().collect();
        assert_eq!(keys, vec!["a/x", "b/y"]);
    }
}
