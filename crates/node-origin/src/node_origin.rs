//! Provenance record attached to every IR node.
//!
//! A `NodeOrigin` says "created by reducer R from node N". The distinguished
//! unknown record uses `created_from == i64::MIN`; real node identities enter
//! through [`NodeId`] and therefore can never collide with it.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::graph::NodeId;

/// Reserved `created_from` value meaning "provenance unknown".
pub const UNKNOWN_CREATED_FROM: i64 = i64::MIN;

/// Immutable provenance value: which reducer produced a node, and from which
/// prior node it was derived.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeOrigin {
    reducer_name: Arc<str>,
    created_from: i64,
}

impl NodeOrigin {
    /// Origin for a node derived from `created_from` by `reducer_name`.
    pub fn new(reducer_name: impl Into<Arc<str>>, created_from: NodeId) -> Self {
        Self {
            reducer_name: reducer_name.into(),
            created_from: i64::from(created_from.as_u32()),
        }
    }

    /// Origin with an arbitrary `created_from` value (source positions,
    /// external ids). Passing [`UNKNOWN_CREATED_FROM`] yields a record that
    /// reads back as unknown.
    pub fn from_raw(reducer_name: impl Into<Arc<str>>, created_from: i64) -> Self {
        Self {
            reducer_name: reducer_name.into(),
            created_from,
        }
    }

    /// The sentinel record.
    pub fn unknown() -> Self {
        Self {
            reducer_name: Arc::from(""),
            created_from: UNKNOWN_CREATED_FROM,
        }
    }

    pub fn is_known(&self) -> bool {
        self.created_from != UNKNOWN_CREATED_FROM
    }

    pub fn reducer_name(&self) -> &str {
        &self.reducer_name
    }

    pub fn created_from(&self) -> i64 {
        self.created_from
    }
}

impl Default for NodeOrigin {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Display for NodeOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_known() {
            write!(f, "{}@#{}", self.reducer_name, self.created_from)
        } else {
            f.write_str("unknown")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_is_not_known() {
        let origin = NodeOrigin::unknown();
        assert!(!origin.is_known());
        assert_eq!(origin.created_from(), UNKNOWN_CREATED_FROM);
        assert_eq!(origin.reducer_name(), "");
        assert_eq!(origin, NodeOrigin::default());
    }

    #[test]
    fn node_id_constructor_is_always_known() {
        let origin = NodeOrigin::new("Inline", NodeId::new(0));
        assert!(origin.is_known());
        assert_eq!(origin.created_from(), 0);
        let origin = NodeOrigin::new("Inline", NodeId::new(u32::MAX));
        assert!(origin.is_known());
        assert_eq!(origin.created_from(), i64::from(u32::MAX));
    }

    #[test]
    fn raw_sentinel_reads_back_unknown() {
        let origin = NodeOrigin::from_raw("Caller", UNKNOWN_CREATED_FROM);
        assert!(!origin.is_known());
        assert_ne!(origin, NodeOrigin::unknown());
    }

    #[test]
    fn raw_negative_non_sentinel_is_known() {
        assert!(NodeOrigin::from_raw("SourcePosition", -1).is_known());
    }

    #[test]
    fn equality_compares_name_content() {
        let owned = String::from("Fold");
        assert_eq!(
            NodeOrigin::new(owned.as_str(), NodeId::new(7)),
            NodeOrigin::new("Fold", NodeId::new(7))
        );
        assert_ne!(
            NodeOrigin::new("Fold", NodeId::new(7)),
            NodeOrigin::new("Fold", NodeId::new(8))
        );
        assert_ne!(
            NodeOrigin::new("Fold", NodeId::new(7)),
            NodeOrigin::new("Inline", NodeId::new(7))
        );
    }

    #[test]
    fn display() {
        assert_eq!(NodeOrigin::new("Fold", NodeId::new(10)).to_string(), "Fold@#10");
        assert_eq!(NodeOrigin::unknown().to_string(), "unknown");
    }

    #[test]
    fn serde_field_names() {
        let json = serde_json::to_value(NodeOrigin::new("Fold", NodeId::new(3))).unwrap();
        assert_eq!(json["reducer_name"], "Fold");
        assert_eq!(json["created_from"], 3);
    }
}
