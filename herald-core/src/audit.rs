//! Audit records for enrollments and deliveries.
//!
//! The authority emits these as JSON lines; nothing reads them back.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::Identity;

/// Action being audited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// First token issued for an identity.
    Enrolled,
    /// Token issued for an identity that already had one (the old one is revoked).
    Reenrolled,
    /// Identity was dropped from a capacity-bounded binding table.
    Evicted,
    /// Message accepted.
    Delivered,
    /// Message rejected with a protocol error.
    DeliveryRejected,
}

/// An audit event recording an action on the authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub ts: DateTime<Utc>,

    /// Identity the action concerns (None when the envelope carried none).
    pub actor: Option<Identity>,

    pub action: AuditAction,

    /// BTreeMap for deterministic serialization order.
    pub metadata: BTreeMap<String, String>,
}

impl AuditEvent {
    /// Create a new audit event with the current timestamp.
    pub fn new(actor: Option<Identity>, action: AuditAction) -> Self {
        Self::with_timestamp(Utc::now(), actor, action)
    }

    pub fn with_timestamp(ts: DateTime<Utc>, actor: Option<Identity>, action: AuditAction) -> Self {
        Self {
            ts,
            actor,
            action,
            metadata: BTreeMap::new(),
        }
    }

    /// Add metadata to the event (builder pattern).
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
