//! Append-only audit event log.
//!
//! Every session keeps a bounded journal of what happened: phase changes,
//! hint deliveries, narration fallbacks, facilitator overrides. The journal
//! is for audit and replay tooling, not for driving game logic.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Upper bound on journal entries kept in memory (and on disk).
/// Oldest entries are dropped first once the bound is exceeded.
pub(crate) const MAX_AUDIT_EVENTS: usize = 2000;

/// One audit journal entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Random token identifying this entry.
    pub id: String,
    /// What happened, e.g. `"hint_delivered"` or `"round_phase"`.
    pub kind: String,
    /// Origin label, e.g. `"system"` or `"facilitator"`.
    pub scope: String,
    /// Free-form details, flat JSON.
    pub payload: serde_json::Value,
    /// Unix timestamp (seconds).
    pub ts: u64,
}

impl EventRecord {
    /// Creates an entry stamped with the current time.
    pub fn new(kind: impl Into<String>, scope: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: hex_token(),
            kind: kind.into(),
            scope: scope.into(),
            payload,
            ts: unix_now(),
        }
    }
}

/// Generates a random 32-character hex string (128 bits of entropy).
///
/// Used for event ids, hint ids, and generated session ids.
pub fn hex_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Current unix time in whole seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
