//! Session data model and persistent store for Parlor.
//!
//! One [`SessionState`] exists per running party. It owns the player roster,
//! the prop pool, the round plan and progress, the prepared-round cache, the
//! hint history and the audit event log. The [`SessionStore`] hands out
//! [`SessionHandle`]s whose `tokio::sync::Mutex` is the per-session critical
//! section: every mutation of a session happens under that one lock, and
//! operations on different sessions never contend.
//!
//! Persistence is deliberately plain: `state.json` plus an `events.ndjson`
//! journal per session directory, written through a temp-file rename so a
//! crashed save never leaves a torn record behind.

mod error;
mod events;
mod model;
mod store;

pub use error::StoreError;
pub use events::{EventRecord, hex_token, unix_now};
pub use model::{
    HintDeliveryEntry, HintRecord, KillerLedger, Player, PlayerRole, PreparedRound, Prop,
    RoundPlan, RoundProgress, RoundResult, RoundSpec, SessionState,
};
pub use store::{SessionHandle, SessionStore};
