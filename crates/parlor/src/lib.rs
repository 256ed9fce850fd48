//! # Parlor
//!
//! Real-time orchestration backend for facilitator-driven murder-mystery
//! parties.
//!
//! The facilitator drives a session of timed mini-game rounds; Parlor keeps
//! every connected client in sync: it tracks connections and player
//! identities, sequences round phases with soft timers, distributes story
//! props equitably, and delivers tiered hints with a quota-limited destroy
//! action for the culprit.
//!
//! The layers, bottom up:
//!
//! ```text
//! transport (sockets) → protocol (envelopes) → registry (who is connected)
//!                                      ↘
//!        state (session records) → rounds / deal (orchestration engines)
//!                                      ↘
//!                            parlor (this crate): Director + server loop
//! ```
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use parlor::{ParlorServer, StubNarrator};
//!
//! # async fn run() -> Result<(), parlor::ParlorError> {
//! let server = ParlorServer::<StubNarrator>::builder()
//!     .bind("0.0.0.0:8080")
//!     .data_dir("data/sessions")
//!     .build(StubNarrator)
//!     .await?;
//! server.run().await
//! # }
//! ```

mod director;
mod error;
mod handler;
mod server;

pub use director::Director;
pub use error::ParlorError;
pub use server::{ParlorServer, ParlorServerBuilder};

/// Initializes a default `tracing` subscriber for host binaries:
/// `RUST_LOG`-style filtering, `info` when unset.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
}

// The pieces a host application wires together.
pub use parlor_deal::{DealEngine, DealError, Distribution, PoolSummary, Reassignment};
pub use parlor_protocol::{
    ClientMessage, HintId, HintTier, Importance, PlayerId, PropId, RoundPhase, ServerEvent,
    SessionId,
};
pub use parlor_registry::ConnectionRegistry;
pub use parlor_rounds::{
    BeginOutcome, Narrator, RoundConfig, RoundEngine, RoundError, RoundStatus, StubNarrator,
};
pub use parlor_state::{HintRecord, SessionHandle, SessionState, SessionStore};
