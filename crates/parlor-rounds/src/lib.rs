//! Round orchestration for Parlor.
//!
//! The facilitator drives each party round through a strict phase sequence:
//!
//! ```text
//! IDLE → INTRO → ACTIVE → COOLDOWN → (next round) INTRO → …
//! ```
//!
//! [`RoundEngine`] owns that state machine for one session. Transitions are
//! commands (`begin_next_round`, `confirm_start`, `finish_current_round`),
//! each legal from exactly one set of phases and rejected — with the current
//! phase attached — from anywhere else. Every transition narrates (through a
//! [`Narrator`], with a bounded timeout and a deterministic fallback line)
//! and broadcasts phase/prompt events through the connection registry.
//!
//! Timed rounds get a *soft* timer: it announces half-time and expiry but
//! never closes the round — only the facilitator does that.

#![allow(async_fn_in_trait)]

mod engine;
mod error;
mod narrator;
mod timer;

pub use engine::{BeginOutcome, RoundConfig, RoundEngine, RoundStatus};
pub use error::RoundError;
pub use narrator::{NarrationError, NarrationRequest, Narrator, StubNarrator};
pub use timer::SoftTimer;
