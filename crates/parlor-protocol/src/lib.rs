//! Wire protocol for Parlor.
//!
//! This crate defines the "language" spoken between the orchestration core
//! and the connected party clients:
//!
//! - **Identity types** ([`SessionId`], [`PlayerId`], [`PropId`], [`HintId`])
//!   and the wire-visible enums ([`RoundPhase`], [`Importance`], [`HintTier`]).
//! - **Events** ([`ServerEvent`], [`ClientMessage`]) — every frame on the wire
//!   is a `{ "type": ..., "payload": ... }` envelope produced by these enums.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how events become text
//!   frames and back.
//! - **Errors** ([`ProtocolError`]).
//!
//! The protocol layer sits between transport (raw frames) and the
//! orchestration core (sessions, rounds, hints). It knows nothing about
//! connections or session state — only how messages are shaped.

mod codec;
mod error;
mod event;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use event::{ClientMessage, NarrationMoment, PromptKind, ServerEvent, TimerMoment};
pub use types::{HintId, HintTier, Importance, PlayerId, PropId, PropView, RoundPhase, SessionId};
