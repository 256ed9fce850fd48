//! Server and client event envelopes.
//!
//! Every frame on the wire is `{ "type": <string>, "payload": <object> }`.
//! The adjacently-tagged serde representation produces exactly that shape,
//! so constructing a [`ServerEvent`] variant *is* constructing the envelope —
//! callers never assemble the outer object by hand.

use serde::{Deserialize, Serialize};

use crate::types::{HintId, HintTier, PlayerId, PropView, RoundPhase, SessionId};

// ---------------------------------------------------------------------------
// Narration / timer / prompt vocabularies
// ---------------------------------------------------------------------------

/// The story moment a narration line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrationMoment {
    RoundIntro,
    RoundStart,
    RoundEnd,
    SessionEnd,
}

/// Checkpoints emitted by the soft timer. The timer only notifies — it never
/// closes the round by itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerMoment {
    HalfTime,
    Expired,
}

/// Facilitator-facing prompts that drive the physical party along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    /// "The intro has played — launch the mini-game when the table is ready."
    StartMinigame,
    /// "The round is closed — advance whenever you like."
    NextRoundReady,
}

// ---------------------------------------------------------------------------
// ServerEvent
// ---------------------------------------------------------------------------

/// A message pushed from the core to connected clients.
///
/// Serializes as `{ "type": "...", "payload": { ... } }` with snake_case type
/// tags, e.g.:
///
/// ```json
/// { "type": "narration",
///   "payload": { "event": "round_intro", "text": "...", "round_index": 2 } }
/// ```
///
/// Payloads are flat and carry enough context (`round_index`, ids) that a
/// client can render them without a follow-up query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Acknowledges an `identify` message; the connection is now bound.
    Identified { player_id: PlayerId },

    /// The round state machine moved to a new phase.
    Phase {
        session_id: SessionId,
        phase: RoundPhase,
        round_index: u32,
    },

    /// A narration line (generated or fallback) for everyone to hear.
    Narration {
        event: NarrationMoment,
        text: String,
        round_index: Option<u32>,
    },

    /// A soft-timer checkpoint. Informational only.
    Timer {
        event: TimerMoment,
        round_index: u32,
        code: String,
    },

    /// A call to action for the facilitator's table screen.
    Prompt {
        kind: PromptKind,
        round_index: u32,
        code: Option<String>,
        theme: Option<String>,
    },

    /// A player's ordered prop list changed (allocation, reset, override).
    PropUpdate {
        player_id: PlayerId,
        props: Vec<PropView>,
    },

    /// Targeted hint delivery: the tier and text this recipient actually got.
    HintDelivered {
        session_id: SessionId,
        hint_id: HintId,
        round_index: u32,
        tier: HintTier,
        text: String,
        discoverer_id: PlayerId,
        shared: bool,
    },

    /// Non-spoiling broadcast notice that a hint entered play. Carries no
    /// tier text so it can go to everyone, including the discoverer's rivals.
    HintDiscovered {
        session_id: SessionId,
        hint_id: HintId,
        round_index: u32,
        discoverer_id: PlayerId,
        shared: bool,
    },

    /// Non-spoiling broadcast notice that a hint was destroyed.
    HintDestroyed {
        session_id: SessionId,
        hint_id: HintId,
        destroyed_by: PlayerId,
    },
}

impl ServerEvent {
    /// The wire `type` tag, for structured logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Identified { .. } => "identified",
            Self::Phase { .. } => "phase",
            Self::Narration { .. } => "narration",
            Self::Timer { .. } => "timer",
            Self::Prompt { .. } => "prompt",
            Self::PropUpdate { .. } => "prop_update",
            Self::HintDelivered { .. } => "hint_delivered",
            Self::HintDiscovered { .. } => "hint_discovered",
            Self::HintDestroyed { .. } => "hint_destroyed",
        }
    }
}

// ---------------------------------------------------------------------------
// ClientMessage
// ---------------------------------------------------------------------------

/// A message received from a client over its socket.
///
/// The core's inbound surface is deliberately tiny: everything else reaches
/// the core through the validated request layer, not the socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Binds this connection to a player identity. Idempotent; sending a
    /// different id re-binds the connection atomically.
    Identify { player_id: PlayerId },
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_event_envelope_shape() {
        // Adjacent tagging must yield { "type": ..., "payload": ... }.
        let event = ServerEvent::Narration {
            event: NarrationMoment::RoundIntro,
            text: "Lightning flickers over the manor.".into(),
            round_index: Some(1),
        };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "narration");
        assert_eq!(json["payload"]["event"], "round_intro");
        assert_eq!(json["payload"]["round_index"], 1);
        assert!(json["payload"]["text"].is_string());
    }

    #[test]
    fn test_phase_event_carries_wire_phase_spelling() {
        let event = ServerEvent::Phase {
            session_id: SessionId::new("s1"),
            phase: RoundPhase::Active,
            round_index: 3,
        };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "phase");
        assert_eq!(json["payload"]["phase"], "ACTIVE");
        assert_eq!(json["payload"]["round_index"], 3);
    }

    #[test]
    fn test_timer_event_round_trip() {
        let event = ServerEvent::Timer {
            event: TimerMoment::HalfTime,
            round_index: 2,
            code: "quiz".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: ServerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }

    #[test]
    fn test_hint_discovered_has_no_text_field() {
        // The non-spoiling notice must not leak tier text.
        let event = ServerEvent::HintDiscovered {
            session_id: SessionId::new("s1"),
            hint_id: HintId::new("deadbeef"),
            round_index: 1,
            discoverer_id: PlayerId::new("p1"),
            shared: false,
        };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "hint_discovered");
        assert!(json["payload"].get("text").is_none());
        assert!(json["payload"].get("tier").is_none());
    }

    #[test]
    fn test_kind_matches_wire_tag() {
        let event = ServerEvent::PropUpdate {
            player_id: PlayerId::new("p1"),
            props: vec![],
        };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.kind());
    }

    #[test]
    fn test_client_identify_decodes_from_envelope() {
        let frame = r#"{ "type": "identify", "payload": { "player_id": "p7" } }"#;
        let msg: ClientMessage = serde_json::from_str(frame).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Identify {
                player_id: PlayerId::new("p7")
            }
        );
    }

    #[test]
    fn test_client_unknown_type_is_rejected() {
        let frame = r#"{ "type": "teleport", "payload": {} }"#;
        let result: Result<ClientMessage, _> = serde_json::from_str(frame);
        assert!(result.is_err());
    }
}
