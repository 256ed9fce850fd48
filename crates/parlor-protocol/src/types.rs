//! Identity newtypes and wire-visible enums.
//!
//! Identifiers in Parlor are opaque strings minted by the registration layer
//! (player ids, session ids) or by the core itself (hint ids). Wrapping them
//! in newtypes keeps a `PropId` from ever being passed where a `PlayerId` is
//! expected, at zero runtime cost beyond the `String` they already are.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Wraps an already-validated identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrows the raw identifier.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }
    };
}

string_id! {
    /// A unique identifier for one running party session.
    SessionId
}

string_id! {
    /// A unique identifier for a registered player.
    ///
    /// A player id is a logical identity: several live connections (tabs,
    /// devices) may be bound to the same `PlayerId` at once.
    PlayerId
}

string_id! {
    /// A unique identifier for a story prop (envelope).
    PropId
}

string_id! {
    /// A unique identifier for a delivered hint record.
    HintId
}

// ---------------------------------------------------------------------------
// RoundPhase
// ---------------------------------------------------------------------------

/// The phase of the round state machine.
///
/// Transitions only move forward:
///
/// ```text
/// IDLE → INTRO → ACTIVE → COOLDOWN → (next round) INTRO → …
/// ```
///
/// There is no undo: a phase is only ever left through the single legal
/// facilitator command for that phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundPhase {
    /// No round has been announced yet (or the plan is exhausted).
    #[default]
    Idle,
    /// The next round was announced; the facilitator has not started it.
    Intro,
    /// The mini-game is being played.
    Active,
    /// The round was closed; the party is between rounds.
    Cooldown,
}

impl RoundPhase {
    /// Whether `begin_next_round` is legal from this phase.
    pub fn can_begin_round(self) -> bool {
        matches!(self, Self::Idle | Self::Cooldown)
    }
}

impl fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "IDLE",
            Self::Intro => "INTRO",
            Self::Active => "ACTIVE",
            Self::Cooldown => "COOLDOWN",
        };
        f.write_str(label)
    }
}

// ---------------------------------------------------------------------------
// Importance
// ---------------------------------------------------------------------------

/// Importance tier of a story prop. High-importance props are placed first
/// by the allocation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    High,
    #[default]
    Medium,
    Low,
}

impl Importance {
    /// Sort rank: high before medium before low.
    pub fn rank(self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }
}

// ---------------------------------------------------------------------------
// HintTier
// ---------------------------------------------------------------------------

/// A named quality level of a clue, drawn from round-scoped prepared content.
///
/// Which tiers actually exist for a given round is data (the prepared hint
/// map), not this enum: a round may ship only `major` and `vague` texts.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum HintTier {
    Major,
    Minor,
    Vague,
    Misleading,
}

impl fmt::Display for HintTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Major => "major",
            Self::Minor => "minor",
            Self::Vague => "vague",
            Self::Misleading => "misleading",
        };
        f.write_str(label)
    }
}

// ---------------------------------------------------------------------------
// PropView
// ---------------------------------------------------------------------------

/// One entry of a player's ordered prop list, as pushed to clients.
///
/// `num` is the 1-based position in the player's own list; the ordering is
/// derived from the pool by the allocation engine and is not authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropView {
    pub num: u32,
    pub id: PropId,
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! The client app consumes these values verbatim, so the serde attributes
    //! must produce the exact wire spelling.

    use super::*;

    #[test]
    fn test_player_id_serializes_as_plain_string() {
        // `#[serde(transparent)]`: PlayerId("p1") → "p1", not {"0":"p1"}.
        let json = serde_json::to_string(&PlayerId::new("p1")).unwrap();
        assert_eq!(json, "\"p1\"");
    }

    #[test]
    fn test_player_id_deserializes_from_plain_string() {
        let pid: PlayerId = serde_json::from_str("\"p1\"").unwrap();
        assert_eq!(pid, PlayerId::new("p1"));
    }

    #[test]
    fn test_ids_are_distinct_types() {
        // Compile-time property really, but keep the display contract pinned.
        assert_eq!(PropId::new("env1").to_string(), "env1");
        assert_eq!(HintId::new("abc").as_str(), "abc");
    }

    #[test]
    fn test_round_phase_wire_spelling_is_screaming_snake() {
        assert_eq!(serde_json::to_string(&RoundPhase::Idle).unwrap(), "\"IDLE\"");
        assert_eq!(
            serde_json::to_string(&RoundPhase::Cooldown).unwrap(),
            "\"COOLDOWN\""
        );
    }

    #[test]
    fn test_round_phase_default_is_idle() {
        assert_eq!(RoundPhase::default(), RoundPhase::Idle);
    }

    #[test]
    fn test_round_phase_can_begin_round() {
        assert!(RoundPhase::Idle.can_begin_round());
        assert!(RoundPhase::Cooldown.can_begin_round());
        assert!(!RoundPhase::Intro.can_begin_round());
        assert!(!RoundPhase::Active.can_begin_round());
    }

    #[test]
    fn test_importance_rank_orders_high_first() {
        assert!(Importance::High.rank() < Importance::Medium.rank());
        assert!(Importance::Medium.rank() < Importance::Low.rank());
    }

    #[test]
    fn test_importance_wire_spelling_is_lowercase() {
        assert_eq!(serde_json::to_string(&Importance::High).unwrap(), "\"high\"");
    }

    #[test]
    fn test_hint_tier_round_trip() {
        for tier in [
            HintTier::Major,
            HintTier::Minor,
            HintTier::Vague,
            HintTier::Misleading,
        ] {
            let json = serde_json::to_string(&tier).unwrap();
            let back: HintTier = serde_json::from_str(&json).unwrap();
            assert_eq!(tier, back);
            assert_eq!(json, format!("\"{tier}\""));
        }
    }
}
