//! The session record: everything one running party knows about itself.

use std::collections::BTreeMap;

use parlor_protocol::{
    HintId, HintTier, Importance, PlayerId, PropId, PropView, RoundPhase, SessionId,
};
use serde::{Deserialize, Serialize};

use crate::events::{EventRecord, MAX_AUDIT_EVENTS};

// ---------------------------------------------------------------------------
// Players
// ---------------------------------------------------------------------------

/// The story role a player was dealt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlayerRole {
    /// The designated antagonist; the only role allowed to destroy hints.
    Culprit,
    #[default]
    Other,
}

/// One registered party guest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub display_name: String,
    /// Assigned story character, if casting has happened.
    #[serde(default)]
    pub character: Option<String>,
    #[serde(default)]
    pub role: PlayerRole,
    /// Registration order. Stable tie-break for the allocation engine:
    /// on equal prop counts, the lower seat wins.
    pub seat: u32,
    /// Derived, ordered view of the props assigned to this player.
    /// The pool is authoritative; this list is recomputed after every
    /// allocation change.
    #[serde(default)]
    pub props: Vec<PropView>,
}

// ---------------------------------------------------------------------------
// Props
// ---------------------------------------------------------------------------

/// A physical story item (envelope) in the session's pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prop {
    pub id: PropId,
    #[serde(default)]
    pub importance: Importance,
    /// `None` until the allocation engine (or a facilitator override)
    /// places the prop. Once set, allocation runs never move it.
    #[serde(default)]
    pub assigned_to: Option<PlayerId>,
}

// ---------------------------------------------------------------------------
// Round plan
// ---------------------------------------------------------------------------

/// One planned mini-game slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundSpec {
    /// Short identifier of the mini-game, e.g. `"quiz"` or `"seance"`.
    pub code: String,
    #[serde(default)]
    pub theme: Option<String>,
    /// Narration seed for the round intro (ambiance hint for the narrator).
    #[serde(default)]
    pub intro: Option<String>,
    /// Narration seed for the round outro.
    #[serde(default)]
    pub outro: Option<String>,
    /// Soft time budget in seconds. `None` means the round is untimed.
    #[serde(default)]
    pub max_secs: Option<u64>,
}

/// The ordered sequence of rounds planned for the party.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RoundPlan {
    #[serde(default)]
    pub rounds: Vec<RoundSpec>,
}

impl RoundPlan {
    /// Number of planned rounds.
    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    /// Whether the plan has no rounds at all.
    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    /// Looks up a round by its 1-based index (0 = "not started" is never
    /// a valid round).
    pub fn get(&self, round_index: u32) -> Option<&RoundSpec> {
        if round_index == 0 {
            return None;
        }
        self.rounds.get(round_index as usize - 1)
    }
}

// ---------------------------------------------------------------------------
// Round progress
// ---------------------------------------------------------------------------

/// Recorded outcome of a finished round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RoundResult {
    #[serde(default)]
    pub winners: Vec<PlayerId>,
    #[serde(default)]
    pub meta: serde_json::Value,
}

/// Where the session currently is in its round sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RoundProgress {
    #[serde(default)]
    pub phase: RoundPhase,
    /// 1-based index of the current round; 0 before the first round.
    #[serde(default)]
    pub round_index: u32,
    #[serde(default)]
    pub results: BTreeMap<u32, RoundResult>,
}

// ---------------------------------------------------------------------------
// Prepared rounds
// ---------------------------------------------------------------------------

/// Pre-generated assets for one round, produced ahead of time by the
/// preparation pipeline (outside the core) and consumed read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PreparedRound {
    /// Clue text per tier. Which tiers exist is entirely data-driven.
    #[serde(default)]
    pub hints: BTreeMap<HintTier, String>,
    /// Sharing policy: when a discoverer keeps a find of tier K to
    /// themselves, everyone else receives `sharing_rules[K]` instead.
    #[serde(default)]
    pub sharing_rules: BTreeMap<HintTier, HintTier>,
    /// Pre-generated intro narration, if the pipeline produced one.
    #[serde(default)]
    pub intro: Option<String>,
    #[serde(default)]
    pub outro: Option<String>,
}

// ---------------------------------------------------------------------------
// Hints
// ---------------------------------------------------------------------------

/// What one recipient actually received for a given hint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HintDeliveryEntry {
    pub player_id: PlayerId,
    pub tier: HintTier,
    pub text: String,
}

/// Immutable record of one hint discovery and its per-player deliveries.
///
/// Created once at delivery time; only `destroyed`/`destroyed_by` ever
/// change afterwards, and each exactly once. Display queries filter this
/// history, so it must match what was actually sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HintRecord {
    pub hint_id: HintId,
    pub round_index: u32,
    pub discoverer_id: PlayerId,
    pub source_tier: HintTier,
    pub shared: bool,
    /// The tier non-discoverers received (equals `source_tier` when shared).
    pub other_tier: HintTier,
    pub deliveries: Vec<HintDeliveryEntry>,
    #[serde(default)]
    pub destroyed: bool,
    #[serde(default)]
    pub destroyed_by: Option<PlayerId>,
    pub created_at: u64,
}

// ---------------------------------------------------------------------------
// Killer ledger
// ---------------------------------------------------------------------------

/// Quota accounting for the culprit's destroy action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct KillerLedger {
    /// Configured maximum number of destroys. 0 means unlimited.
    #[serde(default)]
    pub destroy_quota: u32,
    #[serde(default)]
    pub destroy_used: u32,
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// The full mutable record of one running party.
///
/// Owned by the [`SessionStore`](crate::SessionStore); the engines only ever
/// touch it through a [`SessionHandle`](crate::SessionHandle) lock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: SessionId,
    #[serde(default)]
    pub join_code: Option<String>,
    /// Roster in registration order (the order assigns seats).
    #[serde(default)]
    pub players: Vec<Player>,
    /// Free-form facilitator flags: phase labels, lock flags, canon facts.
    #[serde(default)]
    pub flags: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub plan: RoundPlan,
    #[serde(default)]
    pub props: Vec<Prop>,
    /// Prepared assets keyed by 1-based round index.
    #[serde(default)]
    pub prepared: BTreeMap<u32, PreparedRound>,
    #[serde(default)]
    pub progress: RoundProgress,
    #[serde(default)]
    pub hints: Vec<HintRecord>,
    #[serde(default)]
    pub killer: KillerLedger,
    /// Audit journal. Persisted separately as ndjson, not in `state.json`.
    #[serde(skip)]
    pub events: Vec<EventRecord>,
}

impl SessionState {
    /// A fresh, empty session record.
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            join_code: None,
            players: Vec::new(),
            flags: BTreeMap::new(),
            plan: RoundPlan::default(),
            props: Vec::new(),
            prepared: BTreeMap::new(),
            progress: RoundProgress::default(),
            hints: Vec::new(),
            killer: KillerLedger::default(),
            events: Vec::new(),
        }
    }

    /// Adds a player to the roster, assigning the next seat.
    ///
    /// Registration itself lives outside the core; this is the hook the
    /// registration layer calls with an already-minted id.
    pub fn add_player(&mut self, id: PlayerId, display_name: impl Into<String>) -> &Player {
        let seat = self.players.len() as u32;
        let display_name = display_name.into();
        self.log_event(
            "player_join",
            serde_json::json!({ "player_id": id.as_str(), "display_name": display_name }),
        );
        self.players.push(Player {
            id,
            display_name,
            character: None,
            role: PlayerRole::Other,
            seat,
            props: Vec::new(),
        });
        self.players.last().expect("just pushed")
    }

    /// Looks up a player by id.
    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == id)
    }

    /// Mutable lookup by id.
    pub fn player_mut(&mut self, id: &PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| &p.id == id)
    }

    /// Whether the roster contains this player.
    pub fn has_player(&self, id: &PlayerId) -> bool {
        self.player(id).is_some()
    }

    /// The designated culprit, if one has been cast.
    pub fn culprit_id(&self) -> Option<&PlayerId> {
        self.players
            .iter()
            .find(|p| p.role == PlayerRole::Culprit)
            .map(|p| &p.id)
    }

    /// Looks up a hint record by id.
    pub fn hint(&self, id: &HintId) -> Option<&HintRecord> {
        self.hints.iter().find(|h| &h.hint_id == id)
    }

    /// Looks up a prop by id.
    pub fn prop(&self, id: &PropId) -> Option<&Prop> {
        self.props.iter().find(|p| &p.id == id)
    }

    /// Appends an audit entry, trimming the journal to its bound.
    pub fn log_event(&mut self, kind: &str, payload: serde_json::Value) -> &EventRecord {
        self.events.push(EventRecord::new(kind, "system", payload));
        if self.events.len() > MAX_AUDIT_EVENTS {
            let overflow = self.events.len() - MAX_AUDIT_EVENTS;
            self.events.drain(..overflow);
        }
        self.events.last().expect("just pushed")
    }
}

// =========================================================================
// Tests
// =========================================================================
