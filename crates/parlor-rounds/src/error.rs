//! Error types for round orchestration.

use parlor_protocol::RoundPhase;

/// Errors that can occur while driving the round state machine.
#[derive(Debug, thiserror::Error)]
pub enum RoundError {
    /// The command is not legal from the current phase. Carries the phase so
    /// the facilitator UI can explain the rejection; the phase is unchanged.
    #[error("command not legal while round phase is {phase}")]
    PhaseConflict { phase: RoundPhase },

    /// The session has no round plan to advance through.
    #[error("the session plan has no rounds")]
    EmptyPlan,
}
