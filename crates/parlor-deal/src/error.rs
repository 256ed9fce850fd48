//! Error types for the allocation and hint engines.

use parlor_protocol::{HintId, HintTier, PlayerId, PropId};

/// Errors surfaced by prop allocation and hint delivery.
///
/// Every variant is facilitator-actionable and maps to a distinct outcome;
/// policy violations are never collapsed into a generic failure.
#[derive(Debug, thiserror::Error)]
pub enum DealError {
    /// The prop id does not exist in this session's pool.
    #[error("prop {0} not found")]
    PropNotFound(PropId),

    /// The discoverer is not on this session's roster.
    #[error("unknown discoverer {0}")]
    UnknownDiscoverer(PlayerId),

    /// No prepared hint content exists for this round.
    #[error("round {0} is not prepared")]
    RoundNotPrepared(u32),

    /// The requested tier has no text in this round's prepared content.
    #[error("hint tier '{0}' not available for this round")]
    TierUnavailable(HintTier),

    /// The hint id does not exist in this session's history.
    #[error("hint {0} not found")]
    HintNotFound(HintId),

    /// The hint was already destroyed; destruction happens exactly once.
    #[error("hint {0} already destroyed")]
    AlreadyDestroyed(HintId),

    /// A designated culprit exists and the caller is not that player.
    #[error("only the culprit may destroy hints")]
    NotAuthorized,

    /// The destroy quota is already consumed.
    #[error("destroy quota of {quota} already consumed")]
    QuotaReached { quota: u32 },
}
