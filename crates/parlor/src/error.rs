//! Unified error type for the Parlor facade.

use parlor_deal::DealError;
use parlor_protocol::ProtocolError;
use parlor_rounds::RoundError;
use parlor_state::StoreError;
use parlor_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// Host applications using the `parlor` facade deal with this single type;
/// `#[from]` keeps `?` working across the sub-crate boundaries.
#[derive(Debug, thiserror::Error)]
pub enum ParlorError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session persistence error.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A round state machine rejection.
    #[error(transparent)]
    Round(#[from] RoundError),

    /// An allocation or hint policy rejection.
    #[error(transparent)]
    Deal(#[from] DealError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_protocol::RoundPhase;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let parlor_err: ParlorError = err.into();
        assert!(matches!(parlor_err, ParlorError::Transport(_)));
        assert!(parlor_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_round_error() {
        let err = RoundError::PhaseConflict {
            phase: RoundPhase::Active,
        };
        let parlor_err: ParlorError = err.into();
        assert!(matches!(parlor_err, ParlorError::Round(_)));
        assert!(parlor_err.to_string().contains("ACTIVE"));
    }

    #[test]
    fn test_from_deal_error() {
        let err = DealError::QuotaReached { quota: 2 };
        let parlor_err: ParlorError = err.into();
        assert!(matches!(parlor_err, ParlorError::Deal(_)));
    }
}
