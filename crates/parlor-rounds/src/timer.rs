//! Soft round timer.
//!
//! A soft timer only *announces* checkpoints — half-time (for rounds of at
//! least a minute) and expiry. It never transitions the round: closing a
//! round is always an explicit facilitator command, even after time is up.

use std::sync::Arc;
use std::time::Duration;

use parlor_protocol::{ServerEvent, TimerMoment};
use parlor_registry::ConnectionRegistry;
use parlor_transport::Connection;
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// Durations below this fire only the expiry notice, no half-time.
pub(crate) const HALF_TIME_MIN_SECS: u64 = 60;

/// One in-flight soft timer for a session.
///
/// At most one exists per session: the engine aborts (and awaits) any
/// previous timer before spawning the next, so stale notifications from a
/// superseded timer can never land.
pub struct SoftTimer {
    handle: JoinHandle<()>,
}

impl SoftTimer {
    /// Spawns the countdown task for a round with a `secs` time budget.
    pub fn spawn<C: Connection>(
        registry: Arc<ConnectionRegistry<C>>,
        secs: u64,
        round_index: u32,
        code: String,
    ) -> Self {
        let handle = tokio::spawn(async move {
            if secs >= HALF_TIME_MIN_SECS {
                sleep(Duration::from_secs((secs / 2).max(1))).await;
                registry
                    .broadcast(&ServerEvent::Timer {
                        event: TimerMoment::HalfTime,
                        round_index,
                        code: code.clone(),
                    })
                    .await;
                sleep(Duration::from_secs(secs - secs / 2)).await;
            } else {
                sleep(Duration::from_secs(secs)).await;
            }
            tracing::debug!(round_index, "soft timer expired");
            registry
                .broadcast(&ServerEvent::Timer {
                    event: TimerMoment::Expired,
                    round_index,
                    code,
                })
                .await;
        });
        Self { handle }
    }

    /// Cancels the timer and waits until its task has fully stopped, so no
    /// notification from it can still be in flight afterwards.
    pub async fn abort(self) {
        self.handle.abort();
        let _ = self.handle.await;
    }

    /// Whether the countdown task has already run to completion.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
