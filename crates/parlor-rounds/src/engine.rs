//! The per-session round engine.

use std::sync::Arc;
use std::time::Duration;

use parlor_protocol::{NarrationMoment, PlayerId, PromptKind, RoundPhase, ServerEvent};
use parlor_registry::ConnectionRegistry;
use parlor_state::{RoundResult, RoundSpec, SessionHandle, SessionState};
use parlor_transport::Connection;
use serde::Serialize;

use crate::error::RoundError;
use crate::narrator::{NarrationRequest, Narrator, fallback_line};
use crate::timer::SoftTimer;

/// Tunables for the round engine.
#[derive(Debug, Clone)]
pub struct RoundConfig {
    /// Upper bound on one narration attempt; past it the fallback line is
    /// used and the transition proceeds.
    pub narration_timeout: Duration,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            narration_timeout: Duration::from_secs(10),
        }
    }
}

/// Result of [`RoundEngine::begin_next_round`].
#[derive(Debug, Clone, PartialEq)]
pub enum BeginOutcome {
    /// A round was announced and the session is in INTRO.
    Started { round_index: u32, round: RoundSpec },
    /// The plan is exhausted; a session-end notice went out and the round
    /// counter did not advance. Calling again repeats the notice.
    PlanExhausted,
}

/// Snapshot of where the session is, for the facilitator dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct RoundStatus {
    pub phase: RoundPhase,
    pub round_index: u32,
    pub current_round: Option<RoundSpec>,
    pub next_round: Option<RoundSpec>,
    pub total_rounds: usize,
    pub timer_running: bool,
}

/// Drives one session's round phases, timers, and narration.
///
/// All state mutation happens under the session handle's lock; the timer
/// slot has its own lock, always taken *after* the session lock when both
/// are needed, never the other way around.
pub struct RoundEngine<C: Connection, N: Narrator> {
    session: Arc<SessionHandle>,
    registry: Arc<ConnectionRegistry<C>>,
    narrator: Arc<N>,
    timer: tokio::sync::Mutex<Option<SoftTimer>>,
    config: RoundConfig,
}

impl<C: Connection, N: Narrator> RoundEngine<C, N> {
    /// Creates the engine for one session.
    pub fn new(
        session: Arc<SessionHandle>,
        registry: Arc<ConnectionRegistry<C>>,
        narrator: Arc<N>,
        config: RoundConfig,
    ) -> Self {
        Self {
            session,
            registry,
            narrator,
            timer: tokio::sync::Mutex::new(None),
            config,
        }
    }

    /// The session this engine belongs to.
    pub fn session(&self) -> &Arc<SessionHandle> {
        &self.session
    }

    /// Dashboard snapshot: phase, current/next round, timer liveness.
    pub async fn status(&self) -> RoundStatus {
        let state = self.session.lock().await;
        let index = state.progress.round_index;
        RoundStatus {
            phase: state.progress.phase,
            round_index: index,
            current_round: state.plan.get(index).cloned(),
            next_round: state.plan.get(index + 1).cloned(),
            total_rounds: state.plan.len(),
            timer_running: self.timer_running().await,
        }
    }

    /// Whether a soft timer is currently counting down.
    pub async fn timer_running(&self) -> bool {
        self.timer
            .lock()
            .await
            .as_ref()
            .is_some_and(|t| !t.is_finished())
    }

    // ---------------------------------------------------------------------
    // Transitions
    // ---------------------------------------------------------------------

    /// Announces the next round: IDLE/COOLDOWN → INTRO.
    ///
    /// Rejected with the current phase while a round is being introduced or
    /// played. Past the last planned round it emits a session-end notice and
    /// reports [`BeginOutcome::PlanExhausted`] without advancing further.
    pub async fn begin_next_round(&self) -> Result<BeginOutcome, RoundError> {
        let mut state = self.session.lock().await;
        if state.plan.is_empty() {
            return Err(RoundError::EmptyPlan);
        }
        let phase = state.progress.phase;
        if !phase.can_begin_round() {
            return Err(RoundError::PhaseConflict { phase });
        }

        // A stale timer from an aborted round must not outlive its round.
        self.stop_timer().await;

        if state.progress.round_index as usize >= state.plan.len() {
            state.log_event("session_end", serde_json::json!({}));
            self.save(&state);
            let text = self
                .narrate(&mut state, NarrationMoment::SessionEnd, None, None, None)
                .await;
            tracing::info!(session_id = %state.session_id, %text, "plan exhausted");
            return Ok(BeginOutcome::PlanExhausted);
        }

        state.progress.round_index += 1;
        let round_index = state.progress.round_index;
        let round = state
            .plan
            .get(round_index)
            .cloned()
            .expect("index just validated against plan length");
        state.progress.phase = RoundPhase::Intro;
        state.log_event(
            "round_phase",
            serde_json::json!({ "phase": "INTRO", "round_index": round_index }),
        );
        self.save(&state);

        tracing::info!(
            session_id = %state.session_id,
            round_index,
            code = %round.code,
            "round announced"
        );

        // Prepared intro text wins; otherwise narrate live from the seed.
        let prepared_intro = state
            .prepared
            .get(&round_index)
            .and_then(|p| p.intro.clone());
        match prepared_intro {
            Some(text) => {
                self.registry
                    .broadcast(&ServerEvent::Narration {
                        event: NarrationMoment::RoundIntro,
                        text,
                        round_index: Some(round_index),
                    })
                    .await;
            }
            None => {
                self.narrate(
                    &mut state,
                    NarrationMoment::RoundIntro,
                    round.intro.clone(),
                    Some(round_index),
                    Some(round.code.clone()),
                )
                .await;
            }
        }

        self.broadcast_phase(&state).await;
        self.registry
            .broadcast(&ServerEvent::Prompt {
                kind: PromptKind::StartMinigame,
                round_index,
                code: Some(round.code.clone()),
                theme: round.theme.clone(),
            })
            .await;

        Ok(BeginOutcome::Started { round_index, round })
    }

    /// Confirms the physical start of the announced round: INTRO → ACTIVE.
    /// Starts the soft timer when the round declares a time budget.
    pub async fn confirm_start(&self) -> Result<RoundPhase, RoundError> {
        let mut state = self.session.lock().await;
        let phase = state.progress.phase;
        if phase != RoundPhase::Intro {
            return Err(RoundError::PhaseConflict { phase });
        }

        state.progress.phase = RoundPhase::Active;
        let round_index = state.progress.round_index;
        state.log_event(
            "round_phase",
            serde_json::json!({ "phase": "ACTIVE", "round_index": round_index }),
        );
        self.save(&state);

        let round = state.plan.get(round_index).cloned();
        let code = round.as_ref().map(|r| r.code.clone());

        self.narrate(
            &mut state,
            NarrationMoment::RoundStart,
            None,
            Some(round_index),
            code.clone(),
        )
        .await;
        self.broadcast_phase(&state).await;

        if let Some(secs) = round.as_ref().and_then(|r| r.max_secs) {
            self.start_timer(secs, round_index, code.unwrap_or_default())
                .await;
        }

        Ok(RoundPhase::Active)
    }

    /// Closes the running round: ACTIVE → COOLDOWN. Records the result,
    /// cancels the timer, narrates the outro, and prompts for the next round.
    pub async fn finish_current_round(
        &self,
        winners: Vec<PlayerId>,
        meta: serde_json::Value,
    ) -> Result<RoundPhase, RoundError> {
        let mut state = self.session.lock().await;
        let phase = state.progress.phase;
        if phase != RoundPhase::Active {
            return Err(RoundError::PhaseConflict { phase });
        }

        self.stop_timer().await;

        let round_index = state.progress.round_index;
        state
            .progress
            .results
            .insert(round_index, RoundResult { winners, meta });
        state.progress.phase = RoundPhase::Cooldown;
        state.log_event(
            "round_phase",
            serde_json::json!({ "phase": "COOLDOWN", "round_index": round_index }),
        );
        self.save(&state);

        let round = state.plan.get(round_index).cloned();
        let prepared_outro = state
            .prepared
            .get(&round_index)
            .and_then(|p| p.outro.clone());
        let seed = prepared_outro.or_else(|| round.as_ref().and_then(|r| r.outro.clone()));
        self.narrate(
            &mut state,
            NarrationMoment::RoundEnd,
            seed,
            Some(round_index),
            round.map(|r| r.code),
        )
        .await;

        self.broadcast_phase(&state).await;
        self.registry
            .broadcast(&ServerEvent::Prompt {
                kind: PromptKind::NextRoundReady,
                round_index,
                code: None,
                theme: None,
            })
            .await;

        Ok(RoundPhase::Cooldown)
    }

    /// Cancels any in-flight timer. Safe to call when none is running.
    pub async fn abort_timer(&self) {
        self.stop_timer().await;
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    /// Replaces the current timer, aborting (and awaiting) any previous one
    /// first so at most one timer's notifications are ever in flight.
    async fn start_timer(&self, secs: u64, round_index: u32, code: String) {
        let mut slot = self.timer.lock().await;
        if let Some(old) = slot.take() {
            old.abort().await;
        }
        *slot = Some(SoftTimer::spawn(
            Arc::clone(&self.registry),
            secs,
            round_index,
            code,
        ));
        tracing::debug!(round_index, secs, "soft timer started");
    }

    async fn stop_timer(&self) {
        let mut slot = self.timer.lock().await;
        if let Some(timer) = slot.take() {
            timer.abort().await;
        }
    }

    /// Runs the narrator with a timeout, broadcasts the resulting line, and
    /// logs an audit event when the fallback had to step in.
    async fn narrate(
        &self,
        state: &mut SessionState,
        moment: NarrationMoment,
        seed: Option<String>,
        round_index: Option<u32>,
        code: Option<String>,
    ) -> String {
        let request = NarrationRequest {
            moment,
            seed,
            round_index,
            code,
        };
        let generated =
            tokio::time::timeout(self.config.narration_timeout, self.narrator.narrate(&request))
                .await;

        let text = match generated {
            Ok(Ok(text)) if !text.trim().is_empty() => text,
            other => {
                let reason = match other {
                    Err(_) => "timeout",
                    Ok(Err(_)) => "error",
                    Ok(Ok(_)) => "empty",
                };
                tracing::warn!(?moment, reason, "narration failed, using fallback line");
                state.log_event(
                    "narration_fallback",
                    serde_json::json!({ "moment": moment, "reason": reason }),
                );
                self.save(state);
                fallback_line(moment).to_owned()
            }
        };

        self.registry
            .broadcast(&ServerEvent::Narration {
                event: moment,
                text: text.clone(),
                round_index,
            })
            .await;
        text
    }

    async fn broadcast_phase(&self, state: &SessionState) {
        self.registry
            .broadcast(&ServerEvent::Phase {
                session_id: state.session_id.clone(),
                phase: state.progress.phase,
                round_index: state.progress.round_index,
            })
            .await;
    }

    /// Persistence failures are reported and survived; the in-memory record
    /// stays authoritative.
    fn save(&self, state: &SessionState) {
        if let Err(error) = self.session.save(state) {
            tracing::warn!(session_id = %state.session_id, %error, "session save failed");
        }
    }
}
