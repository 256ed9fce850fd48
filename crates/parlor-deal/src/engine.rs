//! Registry-coupled wrapper around the pure allocation and hint functions.
//!
//! The pure functions mutate a [`SessionState`]; this engine adds what a
//! running party needs around them: the per-session lock, persistence, and
//! the targeted/broadcast pushes that keep clients in sync.

use std::collections::BTreeMap;
use std::sync::Arc;

use parlor_protocol::{HintId, HintTier, PlayerId, PropId, PropView, ServerEvent};
use parlor_registry::ConnectionRegistry;
use parlor_state::{HintDeliveryEntry, HintRecord, SessionHandle, SessionState};
use parlor_transport::Connection;

use crate::error::DealError;
use crate::props::{self, Distribution, PoolSummary, Reassignment};
use crate::hints;

/// Runs allocation and hint operations for one session and pushes the
/// resulting updates to connected clients.
pub struct DealEngine<C: Connection> {
    session: Arc<SessionHandle>,
    registry: Arc<ConnectionRegistry<C>>,
}

impl<C: Connection> DealEngine<C> {
    /// Creates the engine for one session.
    pub fn new(session: Arc<SessionHandle>, registry: Arc<ConnectionRegistry<C>>) -> Self {
        Self { session, registry }
    }

    /// The session this engine belongs to.
    pub fn session(&self) -> &Arc<SessionHandle> {
        &self.session
    }

    // ---------------------------------------------------------------------
    // Props
    // ---------------------------------------------------------------------

    /// Runs the equitable distribution and notifies every player whose prop
    /// list changed.
    pub async fn distribute_props(&self) -> Distribution {
        let (report, changed) = {
            let mut state = self.session.lock().await;
            let before = views_by_player(&state);
            let report = props::distribute_equitable(&mut state);
            if report.assigned > 0 {
                state.log_event(
                    "props_distributed",
                    serde_json::json!({ "assigned": report.assigned, "left": report.left }),
                );
            }
            self.save(&state);
            (report, changed_views(before, &state))
        };
        self.push_prop_updates(changed).await;
        report
    }

    /// Clears every assignment and notifies players who held props.
    pub async fn reset_props(&self) -> usize {
        let (cleared, changed) = {
            let mut state = self.session.lock().await;
            let before = views_by_player(&state);
            let cleared = props::reset_assignments(&mut state);
            state.log_event("props_reset", serde_json::json!({ "reset": cleared }));
            self.save(&state);
            (cleared, changed_views(before, &state))
        };
        self.push_prop_updates(changed).await;
        cleared
    }

    /// Facilitator override on a single prop; both the previous and the new
    /// owner get a fresh prop list.
    pub async fn assign_prop(
        &self,
        prop_id: &PropId,
        player_id: &PlayerId,
    ) -> Result<Reassignment, DealError> {
        let (outcome, changed) = {
            let mut state = self.session.lock().await;
            let before = views_by_player(&state);
            let outcome = props::assign_specific(&mut state, prop_id, player_id)?;
            state.log_event(
                "prop_assigned",
                serde_json::json!({
                    "prop_id": prop_id.as_str(),
                    "player_id": player_id.as_str(),
                    "previous_owner": outcome.previous_owner.as_ref().map(|p| p.as_str().to_owned()),
                }),
            );
            self.save(&state);
            (outcome, changed_views(before, &state))
        };
        self.push_prop_updates(changed).await;
        Ok(outcome)
    }

    /// Dashboard snapshot of the pool.
    pub async fn pool_summary(&self) -> PoolSummary {
        let state = self.session.lock().await;
        props::pool_summary(&state)
    }

    // ---------------------------------------------------------------------
    // Hints
    // ---------------------------------------------------------------------

    /// Delivers a hint: one targeted push per player with their own tier and
    /// text, plus a non-spoiling broadcast notice.
    pub async fn deliver_hint(
        &self,
        round_index: u32,
        discoverer_id: &PlayerId,
        tier: HintTier,
        share: bool,
    ) -> Result<HintRecord, DealError> {
        let record = {
            let mut state = self.session.lock().await;
            let record = hints::deliver_hint(&mut state, round_index, discoverer_id, tier, share)?;
            self.save(&state);
            record
        };

        let session_id = self.session.id().clone();
        for delivery in &record.deliveries {
            self.registry
                .send_to_player(
                    &delivery.player_id,
                    &ServerEvent::HintDelivered {
                        session_id: session_id.clone(),
                        hint_id: record.hint_id.clone(),
                        round_index: record.round_index,
                        tier: delivery.tier,
                        text: delivery.text.clone(),
                        discoverer_id: record.discoverer_id.clone(),
                        shared: record.shared,
                    },
                )
                .await;
        }
        self.registry
            .broadcast(&ServerEvent::HintDiscovered {
                session_id,
                hint_id: record.hint_id.clone(),
                round_index: record.round_index,
                discoverer_id: record.discoverer_id.clone(),
                shared: record.shared,
            })
            .await;

        Ok(record)
    }

    /// Destroys a hint and broadcasts the non-spoiling notice.
    pub async fn destroy_hint(
        &self,
        hint_id: &HintId,
        killer_id: &PlayerId,
    ) -> Result<HintRecord, DealError> {
        let record = {
            let mut state = self.session.lock().await;
            let record = hints::destroy_hint(&mut state, hint_id, killer_id)?;
            self.save(&state);
            record
        };

        self.registry
            .broadcast(&ServerEvent::HintDestroyed {
                session_id: self.session.id().clone(),
                hint_id: record.hint_id.clone(),
                destroyed_by: killer_id.clone(),
            })
            .await;

        Ok(record)
    }

    /// A player's surviving hint deliveries, for display queries.
    pub async fn player_hints(&self, player_id: &PlayerId) -> Vec<HintDeliveryEntry> {
        let state = self.session.lock().await;
        hints::hints_for_player(&state, player_id)
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    async fn push_prop_updates(&self, changed: Vec<(PlayerId, Vec<PropView>)>) {
        for (player_id, views) in changed {
            self.registry
                .send_to_player(
                    &player_id,
                    &ServerEvent::PropUpdate {
                        player_id: player_id.clone(),
                        props: views,
                    },
                )
                .await;
        }
    }

    fn save(&self, state: &SessionState) {
        if let Err(error) = self.session.save(state) {
            tracing::warn!(session_id = %state.session_id, %error, "session save failed");
        }
    }
}

fn views_by_player(state: &SessionState) -> BTreeMap<PlayerId, Vec<PropView>> {
    state
        .players
        .iter()
        .map(|p| (p.id.clone(), p.props.clone()))
        .collect()
}

fn changed_views(
    before: BTreeMap<PlayerId, Vec<PropView>>,
    state: &SessionState,
) -> Vec<(PlayerId, Vec<PropView>)> {
    state
        .players
        .iter()
        .filter(|p| before.get(&p.id) != Some(&p.props))
        .map(|p| (p.id.clone(), p.props.clone()))
        .collect()
}
