//! The `Director`: the core's logical operation surface.
//!
//! The request layer (HTTP routes, WebSocket handler, admin tooling) calls
//! the director with already-validated parameters; the director routes each
//! call to the right per-session engine. Engines are created lazily, one
//! pair per session, and cached for the process lifetime — each holds the
//! session's lock-protected record, so all mutation of one session is
//! serialized while different sessions proceed independently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use parlor_deal::{DealEngine, DealError, Distribution, PoolSummary, Reassignment};
use parlor_protocol::{HintId, HintTier, PlayerId, PropId, RoundPhase, ServerEvent, SessionId};
use parlor_registry::ConnectionRegistry;
use parlor_rounds::{BeginOutcome, Narrator, RoundConfig, RoundEngine, RoundError, RoundStatus};
use parlor_state::{HintDeliveryEntry, HintRecord, SessionHandle, SessionStore};
use parlor_transport::{Connection, ConnectionId};

struct SessionEngines<C: Connection, N: Narrator> {
    rounds: Arc<RoundEngine<C, N>>,
    deal: Arc<DealEngine<C>>,
}

impl<C: Connection, N: Narrator> Clone for SessionEngines<C, N> {
    fn clone(&self) -> Self {
        Self {
            rounds: Arc::clone(&self.rounds),
            deal: Arc::clone(&self.deal),
        }
    }
}

/// Routes validated requests to per-session orchestration engines.
pub struct Director<C: Connection, N: Narrator> {
    registry: Arc<ConnectionRegistry<C>>,
    store: Arc<SessionStore>,
    narrator: Arc<N>,
    round_config: RoundConfig,
    engines: Mutex<HashMap<SessionId, SessionEngines<C, N>>>,
}

impl<C: Connection, N: Narrator> Director<C, N> {
    /// Wires a director over a shared registry and store.
    pub fn new(
        registry: Arc<ConnectionRegistry<C>>,
        store: Arc<SessionStore>,
        narrator: Arc<N>,
        round_config: RoundConfig,
    ) -> Self {
        Self {
            registry,
            store,
            narrator,
            round_config,
            engines: Mutex::new(HashMap::new()),
        }
    }

    /// The process-wide connection registry.
    pub fn registry(&self) -> &Arc<ConnectionRegistry<C>> {
        &self.registry
    }

    /// The session handle, for registration-layer glue (adding players,
    /// seeding plans and prepared rounds).
    pub fn session(&self, session_id: &SessionId) -> Arc<SessionHandle> {
        self.store.get_or_create(session_id)
    }

    fn engines(&self, session_id: &SessionId) -> SessionEngines<C, N> {
        let mut engines = self.engines.lock().expect("engine map lock");
        engines
            .entry(session_id.clone())
            .or_insert_with(|| {
                let session = self.store.get_or_create(session_id);
                SessionEngines {
                    rounds: Arc::new(RoundEngine::new(
                        Arc::clone(&session),
                        Arc::clone(&self.registry),
                        Arc::clone(&self.narrator),
                        self.round_config.clone(),
                    )),
                    deal: Arc::new(DealEngine::new(session, Arc::clone(&self.registry))),
                }
            })
            .clone()
    }

    // ---------------------------------------------------------------------
    // Connection lifecycle and delivery
    // ---------------------------------------------------------------------

    /// Registers a freshly accepted connection as pending.
    pub fn connect(&self, conn: Arc<C>) {
        self.registry.connect(conn);
    }

    /// Binds a connection to a player identity.
    pub fn identify(&self, conn_id: ConnectionId, player_id: &PlayerId) {
        self.registry.identify(conn_id, player_id);
    }

    /// Drops a connection from the registry and closes it.
    pub async fn disconnect(&self, conn_id: ConnectionId) {
        self.registry.disconnect(conn_id).await;
    }

    /// Targeted delivery; returns the number of connections reached.
    pub async fn send_to_player(&self, player_id: &PlayerId, event: &ServerEvent) -> usize {
        self.registry.send_to_player(player_id, event).await
    }

    /// Delivery to every identified connection.
    pub async fn broadcast(&self, event: &ServerEvent) -> usize {
        self.registry.broadcast(event).await
    }

    /// Delivery to every connection, pending included.
    pub async fn broadcast_all(&self, event: &ServerEvent) -> usize {
        self.registry.broadcast_all(event).await
    }

    // ---------------------------------------------------------------------
    // Round control
    // ---------------------------------------------------------------------

    /// Announces the next round for the session.
    pub async fn begin_next_round(
        &self,
        session_id: &SessionId,
    ) -> Result<BeginOutcome, RoundError> {
        self.engines(session_id).rounds.begin_next_round().await
    }

    /// Confirms the physical start of the announced round.
    pub async fn confirm_start(&self, session_id: &SessionId) -> Result<RoundPhase, RoundError> {
        self.engines(session_id).rounds.confirm_start().await
    }

    /// Closes the running round with its result.
    pub async fn finish_current_round(
        &self,
        session_id: &SessionId,
        winners: Vec<PlayerId>,
        meta: serde_json::Value,
    ) -> Result<RoundPhase, RoundError> {
        self.engines(session_id)
            .rounds
            .finish_current_round(winners, meta)
            .await
    }

    /// Cancels the session's soft timer, if any.
    pub async fn abort_timer(&self, session_id: &SessionId) {
        self.engines(session_id).rounds.abort_timer().await;
    }

    /// Facilitator dashboard snapshot.
    pub async fn round_status(&self, session_id: &SessionId) -> RoundStatus {
        self.engines(session_id).rounds.status().await
    }

    // ---------------------------------------------------------------------
    // Allocation
    // ---------------------------------------------------------------------

    /// Distributes unassigned props equitably across the roster.
    pub async fn distribute_props(&self, session_id: &SessionId) -> Distribution {
        self.engines(session_id).deal.distribute_props().await
    }

    /// Clears every prop assignment.
    pub async fn reset_props(&self, session_id: &SessionId) -> usize {
        self.engines(session_id).deal.reset_props().await
    }

    /// Facilitator override on one prop.
    pub async fn assign_prop(
        &self,
        session_id: &SessionId,
        prop_id: &PropId,
        player_id: &PlayerId,
    ) -> Result<Reassignment, DealError> {
        self.engines(session_id)
            .deal
            .assign_prop(prop_id, player_id)
            .await
    }

    /// Pool totals for the facilitator dashboard.
    pub async fn pool_summary(&self, session_id: &SessionId) -> PoolSummary {
        self.engines(session_id).deal.pool_summary().await
    }

    // ---------------------------------------------------------------------
    // Hints
    // ---------------------------------------------------------------------

    /// Delivers a discovered hint to the whole roster.
    pub async fn deliver_hint(
        &self,
        session_id: &SessionId,
        round_index: u32,
        discoverer_id: &PlayerId,
        tier: HintTier,
        share: bool,
    ) -> Result<HintRecord, DealError> {
        self.engines(session_id)
            .deal
            .deliver_hint(round_index, discoverer_id, tier, share)
            .await
    }

    /// Destroys a hint on behalf of the culprit.
    pub async fn destroy_hint(
        &self,
        session_id: &SessionId,
        hint_id: &HintId,
        killer_id: &PlayerId,
    ) -> Result<HintRecord, DealError> {
        self.engines(session_id)
            .deal
            .destroy_hint(hint_id, killer_id)
            .await
    }

    /// A player's surviving hint view.
    pub async fn player_hints(
        &self,
        session_id: &SessionId,
        player_id: &PlayerId,
    ) -> Vec<HintDeliveryEntry> {
        self.engines(session_id).deal.player_hints(player_id).await
    }
}
