//! The connection registry: pending pool, per-player buckets, delivery.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use parlor_protocol::{PlayerId, ServerEvent};
use parlor_transport::{Connection, ConnectionId};

/// Tracks live connections and delivers events to them.
///
/// ## Buckets
///
/// A connection is a member of exactly one bucket at any time: the pending
/// pool (no identity yet) or the bucket of the player it identified as.
/// `identify` moves it atomically; `disconnect` removes it from wherever it
/// is. Generic over the transport's [`Connection`] so tests run against the
/// in-memory loopback.
///
/// ## Concurrency note
///
/// The interior map is guarded by a `std::sync::Mutex` held only for
/// lookups and moves, never across an await. Sends iterate over a snapshot
/// taken under the lock, so a delivery failure's cleanup (which re-locks and
/// mutates the registry) cannot corrupt an in-progress iteration.
pub struct ConnectionRegistry<C: Connection> {
    inner: Mutex<Inner<C>>,
}

struct Inner<C> {
    /// Accepted connections that have not identified yet.
    pending: HashMap<ConnectionId, Arc<C>>,
    /// Identified connections, bucketed by player.
    by_player: HashMap<PlayerId, HashMap<ConnectionId, Arc<C>>>,
}

impl<C: Connection> ConnectionRegistry<C> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                pending: HashMap::new(),
                by_player: HashMap::new(),
            }),
        }
    }

    /// Registers a freshly accepted connection as pending.
    pub fn connect(&self, conn: Arc<C>) {
        let conn_id = conn.id();
        let mut inner = self.inner.lock().expect("registry lock");
        inner.pending.insert(conn_id, conn);
        tracing::debug!(%conn_id, "connection pending");
    }

    /// Binds a connection to a player identity.
    ///
    /// Idempotent: re-identifying with the same player is a no-op, a
    /// different player is an atomic move between buckets, and an unknown
    /// connection id is silently tolerated (the socket raced a disconnect).
    pub fn identify(&self, conn_id: ConnectionId, player_id: &PlayerId) {
        let mut inner = self.inner.lock().expect("registry lock");

        // Already in the right bucket?
        if let Some(bucket) = inner.by_player.get(player_id) {
            if bucket.contains_key(&conn_id) {
                return;
            }
        }

        let Some(conn) = remove_from_buckets(&mut inner, conn_id) else {
            tracing::debug!(%conn_id, %player_id, "identify for unknown connection, ignoring");
            return;
        };

        inner
            .by_player
            .entry(player_id.clone())
            .or_default()
            .insert(conn_id, conn);
        tracing::info!(%conn_id, %player_id, "connection identified");
    }

    /// Removes a connection from every bucket and attempts a transport-level
    /// close. Tolerates connections that were never registered.
    pub async fn disconnect(&self, conn_id: ConnectionId) {
        let removed = {
            let mut inner = self.inner.lock().expect("registry lock");
            remove_from_buckets(&mut inner, conn_id)
        };
        if let Some(conn) = removed {
            // Best-effort close; the peer may already be gone.
            let _ = conn.close().await;
            tracing::debug!(%conn_id, "connection removed");
        }
    }

    // ---------------------------------------------------------------------
    // Delivery
    // ---------------------------------------------------------------------

    /// Delivers an event to every connection bound to `player_id`.
    ///
    /// Returns the number of successful deliveries. A connection that fails
    /// to send is treated as dead and evicted without affecting the rest.
    pub async fn send_to_player(&self, player_id: &PlayerId, event: &ServerEvent) -> usize {
        let Some(frame) = self.encode(event) else {
            return 0;
        };
        let conns = {
            let inner = self.inner.lock().expect("registry lock");
            inner
                .by_player
                .get(player_id)
                .map(|bucket| bucket.values().cloned().collect::<Vec<_>>())
                .unwrap_or_default()
        };
        self.send_frame(conns, &frame).await
    }

    /// Delivers an event to every identified connection.
    pub async fn broadcast(&self, event: &ServerEvent) -> usize {
        let Some(frame) = self.encode(event) else {
            return 0;
        };
        let conns = {
            let inner = self.inner.lock().expect("registry lock");
            inner
                .by_player
                .values()
                .flat_map(|bucket| bucket.values().cloned())
                .collect::<Vec<_>>()
        };
        self.send_frame(conns, &frame).await
    }

    /// Delivers an event to every connection, identified **and** pending.
    /// Rarely needed — pending sockets have not said who they are yet.
    pub async fn broadcast_all(&self, event: &ServerEvent) -> usize {
        let Some(frame) = self.encode(event) else {
            return 0;
        };
        let conns = {
            let inner = self.inner.lock().expect("registry lock");
            inner
                .by_player
                .values()
                .flat_map(|bucket| bucket.values().cloned())
                .chain(inner.pending.values().cloned())
                .collect::<Vec<_>>()
        };
        self.send_frame(conns, &frame).await
    }

    /// Sends one encoded frame to a snapshot of connections, evicting any
    /// that fail.
    async fn send_frame(&self, conns: Vec<Arc<C>>, frame: &str) -> usize {
        let mut delivered = 0;
        for conn in conns {
            match conn.send_text(frame).await {
                Ok(()) => delivered += 1,
                Err(error) => {
                    let conn_id = conn.id();
                    tracing::debug!(%conn_id, %error, "send failed, evicting connection");
                    let mut inner = self.inner.lock().expect("registry lock");
                    remove_from_buckets(&mut inner, conn_id);
                }
            }
        }
        delivered
    }

    fn encode(&self, event: &ServerEvent) -> Option<String> {
        match serde_json::to_string(event) {
            Ok(frame) => Some(frame),
            Err(error) => {
                tracing::error!(kind = event.kind(), %error, "failed to encode event");
                None
            }
        }
    }

    // ---------------------------------------------------------------------
    // Introspection
    // ---------------------------------------------------------------------

    /// Player the connection is currently bound to, if any.
    pub fn identity_of(&self, conn_id: ConnectionId) -> Option<PlayerId> {
        let inner = self.inner.lock().expect("registry lock");
        inner
            .by_player
            .iter()
            .find(|(_, bucket)| bucket.contains_key(&conn_id))
            .map(|(pid, _)| pid.clone())
    }

    /// Total live connections (pending + identified).
    pub fn connection_count(&self) -> usize {
        let inner = self.inner.lock().expect("registry lock");
        inner.pending.len() + inner.by_player.values().map(HashMap::len).sum::<usize>()
    }

    /// Live connections bound to a specific player.
    pub fn player_connection_count(&self, player_id: &PlayerId) -> usize {
        let inner = self.inner.lock().expect("registry lock");
        inner.by_player.get(player_id).map_or(0, HashMap::len)
    }

    /// Connections still waiting to identify.
    pub fn pending_count(&self) -> usize {
        self.inner.lock().expect("registry lock").pending.len()
    }
}

impl<C: Connection> Default for ConnectionRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Removes the connection from the pending pool and from any player bucket,
/// dropping emptied buckets. Returns the connection if it was registered.
fn remove_from_buckets<C>(inner: &mut Inner<C>, conn_id: ConnectionId) -> Option<Arc<C>> {
    if let Some(conn) = inner.pending.remove(&conn_id) {
        return Some(conn);
    }
    let mut found = None;
    inner.by_player.retain(|_, bucket| {
        if found.is_none() {
            if let Some(conn) = bucket.remove(&conn_id) {
                found = Some(conn);
            }
        }
        !bucket.is_empty()
    });
    found
}

// =========================================================================
// Tests
// =========================================================================
