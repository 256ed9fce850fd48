//! Per-connection handler: the pending → identified protocol.
//!
//! Each accepted connection gets its own Tokio task running this loop. The
//! connection sits in the registry's pending pool until the client sends an
//! `identify` message; from then on it receives targeted and broadcast
//! events for its player. Whatever ends the loop — clean close, transport
//! error — the connection is removed from every bucket.

use std::sync::Arc;

use parlor_protocol::{ClientMessage, Codec, JsonCodec, ServerEvent};
use parlor_rounds::Narrator;
use parlor_transport::Connection;

use crate::director::Director;

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C, N>(conn: Arc<C>, director: Arc<Director<C, N>>)
where
    C: Connection,
    N: Narrator,
{
    let conn_id = conn.id();
    director.connect(Arc::clone(&conn));
    tracing::debug!(%conn_id, "connection handler started");

    let codec = JsonCodec;
    loop {
        match conn.recv().await {
            Ok(Some(frame)) => match codec.decode::<ClientMessage>(&frame) {
                Ok(ClientMessage::Identify { player_id }) => {
                    director.identify(conn_id, &player_id);
                    // Ack on this connection only; other tabs of the same
                    // player did not ask.
                    let ack = ServerEvent::Identified {
                        player_id: player_id.clone(),
                    };
                    if let Ok(text) = codec.encode(&ack) {
                        if conn.send_text(&text).await.is_err() {
                            break;
                        }
                    }
                }
                Err(error) => {
                    tracing::debug!(%conn_id, %error, "unreadable client frame, ignoring");
                }
            },
            Ok(None) => {
                tracing::debug!(%conn_id, "connection closed cleanly");
                break;
            }
            Err(error) => {
                tracing::debug!(%conn_id, %error, "recv error");
                break;
            }
        }
    }

    director.disconnect(conn_id).await;
    tracing::debug!(%conn_id, "connection handler stopped");
}

// =========================================================================
// Tests
// =========================================================================
