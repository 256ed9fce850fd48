//! In-process loopback connection.
//!
//! Used by the test suites (and by scripted bot clients) wherever a real
//! socket would only get in the way: outbound frames are recorded for
//! inspection, inbound frames are injected through a channel, and the
//! connection can be flipped into a "dead socket" mode to exercise the
//! registry's eviction path.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::mpsc;

use crate::{Connection, ConnectionId, TransportError};

/// Counter for generating unique connection IDs.
///
/// Starts in a high range so ids never collide with transport-accepted
/// connections in mixed test setups.
static NEXT_MEMORY_ID: AtomicU64 = AtomicU64::new(1_000_000);

/// A [`Connection`] that lives entirely in process memory.
pub struct MemoryConnection {
    id: ConnectionId,
    sent: Mutex<Vec<String>>,
    inbound_tx: mpsc::UnboundedSender<String>,
    inbound_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<String>>,
    close_notify: tokio::sync::Notify,
    closed: AtomicBool,
    dead: AtomicBool,
}

impl MemoryConnection {
    /// Creates a fresh loopback connection.
    pub fn new() -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        Self {
            id: ConnectionId::new(NEXT_MEMORY_ID.fetch_add(1, Ordering::Relaxed)),
            sent: Mutex::new(Vec::new()),
            inbound_tx,
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            close_notify: tokio::sync::Notify::new(),
            closed: AtomicBool::new(false),
            dead: AtomicBool::new(false),
        }
    }

    /// Queues a frame as if the remote peer had sent it.
    pub fn push_incoming(&self, text: impl Into<String>) {
        let _ = self.inbound_tx.send(text.into());
    }

    /// Snapshot of every frame sent so far, oldest first.
    pub fn sent_frames(&self) -> Vec<String> {
        self.sent.lock().expect("sent frames lock").clone()
    }

    /// Number of frames sent so far.
    pub fn sent_count(&self) -> usize {
        self.sent.lock().expect("sent frames lock").len()
    }

    /// Simulates a dead socket: every subsequent send fails.
    pub fn kill(&self) {
        self.dead.store(true, Ordering::SeqCst);
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Default for MemoryConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl Connection for MemoryConnection {
    type Error = TransportError;

    async fn send_text(&self, text: &str) -> Result<(), Self::Error> {
        if self.dead.load(Ordering::SeqCst) || self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionClosed(self.id.to_string()));
        }
        self.sent
            .lock()
            .expect("sent frames lock")
            .push(text.to_owned());
        Ok(())
    }

    async fn recv(&self) -> Result<Option<String>, Self::Error> {
        if self.closed.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let mut inbound = self.inbound_rx.lock().await;
        // `notify_one` stores a permit, so a close racing this select is
        // still observed.
        tokio::select! {
            _ = self.close_notify.notified() => Ok(None),
            frame = inbound.recv() => Ok(frame),
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.closed.store(true, Ordering::SeqCst);
        self.close_notify.notify_one();
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

// =========================================================================
// Tests
// =========================================================================
