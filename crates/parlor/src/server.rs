//! `ParlorServer` builder and accept loop.
//!
//! Ties the layers together: WebSocket transport → connection handler →
//! director. The host application seeds sessions (plan, roster, prepared
//! rounds) through [`Director::session`] and drives round control through
//! the director; this module only owns the socket side.

use std::path::PathBuf;
use std::sync::Arc;

use parlor_registry::ConnectionRegistry;
use parlor_rounds::{Narrator, RoundConfig};
use parlor_state::SessionStore;
use parlor_transport::{Transport, WebSocketConnection, WebSocketTransport};

use crate::director::Director;
use crate::error::ParlorError;
use crate::handler::handle_connection;

/// Builder for configuring and starting a Parlor server.
///
/// # Example
///
/// ```rust,no_run
/// use parlor::{ParlorServer, StubNarrator};
///
/// # async fn run() -> Result<(), parlor::ParlorError> {
/// let server = ParlorServer::<StubNarrator>::builder()
///     .bind("0.0.0.0:8080")
///     .data_dir("data/sessions")
///     .build(StubNarrator)
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct ParlorServerBuilder {
    bind_addr: String,
    data_dir: PathBuf,
    round_config: RoundConfig,
}

impl ParlorServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            data_dir: PathBuf::from("data/sessions"),
            round_config: RoundConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the directory session records are persisted under.
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Sets the round engine configuration (narration timeout).
    pub fn round_config(mut self, config: RoundConfig) -> Self {
        self.round_config = config;
        self
    }

    /// Binds the transport and wires the director with the given narrator.
    pub async fn build<N: Narrator>(self, narrator: N) -> Result<ParlorServer<N>, ParlorError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let director = Arc::new(Director::new(
            Arc::new(ConnectionRegistry::new()),
            Arc::new(SessionStore::open(self.data_dir)),
            Arc::new(narrator),
            self.round_config,
        ));

        Ok(ParlorServer {
            transport,
            director,
        })
    }
}

impl Default for ParlorServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Parlor server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct ParlorServer<N: Narrator> {
    transport: WebSocketTransport,
    director: Arc<Director<WebSocketConnection, N>>,
}

impl<N: Narrator> ParlorServer<N> {
    /// Creates a new builder.
    pub fn builder() -> ParlorServerBuilder {
        ParlorServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// The director, for the request layer and host tooling.
    pub fn director(&self) -> Arc<Director<WebSocketConnection, N>> {
        Arc::clone(&self.director)
    }

    /// Runs the server accept loop.
    ///
    /// Accepts incoming connections and spawns a handler task for each.
    /// Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), ParlorError> {
        tracing::info!("Parlor server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let director = Arc::clone(&self.director);
                    tokio::spawn(handle_connection(Arc::new(conn), director));
                }
                Err(error) => {
                    tracing::error!(%error, "accept failed");
                }
            }
        }
    }
}
