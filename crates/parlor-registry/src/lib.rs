//! Connection registry for Parlor.
//!
//! Tracks every live client connection in the process and the mapping from
//! logical player identity to its active connections. A connection arrives
//! *pending* (the transport accepts it before any protocol handshake) and is
//! bound to a player by an `identify` message; a player may hold several
//! concurrent connections (tabs, devices).
//!
//! The registry is shared across all sessions — a connection is not
//! intrinsically scoped to one party.

mod registry;

pub use registry::ConnectionRegistry;
