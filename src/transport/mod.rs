//! Connection implementations.
//!
//! This module provides concrete implementations of the domain-level
//! [`Connection`](crate::Connection) trait. Socket-backed connections are
//! hidden behind feature flags and exposed only through constructor
//! functions.
//!
//! Domain code must not depend on transport-specific types.

mod memory;
mod zmq;

pub use memory::{
    //
    create_memory_connection,
    create_memory_connection_with_wire,
    memory_wire,
    MemoryWire,
    MEMORY_SCHEME,
};

pub use zmq::{create_zmq_connection, ZMQ_SCHEMES};

use crate::{ConnectionPtr, Error, Result};

/// Open a connection to `endpoint`, choosing the transport by URI scheme.
///
/// - `memory://<name>` → in-process [`MemoryWire`]
/// - `tcp://…`, `ipc://…` → ZeroMQ PUB socket (feature `transport_zmq`)
///
/// # Errors
///
/// Returns [`Error::UnsupportedEndpoint`] for any other scheme, or the
/// transport's own error if connecting fails.
pub async fn connect(endpoint: &str) -> Result<ConnectionPtr> {
    // ---
    if endpoint.starts_with(MEMORY_SCHEME) {
        return create_memory_connection(endpoint).await;
    }

    if ZMQ_SCHEMES.iter().any(|scheme| endpoint.starts_with(scheme)) {
        return create_zmq_connection(endpoint).await;
    }

    Err(Error::UnsupportedEndpoint(endpoint.to_string()))
}
