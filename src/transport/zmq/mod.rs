//! ZeroMQ transports.
//!
//! This module contains connection implementations for ZeroMQ.
//! Currently supports:
//! - zmq - PUB socket via the pure-Rust `zeromq` library (zmq.rs)

#[cfg(feature = "transport_zmq")]
#[allow(clippy::module_inception)]
mod zmq;

#[cfg(feature = "transport_zmq")]
pub use zmq::create_connection as create_zmq_connection;

#[cfg(not(feature = "transport_zmq"))]
pub async fn create_zmq_connection(_endpoint: &str) -> crate::Result<crate::ConnectionPtr> {
    Err(crate::Error::Transport(
        "transport_zmq feature is not enabled".into(),
    ))
}

/// URI schemes routed to the ZeroMQ connection.
pub const ZMQ_SCHEMES: &[&str] = &["tcp://", "ipc://"];
