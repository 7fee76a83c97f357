//! Forward process output onto a message bus as tenant-tagged multi-part messages
//!
//! The core of this library is [`Publisher`]: it serializes concurrent
//! writers (one per captured output stream, plus a teardown task) onto a
//! single outbound connection and attaches routing metadata to every
//! message. Each published line becomes three frames: tenant id, service
//! id, and `"<source_id>: <line>"`.
//!
//! Hosts build a publisher with [`PublisherBuilder`], feed it lines with
//! [`Publisher::publish`] or [`Publisher::log`], and release it with
//! [`Publisher::close`].
//!

// Import all sub modules once...
mod domain;
mod macros;
mod transport;

mod identity;
mod log_message;
mod log_opts;
mod publisher;
mod publisher_builder;

mod error;

pub(crate) use macros::log_debug;

// Re-export main types
pub use publisher::Publisher;
pub use publisher_builder::PublisherBuilder;

pub use error::{Error, Result};

pub use identity::{
    //
    IdentityContext,
    SourceId,
    DEFAULT_IDENTITY,
    SERVICE_ID_KEY,
    TENANT_ID_KEY,
};

pub use log_message::{LogMessage, LogSource};

pub use log_opts::{
    //
    validate_log_opts,
    PublisherConfig,
    DRIVER_NAME,
    ENDPOINT_ADDRESS,
};

// --- public re-exports
pub use domain::{
    //
    Connection,
    ConnectionPtr,
    SendFlags,
};

pub use transport::{
    //
    connect,
    create_memory_connection,
    create_memory_connection_with_wire,
    create_zmq_connection,
    memory_wire,
    MemoryWire,
};
