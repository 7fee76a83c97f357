// src/domain/connection.rs

//! Endpoint connection abstractions.
//!
//! This module defines the frame-level interface a [`Publisher`](crate::Publisher)
//! writes to. It intentionally avoids any reference to a concrete socket
//! library; implementations live under `src/transport/`.
//!
//! A connection carries multi-part messages. Each message is a sequence of
//! frames; every frame except the last is sent with [`SendFlags::MORE`].
//! Implementations must honor the following contract:
//!
//! - Frames flagged `more` are staged, not delivered.
//! - The first frame sent without `more` completes the message: all staged
//!   frames plus the final frame are delivered as one atomic unit.
//! - If the final send fails, the staged frames are discarded so the next
//!   message never inherits a partial prefix.
//! - [`Connection::discard_staged`] drops frames left behind by a sender
//!   that was cancelled before its final frame. Callers invoke it before
//!   starting each message.
//!
//! Connections are not safe for concurrent use. Every mutating method takes
//! `&mut self`, so a caller shared between tasks must provide its own
//! exclusive lock around the handle.

use bytes::Bytes;

use crate::Result;

/// Per-frame send options.
///
/// Mirrors the two socket flags the publisher needs: a "more frames follow"
/// marker and a non-blocking marker for the final frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendFlags {
    /// Further frames of the same message follow this one.
    pub more: bool,

    /// Fail with [`Error::WouldBlock`](crate::Error::WouldBlock) instead of
    /// waiting when the frame cannot be queued immediately.
    pub dont_wait: bool,
}

impl SendFlags {
    /// Blocking send of a frame that is not the last one.
    pub const MORE: SendFlags = SendFlags {
        more: true,
        dont_wait: false,
    };

    /// Non-blocking send of the final frame.
    pub const DONT_WAIT: SendFlags = SendFlags {
        more: false,
        dont_wait: true,
    };
}

/// Outbound endpoint connection.
///
/// # Notes
///
/// This trait uses `async_trait`; the expanded documentation may show explicit
/// lifetimes and a boxed `Future`. Consumers should treat methods as normal
/// `async fn`s.
#[async_trait::async_trait]
pub trait Connection: Send {
    // ---
    /// The endpoint address this connection was opened against.
    fn endpoint(&self) -> &str;

    /// Send one frame of a multi-part message.
    async fn send_frame(&mut self, frame: Bytes, flags: SendFlags) -> Result<()>;

    /// Drop any staged frames of an unfinished message.
    fn discard_staged(&mut self);

    /// Release the underlying socket.
    ///
    /// Callers invoke this at most once; the handle is dropped afterwards.
    async fn close(&mut self) -> Result<()>;
}

/// Owned connection handle.
///
/// Boxed so that publishers are independent of the concrete transport.
pub type ConnectionPtr = Box<dyn Connection>;
