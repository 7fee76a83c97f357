//! Multi-producer-safe publisher.
//!
//! A [`Publisher`] owns one outbound [`Connection`](crate::Connection) and an
//! [`IdentityContext`]. Every call to [`Publisher::publish`] emits exactly
//! three frames:
//!
//! 1. tenant id
//! 2. service id
//! 3. `"<source_id>: <payload>"`
//!
//! ## Concurrency
//!
//! Hosts call `publish` from one task per captured stream and `close` from a
//! teardown task, all in parallel. The connection handle is not safe for
//! concurrent use, so every operation that touches it runs under a single
//! exclusive lock:
//!
//! - frames of two `publish` calls never interleave on the wire
//! - `close` never releases the connection while a `publish` holds it
//!
//! The identity is read-only after construction and needs no locking.
//!
//! ## Stream origin
//!
//! `publish` accepts an `is_error_source` flag but produces identical frames
//! for stdout and stderr lines. Downstream consumers do not distinguish the
//! two streams.

use bytes::{BufMut, Bytes, BytesMut};
use tokio::sync::Mutex;

use crate::{
    // ---
    log_debug,
    log_opts::DRIVER_NAME,
    ConnectionPtr,
    Error,
    IdentityContext,
    LogMessage,
    Result,
    SendFlags,
};

/// Separator between the source id and the payload in the last frame.
const SOURCE_SEPARATOR: &[u8] = b": ";

/// Serializes concurrent writers onto one outbound connection.
///
/// Created once per log source and shared between tasks (typically behind an
/// `Arc`). All methods take `&self`.
pub struct Publisher {
    // ---
    identity: IdentityContext,
    tenant_frame: Bytes,
    service_frame: Bytes,
    connection: Mutex<Option<ConnectionPtr>>,
}

impl Publisher {
    /// Create a publisher that owns `connection`.
    ///
    /// Prefer [`PublisherBuilder`](crate::PublisherBuilder), which validates
    /// options and derives the identity first.
    pub fn new(connection: ConnectionPtr, identity: IdentityContext) -> Self {
        // ---
        Self {
            tenant_frame: Bytes::copy_from_slice(identity.tenant_id().as_bytes()),
            service_frame: Bytes::copy_from_slice(identity.service_id().as_bytes()),
            identity,
            connection: Mutex::new(Some(connection)),
        }
    }

    /// Publish one payload as a three-frame message.
    ///
    /// The tenant and service frames are sent with the "more" marker; the
    /// payload frame is sent non-blocking. The lock is released on every
    /// exit path.
    ///
    /// Dropping the returned future part-way leaves nothing behind: frames
    /// staged by a cancelled call are discarded before the next message.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if [`close`](Self::close) already ran
    /// - [`Error::WouldBlock`] if the final frame could not be queued
    /// - [`Error::Transport`] if the socket rejected a frame
    ///
    /// The publisher stays usable after any of these; retrying the line is
    /// up to the caller.
    pub async fn publish(&self, payload: &[u8], is_error_source: bool) -> Result<()> {
        // ---
        let line = self.payload_frame(payload, is_error_source);

        let mut guard = self.connection.lock().await;
        let connection = guard.as_mut().ok_or(Error::ConnectionClosed)?;

        connection.discard_staged();
        connection
            .send_frame(self.tenant_frame.clone(), SendFlags::MORE)
            .await?;
        connection
            .send_frame(self.service_frame.clone(), SendFlags::MORE)
            .await?;
        connection.send_frame(line, SendFlags::DONT_WAIT).await
    }

    /// Publish a captured output line.
    pub async fn log(&self, message: &LogMessage) -> Result<()> {
        self.publish(&message.line, message.source.is_error()).await
    }

    /// Release the connection.
    ///
    /// Waits for any in-flight `publish` to finish. The handle is taken out
    /// before it is closed, so it is released exactly once even if the
    /// transport reports an error. Calling `close` again is a no-op that
    /// returns `Ok(())`.
    pub async fn close(&self) -> Result<()> {
        // ---
        let mut guard = self.connection.lock().await;

        let Some(mut connection) = guard.take() else {
            return Ok(());
        };

        log_debug!(
            "{}: closing publisher for {}",
            connection.endpoint(),
            self.identity.source_id()
        );

        connection.close().await
    }

    /// Fixed driver identifier.
    pub fn name(&self) -> &'static str {
        DRIVER_NAME
    }

    /// Routing identity attached to every message.
    pub fn identity(&self) -> &IdentityContext {
        &self.identity
    }

    /// True once [`close`](Self::close) has released the connection.
    pub async fn is_closed(&self) -> bool {
        self.connection.lock().await.is_none()
    }

    fn payload_frame(&self, payload: &[u8], _is_error_source: bool) -> Bytes {
        // ---
        let source = self.identity.source_id().as_str().as_bytes();

        let capacity = source.len() + SOURCE_SEPARATOR.len() + payload.len();
        let mut frame = BytesMut::with_capacity(capacity);
        frame.put_slice(source);
        frame.put_slice(SOURCE_SEPARATOR);
        frame.put_slice(payload);
        frame.freeze()
    }
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}
