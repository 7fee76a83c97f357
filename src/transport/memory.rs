//! In-memory connection implementation.
//!
//! This module provides a pure in-process implementation of the domain-level
//! [`Connection`] trait. It is intended primarily for testing, local execution,
//! and as a reference for connection semantics.
//!
//! ## Reference Semantics
//!
//! The in-memory connection defines the **reference behavior** for the
//! connection layer:
//!
//! - Frames sent with `more` are staged on the connection.
//! - The final frame commits the staged frames plus itself to the shared
//!   [`MemoryWire`] as one message.
//! - A failed final send leaves nothing on the wire and clears the staging
//!   area.
//! - On a bounded wire, a full queue makes a `dont_wait` send fail with
//!   [`Error::WouldBlock`]; a blocking send waits until the wire is drained.
//!
//! ## Non-Goals
//!
//! This connection does not emulate subscriber matching, high-water marks
//! per peer, or any network failure mode other than the injected ones.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use bytes::Bytes;
use tokio::sync::{Notify, RwLock};

use crate::{
    // ---
    log_debug,
    Connection,
    ConnectionPtr,
    Error,
    Result,
    SendFlags,
};

/// URI scheme routed to the in-memory connection.
pub const MEMORY_SCHEME: &str = "memory://";

/// Shared in-process wire.
///
/// Records every committed multi-part message in commit order. Several
/// connections may share a wire, exactly as several publishers share a
/// collector endpoint.
///
/// # ⚠️  Testing Only - Subject to Change
///
/// **This type is exposed for integration tests and local experiments.**
/// Production code should connect through [`connect`](crate::connect) with a
/// real endpoint.
pub struct MemoryWire {
    // ---
    messages: RwLock<Vec<Vec<Bytes>>>,
    capacity: Option<usize>,
    space: Notify,
    closes: AtomicUsize,
    failing_sends: AtomicUsize,
    failing_closes: AtomicUsize,
}

impl MemoryWire {
    /// Create an unbounded wire.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::with_capacity(None))
    }

    /// Create a wire that holds at most `capacity` undrained messages.
    pub fn bounded(capacity: usize) -> Arc<Self> {
        Arc::new(Self::with_capacity(Some(capacity)))
    }

    fn with_capacity(capacity: Option<usize>) -> Self {
        // ---
        Self {
            messages: RwLock::new(Vec::new()),
            capacity,
            space: Notify::new(),
            closes: AtomicUsize::new(0),
            failing_sends: AtomicUsize::new(0),
            failing_closes: AtomicUsize::new(0),
        }
    }

    /// Snapshot of all committed messages, oldest first.
    pub async fn messages(&self) -> Vec<Vec<Bytes>> {
        self.messages.read().await.clone()
    }

    /// Remove and return all committed messages, freeing capacity.
    pub async fn drain(&self) -> Vec<Vec<Bytes>> {
        // ---
        let drained = std::mem::take(&mut *self.messages.write().await);
        self.space.notify_waiters();
        drained
    }

    /// Number of times a connection on this wire was closed.
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Make the next `count` final-frame sends fail with a transport error.
    pub fn fail_next_sends(&self, count: usize) {
        self.failing_sends.store(count, Ordering::SeqCst);
    }

    /// Make the next `count` closes report a transport error.
    ///
    /// The close is still counted; the error only reaches the caller.
    pub fn fail_next_closes(&self, count: usize) {
        self.failing_closes.store(count, Ordering::SeqCst);
    }

    async fn commit(&self, message: Vec<Bytes>, dont_wait: bool) -> Result<()> {
        // ---
        loop {
            let notified = self.space.notified();
            {
                let mut messages = self.messages.write().await;
                let full = self.capacity.is_some_and(|cap| messages.len() >= cap);
                if !full {
                    messages.push(message);
                    return Ok(());
                }
                if dont_wait {
                    return Err(Error::WouldBlock);
                }
            }
            notified.await;
        }
    }
}

impl Default for MemoryWire {
    fn default() -> Self {
        Self::with_capacity(None)
    }
}

fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

/// Process-global registry backing `memory://<name>` endpoints.
static WIRES: OnceLock<Mutex<HashMap<String, Arc<MemoryWire>>>> = OnceLock::new();

/// Look up (or create) the shared wire for a `memory://<name>` endpoint.
pub fn memory_wire(name: &str) -> Arc<MemoryWire> {
    // ---
    let wires = WIRES.get_or_init(|| Mutex::new(HashMap::new()));
    let mut wires = wires.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    wires.entry(name.to_string()).or_insert_with(MemoryWire::new).clone()
}

/// In-memory connection.
///
/// Stages `more` frames locally and commits complete messages to its wire.
struct MemoryConnection {
    // ---
    endpoint: String,
    wire: Arc<MemoryWire>,
    staged: Vec<Bytes>,
}

#[async_trait::async_trait]
impl Connection for MemoryConnection {
    // ---
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn discard_staged(&mut self) {
        self.staged.clear();
    }

    async fn send_frame(&mut self, frame: Bytes, flags: SendFlags) -> Result<()> {
        // ---
        if flags.more {
            self.staged.push(frame);
            // Let other tasks run between frames so missing exclusion
            // would show up as interleaving.
            tokio::task::yield_now().await;
            return Ok(());
        }

        let mut message = std::mem::take(&mut self.staged);
        message.push(frame);

        if take_one(&self.wire.failing_sends) {
            return Err(Error::Transport(format!(
                "{}: injected send failure",
                self.endpoint
            )));
        }

        self.wire.commit(message, flags.dont_wait).await
    }

    async fn close(&mut self) -> Result<()> {
        // ---
        log_debug!("{}: closing memory connection", self.endpoint);

        self.staged.clear();
        self.wire.closes.fetch_add(1, Ordering::SeqCst);

        if take_one(&self.wire.failing_closes) {
            return Err(Error::Transport(format!(
                "{}: injected close failure",
                self.endpoint
            )));
        }
        Ok(())
    }
}

/// Open an in-memory connection for a `memory://<name>` endpoint.
///
/// Connections to the same name share one [`MemoryWire`], retrievable with
/// [`memory_wire`].
///
/// # Errors
///
/// Returns [`Error::UnsupportedEndpoint`] if the address does not use the
/// `memory://` scheme.
pub async fn create_memory_connection(endpoint: &str) -> Result<ConnectionPtr> {
    // ---
    let name = endpoint
        .strip_prefix(MEMORY_SCHEME)
        .ok_or_else(|| Error::UnsupportedEndpoint(endpoint.to_string()))?;

    create_memory_connection_with_wire(endpoint, memory_wire(name)).await
}

/// Open an in-memory connection writing to an explicitly provided wire.
///
/// # ⚠️  Testing Only - Subject to Change
///
/// Lets parallel tests each use an isolated wire.
///
/// # Errors
///
/// Currently infallible — always returns `Ok`.
pub async fn create_memory_connection_with_wire(
    endpoint: impl Into<String>,
    wire: Arc<MemoryWire>,
) -> Result<ConnectionPtr> {
    // ---
    let endpoint = endpoint.into();
    log_debug!("{endpoint}: create memory connection");

    Ok(Box::new(MemoryConnection {
        endpoint,
        wire,
        staged: Vec::new(),
    }))
}
