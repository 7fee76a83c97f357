//! ZeroMQ PUB connection implementation using `zeromq`.
//!
//! This module provides an implementation of the [`Connection`] trait backed
//! by a ZeroMQ PUB socket connected to a collector endpoint.
//!
//! ## Framing
//!
//! ZeroMQ delivers multi-part messages atomically: subscribers receive either
//! every frame of a message or none of them. The `zeromq` library exposes
//! this as a single [`ZmqMessage`] holding all frames, so the connection
//! stages frames flagged `more` and hands the complete message to the socket
//! when the final frame arrives.
//!
//! ## Non-blocking sends
//!
//! A final frame flagged `dont_wait` is sent by polling the socket send
//! exactly once. If the socket cannot accept the message without waiting,
//! the message is dropped and [`Error::WouldBlock`] is returned. Backpressure
//! beyond that is the socket's concern; nothing is retried here.
//!
//! ## Collector restarts
//!
//! The socket monitor reports when the collector goes away. While no peer
//! is attached, final sends fail with [`Error::Transport`] instead of
//! vanishing silently, and the connection re-dials the endpoint at most once
//! per [`RECONNECT_INTERVAL`]. Delivery resumes once the collector is back.
//!
//! ## Concurrency
//!
//! The socket is not safe for concurrent use. The connection is only driven
//! through `&mut self`, and publishers wrap it in a lock.

use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::{FutureExt, StreamExt};
use tokio::time::Instant;
use zeromq::{PubSocket, Socket, SocketEvent, SocketSend, ZmqMessage};

use crate::{
    // ---
    log_debug,
    Connection,
    ConnectionPtr,
    Error,
    Result,
    SendFlags,
};

/// Upper bound on establishing the initial connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on one re-dial attempt made from the publish path.
const RECONNECT_TIMEOUT: Duration = Duration::from_millis(250);

/// Minimum spacing between re-dial attempts while the collector is away.
const RECONNECT_INTERVAL: Duration = Duration::from_millis(500);

/// ZeroMQ PUB implementation of the [`Connection`] trait.
struct ZmqConnection {
    // ---
    endpoint: String,
    socket: Option<PubSocket>,
    staged: Vec<Bytes>,
    events: BoxStream<'static, SocketEvent>,
    attached: bool,
    next_reconnect: Option<Instant>,
}

impl ZmqConnection {
    // ---
    fn socket(&mut self) -> Result<&mut PubSocket> {
        self.socket.as_mut().ok_or(Error::ConnectionClosed)
    }

    fn assemble(&mut self, last: Bytes) -> ZmqMessage {
        // ---
        let mut frames = std::mem::take(&mut self.staged).into_iter();
        let mut message = match frames.next() {
            Some(first) => ZmqMessage::from(first),
            None => return ZmqMessage::from(last),
        };
        for frame in frames {
            message.push_back(frame);
        }
        message.push_back(last);
        message
    }

    /// Apply pending monitor events without waiting.
    fn poll_events(&mut self) {
        // ---
        while let Some(Some(event)) = self.events.next().now_or_never() {
            if matches!(event, SocketEvent::Disconnected(..)) {
                log_debug!("{}: collector disconnected", self.endpoint);
                self.attached = false;
            }
        }
    }

    /// Make sure a collector is attached, re-dialing if the interval allows.
    async fn ensure_attached(&mut self) -> Result<()> {
        // ---
        self.poll_events();
        if self.attached {
            return Ok(());
        }

        let now = Instant::now();
        if self.next_reconnect.is_some_and(|at| now < at) {
            return Err(Error::Transport(format!(
                "{}: collector disconnected",
                self.endpoint
            )));
        }
        self.next_reconnect = Some(now + RECONNECT_INTERVAL);

        let endpoint = self.endpoint.clone();
        let socket = self.socket()?;
        let dialed = tokio::time::timeout(RECONNECT_TIMEOUT, socket.connect(&endpoint)).await;

        match dialed {
            Ok(Ok(())) => {
                log_debug!("{endpoint}: reconnected zmq PUB socket");
                self.attached = true;
                self.next_reconnect = None;
                Ok(())
            }
            Ok(Err(err)) => Err(Error::Transport(format!(
                "{endpoint}: reconnect failed: {err}"
            ))),
            Err(_) => Err(Error::Transport(format!(
                "{endpoint}: collector disconnected; reconnect timed out"
            ))),
        }
    }
}

#[async_trait::async_trait]
impl Connection for ZmqConnection {
    // ---
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send_frame(&mut self, frame: Bytes, flags: SendFlags) -> Result<()> {
        // ---
        if flags.more {
            self.socket()?;
            self.staged.push(frame);
            return Ok(());
        }

        let message = self.assemble(frame);
        self.ensure_attached().await?;

        let endpoint = self.endpoint.clone();
        let socket = self.socket()?;

        let sent = if flags.dont_wait {
            match socket.send(message).now_or_never() {
                Some(result) => result,
                None => return Err(Error::WouldBlock),
            }
        } else {
            socket.send(message).await
        };

        sent.map_err(|err| Error::Transport(format!("{endpoint}: send failed: {err}")))
    }

    fn discard_staged(&mut self) {
        self.staged.clear();
    }

    async fn close(&mut self) -> Result<()> {
        // ---
        self.staged.clear();

        let Some(socket) = self.socket.take() else {
            return Ok(());
        };

        log_debug!("{}: closing zmq socket", self.endpoint);

        let errors = socket.close().await;
        if errors.is_empty() {
            Ok(())
        } else {
            let detail = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            Err(Error::Transport(format!(
                "{}: close failed: {detail}",
                self.endpoint
            )))
        }
    }
}

/// Creates a ZeroMQ PUB connection to the given endpoint.
///
/// # Errors
///
/// Returns [`Error::Transport`] if the socket cannot connect to the endpoint
/// within [`CONNECT_TIMEOUT`].
pub async fn create_connection(endpoint: &str) -> Result<ConnectionPtr> {
    // ---
    let mut socket = PubSocket::new();
    let events = socket.monitor().boxed();

    match tokio::time::timeout(CONNECT_TIMEOUT, socket.connect(endpoint)).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            return Err(Error::Transport(format!(
                "{endpoint}: connect failed: {err}"
            )))
        }
        Err(_) => {
            return Err(Error::Transport(format!(
                "{endpoint}: connect timed out after {CONNECT_TIMEOUT:?}"
            )))
        }
    }

    log_debug!("{endpoint}: connected zmq PUB socket");

    Ok(Box::new(ZmqConnection {
        endpoint: endpoint.to_string(),
        socket: Some(socket),
        staged: Vec::new(),
        events,
        attached: true,
        next_reconnect: None,
    }))
}
