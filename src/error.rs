use thiserror::Error;

/// Errors that can occur while configuring or driving a [`Publisher`](crate::Publisher).
///
/// Variants fall into two kinds:
/// - configuration errors, reported before any resource is allocated
/// - connection errors, fatal to the call that hit them but not to the publisher
#[derive(Error, Debug)]
pub enum Error {
    /// An option key outside the recognized set was supplied.
    #[error("unknown log opt '{option}' for {driver} log driver")]
    UnknownOption {
        option: String,
        driver: &'static str,
    },

    /// A required option was absent or empty.
    #[error("must specify a value for log opt '{option}' for {driver} log driver")]
    MissingOption {
        option: &'static str,
        driver: &'static str,
    },

    /// The endpoint address uses a scheme no transport understands.
    #[error("unsupported endpoint address: {0}")]
    UnsupportedEndpoint(String),

    /// Connecting, sending or closing failed at the transport level.
    #[error("transport error: {0}")]
    Transport(String),

    /// A non-blocking send could not be queued without waiting.
    #[error("send would block")]
    WouldBlock,

    /// The connection was already released by `close`.
    #[error("connection closed")]
    ConnectionClosed,
}

impl Error {
    /// True for errors raised while validating options, before construction.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::UnknownOption { .. } | Error::MissingOption { .. } | Error::UnsupportedEndpoint(_)
        )
    }

    /// True for transport-level failures surfaced by `publish` or `close`.
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            Error::Transport(_) | Error::WouldBlock | Error::ConnectionClosed
        )
    }
}

/// Result type alias for publisher operations
pub type Result<T> = std::result::Result<T, Error>;
