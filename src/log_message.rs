//! Captured output lines handed to a publisher by the host.

use bytes::Bytes;

/// Output stream a line was captured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSource {
    Stdout,
    Stderr,
}

impl LogSource {
    pub fn is_error(self) -> bool {
        matches!(self, LogSource::Stderr)
    }
}

/// One captured line of process output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    /// Line bytes without the trailing newline.
    pub line: Bytes,
    pub source: LogSource,
}

impl LogMessage {
    pub fn new(line: impl Into<Bytes>, source: LogSource) -> Self {
        Self {
            line: line.into(),
            source,
        }
    }

    pub fn stdout(line: impl Into<Bytes>) -> Self {
        Self::new(line, LogSource::Stdout)
    }

    pub fn stderr(line: impl Into<Bytes>) -> Self {
        Self::new(line, LogSource::Stderr)
    }
}
