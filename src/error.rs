//! Error types for the session engine.
//!
//! One enum covers the three failure surfaces: transport I/O, line framing,
//! and session lifecycle misuse. Transport errors are the only ones reported
//! through the error channel; framing and lifecycle errors are returned
//! directly to the caller that provoked them.

use thiserror::Error;

/// Convenience type alias for Results using [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Top-level session errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 decoding error on an inbound line.
    #[error("decode error: {0}")]
    Decode(#[from] std::string::FromUtf8Error),

    /// Line exceeded the maximum allowed frame length.
    #[error("line too long: {length} bytes (limit {limit})")]
    LineTooLong {
        /// Observed length in bytes.
        length: usize,
        /// Configured frame limit.
        limit: usize,
    },

    /// Illegal control character in an outbound line.
    #[error("illegal control character: {0:?}")]
    IllegalControlChar(char),

    /// The peer closed the connection.
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// Operation requires a live connection.
    #[error("not connected")]
    NotConnected,

    /// A connection is already established; disconnect first.
    #[error("already connected")]
    AlreadyConnected,

    /// The error channel is already being consumed by another serve call.
    #[error("serve is already running for this connection")]
    AlreadyServing,

    /// The connect address did not contain a usable host name.
    #[error("invalid server name: {0}")]
    InvalidServerName(String),
}
