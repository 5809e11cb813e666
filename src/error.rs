//! Error types for stream-flac.
//!
//! Errors are split into two categories:
//! - **Session errors** ([`EncoderError`]): the encoding session cannot
//!   continue; most of these leave the session permanently invalid
//! - **Sink errors** ([`SinkError`]): a sink implementation failed; surfaced
//!   to the session through its write callback and treated as fatal there

use std::collections::TryReserveError;
use std::path::PathBuf;

/// Fatal errors raised by a [`FlacEncoder`] session.
///
/// Apart from [`EncoderError::SessionFinished`], every variant here leaves
/// the session invalid: further [`push`] calls fail fast without touching
/// the encoder or the sink.
///
/// [`FlacEncoder`]: crate::FlacEncoder
/// [`push`]: crate::FlacEncoder::push
#[derive(Debug, thiserror::Error)]
pub enum EncoderError {
    /// The encoder rejected its configuration before initialization.
    #[error("encoder configuration rejected: {reason}")]
    Configuration {
        /// Which parameter was rejected and why.
        reason: String,
    },

    /// `FLAC__stream_encoder_init_stream` failed.
    #[error("encoder initialization failed: {reason}")]
    Init {
        /// Init status reported by libFLAC, as text.
        reason: String,
    },

    /// A conversion buffer could not be grown to hold the pushed samples.
    ///
    /// The input was not consumed and the session is invalid.
    #[error("conversion buffer growth failed")]
    BufferAlloc(#[from] TryReserveError),

    /// The encoder rejected a block of samples.
    ///
    /// This is how sink write failures surface: the encoder's write callback
    /// reports fatal, and libFLAC fails the processing call.
    #[error("encoding failed (encoder state: {state})")]
    Encode {
        /// Encoder state at the time of failure.
        state: String,
    },

    /// The encoder failed to flush and finalize the stream.
    #[error("finish failed (encoder state: {state})")]
    Finish {
        /// Encoder state at the time of failure.
        state: String,
    },

    /// The session is invalid; no further encoding work is possible.
    #[error("session is invalid")]
    SessionInvalid,

    /// The session was already finished; it no longer accepts samples.
    #[error("session is finished")]
    SessionFinished,
}

/// Errors that can occur within a [`DataSink`](crate::DataSink) or
/// [`AsyncDataSink`](crate::AsyncDataSink) implementation.
///
/// The owning session treats any sink error as fatal: the current encoder
/// call fails and the session becomes invalid.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// A write operation failed.
    #[error("write failed: {reason}")]
    WriteFailed {
        /// Description of what went wrong.
        reason: String,
    },

    /// The sink accepted fewer bytes than requested.
    #[error("short write: expected {expected} bytes, wrote {written}")]
    ShortWrite {
        /// Bytes the caller asked to write.
        expected: u64,
        /// Bytes the sink acknowledged.
        written: u64,
    },

    /// File I/O error.
    #[error("file error: {path}: {source}")]
    FileError {
        /// Path to the file.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The receiving channel was closed.
    #[error("channel closed")]
    ChannelClosed,

    /// The destination's execution context could not be entered.
    ///
    /// Raised by [`BridgeSink`](crate::BridgeSink) when the tokio runtime
    /// that owns the destination sink is gone or cannot be re-entered from
    /// the calling thread.
    #[error("execution context unavailable: {reason}")]
    ContextUnavailable {
        /// Why the context could not be entered.
        reason: String,
    },

    /// The sink was already released.
    #[error("sink already released")]
    Released,

    /// Custom error for user-implemented sinks.
    #[error("{0}")]
    Custom(String),
}

impl SinkError {
    /// Creates a custom sink error with the given message.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    /// Creates a write failed error with the given reason.
    pub fn write_failed(reason: impl Into<String>) -> Self {
        Self::WriteFailed {
            reason: reason.into(),
        }
    }

    /// Creates a file error for the given path.
    pub fn file_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileError {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoder_error_display() {
        let err = EncoderError::Configuration {
            reason: "channel count 0 is out of range".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "encoder configuration rejected: channel count 0 is out of range"
        );
    }

    #[test]
    fn test_encoder_error_encode_state() {
        let err = EncoderError::Encode {
            state: "FLAC__STREAM_ENCODER_CLIENT_ERROR".to_string(),
        };
        assert!(err.to_string().contains("CLIENT_ERROR"));
    }

    #[test]
    fn test_sink_error_custom() {
        let err = SinkError::custom("something went wrong");
        assert_eq!(err.to_string(), "something went wrong");
    }

    #[test]
    fn test_sink_error_short_write() {
        let err = SinkError::ShortWrite {
            expected: 128,
            written: 127,
        };
        assert_eq!(err.to_string(), "short write: expected 128 bytes, wrote 127");
    }

    #[test]
    fn test_sink_error_file_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = SinkError::file_error("/tmp/test.flac", io_err);
        assert!(err.to_string().contains("/tmp/test.flac"));
    }
}
