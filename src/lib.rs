//! # stream-flac
//!
//! Streaming FLAC encoding into caller-supplied sinks.
//!
//! `stream-flac` wraps libFLAC's stream encoder and streams its compressed
//! output to any byte destination — a file, an in-memory buffer, or an async
//! consumer living on a tokio runtime — without ever holding the whole
//! encoded stream in memory.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stream_flac::{EncoderConfig, FlacEncoder, FileSink};
//!
//! let sink = FileSink::create("recording.flac")?;
//! let mut session = FlacEncoder::new(Box::new(sink), EncoderConfig::new(44100, 2))?;
//!
//! // Feed interleaved 16-bit little-endian PCM as it arrives
//! while let Some(pcm) = capture.next_block() {
//!     session.push(&pcm)?;
//! }
//!
//! session.finish()?;
//! // Dropping the session releases the sink
//! ```
//!
//! ## Architecture
//!
//! The crate is an adapter layer around the encoder, not an encoder:
//!
//! - **[`FlacEncoder`]**: owns the libFLAC instance and answers its
//!   seek/tell/write callbacks against a [`DataSink`], keeping a logical
//!   byte cursor so the sink only ever sees positional writes
//! - **[`DataSink`]**: the synchronous sink contract; calls are serialized
//!   by the session, and a short or failed write ends the session
//! - **[`BridgeSink`]**: adapts an async [`AsyncDataSink`] to the
//!   synchronous contract by re-entering the destination's tokio runtime on
//!   every call, from whatever thread is driving the encoder
//!
//! All work happens synchronously on the calling thread; the crate starts
//! no threads of its own.

#![warn(missing_docs)]
// Sample conversion and FFI require intentional numeric casts
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_lossless
)]
// unwrap/expect allowed in tests only
#![allow(clippy::unwrap_used)]
#![allow(clippy::missing_panics_doc, clippy::missing_errors_doc)]

mod config;
mod encoder;
mod error;
mod sink;

pub use config::{EncoderConfig, BITS_PER_SAMPLE};
pub use encoder::FlacEncoder;
pub use error::{EncoderError, SinkError};
pub use sink::{AsyncDataSink, BridgeSink, ChannelSink, DataSink, EncodedChunk, FileSink, MemorySink};
