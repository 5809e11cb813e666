//! Sink trait and implementations for encoded output.
//!
//! A [`DataSink`] is any destination that can accept encoded bytes at a
//! logical position. The crate provides three built-in sinks:
//!
//! - [`FileSink`]: Writes to a file, honoring positional rewrites
//! - [`MemorySink`]: Collects output into a shared in-memory buffer
//! - [`BridgeSink`]: Forwards into an async [`AsyncDataSink`] owned by a
//!   tokio runtime
//!
//! You can implement [`DataSink`] directly for custom synchronous
//! destinations, or [`AsyncDataSink`] for destinations that live on a
//! runtime.

mod bridge;
mod channel;
mod file;
mod memory;

pub use bridge::{AsyncDataSink, BridgeSink};
pub use channel::{ChannelSink, EncodedChunk};
pub use file::FileSink;
pub use memory::MemorySink;

use crate::SinkError;

/// A destination for encoded bytes.
///
/// The owning [`FlacEncoder`] session serializes all calls, so methods take
/// `&mut self` and implementations need no internal locking.
///
/// # Contract
///
/// - `write` must attempt to store exactly `buf.len()` bytes starting at
///   the logical byte offset `position`. Positions are not necessarily
///   monotonic: the encoder seeks back into the header when the stream is
///   finalized. An append-only sink may ignore `position` and accept the
///   rewrite bytes as a trailing duplicate, at the cost of a stale header.
/// - Anything other than `Ok(buf.len() as u64)` is fatal to the owning
///   session; the sink will not be written to again.
/// - `release` is called exactly once, when the session is dropped.
///
/// [`FlacEncoder`]: crate::FlacEncoder
pub trait DataSink: Send {
    /// Writes `buf` at the logical byte offset `position`.
    ///
    /// Returns the number of bytes actually written. A short count or an
    /// error aborts the owning session.
    fn write(&mut self, position: u64, buf: &[u8]) -> Result<u64, SinkError>;

    /// Releases the underlying resource.
    ///
    /// Called exactly once when the owning session is torn down, on every
    /// path including abandoned (never finished) sessions. Failures must be
    /// handled internally; there is nobody left to report them to.
    fn release(&mut self);
}
