//! Bridge from the synchronous sink contract into an async destination.
//!
//! The encoder drives its sink synchronously, from whichever thread the
//! caller pushes samples on. Destinations that live on a tokio runtime
//! (channels, sockets, object-store clients) can't be called from such a
//! thread directly, so [`BridgeSink`] re-enters the destination's runtime
//! for the duration of each call and blocks on the result.

use crate::sink::DataSink;
use crate::SinkError;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::runtime::Handle;

/// An async destination for encoded bytes, owned by a tokio runtime.
///
/// This is the destination side of [`BridgeSink`]. Implementations receive
/// owned [`Bytes`] payloads, so they may hold onto the data past the call
/// (queue it, send it to a channel) without copying.
///
/// # Example
///
/// ```
/// use stream_flac::{AsyncDataSink, SinkError};
/// use async_trait::async_trait;
/// use bytes::Bytes;
///
/// struct PrintSink;
///
/// #[async_trait]
/// impl AsyncDataSink for PrintSink {
///     async fn write(&self, position: u64, data: Bytes) -> Result<u64, SinkError> {
///         println!("{} bytes at {}", data.len(), position);
///         Ok(data.len() as u64)
///     }
/// }
/// ```
#[async_trait]
pub trait AsyncDataSink: Send + Sync {
    /// Writes `data` at the logical byte offset `position`.
    ///
    /// Returns the number of bytes actually written; a short count or an
    /// error is fatal to the session driving the bridge.
    async fn write(&self, position: u64, data: Bytes) -> Result<u64, SinkError>;

    /// Called once when the bridge is released.
    ///
    /// Use this to flush or close the destination. Default implementation
    /// does nothing.
    async fn release(&self) {}
}

/// Adapts an [`AsyncDataSink`] to the synchronous [`DataSink`] contract.
///
/// The bridge captures a [`Handle`] to the destination's runtime at
/// construction and re-enters it on every call:
///
/// - from a thread with no runtime context (the usual case: a dedicated
///   encoding thread), it blocks directly on the destination future;
/// - from inside a runtime worker, it hops through
///   [`tokio::task::block_in_place`] so blocking is permitted — this
///   requires a multi-threaded runtime.
///
/// Payloads are marshalled through one reusable transfer buffer whose
/// capacity only grows. At steady state the destination has dropped its
/// previous [`Bytes`] by the time the next write arrives and the allocation
/// is reclaimed, so the hot path stops allocating once the largest write
/// size has been seen.
///
/// Faults never cross the boundary: a destination that panics, or a runtime
/// that has shut down, surfaces as [`SinkError::ContextUnavailable`].
pub struct BridgeSink {
    target: Option<Arc<dyn AsyncDataSink>>,
    handle: Handle,
    tmp: BytesMut,
    // High-water mark of the transfer buffer; never decreases.
    tmp_capacity: usize,
}

impl std::fmt::Debug for BridgeSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeSink")
            .field("has_target", &self.target.is_some())
            .field("tmp_capacity", &self.tmp_capacity)
            .finish_non_exhaustive()
    }
}

impl BridgeSink {
    /// Creates a bridge to `target`, capturing the current runtime.
    ///
    /// Must be called from within a tokio runtime context (the context that
    /// owns the destination); fails with [`SinkError::ContextUnavailable`]
    /// otherwise.
    pub fn new(target: Arc<dyn AsyncDataSink>) -> Result<Self, SinkError> {
        let handle = Handle::try_current().map_err(|e| SinkError::ContextUnavailable {
            reason: e.to_string(),
        })?;
        Ok(Self::with_handle(target, handle))
    }

    /// Creates a bridge to `target` using an explicit runtime handle.
    #[must_use]
    pub fn with_handle(target: Arc<dyn AsyncDataSink>, handle: Handle) -> Self {
        Self {
            target: Some(target),
            handle,
            tmp: BytesMut::new(),
            tmp_capacity: 0,
        }
    }

    /// Current capacity of the reusable transfer buffer.
    ///
    /// Monotonically non-decreasing over the bridge's lifetime.
    #[must_use]
    pub fn transfer_capacity(&self) -> usize {
        self.tmp_capacity
    }

    /// Copies `buf` into the transfer buffer and splits off an owned payload.
    ///
    /// `reserve` reclaims the previous allocation when the destination has
    /// dropped its copy; otherwise a replacement buffer is allocated and the
    /// old one stays alive until the destination lets go of it.
    fn marshal(&mut self, buf: &[u8]) -> Bytes {
        self.tmp_capacity = self.tmp_capacity.max(buf.len());
        self.tmp.reserve(self.tmp_capacity);
        self.tmp.extend_from_slice(buf);
        self.tmp.split().freeze()
    }

    /// Runs `fut` to completion inside the destination's runtime.
    ///
    /// Panics from the destination and runtime-shutdown panics from tokio
    /// are caught here; nothing unwinds back into the encoder.
    fn enter_and_block<F: std::future::Future>(&self, fut: F) -> Result<F::Output, SinkError> {
        let handle = &self.handle;
        catch_unwind(AssertUnwindSafe(|| {
            if Handle::try_current().is_ok() {
                tokio::task::block_in_place(|| handle.block_on(fut))
            } else {
                handle.block_on(fut)
            }
        }))
        .map_err(|panic| SinkError::ContextUnavailable {
            reason: panic_reason(&*panic),
        })
    }
}

impl DataSink for BridgeSink {
    fn write(&mut self, position: u64, buf: &[u8]) -> Result<u64, SinkError> {
        let Some(target) = self.target.clone() else {
            return Err(SinkError::Released);
        };

        tracing::trace!(position, len = buf.len(), "bridge sink write");

        let data = self.marshal(buf);
        self.enter_and_block(target.write(position, data))?
    }

    fn release(&mut self) {
        let Some(target) = self.target.take() else {
            return;
        };

        // Nothing valid to release if the runtime is already gone; skip the
        // destination's hook rather than compound the failure.
        if let Err(e) = self.enter_and_block(target.release()) {
            tracing::warn!(error = %e, "bridge sink release skipped");
        }

        self.tmp = BytesMut::new();
        self.tmp_capacity = 0;
    }
}

fn panic_reason(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "destination panicked".to_string()
    }
}
