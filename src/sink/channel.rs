//! Tokio mpsc channel sink implementation.

use crate::sink::AsyncDataSink;
use crate::SinkError;
use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

/// A chunk of encoded output, tagged with its logical position.
///
/// Positions are not necessarily monotonic: the encoder seeks back into the
/// stream header when it finalizes. Consumers that persist the stream should
/// apply each chunk at its position; consumers that only forward bytes can
/// ignore positions and live with a stale header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedChunk {
    /// Logical byte offset of this chunk in the encoded stream.
    pub position: u64,
    /// The encoded bytes.
    pub data: Bytes,
}

/// A sink that sends encoded chunks to a tokio mpsc channel.
///
/// Use with [`BridgeSink`](crate::BridgeSink) to stream encoder output into
/// an async consumer (uploader, socket writer, etc.).
///
/// # Example
///
/// ```
/// use stream_flac::{ChannelSink, EncodedChunk};
/// use tokio::sync::mpsc;
///
/// let (tx, mut rx) = mpsc::channel::<EncodedChunk>(32);
/// let sink = ChannelSink::new(tx);
///
/// // Wrap in a BridgeSink, hand to a FlacEncoder, then:
/// // while let Some(chunk) = rx.recv().await { ... }
/// ```
pub struct ChannelSink {
    sender: mpsc::Sender<EncodedChunk>,
}

impl ChannelSink {
    /// Creates a new channel sink with the given sender.
    #[must_use]
    pub fn new(sender: mpsc::Sender<EncodedChunk>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl AsyncDataSink for ChannelSink {
    async fn write(&self, position: u64, data: Bytes) -> Result<u64, SinkError> {
        let len = data.len() as u64;
        self.sender
            .send(EncodedChunk { position, data })
            .await
            .map_err(|_| SinkError::ChannelClosed)?;
        Ok(len)
    }
}
