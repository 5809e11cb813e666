//! In-memory sink implementation.

use crate::sink::DataSink;
use crate::SinkError;
use std::sync::{Arc, Mutex};

/// A sink that collects encoded bytes into a shared in-memory buffer.
///
/// Useful for encode-to-bytes use cases and as the reference sink in tests.
/// The backing buffer is shared, so it stays readable after the session has
/// consumed and released the sink.
///
/// # Example
///
/// ```
/// use stream_flac::MemorySink;
///
/// let sink = MemorySink::new();
/// let output = sink.buffer();
/// // Hand `sink` to a FlacEncoder; read `output` when done:
/// // let bytes = output.lock().unwrap();
/// ```
#[derive(Default)]
pub struct MemorySink {
    data: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    /// Creates an empty in-memory sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle to the backing buffer.
    #[must_use]
    pub fn buffer(&self) -> Arc<Mutex<Vec<u8>>> {
        Arc::clone(&self.data)
    }
}

impl DataSink for MemorySink {
    fn write(&mut self, position: u64, buf: &[u8]) -> Result<u64, SinkError> {
        let mut data = self
            .data
            .lock()
            .map_err(|_| SinkError::write_failed("memory sink poisoned"))?;

        let position = position as usize;
        let end = position + buf.len();
        if end > data.len() {
            data.resize(end, 0);
        }
        data[position..end].copy_from_slice(buf);
        Ok(buf.len() as u64)
    }

    fn release(&mut self) {}
}
