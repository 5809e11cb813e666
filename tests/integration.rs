//! Integration tests for stream-flac.
//!
//! These drive the real libFLAC encoder end-to-end against the built-in
//! sinks and the async bridge.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use stream_flac::{
    AsyncDataSink, BridgeSink, ChannelSink, DataSink, EncodedChunk, EncoderConfig, FlacEncoder,
    FileSink, MemorySink, SinkError,
};
use tokio::sync::mpsc;

/// Forwards to a [`MemorySink`] while logging every (position, length).
struct RecordingSink {
    inner: MemorySink,
    log: Arc<Mutex<Vec<(u64, usize)>>>,
    releases: Arc<AtomicUsize>,
}

impl RecordingSink {
    fn new() -> (Self, Arc<Mutex<Vec<u8>>>, Arc<Mutex<Vec<(u64, usize)>>>, Arc<AtomicUsize>) {
        let inner = MemorySink::new();
        let data = inner.buffer();
        let log = Arc::new(Mutex::new(Vec::new()));
        let releases = Arc::new(AtomicUsize::new(0));
        (
            Self {
                inner,
                log: Arc::clone(&log),
                releases: Arc::clone(&releases),
            },
            data,
            log,
            releases,
        )
    }
}

impl DataSink for RecordingSink {
    fn write(&mut self, position: u64, buf: &[u8]) -> Result<u64, SinkError> {
        self.log.lock().unwrap().push((position, buf.len()));
        self.inner.write(position, buf)
    }

    fn release(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
        self.inner.release();
    }
}

fn sine_pcm(samples: usize) -> Vec<u8> {
    (0..samples)
        .flat_map(|i| (((i as f32 / 16.0).sin() * 10000.0) as i16).to_le_bytes())
        .collect()
}

#[test]
fn test_two_small_pushes_then_finish() {
    // 44100 Hz stereo, two pushes of 4 interleaved samples (8 bytes) each
    let (sink, data, log, _releases) = RecordingSink::new();
    let mut session = FlacEncoder::new(Box::new(sink), EncoderConfig::new(44100, 2)).unwrap();

    let pcm = [1i16, -1, 2, -2]
        .iter()
        .flat_map(|s| s.to_le_bytes())
        .collect::<Vec<u8>>();
    assert_eq!(pcm.len(), 8);

    assert_eq!(session.push(&pcm).unwrap(), 8);
    assert_eq!(session.push(&pcm).unwrap(), 8);
    session.finish().unwrap();
    drop(session);

    // The stream header was written at position 0
    let log = log.lock().unwrap();
    assert!(log.iter().any(|&(position, _)| position == 0));

    let data = data.lock().unwrap();
    assert_eq!(&data[0..4], b"fLaC");
}

#[test]
fn test_encode_to_memory_produces_flac_stream() {
    let sink = MemorySink::new();
    let data = sink.buffer();
    let mut session = FlacEncoder::new(Box::new(sink), EncoderConfig::new(44100, 2)).unwrap();

    for _ in 0..8 {
        let pcm = sine_pcm(4096 * 2);
        let len = pcm.len();
        assert_eq!(session.push(&pcm).unwrap(), len);
    }
    session.finish().unwrap();
    drop(session);

    let data = data.lock().unwrap();
    assert_eq!(&data[0..4], b"fLaC");
    // Signature + STREAMINFO block header + STREAMINFO, plus audio frames
    assert!(data.len() > 4 + 4 + 34);
}

#[test]
fn test_abandoned_session_releases_sink_once() {
    let (sink, data, _log, releases) = RecordingSink::new();
    let mut session = FlacEncoder::new(Box::new(sink), EncoderConfig::new(48000, 1)).unwrap();
    session.push(&sine_pcm(1000)).unwrap();

    // Abandon without finishing
    drop(session);

    assert_eq!(releases.load(Ordering::SeqCst), 1);
    // libFLAC still finalizes the stream during teardown
    assert_eq!(&data.lock().unwrap()[0..4], b"fLaC");
}

#[test]
fn test_encode_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.flac");

    let sink = FileSink::create(&path).unwrap();
    let mut session = FlacEncoder::new(Box::new(sink), EncoderConfig::new(44100, 2)).unwrap();

    for _ in 0..4 {
        session.push(&sine_pcm(4096 * 2)).unwrap();
    }
    session.finish().unwrap();
    drop(session);

    let data = std::fs::read(&path).unwrap();
    assert_eq!(&data[0..4], b"fLaC");
    assert!(data.len() > 42);
}

/// Applies a positional chunk to a growing byte vector.
fn apply_chunk(stream: &mut Vec<u8>, chunk: &EncodedChunk) {
    let position = chunk.position as usize;
    let end = position + chunk.data.len();
    if stream.len() < end {
        stream.resize(end, 0);
    }
    stream[position..end].copy_from_slice(&chunk.data);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_encode_through_bridge_to_channel() {
    let (tx, mut rx) = mpsc::channel::<EncodedChunk>(64);
    let bridge =
        BridgeSink::new(Arc::new(ChannelSink::new(tx)) as Arc<dyn AsyncDataSink>).unwrap();

    let pcm = sine_pcm(4096 * 4);

    // Reference: the same input encoded straight to memory
    let reference = {
        let sink = MemorySink::new();
        let data = sink.buffer();
        let mut session = FlacEncoder::new(Box::new(sink), EncoderConfig::new(44100, 2)).unwrap();
        session.push(&pcm).unwrap();
        session.finish().unwrap();
        drop(session);
        let data = data.lock().unwrap();
        data.clone()
    };

    // Drive the encoder from a plain thread, as a capture pipeline would
    let encoder_pcm = pcm.clone();
    let encoder = std::thread::spawn(move || {
        let mut session =
            FlacEncoder::new(Box::new(bridge), EncoderConfig::new(44100, 2)).unwrap();
        session.push(&encoder_pcm).unwrap();
        session.finish().unwrap();
    });

    // Consume chunks until the sink is released and the channel closes
    let mut stream = Vec::new();
    while let Some(chunk) = rx.recv().await {
        apply_chunk(&mut stream, &chunk);
    }
    encoder.join().unwrap();

    assert_eq!(&stream[0..4], b"fLaC");
    assert_eq!(stream, reference);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_bridge_channel_closed_fails_session() {
    let (tx, rx) = mpsc::channel::<EncodedChunk>(64);
    drop(rx);

    let bridge =
        BridgeSink::new(Arc::new(ChannelSink::new(tx)) as Arc<dyn AsyncDataSink>).unwrap();

    // The header write during init fails because the channel is closed
    let result = tokio::task::spawn_blocking(move || {
        FlacEncoder::new(Box::new(bridge), EncoderConfig::new(44100, 2)).map(|_| ())
    })
    .await
    .unwrap();

    assert!(result.is_err());
}
