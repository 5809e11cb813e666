//! Encodes two seconds of a stereo sine sweep to `sine.flac`.
//!
//! Run with: `cargo run --example encode_sine`

use stream_flac::{EncoderConfig, FileSink, FlacEncoder};

const SAMPLE_RATE: u32 = 44100;
const CHANNELS: u32 = 2;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let sink = FileSink::create("sine.flac")?;
    let mut session = FlacEncoder::new(Box::new(sink), EncoderConfig::new(SAMPLE_RATE, CHANNELS))?;

    // Push in 4096-frame blocks, the way a capture callback would deliver them
    let block_frames = 4096usize;
    let total_frames = (SAMPLE_RATE * 2) as usize;
    let mut pcm = Vec::with_capacity(block_frames * CHANNELS as usize * 2);

    let mut frame = 0usize;
    while frame < total_frames {
        pcm.clear();
        for i in frame..(frame + block_frames).min(total_frames) {
            let t = i as f32 / SAMPLE_RATE as f32;
            let sweep = 220.0 + 440.0 * t;
            let sample = ((t * sweep * std::f32::consts::TAU).sin() * 16000.0) as i16;
            // Same signal on both channels
            pcm.extend_from_slice(&sample.to_le_bytes());
            pcm.extend_from_slice(&sample.to_le_bytes());
        }
        session.push(&pcm)?;
        frame += block_frames;
    }

    session.finish()?;
    drop(session);

    let bytes = std::fs::metadata("sine.flac")?.len();
    tracing::info!(bytes, "wrote sine.flac");

    Ok(())
}
