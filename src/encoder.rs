//! The streaming encoder session.
//!
//! [`FlacEncoder`] owns a libFLAC stream encoder and drives it against a
//! [`DataSink`]. The encoder believes it is writing to a random-access file;
//! the session keeps a logical byte cursor and answers the encoder's
//! seek/tell/write callbacks against the sink, which only ever sees
//! positional writes.

use crate::sink::DataSink;
use crate::{EncoderConfig, EncoderError, BITS_PER_SAMPLE};
use libflac_sys as flac;
use std::os::raw::c_void;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;

/// State shared with the libFLAC callbacks.
///
/// Boxed by the session so its address stays stable when the session moves.
struct CallbackState {
    sink: Box<dyn DataSink>,
    /// Logical byte cursor into the sink. Advances only by bytes the sink
    /// acknowledged; the seek callback repositions it without touching the
    /// sink itself.
    current_offset: i64,
    sink_released: bool,
}

/// A streaming FLAC encoding session.
///
/// Create one with a sink and a format, feed it interleaved 16-bit PCM via
/// [`push`](Self::push), then [`finish`](Self::finish). Dropping the session
/// deletes the encoder and releases the sink exactly once, from any state —
/// a session may be abandoned without finishing.
///
/// A session must be driven from one thread at a time. It is `Send` but not
/// `Sync`; all operations take `&mut self` and perform no internal locking.
///
/// # Example
///
/// ```no_run
/// use stream_flac::{EncoderConfig, FlacEncoder, FileSink};
///
/// let sink = FileSink::create("out.flac")?;
/// let mut session = FlacEncoder::new(Box::new(sink), EncoderConfig::new(44100, 2))?;
///
/// let pcm: Vec<u8> = vec![0; 4096]; // 16-bit LE interleaved samples
/// session.push(&pcm)?;
/// session.finish()?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct FlacEncoder {
    raw: *mut flac::FLAC__StreamEncoder,
    state: Box<CallbackState>,
    config: EncoderConfig,
    // Grow-only conversion buffers, sized to the largest batch seen so far.
    buffer16: Vec<i16>,
    buffer32: Vec<i32>,
    invalid: bool,
    finished: bool,
}

// The raw encoder is only touched through &mut self: the session may move
// between threads but is never shared.
unsafe impl Send for FlacEncoder {}

impl std::fmt::Debug for FlacEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlacEncoder")
            .field("raw", &self.raw)
            .field("config", &self.config)
            .field("invalid", &self.invalid)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl FlacEncoder {
    /// Creates a session and initializes the encoder against `sink`.
    ///
    /// Note that libFLAC emits the `fLaC` signature and STREAMINFO through
    /// the write callback during initialization, so the sink sees its first
    /// writes here, not at the first `push`.
    ///
    /// On failure the partially-built session is torn down before
    /// returning: the sink's `release` has already run by the time the
    /// error reaches the caller.
    pub fn new(sink: Box<dyn DataSink>, config: EncoderConfig) -> Result<Self, EncoderError> {
        let mut session = Self {
            raw: ptr::null_mut(),
            state: Box::new(CallbackState {
                sink,
                current_offset: 0,
                sink_released: false,
            }),
            config,
            buffer16: Vec::new(),
            buffer32: Vec::new(),
            invalid: true,
            finished: false,
        };

        match session.init() {
            Ok(()) => {
                session.invalid = false;
                Ok(session)
            }
            Err(e) => {
                tracing::error!(error = %e, "encoder session construction failed");
                Err(e)
            }
        }
    }

    fn init(&mut self) -> Result<(), EncoderError> {
        self.config.validate()?;

        let raw = unsafe { flac::FLAC__stream_encoder_new() };
        if raw.is_null() {
            return Err(EncoderError::Configuration {
                reason: "could not allocate encoder".to_string(),
            });
        }
        self.raw = raw;

        let mut ok = true;
        unsafe {
            ok &= flac::FLAC__stream_encoder_set_verify(raw, i32::from(self.config.verify)) != 0;
            ok &= flac::FLAC__stream_encoder_set_compression_level(raw, self.config.compression_level)
                != 0;
            ok &= flac::FLAC__stream_encoder_set_channels(raw, self.config.channels) != 0;
            ok &= flac::FLAC__stream_encoder_set_bits_per_sample(raw, BITS_PER_SAMPLE) != 0;
            ok &= flac::FLAC__stream_encoder_set_sample_rate(raw, self.config.sample_rate) != 0;
        }
        if !ok {
            return Err(EncoderError::Configuration {
                reason: "encoder rejected stream parameters".to_string(),
            });
        }

        let client_data = (&mut *self.state as *mut CallbackState).cast::<c_void>();
        let status = unsafe {
            flac::FLAC__stream_encoder_init_stream(
                raw,
                Some(write_callback),
                Some(seek_callback),
                Some(tell_callback),
                None,
                client_data,
            )
        };
        if status != flac::FLAC__STREAM_ENCODER_INIT_STATUS_OK {
            return Err(EncoderError::Init {
                reason: init_status_name(status).to_string(),
            });
        }

        Ok(())
    }

    /// Pushes a block of interleaved 16-bit little-endian PCM bytes.
    ///
    /// `pcm.len()` should be a multiple of `2 * channels`; a trailing
    /// partial frame is silently not encoded. Returns the number of input
    /// bytes consumed (always `pcm.len()` on success).
    ///
    /// Most failures leave the session invalid: a conversion buffer that
    /// cannot grow, a sink write failure, or the encoder rejecting the
    /// block all end the session. Later calls fail fast with
    /// [`EncoderError::SessionInvalid`] without touching the encoder or
    /// the sink.
    pub fn push(&mut self, pcm: &[u8]) -> Result<usize, EncoderError> {
        if self.invalid {
            return Err(EncoderError::SessionInvalid);
        }
        if self.finished {
            return Err(EncoderError::SessionFinished);
        }

        let samples = pcm.len() / 2;
        let frames = samples / self.config.channels as usize;

        self.prepare_buffers(samples)?;

        for (dst, src) in self.buffer16[..samples].iter_mut().zip(pcm.chunks_exact(2)) {
            *dst = i16::from_le_bytes([src[0], src[1]]);
        }
        // Pure sign-extension widen; libFLAC takes samples as i32 at any
        // declared bit depth.
        for (dst, src) in self.buffer32[..samples].iter_mut().zip(&self.buffer16[..samples]) {
            *dst = i32::from(*src);
        }

        tracing::trace!(bytes = pcm.len(), frames, "pushing samples");

        let ok = unsafe {
            flac::FLAC__stream_encoder_process_interleaved(
                self.raw,
                self.buffer32.as_ptr(),
                frames as u32,
            )
        };
        if ok == 0 {
            self.invalid = true;
            let state = self.state_name();
            tracing::error!(state, "encoder rejected sample block");
            return Err(EncoderError::Encode {
                state: state.to_string(),
            });
        }

        Ok(pcm.len())
    }

    /// Flushes and finalizes the encoded stream.
    ///
    /// Idempotent: repeated calls report the same terminal state as the
    /// first. A failed finish leaves the session invalid.
    pub fn finish(&mut self) -> Result<(), EncoderError> {
        if self.finished {
            return if self.invalid {
                Err(EncoderError::SessionInvalid)
            } else {
                Ok(())
            };
        }
        if self.invalid || self.raw.is_null() {
            return Err(EncoderError::SessionInvalid);
        }

        self.finished = true;
        let ok = unsafe { flac::FLAC__stream_encoder_finish(self.raw) };
        if ok == 0 {
            self.invalid = true;
            let state = self.state_name();
            tracing::error!(state, "encoder finish failed");
            return Err(EncoderError::Finish {
                state: state.to_string(),
            });
        }

        Ok(())
    }

    /// Whether the session can no longer encode.
    #[must_use]
    pub fn is_invalid(&self) -> bool {
        self.invalid
    }

    /// Whether [`finish`](Self::finish) has been attempted.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The logical byte cursor into the sink.
    ///
    /// Equals the total bytes the sink has acknowledged, except transiently
    /// during finalization when the encoder seeks back to rewrite the
    /// stream header.
    #[must_use]
    pub fn current_offset(&self) -> u64 {
        self.state.current_offset.max(0) as u64
    }

    /// Grows both conversion buffers to at least `samples` elements.
    ///
    /// Buffers never shrink. A growth failure leaves the session invalid
    /// and the input unconsumed.
    fn prepare_buffers(&mut self, samples: usize) -> Result<(), EncoderError> {
        if samples <= self.buffer16.len() {
            return Ok(());
        }

        let grown = self
            .buffer16
            .try_reserve(samples - self.buffer16.len())
            .and_then(|()| self.buffer32.try_reserve(samples - self.buffer32.len()));
        if let Err(e) = grown {
            self.invalid = true;
            tracing::error!(samples, "conversion buffer growth failed");
            return Err(e.into());
        }

        self.buffer16.resize(samples, 0);
        self.buffer32.resize(samples, 0);
        Ok(())
    }

    fn state_name(&self) -> &'static str {
        encoder_state_name(unsafe { flac::FLAC__stream_encoder_get_state(self.raw) })
    }
}

impl Drop for FlacEncoder {
    fn drop(&mut self) {
        if !self.raw.is_null() {
            // libFLAC finishes an initialized encoder as part of delete, so
            // the sink may still see writes here.
            unsafe { flac::FLAC__stream_encoder_delete(self.raw) };
            self.raw = ptr::null_mut();
        }

        if !self.state.sink_released {
            self.state.sink_released = true;
            self.state.sink.release();
        }
    }
}

unsafe extern "C" fn write_callback(
    _encoder: *const flac::FLAC__StreamEncoder,
    buffer: *const flac::FLAC__byte,
    bytes: usize,
    _samples: u32,
    _current_frame: u32,
    client_data: *mut c_void,
) -> flac::FLAC__StreamEncoderWriteStatus {
    let state = &mut *client_data.cast::<CallbackState>();
    let data = std::slice::from_raw_parts(buffer, bytes);
    let position = state.current_offset as u64;

    // Nothing may unwind across the extern "C" boundary; a sink panic is
    // translated into a fatal write status instead.
    let result = catch_unwind(AssertUnwindSafe(|| state.sink.write(position, data)));

    match result {
        Ok(Ok(written)) if written == bytes as u64 => {
            state.current_offset += written as i64;
            flac::FLAC__STREAM_ENCODER_WRITE_STATUS_OK
        }
        Ok(Ok(written)) => {
            tracing::error!(expected = bytes, written, "sink short write");
            flac::FLAC__STREAM_ENCODER_WRITE_STATUS_FATAL_ERROR
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "sink write failed");
            flac::FLAC__STREAM_ENCODER_WRITE_STATUS_FATAL_ERROR
        }
        Err(_) => {
            tracing::error!("sink write panicked");
            flac::FLAC__STREAM_ENCODER_WRITE_STATUS_FATAL_ERROR
        }
    }
}

unsafe extern "C" fn seek_callback(
    _encoder: *const flac::FLAC__StreamEncoder,
    absolute_byte_offset: flac::FLAC__uint64,
    client_data: *mut c_void,
) -> flac::FLAC__StreamEncoderSeekStatus {
    let state = &mut *client_data.cast::<CallbackState>();
    // No physical seek; the sink honors the position on the next write.
    state.current_offset = absolute_byte_offset as i64;
    flac::FLAC__STREAM_ENCODER_SEEK_STATUS_OK
}

unsafe extern "C" fn tell_callback(
    _encoder: *const flac::FLAC__StreamEncoder,
    absolute_byte_offset: *mut flac::FLAC__uint64,
    client_data: *mut c_void,
) -> flac::FLAC__StreamEncoderTellStatus {
    let state = &*client_data.cast::<CallbackState>();
    *absolute_byte_offset = state.current_offset.max(0) as u64;
    flac::FLAC__STREAM_ENCODER_TELL_STATUS_OK
}

fn init_status_name(status: flac::FLAC__StreamEncoderInitStatus) -> &'static str {
    match status {
        flac::FLAC__STREAM_ENCODER_INIT_STATUS_OK => "OK (unexpected failure)",
        flac::FLAC__STREAM_ENCODER_INIT_STATUS_ENCODER_ERROR => "encoder error",
        flac::FLAC__STREAM_ENCODER_INIT_STATUS_UNSUPPORTED_CONTAINER => "unsupported container",
        flac::FLAC__STREAM_ENCODER_INIT_STATUS_INVALID_CALLBACKS => "invalid callbacks",
        flac::FLAC__STREAM_ENCODER_INIT_STATUS_INVALID_NUMBER_OF_CHANNELS => {
            "invalid number of channels"
        }
        flac::FLAC__STREAM_ENCODER_INIT_STATUS_INVALID_BITS_PER_SAMPLE => "invalid bits per sample",
        flac::FLAC__STREAM_ENCODER_INIT_STATUS_INVALID_SAMPLE_RATE => "invalid sample rate",
        flac::FLAC__STREAM_ENCODER_INIT_STATUS_INVALID_BLOCK_SIZE => "invalid block size",
        flac::FLAC__STREAM_ENCODER_INIT_STATUS_INVALID_MAX_LPC_ORDER => "invalid max LPC order",
        flac::FLAC__STREAM_ENCODER_INIT_STATUS_INVALID_QLP_COEFF_PRECISION => {
            "invalid QLP coefficient precision"
        }
        flac::FLAC__STREAM_ENCODER_INIT_STATUS_BLOCK_SIZE_TOO_SMALL_FOR_LPC_ORDER => {
            "block size too small for LPC order"
        }
        flac::FLAC__STREAM_ENCODER_INIT_STATUS_NOT_STREAMABLE => "not streamable",
        flac::FLAC__STREAM_ENCODER_INIT_STATUS_INVALID_METADATA => "invalid metadata",
        flac::FLAC__STREAM_ENCODER_INIT_STATUS_ALREADY_INITIALIZED => "already initialized",
        _ => "unknown init status",
    }
}

fn encoder_state_name(state: flac::FLAC__StreamEncoderState) -> &'static str {
    match state {
        flac::FLAC__STREAM_ENCODER_OK => "FLAC__STREAM_ENCODER_OK",
        flac::FLAC__STREAM_ENCODER_UNINITIALIZED => "FLAC__STREAM_ENCODER_UNINITIALIZED",
        flac::FLAC__STREAM_ENCODER_OGG_ERROR => "FLAC__STREAM_ENCODER_OGG_ERROR",
        flac::FLAC__STREAM_ENCODER_VERIFY_DECODER_ERROR => {
            "FLAC__STREAM_ENCODER_VERIFY_DECODER_ERROR"
        }
        flac::FLAC__STREAM_ENCODER_VERIFY_MISMATCH_IN_AUDIO_DATA => {
            "FLAC__STREAM_ENCODER_VERIFY_MISMATCH_IN_AUDIO_DATA"
        }
        flac::FLAC__STREAM_ENCODER_CLIENT_ERROR => "FLAC__STREAM_ENCODER_CLIENT_ERROR",
        flac::FLAC__STREAM_ENCODER_IO_ERROR => "FLAC__STREAM_ENCODER_IO_ERROR",
        flac::FLAC__STREAM_ENCODER_FRAMING_ERROR => "FLAC__STREAM_ENCODER_FRAMING_ERROR",
        flac::FLAC__STREAM_ENCODER_MEMORY_ALLOCATION_ERROR => {
            "FLAC__STREAM_ENCODER_MEMORY_ALLOCATION_ERROR"
        }
        _ => "unknown encoder state",
    }
}
