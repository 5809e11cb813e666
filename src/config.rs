//! Configuration for encoding sessions.

use crate::EncoderError;

/// Bit depth of the input PCM. The crate accepts 16-bit samples only.
pub const BITS_PER_SAMPLE: u32 = 16;

/// Maximum channel count FLAC supports.
const MAX_CHANNELS: u32 = 8;

/// Maximum libFLAC compression level.
const MAX_COMPRESSION_LEVEL: u32 = 8;

/// Configuration for a [`FlacEncoder`](crate::FlacEncoder) session.
///
/// Use [`EncoderConfig::new`] for the defaults the crate was designed
/// around: compression level 5 with verification enabled.
///
/// # Example
///
/// ```
/// use stream_flac::EncoderConfig;
///
/// let config = EncoderConfig::new(44100, 2).compression_level(8);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderConfig {
    /// Sample rate of the input PCM, in Hz.
    pub sample_rate: u32,

    /// Number of interleaved channels in the input PCM.
    pub channels: u32,

    /// libFLAC compression level, 0 (fastest) to 8 (smallest).
    ///
    /// Default: 5
    pub compression_level: u32,

    /// Whether the encoder verifies its own output by decoding it in
    /// parallel. Slower, but a corrupted stream fails at `push` time
    /// instead of at playback time.
    ///
    /// Default: true
    pub verify: bool,
}

impl EncoderConfig {
    /// Creates a configuration with default compression and verification.
    #[must_use]
    pub fn new(sample_rate: u32, channels: u32) -> Self {
        Self {
            sample_rate,
            channels,
            compression_level: 5,
            verify: true,
        }
    }

    /// Sets the compression level.
    #[must_use]
    pub fn compression_level(mut self, level: u32) -> Self {
        self.compression_level = level;
        self
    }

    /// Enables or disables output verification.
    #[must_use]
    pub fn verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Checks the configuration against the ranges FLAC accepts.
    ///
    /// [`FlacEncoder::new`](crate::FlacEncoder::new) calls this before
    /// touching the encoder, so out-of-range parameters fail with a
    /// readable error instead of a raw libFLAC init status.
    pub fn validate(&self) -> Result<(), EncoderError> {
        if self.sample_rate == 0 {
            return Err(EncoderError::Configuration {
                reason: "sample rate must be non-zero".to_string(),
            });
        }
        if self.channels == 0 || self.channels > MAX_CHANNELS {
            return Err(EncoderError::Configuration {
                reason: format!(
                    "channel count {} is out of range (1-{MAX_CHANNELS})",
                    self.channels
                ),
            });
        }
        if self.compression_level > MAX_COMPRESSION_LEVEL {
            return Err(EncoderError::Configuration {
                reason: format!(
                    "compression level {} is out of range (0-{MAX_COMPRESSION_LEVEL})",
                    self.compression_level
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = EncoderConfig::new(44100, 2);
        assert_eq!(config.sample_rate, 44100);
        assert_eq!(config.channels, 2);
        assert_eq!(config.compression_level, 5);
        assert!(config.verify);
    }

    #[test]
    fn test_config_builders() {
        let config = EncoderConfig::new(48000, 1).compression_level(0).verify(false);
        assert_eq!(config.compression_level, 0);
        assert!(!config.verify);
    }

    #[test]
    fn test_validate_rejects_zero_sample_rate() {
        let config = EncoderConfig::new(0, 2);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_channel_counts() {
        assert!(EncoderConfig::new(44100, 0).validate().is_err());
        assert!(EncoderConfig::new(44100, 9).validate().is_err());
        assert!(EncoderConfig::new(44100, 8).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_compression_level() {
        assert!(EncoderConfig::new(44100, 2).compression_level(9).validate().is_err());
        assert!(EncoderConfig::new(44100, 2).compression_level(8).validate().is_ok());
    }
}
