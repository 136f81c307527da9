//! Audio playback and FFT analysis configuration.

/// Normalization maximum for spectrum magnitudes.
///
/// The FFT thread scales magnitudes into 0..255 (byte-frequency-data
/// convention), and band extraction divides by this to land in [0, 1].
pub const SPECTRUM_MAX: f32 = 255.0;

/// FFT analysis configuration
#[derive(Debug, Clone)]
pub struct FftConfig {
    /// Audio sample rate (Hz)
    pub sample_rate_hz: usize,

    /// FFT window size (must be power of 2)
    pub fft_size: usize,

    /// FFT update interval (milliseconds); 50 = 20 Hz update rate
    pub update_interval_ms: u64,

    /// Magnitude smoothing factor (0..1, fraction of previous frame kept)
    pub smoothing: f32,
}

impl Default for FftConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 44100,
            fft_size: 1024,
            update_interval_ms: 50,
            smoothing: 0.8,
        }
    }
}

impl FftConfig {
    /// Validate configuration (FFT size must be power of 2, etc.)
    pub fn validate(&self) -> Result<(), String> {
        if !self.fft_size.is_power_of_two() {
            return Err(format!(
                "FFT size must be power of 2, got {}",
                self.fft_size
            ));
        }
        if self.sample_rate_hz == 0 {
            return Err("Sample rate must be > 0".to_string());
        }
        if !(0.0..1.0).contains(&self.smoothing) {
            return Err(format!("Smoothing must be in [0, 1), got {}", self.smoothing));
        }
        Ok(())
    }
}

/// Audio asset configuration (the soundtrack driving the visuals)
#[derive(Debug, Clone)]
pub struct AudioAssetConfig {
    /// Path to a WAV file to decode and play
    pub path: String,

    /// Loop playback when the asset ends
    pub looping: bool,

    /// Output gain (0..1, applied after the safety clip)
    pub volume: f32,
}

impl Default for AudioAssetConfig {
    fn default() -> Self {
        Self {
            path: "sounds/cafe_oto.wav".to_string(),
            looping: true,
            volume: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fft_config_default_is_valid() {
        assert!(FftConfig::default().validate().is_ok());
    }

    #[test]
    fn test_fft_config_rejects_non_power_of_two() {
        let config = FftConfig {
            fft_size: 1000,
            ..FftConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_fft_config_rejects_zero_sample_rate() {
        let config = FftConfig {
            sample_rate_hz: 0,
            ..FftConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
