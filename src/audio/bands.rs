//! Band extraction: spectrum magnitudes reduced to three scalar bands.

use crate::audio::fft::SpectrumAnalyser;
use crate::params::SPECTRUM_MAX;

/// Per-tick snapshot of band energies, each in [0, 1]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AudioFrame {
    /// Bass: first 20% of spectrum bins
    pub low: f32,
    /// Mids: next 55% of bins
    pub mid: f32,
    /// Highs: final 25% of bins
    pub high: f32,
}

impl AudioFrame {
    /// The frame produced when no audio source is ready
    pub const SILENT: AudioFrame = AudioFrame {
        low: 0.0,
        mid: 0.0,
        high: 0.0,
    };
}

fn mean(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f32>() / samples.len() as f32
}

/// Reduce a magnitude spectrum (0..SPECTRUM_MAX per bin) to band means.
///
/// Total function: empty input yields the silent frame, never an error.
pub fn read_bands(samples: &[f32]) -> AudioFrame {
    let n = samples.len();
    if n == 0 {
        return AudioFrame::SILENT;
    }
    let low_end = (n as f32 * 0.20) as usize;
    let mid_end = (n as f32 * 0.75) as usize;
    AudioFrame {
        low: (mean(&samples[..low_end]) / SPECTRUM_MAX).clamp(0.0, 1.0),
        mid: (mean(&samples[low_end..mid_end]) / SPECTRUM_MAX).clamp(0.0, 1.0),
        high: (mean(&samples[mid_end..]) / SPECTRUM_MAX).clamp(0.0, 1.0),
    }
}

/// Read bands from an analyser that may not be bound yet.
pub fn read_analyser(analyser: Option<&SpectrumAnalyser>) -> AudioFrame {
    match analyser {
        Some(a) => read_bands(&a.frequency_samples()),
        None => AudioFrame::SILENT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_spectrum_is_silent() {
        assert_eq!(read_bands(&[]), AudioFrame::SILENT);
        assert_eq!(read_analyser(None), AudioFrame::SILENT);
    }

    #[test]
    fn test_bands_in_unit_range() {
        // Out-of-range magnitudes must still clamp into [0, 1].
        let spectrum = vec![500.0_f32; 100];
        let frame = read_bands(&spectrum);
        for band in [frame.low, frame.mid, frame.high] {
            assert!((0.0..=1.0).contains(&band));
        }
        assert_eq!(frame.low, 1.0);
    }

    #[test]
    fn test_band_split_is_disjoint() {
        // 100 bins: lows = bins 0..20, mids = 20..75, highs = 75..100.
        let mut spectrum = vec![0.0_f32; 100];
        for bin in spectrum.iter_mut().take(20) {
            *bin = 255.0;
        }
        let frame = read_bands(&spectrum);
        assert!((frame.low - 1.0).abs() < 1e-6);
        assert_eq!(frame.mid, 0.0);
        assert_eq!(frame.high, 0.0);

        let mut spectrum = vec![0.0_f32; 100];
        for bin in spectrum.iter_mut().skip(75) {
            *bin = 255.0;
        }
        let frame = read_bands(&spectrum);
        assert_eq!(frame.low, 0.0);
        assert_eq!(frame.mid, 0.0);
        assert!((frame.high - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_uniform_spectrum_gives_equal_bands() {
        let spectrum = vec![127.5_f32; 1000];
        let frame = read_bands(&spectrum);
        assert!((frame.low - 0.5).abs() < 1e-3);
        assert!((frame.mid - 0.5).abs() < 1e-3);
        assert!((frame.high - 0.5).abs() < 1e-3);
    }
}
