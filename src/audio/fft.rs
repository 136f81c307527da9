//! FFT analysis thread and the shared spectrum analyser.

use rustfft::{num_complex::Complex, FftPlanner};
use std::f32::consts::PI;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::params::{FftConfig, SPECTRUM_MAX};

/// Shared magnitude spectrum, written by the FFT thread and read as
/// snapshots by every frame-loop consumer (lattice, lights).
///
/// Empty until the first FFT frame lands; consumers treat empty as silence.
pub struct SpectrumAnalyser {
    magnitudes: Mutex<Vec<f32>>,
}

impl SpectrumAnalyser {
    pub fn new() -> Self {
        Self {
            magnitudes: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of the current magnitude spectrum (0..SPECTRUM_MAX per bin).
    pub fn frequency_samples(&self) -> Vec<f32> {
        self.magnitudes.lock().unwrap().clone()
    }

    /// True once at least one non-zero bin has been published.
    pub fn has_signal(&self) -> bool {
        self.magnitudes.lock().unwrap().iter().any(|&m| m > 0.0)
    }

    pub(crate) fn publish(&self, spectrum: &[f32]) {
        let mut mags = self.magnitudes.lock().unwrap();
        mags.clear();
        mags.extend_from_slice(spectrum);
    }
}

impl Default for SpectrumAnalyser {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawn the FFT analysis thread.
///
/// Windows the accumulated mono samples with a Hann window, runs a forward
/// FFT at the configured interval with 50% overlap, and publishes the
/// positive-frequency magnitudes scaled into 0..SPECTRUM_MAX. Smoothing
/// keeps a fraction of the previous frame so the bands do not flicker.
pub fn spawn_fft_thread(
    config: FftConfig,
    sample_buffer: Arc<Mutex<Vec<f32>>>,
    analyser: Arc<SpectrumAnalyser>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(config.fft_size);
        let mut fft_input = vec![Complex::new(0.0, 0.0); config.fft_size];

        // Hann coherent gain is 0.5, so 4/N recovers unit amplitude.
        let amplitude_scale = 4.0 / config.fft_size as f32;
        let half = config.fft_size / 2;
        let mut smoothed = vec![0.0_f32; half];

        loop {
            thread::sleep(Duration::from_millis(config.update_interval_ms));

            let mut buf = sample_buffer.lock().unwrap();
            if buf.len() < config.fft_size {
                continue;
            }

            for i in 0..config.fft_size {
                let window = hann_window(i, config.fft_size);
                fft_input[i] = Complex::new(buf[i] * window, 0.0);
            }

            // 50% overlap, plus shedding any backlog beyond one window so
            // the buffer stays bounded and the window tracks real time
            let stale = drain_count(buf.len(), config.fft_size);
            buf.drain(0..stale);
            drop(buf);

            fft.process(&mut fft_input);

            for (bin, sample) in fft_input.iter().take(half).enumerate() {
                let magnitude = (sample.norm() * amplitude_scale * SPECTRUM_MAX)
                    .clamp(0.0, SPECTRUM_MAX);
                smoothed[bin] =
                    config.smoothing * smoothed[bin] + (1.0 - config.smoothing) * magnitude;
            }

            analyser.publish(&smoothed);
        }
    })
}

/// Samples to shed after one FFT frame: half the window for 50% overlap,
/// plus any excess beyond one window. Playback pushes samples faster than
/// the analysis interval consumes them, so without the excess term the
/// buffer grows without bound and the window falls behind the audio.
fn drain_count(len: usize, fft_size: usize) -> usize {
    len.saturating_sub(fft_size).max(fft_size / 2).min(len)
}

/// Hann window function for FFT analysis
fn hann_window(index: usize, size: usize) -> f32 {
    0.5 * (1.0 - ((2.0 * PI * index as f32) / (size as f32 - 1.0)).cos())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hann_window_shape() {
        let size = 1024;

        // Hann window should be 0 at edges, 1 at center
        assert!((hann_window(0, size) - 0.0).abs() < 0.01);
        assert!((hann_window(size - 1, size) - 0.0).abs() < 0.01);
        assert!((hann_window(size / 2, size) - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_analyser_starts_empty_and_silent() {
        let analyser = SpectrumAnalyser::new();
        assert!(analyser.frequency_samples().is_empty());
        assert!(!analyser.has_signal());
    }

    #[test]
    fn test_analyser_publish_snapshot() {
        let analyser = SpectrumAnalyser::new();
        analyser.publish(&[0.0, 12.0, 3.0]);
        assert!(analyser.has_signal());

        let snapshot = analyser.frequency_samples();
        assert_eq!(snapshot, vec![0.0, 12.0, 3.0]);

        // Snapshot is a copy; a later publish does not alias it.
        analyser.publish(&[1.0, 1.0, 1.0]);
        assert_eq!(snapshot[1], 12.0);
    }

    #[test]
    fn test_drain_keeps_half_window_overlap_when_caught_up() {
        // At or just above one window the drain is exactly half the window
        assert_eq!(drain_count(1024, 1024), 512);
        assert_eq!(drain_count(1400, 1024), 512);
        // Far behind, the drain leaves exactly one window of fresh samples
        assert_eq!(drain_count(5000, 1024), 3976);
    }

    #[test]
    fn test_sample_buffer_stays_bounded_under_playback_rate() {
        let fft_size = 1024_usize;
        let mut len = 0_usize;

        // One 50ms analysis interval accumulates ~2205 samples at 44.1kHz,
        // far more than a half-window drain would remove. Simulate minutes
        // of iterations and check the buffer never outgrows one window.
        for _ in 0..10_000 {
            len += 2205;
            if len < fft_size {
                continue;
            }
            len -= drain_count(len, fft_size);
            assert!(len <= fft_size, "buffer grew to {} samples", len);
        }
    }

    #[test]
    fn test_zero_publish_is_not_signal() {
        let analyser = SpectrumAnalyser::new();
        analyser.publish(&[0.0; 16]);
        assert!(!analyser.has_signal());
    }
}
