//! Audio system: asset decode, playback stream, and FFT wiring.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{info, warn};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread;
use thiserror::Error;

use super::fft::{spawn_fft_thread, SpectrumAnalyser};
use crate::params::{AudioAssetConfig, FftConfig, RecordingConfig};

/// Audio-path failures. Decode and device errors are absorbed by the caller
/// (the app proceeds in silent mode); none of these abort the frame loop.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("failed to decode audio asset: {0}")]
    Decode(#[from] hound::Error),

    #[error("no audio output device found")]
    NoDevice,

    #[error("failed to query audio device config: {0}")]
    DeviceConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build audio stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    Play(#[from] cpal::PlayStreamError),

    #[error("invalid audio configuration: {0}")]
    InvalidConfig(String),
}

/// A fully decoded audio asset, ready for playback
pub struct DecodedAudio {
    /// Interleaved stereo frames (mono assets are duplicated to both ears)
    pub samples: Vec<f32>,

    /// Source sample rate (Hz)
    pub sample_rate: u32,
}

impl DecodedAudio {
    /// Stereo frame count
    pub fn frame_count(&self) -> usize {
        self.samples.len() / 2
    }
}

/// Decode a WAV asset on a loader thread.
///
/// The receiver is the single-assignment slot the frame loop polls: exactly
/// one message arrives, success or failure, whenever the decode finishes.
/// Abandoning the receiver lets the decode complete harmlessly.
pub fn spawn_decoder(path: String) -> Receiver<Result<DecodedAudio, AudioError>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let result = decode_wav(&path);
        // The app may have shut down; a dead receiver is fine.
        let _ = tx.send(result);
    });
    rx
}

fn decode_wav(path: &str) -> Result<DecodedAudio, AudioError> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    let raw: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / ((1_i64 << (spec.bits_per_sample - 1)) as f32);
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    let samples = match spec.channels {
        1 => raw.iter().flat_map(|&s| [s, s]).collect(),
        2 => raw,
        n => {
            // Take the first two channels of anything wider; chunks_exact
            // drops a truncated final frame instead of indexing past it
            warn!("audio asset has {} channels, downmixing to stereo", n);
            raw.chunks_exact(n as usize)
                .flat_map(|frame| [frame[0], frame[1]])
                .collect()
        }
    };

    info!(
        "decoded {} ({} frames @ {}Hz)",
        path,
        samples.len() / 2,
        spec.sample_rate
    );

    Ok(DecodedAudio {
        samples,
        sample_rate: spec.sample_rate,
    })
}

/// Audio system managing playback and FFT analysis
pub struct AudioSystem {
    /// Shared spectrum analyser (thread-safe snapshots)
    analyser: Arc<SpectrumAnalyser>,

    /// Audio output stream (kept alive)
    _stream: cpal::Stream,

    /// FFT analysis thread handle (kept for lifetime)
    _fft_thread: thread::JoinHandle<()>,
}

impl AudioSystem {
    /// Start playback of a decoded asset and the FFT analysis thread.
    ///
    /// Must run on the thread that keeps the stream alive (cpal streams are
    /// not Send), which is why decode happens elsewhere and this runs once
    /// the loader's result arrives on the frame-loop thread.
    pub fn start(
        decoded: DecodedAudio,
        fft_config: FftConfig,
        asset_config: &AudioAssetConfig,
        recording_config: Option<&RecordingConfig>,
    ) -> Result<Self, AudioError> {
        fft_config
            .validate()
            .map_err(AudioError::InvalidConfig)?;
        if decoded.samples.is_empty() {
            return Err(AudioError::InvalidConfig(
                "decoded asset contains no samples".to_string(),
            ));
        }

        // Tee playback into a WAV file when recording
        let wav_writer: Option<Arc<Mutex<hound::WavWriter<std::io::BufWriter<std::fs::File>>>>> =
            match recording_config {
                Some(config) => {
                    let spec = hound::WavSpec {
                        channels: 2,
                        sample_rate: decoded.sample_rate,
                        bits_per_sample: 32,
                        sample_format: hound::SampleFormat::Float,
                    };
                    let writer = hound::WavWriter::create(config.audio_path(), spec)
                        .map_err(AudioError::Decode)?;
                    Some(Arc::new(Mutex::new(writer)))
                }
                None => None,
            };

        let fft_buffer = Arc::new(Mutex::new(Vec::<f32>::new()));
        let fft_buffer_audio = Arc::clone(&fft_buffer);

        let analyser = Arc::new(SpectrumAnalyser::new());
        let analyser_fft = Arc::clone(&analyser);

        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;
        let config = device.default_output_config()?;

        info!(
            "audio out: {} @ {}Hz",
            device.name().unwrap_or_else(|_| "Unknown".to_string()),
            config.sample_rate().0
        );
        if config.sample_rate().0 != decoded.sample_rate {
            warn!(
                "device rate {}Hz != asset rate {}Hz, playback will be pitch-shifted",
                config.sample_rate().0,
                decoded.sample_rate
            );
        }

        let samples = decoded.samples;
        let frame_count = samples.len() / 2;
        let looping = asset_config.looping;
        let volume = asset_config.volume;
        let mut cursor: usize = 0;

        let stream = device.build_output_stream(
            &config.into(),
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let mut fft_buf = fft_buffer_audio.lock().unwrap();

                for out_frame in data.chunks_mut(2) {
                    let (left, right) = if cursor < frame_count {
                        (samples[cursor * 2], samples[cursor * 2 + 1])
                    } else {
                        (0.0, 0.0) // past the end of a non-looping asset
                    };

                    cursor += 1;
                    if looping && cursor >= frame_count {
                        cursor = 0;
                    }

                    // Safety limiter: hard clip to ±0.5 to prevent ear damage
                    let left = (left * volume).clamp(-0.5, 0.5);
                    let right = (right * volume).clamp(-0.5, 0.5);

                    out_frame[0] = left;
                    if out_frame.len() > 1 {
                        out_frame[1] = right;
                    }

                    fft_buf.push(left); // Accumulate for FFT analysis

                    if let Some(ref writer) = wav_writer {
                        if let Ok(mut w) = writer.lock() {
                            let _ = w.write_sample(left);
                            let _ = w.write_sample(right);
                        }
                    }
                }
            },
            |err| warn!("audio stream error: {}", err),
            None,
        )?;

        stream.play()?;

        let fft_thread = spawn_fft_thread(fft_config, fft_buffer, analyser_fft);

        Ok(Self {
            analyser,
            _stream: stream,
            _fft_thread: fft_thread,
        })
    }

    /// The shared analyser handle, for binding into the animator and lights.
    pub fn analyser(&self) -> Arc<SpectrumAnalyser> {
        Arc::clone(&self.analyser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &std::path::Path, channels: u16, samples: &[f32]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate: 44100,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        // flush + drop instead of finalize: hound reports UnfinishedSample
        // for sample counts that are not a multiple of the channel count,
        // after the data and header are already fully written — which the
        // truncated fixture needs to produce on purpose
        match writer.flush() {
            Ok(()) | Err(hound::Error::UnfinishedSample) => {}
            Err(e) => panic!("wav fixture flush failed: {}", e),
        }
    }

    #[test]
    fn test_mono_asset_duplicated_to_stereo() {
        let path = std::env::temp_dir().join("pipesphere_mono_decode.wav");
        write_wav(&path, 1, &[0.1, -0.2, 0.3]);

        let decoded = decode_wav(path.to_str().unwrap()).unwrap();
        assert_eq!(decoded.samples, vec![0.1, 0.1, -0.2, -0.2, 0.3, 0.3]);
        assert_eq!(decoded.frame_count(), 3);
    }

    #[test]
    fn test_wide_downmix_drops_truncated_final_frame() {
        // Seven samples of a 3-channel asset: two full frames plus one
        // dangling sample, which must be dropped, not indexed
        let path = std::env::temp_dir().join("pipesphere_truncated_decode.wav");
        write_wav(&path, 3, &[0.1, 0.2, 0.9, 0.3, 0.4, 0.9, 0.5]);

        let decoded = decode_wav(path.to_str().unwrap()).unwrap();
        assert_eq!(decoded.frame_count(), 2);
        assert_eq!(decoded.samples, vec![0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn test_missing_asset_is_a_decode_error() {
        let result = decode_wav("/nonexistent/pipesphere_asset.wav");
        assert!(matches!(result, Err(AudioError::Decode(_))));
    }
}
