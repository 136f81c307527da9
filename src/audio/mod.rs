//! Audio playback and spectrum analysis.
//!
//! The one asynchronous boundary of the system: the asset decodes on a
//! loader thread, playback runs in the cpal callback, and an FFT thread
//! publishes magnitude spectra into the shared analyser. Everything else
//! reads side-effect-free snapshots once per frame.

pub mod bands;
pub mod fft;
pub mod system;

pub use bands::{read_analyser, read_bands, AudioFrame};
pub use fft::SpectrumAnalyser;
pub use system::{spawn_decoder, AudioError, AudioSystem, DecodedAudio};
