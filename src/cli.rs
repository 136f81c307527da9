//! Command-line argument parsing.

use clap::Parser;
use log::warn;

use pipesphere::params::{
    AudioAssetConfig, CameraPreset, FixedCamera, OrbitCamera, RecordingConfig,
};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "Pipesphere")]
#[command(about = "Audio-reactive spherical pipe field", long_about = None)]
pub struct Args {
    /// WAV file to play and analyse
    #[arg(long, value_name = "PATH", default_value = "sounds/cafe_oto.wav")]
    pub audio: String,

    /// Play the asset once instead of looping
    #[arg(long)]
    pub no_loop: bool,

    /// Camera preset: fixed (default), orbit
    #[arg(long, value_name = "PRESET", default_value = "fixed")]
    pub camera_preset: String,

    /// Orbit radius for the orbit preset (meters)
    #[arg(long, value_name = "METERS", default_value = "120")]
    pub orbit_radius: f32,

    /// Record the session to disk (duration in seconds)
    #[arg(long, value_name = "SECONDS")]
    pub record: Option<f32>,
}

impl Args {
    /// Parse camera preset from command-line arguments
    pub fn parse_camera_preset(&self) -> CameraPreset {
        match self.camera_preset.to_lowercase().as_str() {
            "orbit" => {
                let orbit = OrbitCamera {
                    radius_m: self.orbit_radius,
                    ..OrbitCamera::default()
                };
                CameraPreset::Orbit(orbit)
            }
            "fixed" => CameraPreset::Fixed(FixedCamera::default()),
            other => {
                warn!("unknown camera preset '{}', using fixed", other);
                CameraPreset::Fixed(FixedCamera::default())
            }
        }
    }

    /// Audio asset configuration from the arguments
    pub fn audio_asset_config(&self) -> AudioAssetConfig {
        AudioAssetConfig {
            path: self.audio.clone(),
            looping: !self.no_loop,
            ..AudioAssetConfig::default()
        }
    }

    /// Create recording configuration if recording mode is enabled
    pub fn create_recording_config(&self) -> Option<RecordingConfig> {
        self.record.map(|duration| {
            let config = RecordingConfig::new(duration);

            // Create output directories
            std::fs::create_dir_all(config.frames_dir())
                .expect("Failed to create frames directory");
            std::fs::create_dir_all(&config.output_dir).expect("Failed to create output directory");

            config
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(preset: &str) -> Args {
        Args {
            audio: "sounds/test.wav".to_string(),
            no_loop: false,
            camera_preset: preset.to_string(),
            orbit_radius: 200.0,
            record: None,
        }
    }

    #[test]
    fn test_orbit_preset_carries_radius() {
        match args("orbit").parse_camera_preset() {
            CameraPreset::Orbit(orbit) => assert_eq!(orbit.radius_m, 200.0),
            other => panic!("expected orbit preset, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_preset_falls_back_to_fixed() {
        assert!(matches!(
            args("zoom").parse_camera_preset(),
            CameraPreset::Fixed(_)
        ));
    }

    #[test]
    fn test_audio_config_from_args() {
        let mut a = args("fixed");
        a.no_loop = true;
        let config = a.audio_asset_config();
        assert_eq!(config.path, "sounds/test.wav");
        assert!(!config.looping);
    }
}
