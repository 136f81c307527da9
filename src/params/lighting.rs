//! Audio-reactive light rig parameters.

/// Audio gating and smoothing for the light rig
#[derive(Debug, Clone)]
pub struct LightReactParams {
    /// Bass must exceed this to start darkening
    pub low_threshold: f32,

    /// Treble must exceed this to start brightening
    pub high_threshold: f32,

    /// Envelope rise time constant (seconds)
    pub attack_s: f32,

    /// Envelope fall time constant (seconds)
    pub release_s: f32,

    /// Power curve on threshold excess (<1 makes quiet passages register)
    pub curve_pow: f32,

    /// Fraction of low excess folded into the high channel when highs are
    /// silent, so the scene can still brighten on bass-only material
    pub sparkle_from_lows: f32,
}

impl Default for LightReactParams {
    fn default() -> Self {
        Self {
            low_threshold: 0.01,
            high_threshold: 0.0,
            attack_s: 0.05,
            release_s: 0.35,
            curve_pow: 0.5,
            sparkle_from_lows: 0.45,
        }
    }
}

/// Ambient light intensity range and colors (linear RGB)
#[derive(Debug, Clone)]
pub struct AmbientParams {
    /// Intensity at silence
    pub intensity_min: f32,

    /// Intensity at full high-band drive
    pub intensity_max: f32,

    /// Base color (deep red)
    pub base_color: [f32; 3],

    /// Color pulled toward on highs
    pub high_color: [f32; 3],

    /// Color pulled toward on lows
    pub low_color: [f32; 3],
}

impl Default for AmbientParams {
    fn default() -> Self {
        Self {
            intensity_min: 0.1,
            intensity_max: 20.0,
            base_color: [0.73, 0.0, 0.0],
            high_color: [1.0, 1.0, 1.0],
            low_color: [0.0, 0.0, 0.0],
        }
    }
}

/// Directional light intensity range, position, and exposure mapping
#[derive(Debug, Clone)]
pub struct DirectionalParams {
    /// Intensity at silence
    pub intensity_min: f32,

    /// Intensity at full high-band drive
    pub intensity_max: f32,

    /// Resting world position (meters)
    pub base_position: [f32; 3],

    /// Tone-mapping exposure at silence
    pub exposure_min: f32,

    /// Tone-mapping exposure at full drive
    pub exposure_max: f32,
}

impl Default for DirectionalParams {
    fn default() -> Self {
        Self {
            intensity_min: 0.0,
            intensity_max: 50.0,
            base_position: [-10.0, 50.0, 10.0],
            exposure_min: 0.12,
            exposure_max: 2.4,
        }
    }
}

/// High-band transient strobe
#[derive(Debug, Clone)]
pub struct StrobeParams {
    /// Absolute high-band level that triggers a flash (0..1)
    pub high_trigger: f32,

    /// Rapid per-frame high-band rise that also triggers (0..1)
    pub rise_threshold: f32,

    /// Full-bright hold time (seconds)
    pub hold_s: f32,

    /// Fade time after the hold (seconds)
    pub decay_s: f32,

    /// Extra directional intensity at peak
    pub dir_boost: f32,

    /// Exposure multiplier added at peak (1.0 = double)
    pub exposure_boost: f32,

    /// Directional position jitter at peak (meters)
    pub jitter_m: f32,

    /// Whiteness added to the directional color at peak (0..1)
    pub color_flash: f32,
}

impl Default for StrobeParams {
    fn default() -> Self {
        Self {
            high_trigger: 0.2,
            rise_threshold: 0.10,
            hold_s: 0.1,
            decay_s: 0.35,
            dir_boost: 6.0,
            exposure_boost: 2.0,
            jitter_m: 0.06,
            color_flash: 0.15,
        }
    }
}
