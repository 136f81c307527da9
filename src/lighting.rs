//! Audio-reactive light rig: ambient and directional lights plus exposure.
//!
//! Lows crush the scene dark, highs lift it, and high-band transients fire
//! a short strobe. All CPU state; the renderer consumes the resulting
//! `LightState` as shader uniforms.

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

use crate::animator::AudioReactive;
use crate::audio::{read_analyser, AudioFrame, SpectrumAnalyser};
use crate::envelope;
use crate::params::{AmbientParams, DirectionalParams, LightReactParams, StrobeParams};

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Light values for one frame, consumed as uniforms
#[derive(Clone, Copy, Debug)]
pub struct LightState {
    pub ambient_color: [f32; 3],
    pub ambient_intensity: f32,
    pub dir_color: [f32; 3],
    pub dir_intensity: f32,
    pub dir_position: [f32; 3],
    pub exposure: f32,
}

/// Ambient + directional rig with smoothed band envelopes and strobe state
pub struct LightRig {
    react: LightReactParams,
    ambient: AmbientParams,
    directional: DirectionalParams,
    strobe: StrobeParams,

    analyser: Option<Arc<SpectrumAnalyser>>,

    low_env: f32,
    high_env: f32,

    /// Flash envelope 0..1
    strobe_env: f32,
    /// Remaining full-bright hold time (seconds)
    strobe_hold: f32,
    /// Last frame's raw high level, for rise detection
    last_high: f32,

    rng: StdRng,

    pub state: LightState,
}

impl LightRig {
    pub fn new(
        react: LightReactParams,
        ambient: AmbientParams,
        directional: DirectionalParams,
        strobe: StrobeParams,
    ) -> Self {
        let state = LightState {
            ambient_color: ambient.base_color,
            ambient_intensity: ambient.intensity_min,
            dir_color: [1.0, 0.91, 0.70],
            dir_intensity: directional.intensity_min,
            dir_position: directional.base_position,
            exposure: 1.0,
        };
        Self {
            react,
            ambient,
            directional,
            strobe,
            analyser: None,
            low_env: 0.0,
            high_env: 0.0,
            strobe_env: 0.0,
            strobe_hold: 0.0,
            last_high: 0.0,
            rng: StdRng::seed_from_u64(7),
            state,
        }
    }

    /// Read bands from the attached analyser (silent if none) and advance.
    pub fn tick(&mut self, dt: f32) {
        let bands = read_analyser(self.analyser.as_deref());
        self.tick_with_bands(&bands, dt);
    }

    /// Advance the rig from an explicit band frame.
    pub fn tick_with_bands(&mut self, bands: &AudioFrame, dt: f32) {
        let low_ex = envelope::threshold_excess_curved(
            bands.low,
            self.react.low_threshold,
            self.react.curve_pow,
        );
        let high_ex = envelope::threshold_excess_curved(
            bands.high,
            self.react.high_threshold,
            self.react.curve_pow,
        );

        // When highs are near zero, synthesize a little sparkle from the
        // lows so the scene can still brighten on bass-only material
        let sur_high = (high_ex + low_ex * self.react.sparkle_from_lows).min(1.0);

        self.low_env = envelope::follow(
            self.low_env,
            low_ex,
            dt,
            self.react.attack_s,
            self.react.release_s,
        );
        self.high_env = envelope::follow(
            self.high_env,
            sur_high,
            dt,
            self.react.attack_s,
            self.react.release_s,
        );

        // Strobe detection: absolute high level or a fast rise
        let high_delta = (bands.high - self.last_high).max(0.0);
        if bands.high > self.strobe.high_trigger || high_delta > self.strobe.rise_threshold {
            self.strobe_env = 1.0;
            self.strobe_hold = self.strobe.hold_s;
        }
        if self.strobe_hold > 0.0 {
            self.strobe_hold -= dt;
        } else if self.strobe_env > 0.0 {
            self.strobe_env = (self.strobe_env - dt / self.strobe.decay_s).max(0.0);
        }
        self.last_high = bands.high;

        self.apply();
    }

    /// Map envelopes + strobe to the output light state.
    fn apply(&mut self) {
        // Ambient: highs lift, lows crush hard
        let bright = lerp(
            self.ambient.intensity_min,
            self.ambient.intensity_max,
            self.high_env.powf(0.95),
        );
        let crush = 1.0 - 0.95 * self.low_env.powf(0.8);
        self.state.ambient_intensity = (bright * crush).max(0.0);

        // Ambient color drifts from the base toward a high/low blend
        let base = Vec3::from_array(self.ambient.base_color);
        let blend = Vec3::from_array(self.ambient.high_color)
            .lerp(Vec3::from_array(self.ambient.low_color), self.low_env);
        self.state.ambient_color = base.lerp(blend, 0.6 * self.high_env).to_array();

        // Exposure: base from highs, strong darkening from lows, strobe on top
        let exp_hi = lerp(
            self.directional.exposure_min,
            self.directional.exposure_max,
            self.high_env.powf(0.9),
        );
        let exp_lo = 1.0 - 0.98 * self.low_env.powf(0.85);
        let mut exposure = exp_hi * exp_lo;
        if self.strobe_env > 0.0 {
            exposure *= 1.0 + self.strobe.exposure_boost * self.strobe_env;
        }
        self.state.exposure = exposure;

        // Directional: highs kick it up, lows choke it, strobe boosts
        let hi_kick = lerp(
            self.directional.intensity_min,
            self.directional.intensity_max,
            self.high_env.powf(0.8),
        );
        let lo_choke = 1.0 - 0.80 * self.low_env.powf(0.85);
        self.state.dir_intensity = hi_kick * lo_choke + self.strobe.dir_boost * self.strobe_env;

        // Micro position jitter at flash peak keeps shadows lively
        let base_pos = Vec3::from_array(self.directional.base_position);
        self.state.dir_position = if self.strobe_env > 0.0 {
            let j = self.strobe.jitter_m * self.strobe_env;
            Vec3::new(
                base_pos.x + self.rng.gen_range(-1.0..1.0) * j,
                base_pos.y + self.rng.gen_range(-1.0..1.0) * j,
                base_pos.z + self.rng.gen_range(-1.0..1.0) * j,
            )
            .to_array()
        } else {
            base_pos.to_array()
        };

        // Color: warm at rest, cooler as highs build, flashed toward white
        // at strobe peaks, slightly darkened under heavy lows
        let warmer = Vec3::new(1.0, 0.847, 0.753);
        let cooler = Vec3::new(0.918, 0.969, 1.0);
        let base_color = warmer.lerp(cooler, (0.2 + 0.8 * self.high_env).min(1.0));
        let flashed = base_color.lerp(Vec3::ONE, self.strobe.color_flash * self.strobe_env);
        self.state.dir_color = (flashed * (1.0 - 0.05 * self.low_env)).to_array();
    }

    /// Current flash envelope (0..1), for tests and debug overlays
    pub fn strobe_level(&self) -> f32 {
        self.strobe_env
    }
}

impl AudioReactive for LightRig {
    fn attach_analyser(&mut self, analyser: Arc<SpectrumAnalyser>) {
        self.analyser = Some(analyser);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rig() -> LightRig {
        LightRig::new(
            LightReactParams::default(),
            AmbientParams::default(),
            DirectionalParams::default(),
            StrobeParams::default(),
        )
    }

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn test_silence_stays_near_minimum() {
        let mut rig = rig();
        for _ in 0..300 {
            rig.tick_with_bands(&AudioFrame::SILENT, DT);
        }
        assert!(rig.state.ambient_intensity <= AmbientParams::default().intensity_min + 1e-3);
        assert!(rig.state.dir_intensity < 0.01);
        assert_eq!(rig.strobe_level(), 0.0);
    }

    #[test]
    fn test_highs_raise_exposure_and_intensity() {
        let mut rig = rig();
        let loud_highs = AudioFrame {
            low: 0.0,
            mid: 0.0,
            high: 0.8,
        };
        for _ in 0..120 {
            rig.tick_with_bands(&loud_highs, DT);
        }
        assert!(rig.state.exposure > DirectionalParams::default().exposure_min);
        assert!(rig.state.dir_intensity > 1.0);
        assert!(rig.state.ambient_intensity > 1.0);
    }

    #[test]
    fn test_lows_crush_ambient() {
        let mut rig = rig();
        let bass_heavy = AudioFrame {
            low: 0.9,
            mid: 0.0,
            high: 0.0,
        };
        // First frame triggers nothing on highs; let envelopes settle
        for _ in 0..120 {
            rig.tick_with_bands(&bass_heavy, DT);
        }
        // Sparkle from lows lifts the high env a bit, but the low crush
        // dominates the ambient product
        let silent_level = AmbientParams::default().intensity_max;
        assert!(rig.state.ambient_intensity < silent_level * 0.2);
        assert!(rig.state.exposure < 1.0);
    }

    #[test]
    fn test_strobe_triggers_on_high_transient() {
        let mut rig = rig();
        rig.tick_with_bands(&AudioFrame::SILENT, DT);
        assert_eq!(rig.strobe_level(), 0.0);

        let spike = AudioFrame {
            low: 0.0,
            mid: 0.0,
            high: 0.5,
        };
        rig.tick_with_bands(&spike, DT);
        assert_eq!(rig.strobe_level(), 1.0);

        // Holds at peak for hold_s, then decays toward zero
        let quiet = AudioFrame::SILENT;
        for _ in 0..6 {
            rig.tick_with_bands(&quiet, DT); // inside the 0.1s hold
        }
        assert!(rig.strobe_level() > 0.9);
        for _ in 0..60 {
            rig.tick_with_bands(&quiet, DT);
        }
        assert_eq!(rig.strobe_level(), 0.0);
    }

    #[test]
    fn test_strobe_triggers_on_fast_rise() {
        let mut rig = rig();
        rig.tick_with_bands(
            &AudioFrame {
                low: 0.0,
                mid: 0.0,
                high: 0.02,
            },
            DT,
        );
        // 0.02 -> 0.15 is below the absolute trigger but above the rise
        // threshold of 0.10
        rig.tick_with_bands(
            &AudioFrame {
                low: 0.0,
                mid: 0.0,
                high: 0.15,
            },
            DT,
        );
        assert_eq!(rig.strobe_level(), 1.0);
    }

    #[test]
    fn test_jitter_only_during_strobe() {
        let mut rig = rig();
        let base = DirectionalParams::default().base_position;

        rig.tick_with_bands(&AudioFrame::SILENT, DT);
        assert_eq!(rig.state.dir_position, base);

        rig.tick_with_bands(
            &AudioFrame {
                low: 0.0,
                mid: 0.0,
                high: 0.9,
            },
            DT,
        );
        let jittered = rig.state.dir_position;
        let max_jitter = StrobeParams::default().jitter_m;
        for (jittered_axis, base_axis) in jittered.iter().zip(base.iter()) {
            assert!((jittered_axis - base_axis).abs() <= max_jitter + 1e-6);
        }
    }
}
