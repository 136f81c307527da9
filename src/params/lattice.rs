//! Segment lattice geometry, drift, visibility, and surface motion parameters.

use std::f32::consts::PI;

/// Host sphere the segments are placed on
#[derive(Debug, Clone)]
pub struct SphereParams {
    /// Sphere radius (meters); must match the sky sphere radius
    pub radius_m: f32,

    /// Placement inset (meters); slightly inside to avoid z-fighting
    pub inset_m: f32,
}

impl Default for SphereParams {
    fn default() -> Self {
        Self {
            radius_m: 1000.0,
            inset_m: 1.5,
        }
    }
}

/// Lattice shape: meridian count, segments per meridian, base tube tessellation
#[derive(Debug, Clone)]
pub struct LatticeParams {
    /// Meridians around the full 360°
    pub pipe_count: usize,

    /// Short segments per meridian
    pub segments_per_pipe: usize,

    /// Latitude span of one segment (radians); π/6 ≈ 30° tall
    pub seg_length_rad: f32,

    /// Tube cross-section radius (meters)
    pub seg_radius_m: f32,

    /// Tube tessellation around the cross-section
    pub radial_segs: usize,

    /// Tube tessellation along the segment height
    pub height_segs: usize,

    /// RNG seed for per-segment jitter/weight (deterministic builds)
    pub rng_seed: u64,
}

impl Default for LatticeParams {
    fn default() -> Self {
        Self {
            pipe_count: 13,
            segments_per_pipe: 5,
            seg_length_rad: PI / 6.0,
            seg_radius_m: 3.0,
            radial_segs: 32,
            height_segs: 24,
            rng_seed: 42,
        }
    }
}

impl LatticeParams {
    /// Validate construction parameters; a zero lattice is a wiring error.
    pub fn validate(&self) -> Result<(), String> {
        if self.pipe_count == 0 || self.segments_per_pipe == 0 {
            return Err("Lattice must have at least one pipe and one segment".to_string());
        }
        if self.radial_segs < 3 || self.height_segs == 0 {
            return Err(format!(
                "Tube tessellation too coarse: {}x{}",
                self.radial_segs, self.height_segs
            ));
        }
        if self.seg_length_rad <= 0.0 || self.seg_length_rad >= PI {
            return Err(format!(
                "Segment length must be in (0, pi), got {}",
                self.seg_length_rad
            ));
        }
        Ok(())
    }

    /// Total segment count
    pub fn segment_count(&self) -> usize {
        self.pipe_count * self.segments_per_pipe
    }

    /// Vertices in one tube segment
    pub fn vertices_per_segment(&self) -> usize {
        (self.radial_segs + 1) * (self.height_segs + 1)
    }
}

/// Audio → latitude drift mapping. Positive rates move DOWN, negative UP.
#[derive(Debug, Clone)]
pub struct DriftParams {
    /// Always-on baseline latitude rate (rad/sec)
    pub base_speed_rad_per_s: f32,

    /// How much the signed low-high control adds (rad/sec per unit)
    pub audio_scale: f32,

    /// Power curve on band energies before differencing (sqrt-like at 0.6)
    pub ease_pow: f32,

    /// Per-segment speed variation (±fraction, 0.30 = ±30%)
    pub speed_jitter: f32,
}

impl Default for DriftParams {
    fn default() -> Self {
        Self {
            base_speed_rad_per_s: 0.10,
            audio_scale: 2.0,
            ease_pow: 0.6,
            speed_jitter: 0.30,
        }
    }
}

/// Segment activation (visibility) gating and smoothing
#[derive(Debug, Clone)]
pub struct VisibilityParams {
    /// Lows must exceed this to light DOWN-moving segments
    pub low_threshold: f32,

    /// Highs must exceed this to light UP-moving segments
    pub high_threshold: f32,

    /// Visibility floor when below threshold (0..1), keeps segments from vanishing
    pub idle_floor: f32,

    /// Initial envelope value at construction (0..1)
    pub start_visible: f32,

    /// Envelope rise time constant (seconds)
    pub attack_s: f32,

    /// Envelope fall time constant (seconds)
    pub release_s: f32,

    /// Segments render only while envelope exceeds this
    pub epsilon: f32,

    /// Per-segment audio weight range (low, high)
    pub audio_weight_range: (f32, f32),
}

impl Default for VisibilityParams {
    fn default() -> Self {
        Self {
            low_threshold: 0.05,
            high_threshold: 0.10,
            idle_floor: 0.18,
            start_visible: 0.30,
            attack_s: 0.05,
            release_s: 0.25,
            epsilon: 0.02,
            audio_weight_range: (0.7, 1.3),
        }
    }
}

/// Subtle surface shimmer added along the binormal
#[derive(Debug, Clone)]
pub struct RippleParams {
    /// Ripple amplitude (meters, scaled by 0.25 at application)
    pub amp_m: f32,

    /// Angular frequency around the tube cross-section
    pub freq_circ: f32,

    /// Frequency along the segment height (per meter of arc)
    pub freq_y: f32,

    /// Ripple phase speed (radians of phase per second)
    pub speed: f32,
}

impl Default for RippleParams {
    fn default() -> Self {
        Self {
            amp_m: 0.6,
            freq_circ: 6.0,
            freq_y: 0.0025,
            speed: 2.0,
        }
    }
}

/// Shared scrolling texture motion (audio-independent)
#[derive(Debug, Clone)]
pub struct TexScrollParams {
    /// Texture repeat in (u, v)
    pub repeat: (f32, f32),

    /// Vertical scroll rate (texture units per second)
    pub scroll_speed_y: f32,

    /// Horizontal ripple oscillation rate (radians per second of wall time)
    pub ripple_x_speed: f32,

    /// Horizontal ripple amplitude (texture units)
    pub ripple_x_amp: f32,
}

impl Default for TexScrollParams {
    fn default() -> Self {
        Self {
            repeat: (1.0, 8.0),
            scroll_speed_y: 0.08,
            ripple_x_speed: 2.0,
            ripple_x_amp: 0.005,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lattice_default_is_valid() {
        assert!(LatticeParams::default().validate().is_ok());
    }

    #[test]
    fn test_lattice_rejects_zero_pipes() {
        let params = LatticeParams {
            pipe_count: 0,
            ..LatticeParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_lattice_counts() {
        let params = LatticeParams::default();
        assert_eq!(params.segment_count(), 65);
        assert_eq!(params.vertices_per_segment(), 33 * 25);
    }
}
