//! Per-segment animation state and its pure tick advance.
//!
//! Segments are plain records owned by the lattice; the advance below is a
//! function of (record, controls, dt), so drift and gating test without a
//! renderer.

use std::f32::consts::PI;

use super::tube::Vertex;
use crate::envelope;
use crate::params::VisibilityParams;

/// One short tube fragment on a meridian of the sphere
pub struct Segment {
    /// Fixed longitude λ₀ (radians), assigned at creation
    pub meridian_azimuth: f32,

    /// Latitude phase φ_off ∈ [0, π), advanced every tick
    pub polar_offset: f32,

    /// Fixed per-segment speed multiplier, 1 ± jitter
    pub speed_jitter: f32,

    /// Fixed per-segment audio response multiplier, 0.7..1.3
    pub audio_weight: f32,

    /// Smoothed visibility envelope (0..1)
    pub visibility: f32,

    /// Rendered this frame (envelope above epsilon)
    pub visible: bool,

    /// Exclusively owned vertex buffer, sole write target of placement
    pub vertices: Vec<Vertex>,

    /// Vertex buffer needs re-upload
    pub dirty: bool,
}

/// Audio-derived control values computed once per tick and shared by every
/// segment (the excess gates are deliberately not recomputed per segment).
#[derive(Clone, Copy, Debug, Default)]
pub struct TickControls {
    /// Global base latitude rate (rad/sec); positive drifts down
    pub d_phi_base: f32,

    /// Bass gate, threshold excess of the low band
    pub low_excess: f32,

    /// Treble gate, threshold excess of the high band
    pub high_excess: f32,
}

/// Wrap a latitude phase into [0, π) by adding or subtracting π.
///
/// Not a modulo: a segment overflowing the pole re-enters one boundary
/// crossing at a time, which keeps the motion ping-pong free for any speed
/// below π per tick.
pub fn wrap_polar(phi: f32) -> f32 {
    if phi < 0.0 {
        phi + PI
    } else if phi >= PI {
        phi - PI
    } else {
        phi
    }
}

impl Segment {
    /// Advance drift and visibility for one tick. Returns the signed speed
    /// actually applied (rad/sec), which also selected the gating band.
    pub fn advance(&mut self, ctl: &TickControls, vis: &VisibilityParams, dt: f32) -> f32 {
        let speed = ctl.d_phi_base * self.speed_jitter * self.audio_weight;
        self.polar_offset = wrap_polar(self.polar_offset + speed * dt);

        // Down-moving segments are driven by bass, up-moving by treble
        let gate = if speed >= 0.0 {
            ctl.low_excess
        } else {
            ctl.high_excess
        };

        let target = (gate.max(vis.idle_floor) * self.audio_weight).clamp(0.0, 1.0);
        self.visibility =
            envelope::follow(self.visibility, target, dt, vis.attack_s, vis.release_s);
        self.visible = self.visibility > vis.epsilon;

        speed
    }
}
