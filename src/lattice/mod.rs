//! Segment lattice: a field of short tube segments on meridians of a sphere.
//!
//! Owns every segment record, the shared tube template, and the per-vertex
//! placement that wraps each tube onto the sphere with a correct local
//! tangent frame. Placement runs for thousands of vertices per frame, so it
//! evaluates the cached parametrization instead of rebuilding geometry.

pub mod segment;
pub mod tube;

pub use segment::{wrap_polar, Segment, TickControls};
pub use tube::{compute_normals, TubeTemplate, Vertex};

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::PI;

use crate::audio::AudioFrame;
use crate::params::{DriftParams, LatticeParams, RippleParams, SphereParams, VisibilityParams};

/// φ is polar (0..π), λ is azimuth (-π..π)
fn sph_to_cart(radius: f32, phi: f32, lambda: f32) -> Vec3 {
    let s = phi.sin();
    Vec3::new(
        radius * s * lambda.cos(),
        radius * phi.cos(),
        radius * s * lambda.sin(),
    )
}

/// Local tangent frame at (φ, λ): radial normal, azimuthal tangent, and
/// their binormal, all unit length.
fn tangent_basis(phi: f32, lambda: f32) -> (Vec3, Vec3, Vec3) {
    let s = phi.sin();
    let c = phi.cos();
    let n = Vec3::new(s * lambda.cos(), c, s * lambda.sin()).normalize();
    let t_lambda = Vec3::new(-lambda.sin(), 0.0, lambda.cos());
    let b = n.cross(t_lambda).normalize();
    (n, t_lambda, b)
}

/// The animated segment field
pub struct SegmentLattice {
    /// All segments, created once at construction and never destroyed
    pub segments: Vec<Segment>,

    /// Shared base tube (read-only parametrization + topology)
    pub template: TubeTemplate,

    /// Master visibility for the whole group (reflection capture toggles it)
    pub group_visible: bool,

    params: LatticeParams,
    sphere: SphereParams,
    drift: DriftParams,
    visibility: VisibilityParams,
    ripple: RippleParams,

    /// Global ripple phase accumulator (radians)
    ripple_time: f32,
}

impl SegmentLattice {
    /// Build `pipe_count x segments_per_pipe` segments with randomized
    /// per-segment personality from a seeded RNG. Fails fast only on
    /// invalid parameters (a wiring error, per the construction contract).
    pub fn new(
        params: LatticeParams,
        sphere: SphereParams,
        drift: DriftParams,
        visibility: VisibilityParams,
        ripple: RippleParams,
    ) -> Result<Self, String> {
        params.validate()?;

        let template = TubeTemplate::new(&params);
        let mut rng = StdRng::seed_from_u64(params.rng_seed);
        let mut segments = Vec::with_capacity(params.segment_count());

        for pipe in 0..params.pipe_count {
            // Uniform coverage around the full 360°
            let lambda0 = -PI + (pipe as f32 / params.pipe_count as f32) * 2.0 * PI;

            for _ in 0..params.segments_per_pipe {
                let (weight_lo, weight_hi) = visibility.audio_weight_range;
                segments.push(Segment {
                    meridian_azimuth: lambda0,
                    // Random start latitude so the sphere is populated
                    // from the first frame
                    polar_offset: rng.gen_range(0.0..PI),
                    speed_jitter: 1.0 + rng.gen_range(-1.0..1.0) * drift.speed_jitter,
                    audio_weight: rng.gen_range(weight_lo..weight_hi),
                    visibility: visibility.start_visible,
                    visible: true,
                    vertices: template.make_vertices(),
                    dirty: true,
                });
            }
        }

        Ok(Self {
            segments,
            template,
            group_visible: true,
            params,
            sphere,
            drift,
            visibility,
            ripple,
            ripple_time: 0.0,
        })
    }

    /// Derive the shared per-tick controls from a band frame.
    ///
    /// The excess gates are computed exactly once here and reused by every
    /// segment's advance.
    pub fn compute_controls(&self, frame: &AudioFrame) -> TickControls {
        let low_e = frame.low.max(0.0).powf(self.drift.ease_pow);
        let high_e = frame.high.max(0.0).powf(self.drift.ease_pow);

        // Signed control: positive = drift DOWN (toward increasing latitude)
        let signed = low_e - high_e;

        TickControls {
            d_phi_base: self.drift.base_speed_rad_per_s + self.drift.audio_scale * signed,
            low_excess: crate::envelope::threshold_excess(frame.low, self.visibility.low_threshold),
            high_excess: crate::envelope::threshold_excess(
                frame.high,
                self.visibility.high_threshold,
            ),
        }
    }

    /// Advance every segment one tick and re-place the visible ones.
    pub fn tick(&mut self, frame: &AudioFrame, dt: f32) {
        let ctl = self.compute_controls(frame);
        self.ripple_time += dt * self.ripple.speed;

        let place_radius = self.sphere.radius_m - self.sphere.inset_m;

        for seg in &mut self.segments {
            seg.advance(&ctl, &self.visibility, dt);

            if !seg.visible {
                continue; // skip the expensive per-vertex math when hidden
            }

            place_segment(
                seg,
                &self.template,
                place_radius,
                self.sphere.radius_m,
                self.params.seg_length_rad,
                &self.ripple,
                self.ripple_time,
            );
        }
    }

    /// Segments currently being rendered
    pub fn visible_count(&self) -> usize {
        self.segments.iter().filter(|s| s.visible).count()
    }
}

/// Place one segment's vertices onto the sphere.
///
/// Each vertex of the cached parametrization maps to latitude
/// `φ = (φ_off + v·L) mod π` on its meridian; the tube cross-section is
/// offset in the local tangent plane so the short cylinder hugs the
/// sphere's curvature, plus a small sinusoidal shimmer along the binormal.
#[allow(clippy::too_many_arguments)]
fn place_segment(
    seg: &mut Segment,
    template: &TubeTemplate,
    place_radius: f32,
    sphere_radius: f32,
    seg_length_rad: f32,
    ripple: &RippleParams,
    ripple_time: f32,
) {
    let lambda0 = seg.meridian_azimuth;

    for (vi, vertex) in seg.vertices.iter_mut().enumerate() {
        let alpha = template.alpha[vi];
        let v = template.v[vi];
        let r = template.r[vi];

        let phi = (seg.polar_offset + v * seg_length_rad).rem_euclid(PI);
        let p = sph_to_cart(place_radius, phi, lambda0);
        let (_n, t_lambda, b) = tangent_basis(phi, lambda0);

        // Tube cross-section in the tangent plane
        let dx = alpha.cos() * r;
        let dz = alpha.sin() * r;
        let mut pos = p + t_lambda * dx + b * dz;

        if ripple.amp_m != 0.0 {
            let wave = (alpha * ripple.freq_circ
                + v * seg_length_rad / PI * sphere_radius * ripple.freq_y
                + ripple_time)
                .sin()
                * ripple.amp_m;
            pos += b * wave * 0.25;
        }

        vertex.position = pos.to_array();
    }

    compute_normals(&mut seg.vertices, &template.indices);
    seg.dirty = true;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::VisibilityParams;

    fn build() -> SegmentLattice {
        SegmentLattice::new(
            LatticeParams::default(),
            SphereParams::default(),
            DriftParams::default(),
            VisibilityParams::default(),
            RippleParams::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_construction_counts_and_personality() {
        let lattice = build();
        let params = LatticeParams::default();
        assert_eq!(lattice.segments.len(), params.segment_count());

        for seg in &lattice.segments {
            assert!((0.0..PI).contains(&seg.polar_offset));
            assert!((0.7..1.3).contains(&seg.audio_weight));
            assert!((1.0 - 0.30..=1.0 + 0.30).contains(&seg.speed_jitter));
            assert_eq!(seg.vertices.len(), params.vertices_per_segment());
        }
    }

    #[test]
    fn test_construction_is_deterministic() {
        let a = build();
        let b = build();
        for (sa, sb) in a.segments.iter().zip(&b.segments) {
            assert_eq!(sa.polar_offset, sb.polar_offset);
            assert_eq!(sa.speed_jitter, sb.speed_jitter);
            assert_eq!(sa.audio_weight, sb.audio_weight);
        }
    }

    #[test]
    fn test_meridians_evenly_spaced() {
        let lattice = build();
        let params = LatticeParams::default();
        let step = 2.0 * PI / params.pipe_count as f32;

        for pipe in 0..params.pipe_count {
            let seg = &lattice.segments[pipe * params.segments_per_pipe];
            let expected = -PI + pipe as f32 * step;
            assert!((seg.meridian_azimuth - expected).abs() < 1e-5);
        }
    }

    #[test]
    fn test_silent_controls_are_baseline() {
        let lattice = build();
        let ctl = lattice.compute_controls(&AudioFrame::SILENT);
        assert_eq!(ctl.d_phi_base, DriftParams::default().base_speed_rad_per_s);
        assert_eq!(ctl.low_excess, 0.0);
        assert_eq!(ctl.high_excess, 0.0);
    }

    #[test]
    fn test_full_bass_drifts_down() {
        let lattice = build();
        let frame = AudioFrame {
            low: 1.0,
            mid: 0.0,
            high: 0.0,
        };
        let ctl = lattice.compute_controls(&frame);
        let drift = DriftParams::default();

        // signed control = 1 at full bass, zero highs
        let expected = drift.base_speed_rad_per_s + drift.audio_scale;
        assert!((ctl.d_phi_base - expected).abs() < 1e-6);
        assert!(ctl.d_phi_base > drift.base_speed_rad_per_s);
        assert!(ctl.low_excess > 0.9);
        assert_eq!(ctl.high_excess, 0.0);
    }

    #[test]
    fn test_placement_radius_bound() {
        let mut lattice = build();
        lattice.tick(&AudioFrame::SILENT, 1.0 / 60.0);

        let sphere = SphereParams::default();
        let params = LatticeParams::default();
        let ripple = RippleParams::default();
        // Vertices sit within tube radius + ripple of the placement sphere
        let slack = params.seg_radius_m + ripple.amp_m * 0.25 + 1e-3;
        let place_radius = sphere.radius_m - sphere.inset_m;

        for seg in lattice.segments.iter().filter(|s| s.visible) {
            for vertex in &seg.vertices {
                let d = Vec3::from_array(vertex.position).length();
                assert!(
                    (d - place_radius).abs() <= slack,
                    "vertex at distance {} from center",
                    d
                );
            }
        }
    }

    #[test]
    fn test_hidden_segments_skip_placement() {
        let mut lattice = build();
        // Force one segment invisible and verify its buffer stays untouched
        lattice.segments[0].visibility = 0.0;
        lattice.segments[0].visible = false;
        lattice.segments[0].dirty = false;

        // Epsilon floor: envelope target is the idle floor, so after one
        // short tick from zero the envelope is still tiny but rising; use a
        // tiny dt so it stays below epsilon.
        lattice.tick(&AudioFrame::SILENT, 1e-5);

        assert!(!lattice.segments[0].visible);
        assert!(!lattice.segments[0].dirty);
        let p = lattice.segments[0].vertices[0].position;
        assert_eq!(p, [0.0; 3]);
    }

    #[test]
    fn test_tangent_basis_orthonormal() {
        for &phi in &[0.1_f32, 0.8, 1.5, 2.6] {
            for &lambda in &[-3.0_f32, -1.0, 0.0, 2.5] {
                let (n, t, b) = tangent_basis(phi, lambda);
                assert!((n.length() - 1.0).abs() < 1e-5);
                assert!((t.length() - 1.0).abs() < 1e-5);
                assert!((b.length() - 1.0).abs() < 1e-5);
                assert!(n.dot(t).abs() < 1e-5);
                assert!(n.dot(b).abs() < 1e-5);
                assert!(t.dot(b).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_sph_to_cart_poles_and_equator() {
        let p = sph_to_cart(10.0, 0.0, 0.0);
        assert!((p - Vec3::new(0.0, 10.0, 0.0)).length() < 1e-5);

        let p = sph_to_cart(10.0, PI, 0.0);
        assert!((p - Vec3::new(0.0, -10.0, 0.0)).length() < 1e-4);

        let p = sph_to_cart(10.0, PI / 2.0, 0.0);
        assert!((p - Vec3::new(10.0, 0.0, 0.0)).length() < 1e-4);
    }
}
