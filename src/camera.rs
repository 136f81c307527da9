//! Observer camera: the reflection capture origin and view matrix source.

use glam::{Mat4, Vec3};

use crate::params::{CameraPreset, FixedCamera, OrbitCamera, RenderConfig};

/// Camera system with preset-driven motion
pub struct CameraSystem {
    preset: CameraPreset,
}

impl CameraSystem {
    pub fn new(preset: CameraPreset) -> Self {
        Self { preset }
    }

    /// Compute observer position and look-at target for a given time.
    pub fn compute_position_and_target(&self, time_s: f32) -> (Vec3, Vec3) {
        match &self.preset {
            CameraPreset::Fixed(params) => Self::compute_fixed(params),
            CameraPreset::Orbit(params) => Self::compute_orbit(params, time_s),
        }
    }

    fn compute_fixed(p: &FixedCamera) -> (Vec3, Vec3) {
        (Vec3::from_array(p.position), Vec3::from_array(p.target))
    }

    /// Slow orbit around the center, always looking outward so the segment
    /// field sweeps past.
    fn compute_orbit(p: &OrbitCamera, time_s: f32) -> (Vec3, Vec3) {
        let angle = time_s * p.angular_speed;
        let eye = Vec3::new(
            angle.cos() * p.radius_m,
            p.height_m,
            angle.sin() * p.radius_m,
        );
        // Look ahead along the orbit, out toward the sphere wall
        let look = Vec3::new(
            (angle + 0.5).cos() * p.radius_m * 3.0,
            p.height_m,
            (angle + 0.5).sin() * p.radius_m * 3.0,
        );
        (eye, look)
    }

    /// View-projection matrix plus the observer position (the reflection
    /// capture origin).
    pub fn create_view_proj_matrix(
        &self,
        time_s: f32,
        render_config: &RenderConfig,
    ) -> (Mat4, Vec3) {
        let (eye, target) = self.compute_position_and_target(time_s);

        // Y stays up; the observer never rolls
        let view = Mat4::look_at_rh(eye, target, Vec3::Y);
        let proj = Mat4::perspective_rh(
            render_config.fov_degrees.to_radians(),
            render_config.aspect_ratio(),
            render_config.near_plane_m,
            render_config.far_plane_m,
        );

        (proj * view, eye)
    }
}
