//! Observer camera configuration and presets.

/// Fixed camera at a point inside the sphere
#[derive(Debug, Clone)]
pub struct FixedCamera {
    /// Camera position (meters)
    pub position: [f32; 3],

    /// Look-at target (meters)
    pub target: [f32; 3],
}

impl Default for FixedCamera {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 0.0],
            target: [0.0, 0.0, -100.0],
        }
    }
}

/// Slow orbit around the sphere center
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    /// Orbit radius (meters); well inside the 1000m sphere
    pub radius_m: f32,

    /// Orbit angular speed (radians per second)
    pub angular_speed: f32,

    /// Camera height above the equator plane (meters)
    pub height_m: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            radius_m: 120.0,
            angular_speed: 0.03,
            height_m: 20.0,
        }
    }
}

/// Camera preset selection
#[derive(Debug, Clone)]
pub enum CameraPreset {
    /// Stationary observer looking outward
    Fixed(FixedCamera),

    /// Slow orbit around the center, looking outward
    Orbit(OrbitCamera),
}

impl Default for CameraPreset {
    fn default() -> Self {
        Self::Fixed(FixedCamera::default())
    }
}
