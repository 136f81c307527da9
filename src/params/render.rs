//! Rendering, reflection capture, and recording configuration.

/// Rendering configuration
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Window width (pixels)
    pub window_width: u32,

    /// Window height (pixels)
    pub window_height: u32,

    /// Field of view (degrees)
    pub fov_degrees: f32,

    /// Near clipping plane (meters)
    pub near_plane_m: f32,

    /// Far clipping plane (meters); must reach past the sky sphere
    pub far_plane_m: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            window_width: 1280,
            window_height: 720,
            fov_degrees: 75.0,
            near_plane_m: 0.1,
            far_plane_m: 3000.0, // Sky sphere sits at 1000m
        }
    }
}

impl RenderConfig {
    pub fn aspect_ratio(&self) -> f32 {
        self.window_width as f32 / self.window_height as f32
    }
}

/// Reflection (environment cubemap) capture configuration
#[derive(Debug, Clone)]
pub struct ReflectionConfig {
    /// Cubemap face resolution (pixels, square)
    pub cubemap_size: u32,

    /// Recapture every N-th frame; capture is expensive, so its cadence is
    /// decoupled from the render cadence
    pub cadence_frames: u32,

    /// Capture near plane (meters)
    pub near_plane_m: f32,

    /// Capture far plane (meters)
    pub far_plane_m: f32,
}

impl Default for ReflectionConfig {
    fn default() -> Self {
        Self {
            cubemap_size: 512,
            cadence_frames: 6,
            near_plane_m: 1.0,
            far_plane_m: 10000.0,
        }
    }
}

impl ReflectionConfig {
    /// A zero cadence would never capture; that is a wiring error.
    pub fn validate(&self) -> Result<(), String> {
        if self.cadence_frames == 0 {
            return Err("Reflection cadence must be >= 1 frame".to_string());
        }
        if self.cubemap_size == 0 {
            return Err("Cubemap size must be > 0".to_string());
        }
        Ok(())
    }
}

/// Recording mode configuration
#[derive(Debug, Clone)]
pub struct RecordingConfig {
    /// Duration to record (seconds)
    pub duration_secs: f32,

    /// Output directory for frames and audio
    pub output_dir: String,

    /// Frame rate (FPS)
    pub fps: u32,
}

impl RecordingConfig {
    pub fn new(duration_secs: f32) -> Self {
        Self {
            duration_secs,
            output_dir: "recording".to_string(),
            fps: 60,
        }
    }

    /// Total number of frames to capture
    pub fn total_frames(&self) -> usize {
        (self.duration_secs * self.fps as f32).ceil() as usize
    }

    /// Frame directory path
    pub fn frames_dir(&self) -> String {
        format!("{}/frames", self.output_dir)
    }

    /// Audio file path
    pub fn audio_path(&self) -> String {
        format!("{}/audio.wav", self.output_dir)
    }
}
