//! Parameter definitions with physical units and documented semantics.
//!
//! All magic numbers are extracted here with:
//! - Physical units (meters, radians, seconds, Hz, etc.)
//! - Documented ranges and meanings
//! - Type safety where possible

mod audio;
mod camera;
mod lattice;
mod lighting;
mod render;

// Re-export all types
pub use audio::{AudioAssetConfig, FftConfig, SPECTRUM_MAX};
pub use camera::{CameraPreset, FixedCamera, OrbitCamera};
pub use lattice::{
    DriftParams, LatticeParams, RippleParams, SphereParams, TexScrollParams, VisibilityParams,
};
pub use lighting::{AmbientParams, DirectionalParams, LightReactParams, StrobeParams};
pub use render::{RecordingConfig, ReflectionConfig, RenderConfig};
