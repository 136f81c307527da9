//! Pipesphere library - audio-reactive spherical pipe field

pub mod animator;
pub mod audio;
pub mod camera;
pub mod envelope;
pub mod lattice;
pub mod lighting;
pub mod params;
pub mod probe;
pub mod rendering;
