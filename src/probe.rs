//! Reflection capture scheduling.
//!
//! The cubemap recapture is expensive, so it runs on a fixed cadence
//! decoupled from the render cadence: a few frames of reflection staleness
//! for a large throughput gain. The policy here is plain CPU state; the GPU
//! pass itself lives in rendering.

use crate::params::ReflectionConfig;

/// Frame-counting cadence policy for reflection recapture
pub struct ReflectionProbeScheduler {
    frame: u64,
    cadence: u64,
}

impl ReflectionProbeScheduler {
    pub fn new(config: &ReflectionConfig) -> Result<Self, String> {
        config.validate()?;
        Ok(Self {
            frame: 0,
            cadence: config.cadence_frames as u64,
        })
    }

    /// Count one frame; true when a capture is due this frame
    /// (frames cadence, 2×cadence, 3×cadence, …).
    pub fn begin_frame(&mut self) -> bool {
        self.frame += 1;
        self.frame % self.cadence == 0
    }

    /// Frames counted so far
    pub fn frame(&self) -> u64 {
        self.frame
    }
}

/// Run a capture with the animated geometry hidden, restoring the previous
/// visibility afterwards. Hiding prevents the geometry from reflecting
/// itself with a half-updated pose.
pub fn capture_with_hidden<F: FnOnce(bool)>(group_visible: &mut bool, capture: F) {
    let was_visible = *group_visible;
    *group_visible = false;
    capture(*group_visible);
    *group_visible = was_visible;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler(cadence: u32) -> ReflectionProbeScheduler {
        let config = ReflectionConfig {
            cadence_frames: cadence,
            ..ReflectionConfig::default()
        };
        ReflectionProbeScheduler::new(&config).unwrap()
    }

    #[test]
    fn test_capture_exactly_on_cadence() {
        let mut probe = scheduler(6);
        let mut capture_frames = Vec::new();
        for frame in 1..=30_u64 {
            if probe.begin_frame() {
                capture_frames.push(frame);
            }
        }
        assert_eq!(capture_frames, vec![6, 12, 18, 24, 30]);
    }

    #[test]
    fn test_cadence_one_captures_every_frame() {
        let mut probe = scheduler(1);
        for _ in 0..10 {
            assert!(probe.begin_frame());
        }
    }

    #[test]
    fn test_zero_cadence_is_rejected() {
        let config = ReflectionConfig {
            cadence_frames: 0,
            ..ReflectionConfig::default()
        };
        assert!(ReflectionProbeScheduler::new(&config).is_err());
    }

    #[test]
    fn test_visibility_restored_after_capture() {
        let mut visible = true;
        let mut seen_during_capture = None;
        capture_with_hidden(&mut visible, |v| {
            seen_during_capture = Some(v);
        });
        assert!(visible);
        assert_eq!(seen_during_capture, Some(false));

        // A group that was already hidden stays hidden
        let mut visible = false;
        capture_with_hidden(&mut visible, |_| {});
        assert!(!visible);
    }
}
