//! Surface animator: the per-frame orchestrator.
//!
//! Owns the segment lattice, the reflection cadence policy, the shared
//! texture scroll, and the late-bound analyser slot. One `tick` per rendered
//! frame, in a fixed order: reflection check, band read, lattice update,
//! texture scroll. Nothing here blocks; audio absence is a reduced-liveliness
//! state, never an error.

use log::{info, warn};
use std::sync::Arc;
use thiserror::Error;

use crate::audio::{read_analyser, AudioFrame, SpectrumAnalyser};
use crate::lattice::SegmentLattice;
use crate::params::{
    DriftParams, LatticeParams, ReflectionConfig, RippleParams, SphereParams, TexScrollParams,
    VisibilityParams,
};
use crate::probe::ReflectionProbeScheduler;

/// A component that can accept the shared audio analyser once it exists.
/// The app checks for this capability once at wiring time, not per call.
pub trait AudioReactive {
    fn attach_analyser(&mut self, analyser: Arc<SpectrumAnalyser>);
}

/// What the render loop must do after a tick
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameActions {
    /// Recapture the reflection cubemap this frame (with geometry hidden)
    pub capture_reflection: bool,
}

/// Orchestrator owning the lattice and all audio-derived control state
pub struct SurfaceAnimator {
    pub lattice: SegmentLattice,
    probe: ReflectionProbeScheduler,

    /// Single-assignment analyser slot, bound when the audio decode lands
    analyser: Option<Arc<SpectrumAnalyser>>,

    tex_scroll: TexScrollParams,

    /// Shared texture offset (u, v), advanced independent of audio
    pub tex_offset: [f32; 2],

    /// Band frame read this tick, for anyone inspecting after the fact
    pub last_frame: AudioFrame,
}

impl SurfaceAnimator {
    /// Construct the animator. This is the one place that fails fast:
    /// invalid parameters are wiring errors, not runtime signal conditions.
    pub fn new(
        lattice_params: LatticeParams,
        sphere: SphereParams,
        drift: DriftParams,
        visibility: VisibilityParams,
        ripple: RippleParams,
        tex_scroll: TexScrollParams,
        reflection: &ReflectionConfig,
    ) -> Result<Self, String> {
        let lattice = SegmentLattice::new(lattice_params, sphere, drift, visibility, ripple)?;
        let probe = ReflectionProbeScheduler::new(reflection)?;

        Ok(Self {
            lattice,
            probe,
            analyser: None,
            tex_scroll,
            tex_offset: [0.0, 0.0],
            last_frame: AudioFrame::SILENT,
        })
    }

    /// Late-bind the analyser once the audio decode completes. The slot is
    /// single-assignment; a second bind is ignored.
    pub fn bind_analyser(&mut self, analyser: Arc<SpectrumAnalyser>) {
        if self.analyser.is_some() {
            warn!("analyser already bound, ignoring rebind");
            return;
        }
        info!("analyser bound to surface animator");
        self.analyser = Some(analyser);
    }

    /// The analyser handle for other subsystems (lights, fog). None until
    /// the decode lands.
    pub fn analyser(&self) -> Option<Arc<SpectrumAnalyser>> {
        self.analyser.clone()
    }

    /// Advance one frame.
    ///
    /// `dt` is the elapsed frame time (seconds); `wall_t` a monotonic clock
    /// reading used for the audio-independent texture ripple.
    pub fn tick(&mut self, dt: f32, wall_t: f32) -> FrameActions {
        // 1. Reflection cadence check
        let capture_reflection = self.probe.begin_frame();

        // 2. Band read (silent until the analyser binds and produces data)
        self.last_frame = read_analyser(self.analyser.as_deref());

        // 3. Envelopes + per-segment placement
        self.lattice.tick(&self.last_frame, dt);

        // 4. Shared texture scroll, audio-independent
        self.tex_offset[1] -= dt * self.tex_scroll.scroll_speed_y;
        self.tex_offset[0] =
            (wall_t * self.tex_scroll.ripple_x_speed).sin() * self.tex_scroll.ripple_x_amp;

        FrameActions { capture_reflection }
    }

    pub fn frame(&self) -> u64 {
        self.probe.frame()
    }
}

/// Readiness state for dependents waiting on real analyser data
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateState {
    /// Still polling within the deadline
    Waiting,
    /// At least one non-zero spectrum sample observed
    Ready,
    /// Deadline passed without data; proceed in silent mode
    TimedOut,
}

#[derive(Debug, Error)]
pub enum GateError {
    #[error("analyser produced no data within {0} seconds")]
    Timeout(f32),
}

/// Bounded-time readiness wait for the analyser, polled from the tick loop.
///
/// Dependent systems (lighting, fog) attach only once the analyser is
/// confirmed producing non-zero data; on timeout they attach whatever
/// exists and run degraded rather than failing hard.
pub struct AnalyserGate {
    timeout_s: f32,
    poll_interval_s: f32,
    elapsed_s: f32,
    since_poll_s: f32,
    state: GateState,
}

impl AnalyserGate {
    pub fn new(timeout_s: f32, poll_interval_s: f32) -> Self {
        Self {
            timeout_s,
            poll_interval_s,
            elapsed_s: 0.0,
            // Start past the interval so the first tick polls immediately
            since_poll_s: poll_interval_s,
            state: GateState::Waiting,
        }
    }

    /// Advance the gate by `dt`; checks the analyser at the poll interval.
    /// Terminal states are sticky.
    pub fn tick(&mut self, analyser: Option<&SpectrumAnalyser>, dt: f32) -> GateState {
        if self.state != GateState::Waiting {
            return self.state;
        }

        self.elapsed_s += dt;
        self.since_poll_s += dt;

        if self.since_poll_s >= self.poll_interval_s {
            self.since_poll_s = 0.0;
            if analyser.is_some_and(|a| a.has_signal()) {
                self.state = GateState::Ready;
                return self.state;
            }
        }

        if self.elapsed_s > self.timeout_s {
            self.state = GateState::TimedOut;
        }
        self.state
    }

    /// The typed error for the timed-out state, for logging at the attach
    /// site.
    pub fn timeout_error(&self) -> Option<GateError> {
        (self.state == GateState::TimedOut).then_some(GateError::Timeout(self.timeout_s))
    }
}

impl Default for AnalyserGate {
    fn default() -> Self {
        // Bail after 8s; poll ~8x/sec
        Self::new(8.0, 0.12)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::*;

    fn build() -> SurfaceAnimator {
        SurfaceAnimator::new(
            LatticeParams::default(),
            SphereParams::default(),
            DriftParams::default(),
            VisibilityParams::default(),
            RippleParams::default(),
            TexScrollParams::default(),
            &ReflectionConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_construction_fails_fast_on_bad_params() {
        let result = SurfaceAnimator::new(
            LatticeParams {
                pipe_count: 0,
                ..LatticeParams::default()
            },
            SphereParams::default(),
            DriftParams::default(),
            VisibilityParams::default(),
            RippleParams::default(),
            TexScrollParams::default(),
            &ReflectionConfig::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_tick_without_analyser_is_silent_not_fatal() {
        let mut animator = build();
        let actions = animator.tick(1.0 / 60.0, 0.0);
        assert_eq!(animator.last_frame, AudioFrame::SILENT);
        assert!(!actions.capture_reflection); // frame 1 with cadence 6
    }

    #[test]
    fn test_capture_due_on_cadence_frames() {
        let mut animator = build();
        let cadence = ReflectionConfig::default().cadence_frames as u64;
        let mut due = Vec::new();
        for frame in 1..=18_u64 {
            if animator.tick(1.0 / 60.0, 0.0).capture_reflection {
                due.push(frame);
            }
        }
        assert_eq!(due, vec![cadence, cadence * 2, cadence * 3]);
    }

    #[test]
    fn test_texture_offset_scrolls_without_audio() {
        let mut animator = build();
        animator.tick(1.0 / 60.0, 0.1);
        let first = animator.tex_offset;
        animator.tick(1.0 / 60.0, 0.2);
        assert!(animator.tex_offset[1] < first[1]);
        assert_ne!(animator.tex_offset[0], first[0]);
    }

    #[test]
    fn test_analyser_slot_single_assignment() {
        let mut animator = build();
        assert!(animator.analyser().is_none());

        let first = Arc::new(SpectrumAnalyser::new());
        animator.bind_analyser(Arc::clone(&first));
        let second = Arc::new(SpectrumAnalyser::new());
        animator.bind_analyser(second);

        assert!(Arc::ptr_eq(&animator.analyser().unwrap(), &first));
    }

    #[test]
    fn test_gate_times_out_without_analyser() {
        let mut gate = AnalyserGate::new(1.0, 0.12);
        let mut state = GateState::Waiting;
        // Simulate ~2 seconds of ticks with no analyser ever binding
        for _ in 0..120 {
            state = gate.tick(None, 1.0 / 60.0);
        }
        assert_eq!(state, GateState::TimedOut);
        assert!(gate.timeout_error().is_some());

        // Sticky: a late analyser does not resurrect the gate
        let analyser = SpectrumAnalyser::new();
        assert_eq!(gate.tick(Some(&analyser), 0.1), GateState::TimedOut);
    }

    #[test]
    fn test_gate_ready_on_first_nonzero_sample() {
        let mut gate = AnalyserGate::default();
        let analyser = SpectrumAnalyser::new();

        // Bound but silent: still waiting
        assert_eq!(gate.tick(Some(&analyser), 0.2), GateState::Waiting);

        // All-zero spectrum does not satisfy the readiness condition
        analyser.publish(&[0.0; 8]);
        assert_eq!(gate.tick(Some(&analyser), 0.2), GateState::Waiting);

        // First non-zero sample flips it
        analyser.publish(&[0.0, 40.0, 2.0]);
        assert_eq!(gate.tick(Some(&analyser), 0.2), GateState::Ready);
        assert!(gate.timeout_error().is_none());
    }
}
