//! Pipesphere - an audio-reactive sphere of drifting tube segments
//!
//! Thirteen meridian pipes slide over the inside of a giant sphere,
//! pulled around by the low and high ends of the spectrum, lit by a
//! strobing rig and mirrored in a throttled reflection cubemap.

mod cli;

use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use log::{error, info, warn};
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use pipesphere::animator::{AnalyserGate, AudioReactive, GateState, SurfaceAnimator};
use pipesphere::audio::{spawn_decoder, AudioError, AudioSystem, DecodedAudio};
use pipesphere::camera::CameraSystem;
use pipesphere::lighting::LightRig;
use pipesphere::params::*;
use pipesphere::probe::capture_with_hidden;
use pipesphere::rendering::{frame_uniforms, RenderSystem, SkyUniforms};

/// Main application state
struct App {
    // Window and rendering
    window: Option<Arc<Window>>,
    render_system: Option<RenderSystem>,

    // Simulation systems
    animator: SurfaceAnimator,
    camera: CameraSystem,
    lights: LightRig,

    // Audio: decode lands on a loader thread, the stream starts here
    // (cpal streams are not Send)
    audio: Option<AudioSystem>,
    decode_rx: Option<Receiver<Result<DecodedAudio, AudioError>>>,
    gate: AnalyserGate,
    lights_attached: bool,

    // Configuration
    render_config: RenderConfig,
    reflection_config: ReflectionConfig,
    fft_config: FftConfig,
    asset_config: AudioAssetConfig,
    recording_config: Option<RecordingConfig>,
    tex_scroll: TexScrollParams,

    // Time tracking
    start_time: Instant,
    last_frame: Option<Instant>,
    frame_num: usize,
}

impl App {
    fn new(args: cli::Args) -> Result<Self, String> {
        let render_config = RenderConfig::default();
        let reflection_config = ReflectionConfig::default();
        let tex_scroll = TexScrollParams::default();

        let animator = SurfaceAnimator::new(
            LatticeParams::default(),
            SphereParams::default(),
            DriftParams::default(),
            VisibilityParams::default(),
            RippleParams::default(),
            tex_scroll.clone(),
            &reflection_config,
        )?;

        let camera = CameraSystem::new(args.parse_camera_preset());
        let lights = LightRig::new(
            LightReactParams::default(),
            AmbientParams::default(),
            DirectionalParams::default(),
            StrobeParams::default(),
        );

        let asset_config = args.audio_asset_config();
        let recording_config = args.create_recording_config();

        // Kick off the decode immediately; the result is polled per frame
        let decode_rx = Some(spawn_decoder(asset_config.path.clone()));

        Ok(Self {
            window: None,
            render_system: None,
            animator,
            camera,
            lights,
            audio: None,
            decode_rx,
            gate: AnalyserGate::default(),
            lights_attached: false,
            render_config,
            reflection_config,
            fft_config: FftConfig::default(),
            asset_config,
            recording_config,
            tex_scroll,
            start_time: Instant::now(),
            last_frame: None,
            frame_num: 0,
        })
    }
}

impl ApplicationHandler for App {
    fn about_to_wait(&mut self, _event_loop: &winit::event_loop::ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn resumed(&mut self, event_loop: &winit::event_loop::ActiveEventLoop) {
        if self.window.is_some() {
            return; // Already initialized
        }

        // Create window
        let window_attributes = Window::default_attributes()
            .with_title("Pipesphere - Audio-Reactive Surface")
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.render_config.window_width,
                self.render_config.window_height,
            ));

        let window = match event_loop.create_window(window_attributes) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                error!("failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        // Initialize rendering system
        let render_system = match pollster::block_on(RenderSystem::new(
            Arc::clone(&window),
            &self.animator.lattice,
            self.reflection_config.clone(),
            self.recording_config.clone(),
        )) {
            Ok(rs) => rs,
            Err(e) => {
                error!("failed to initialize rendering: {}", e);
                event_loop.exit();
                return;
            }
        };

        info!("pipesphere running, ESC to quit");

        self.window = Some(window);
        self.render_system = Some(render_system);
    }

    fn window_event(
        &mut self,
        event_loop: &winit::event_loop::ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        ..
                    },
                ..
            } => event_loop.exit(),
            WindowEvent::RedrawRequested => {
                if self.render_frame() {
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }
}

impl App {
    /// Poll the decode channel; once the asset lands, start playback on
    /// this thread and bind the analyser to the animator.
    fn poll_decode(&mut self) {
        let Some(ref rx) = self.decode_rx else {
            return;
        };

        match rx.try_recv() {
            Ok(Ok(decoded)) => {
                self.decode_rx = None;
                match AudioSystem::start(
                    decoded,
                    self.fft_config.clone(),
                    &self.asset_config,
                    self.recording_config.as_ref(),
                ) {
                    Ok(audio) => {
                        self.animator.bind_analyser(audio.analyser());
                        self.audio = Some(audio);
                    }
                    Err(e) => {
                        warn!("audio unavailable, running silent: {}", e);
                    }
                }
            }
            Ok(Err(e)) => {
                self.decode_rx = None;
                warn!("audio decode failed, running silent: {}", e);
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                self.decode_rx = None;
                warn!("audio loader thread vanished, running silent");
            }
        }
    }

    /// Render a single frame. Returns true when the app should exit
    /// (recording duration reached).
    fn render_frame(&mut self) -> bool {
        if self.render_system.is_none() {
            return false;
        }

        let now = Instant::now();
        let dt = match self.last_frame {
            // Clamp against pauses and debugger stalls
            Some(prev) => (now - prev).as_secs_f32().min(0.1),
            None => 1.0 / 60.0,
        };
        self.last_frame = Some(now);
        let time_s = self.start_time.elapsed().as_secs_f32();

        self.poll_decode();

        let Some(ref render_system) = self.render_system else {
            return false;
        };

        // Lighting attaches only once the analyser is confirmed live; on
        // timeout it attaches whatever exists and runs degraded
        if !self.lights_attached {
            let analyser = self.animator.analyser();
            match self.gate.tick(analyser.as_deref(), dt) {
                GateState::Waiting => {}
                GateState::Ready => {
                    if let Some(analyser) = analyser {
                        self.lights.attach_analyser(analyser);
                    }
                    self.lights_attached = true;
                }
                GateState::TimedOut => {
                    if let Some(e) = self.gate.timeout_error() {
                        warn!("{}", e);
                    }
                    if let Some(analyser) = analyser {
                        self.lights.attach_analyser(analyser);
                    }
                    self.lights_attached = true;
                }
            }
        }

        // Advance simulation
        let actions = self.animator.tick(dt, time_s);
        self.lights.tick(dt);

        let (view_proj, camera_pos) = self
            .camera
            .create_view_proj_matrix(time_s, &self.render_config);

        // Upload dirty segment geometry and per-segment opacity
        render_system.update_segments(&mut self.animator.lattice);

        // Throttled reflection capture, with the animated group hidden so
        // only the background reaches the mirror
        if actions.capture_reflection {
            capture_with_hidden(&mut self.animator.lattice.group_visible, |_| {
                render_system.capture_environment(camera_pos, time_s);
            });
        }

        let uniforms = frame_uniforms(
            view_proj,
            camera_pos,
            &self.lights.state,
            self.animator.tex_offset,
            &self.tex_scroll,
            time_s,
        );
        render_system.update_uniforms(&uniforms);

        let sky_uniforms = SkyUniforms {
            inv_view_proj: view_proj.inverse().to_cols_array_2d(),
            time: time_s,
            _padding: [0.0; 3],
        };
        render_system.update_sky_uniforms(&sky_uniforms);

        if let Err(e) = render_system.render(&self.animator.lattice, self.frame_num) {
            match e {
                wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                    warn!("surface lost, skipping frame");
                }
                other => error!("render error: {:?}", other),
            }
        }
        self.frame_num += 1;

        // Recording mode exits after the requested duration
        if let Some(ref config) = self.recording_config {
            let total_frames = (config.duration_secs * config.fps as f32) as usize;
            if self.frame_num >= total_frames {
                info!(
                    "recording complete: {} frames in {}",
                    self.frame_num, config.output_dir
                );
                return true;
            }
        }

        false
    }
}

fn main() {
    env_logger::init();

    let args = cli::Args::parse();

    let mut app = match App::new(args) {
        Ok(app) => app,
        Err(e) => {
            error!("initialization failed: {}", e);
            std::process::exit(1);
        }
    };

    let event_loop = match EventLoop::new() {
        Ok(el) => el,
        Err(e) => {
            error!("failed to create event loop: {}", e);
            std::process::exit(1);
        }
    };
    let _ = event_loop.run_app(&mut app);
}
