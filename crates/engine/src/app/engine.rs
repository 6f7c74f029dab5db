use std::collections::HashMap;
use std::fmt;

use thiserror::Error;
use tracing::{debug, info, trace, warn};

use super::config::EngineConfig;
use super::debug_overlay::{draw_overlay, OverlayData};
use super::input::InputManager;
use super::metrics::{FpsCounter, LoopMetricsSnapshot};
use super::rendering::Surface;
use super::scene::{Scene, SceneError, SceneRuntime};
use super::signal::Signal;
use super::time::{Clock, Time};
use super::world::World;
use super::Size;

/// Handle for one requested frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRequest(u64);

impl FrameRequest {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Host primitive that calls back once per requested frame. The host answers
/// a request by calling `Engine::on_frame` with it.
pub trait FrameScheduler {
    fn request_frame(&mut self) -> FrameRequest;
    fn cancel_frame(&mut self, request: FrameRequest);

    /// Re-arms a request that is still outstanding. `Engine::resume` calls it
    /// for the request adopted from before the pause.
    fn renew_frame(&mut self, _request: FrameRequest) {}
}

/// Scheduler that only records requests; the caller decides when they fire.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    next_id: u64,
    pending: Vec<FrameRequest>,
    cancelled: Vec<FrameRequest>,
    renewed: Vec<FrameRequest>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> &[FrameRequest] {
        &self.pending
    }

    /// Removes and returns the oldest outstanding request.
    pub fn take_pending(&mut self) -> Option<FrameRequest> {
        if self.pending.is_empty() {
            return None;
        }
        Some(self.pending.remove(0))
    }

    pub fn cancelled(&self) -> &[FrameRequest] {
        &self.cancelled
    }

    pub fn renewed(&self) -> &[FrameRequest] {
        &self.renewed
    }

    pub fn requested_count(&self) -> u64 {
        self.next_id
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&mut self) -> FrameRequest {
        let request = FrameRequest(self.next_id);
        self.next_id += 1;
        self.pending.push(request);
        request
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        self.pending.retain(|pending| *pending != request);
        self.cancelled.push(request);
    }

    fn renew_frame(&mut self, request: FrameRequest) {
        self.renewed.push(request);
    }
}

/// Box the logical canvas is fitted into on resize.
pub trait Container {
    fn bounds(&self) -> Size;
}

#[derive(Debug, Clone, Copy)]
pub struct FixedContainer {
    size: Size,
}

impl FixedContainer {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            size: Size::new(width, height),
        }
    }
}

impl Container for FixedContainer {
    fn bounds(&self) -> Size {
        self.size
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Stopped,
    Running,
    Paused,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Initialize,
    Initialized,
    Error(String),
    Start,
    Stop,
    Pause,
    Resume,
    Resize { scale: f32 },
    SceneLoaded { name: String },
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("scene '{name}' is not registered")]
    SceneNotFound { name: String },
    #[error(transparent)]
    SceneLoad(#[from] SceneError),
    #[error("invalid engine config: {reason}")]
    InvalidConfig { reason: String },
}

/// Frame loop, run state and the active scene.
///
/// The host owns the real clock of frames: every `FrameRequest` handed to the
/// scheduler must come back through `on_frame`. A frame runs these phases in
/// order: time, input, FPS accounting, scene update, clear, scene render,
/// debug overlay, next request.
///
/// A request still in flight when `pause` is called is kept. If it fires while
/// paused it is consumed without running a frame; if `resume` comes first the
/// request is adopted instead of scheduling a second one.
pub struct Engine<S: Surface, F: FrameScheduler> {
    config: EngineConfig,
    container: Box<dyn Container>,
    surface: S,
    scheduler: F,
    world: World,
    scenes: HashMap<String, SceneRuntime>,
    current: Option<String>,
    time: Time,
    input: InputManager,
    fps: FpsCounter,
    metrics: LoopMetricsSnapshot,
    state: EngineState,
    pending_frame: Option<FrameRequest>,
    scale: f32,
    pub events: Signal<EngineEvent>,
}

impl<S: Surface, F: FrameScheduler> fmt::Debug for Engine<S, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("current", &self.current)
            .field("scenes", &self.scenes.len())
            .field("objects", &self.world.len())
            .field("pending_frame", &self.pending_frame)
            .finish()
    }
}

impl<S: Surface, F: FrameScheduler> Engine<S, F> {
    pub fn new(
        config: EngineConfig,
        container: Box<dyn Container>,
        surface: S,
        scheduler: F,
    ) -> Self {
        Self {
            config,
            container,
            surface,
            scheduler,
            world: World::new(),
            scenes: HashMap::new(),
            current: None,
            time: Time::default(),
            input: InputManager::new(),
            fps: FpsCounter::new(),
            metrics: LoopMetricsSnapshot::default(),
            state: EngineState::Stopped,
            pending_frame: None,
            scale: 1.0,
            events: Signal::default(),
        }
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.time = Time::with_clock(clock);
        self
    }

    pub fn initialize(&mut self) -> Result<(), EngineError> {
        self.events.emit(&EngineEvent::Initialize);
        if let Err(reason) = self.config.validate() {
            warn!(reason = reason.as_str(), "engine_initialize_failed");
            self.events.emit(&EngineEvent::Error(reason.clone()));
            return Err(EngineError::InvalidConfig { reason });
        }

        self.handle_resize();
        info!(
            width = self.config.width,
            height = self.config.height,
            debug = self.config.debug,
            "engine_initialized"
        );
        self.events.emit(&EngineEvent::Initialized);
        Ok(())
    }

    pub fn start(&mut self) {
        match self.state {
            EngineState::Running => return,
            EngineState::Paused => {
                warn!("engine_start_ignored_while_paused");
                return;
            }
            EngineState::Stopped => {}
        }
        self.state = EngineState::Running;
        self.time.reset();
        self.fps.reset();
        info!("engine_started");
        self.events.emit(&EngineEvent::Start);
        self.run_frame();
    }

    pub fn stop(&mut self) {
        if self.state == EngineState::Stopped {
            return;
        }
        self.state = EngineState::Stopped;
        if let Some(request) = self.pending_frame.take() {
            self.scheduler.cancel_frame(request);
        }
        info!("engine_stopped");
        self.events.emit(&EngineEvent::Stop);
    }

    pub fn pause(&mut self) {
        if self.state != EngineState::Running {
            return;
        }
        self.state = EngineState::Paused;
        if let Some(scene) = self.current_scene_mut() {
            scene.pause();
        }
        info!(in_flight = self.pending_frame.is_some(), "engine_paused");
        self.events.emit(&EngineEvent::Pause);
    }

    pub fn resume(&mut self) {
        if self.state != EngineState::Paused {
            return;
        }
        self.state = EngineState::Running;
        if let Some(scene) = self.current_scene_mut() {
            scene.resume();
        }
        info!(adopted_frame = self.pending_frame.is_some(), "engine_resumed");
        self.events.emit(&EngineEvent::Resume);
        match self.pending_frame {
            Some(request) => self.scheduler.renew_frame(request),
            None => self.run_frame(),
        }
    }

    /// Answers a fired frame request. Returns whether a frame ran.
    pub fn on_frame(&mut self, request: FrameRequest) -> bool {
        if self.pending_frame != Some(request) {
            trace!(request = request.raw(), "stale_frame_ignored");
            return false;
        }
        self.pending_frame = None;
        match self.state {
            EngineState::Running => {
                self.run_frame();
                true
            }
            EngineState::Paused => {
                debug!(request = request.raw(), "frame_dropped_while_paused");
                false
            }
            EngineState::Stopped => false,
        }
    }

    fn run_frame(&mut self) {
        self.time.update();
        let delta_seconds = self.time.delta_seconds();
        self.input.update();

        if let Some(sample) = self.fps.record_frame(self.time.delta()) {
            let snapshot = LoopMetricsSnapshot {
                fps: sample.fps,
                frame_time_ms: sample.frame_time_ms,
                object_count: self.object_count(),
            };
            self.metrics = snapshot;
            info!(
                fps = snapshot.fps,
                frame_time_ms = snapshot.frame_time_ms,
                object_count = snapshot.object_count,
                "loop_metrics"
            );
        }

        if let Some(name) = self.current.as_deref() {
            if let Some(scene) = self.scenes.get_mut(name) {
                scene.update(&mut self.world, delta_seconds, &self.input);
            }
        }

        self.surface.clear_rect(
            0.0,
            0.0,
            self.config.width as f32,
            self.config.height as f32,
        );
        if let Some(scene) = self
            .current
            .as_deref()
            .and_then(|name| self.scenes.get(name))
        {
            scene.render(&self.world, &self.input, &mut self.surface);
        }

        if self.config.debug {
            let data = OverlayData {
                fps: self.fps.fps(),
                object_count: self.object_count(),
                pointer: self.input.position(),
            };
            draw_overlay(&mut self.surface, &data);
        }

        self.pending_frame = Some(self.scheduler.request_frame());
    }

    /// Registers a scene under `name`, returning any scene it replaces.
    pub fn add_scene(
        &mut self,
        name: impl Into<String>,
        scene: Box<dyn Scene>,
    ) -> Option<SceneRuntime> {
        let name = name.into();
        if self.current.as_deref() == Some(name.as_str()) {
            warn!(scene = name.as_str(), "active_scene_replaced");
            self.current = None;
        }
        debug!(scene = name.as_str(), "scene_registered");
        let runtime = SceneRuntime::new(name.clone(), scene);
        self.scenes.insert(name, runtime)
    }

    /// Switches the active scene. The outgoing scene exits before the incoming
    /// one loads, so a failed load leaves no active scene.
    pub fn load_scene(&mut self, name: &str) -> Result<(), EngineError> {
        if !self.scenes.contains_key(name) {
            warn!(scene = name, "scene_not_found");
            return Err(EngineError::SceneNotFound {
                name: name.to_string(),
            });
        }

        if let Some(previous) = self.current.take() {
            if let Some(scene) = self.scenes.get_mut(&previous) {
                scene.exit(&mut self.world);
            }
        }

        let Some(scene) = self.scenes.get_mut(name) else {
            return Err(EngineError::SceneNotFound {
                name: name.to_string(),
            });
        };
        if let Err(error) = scene.load(&mut self.world) {
            self.events.emit(&EngineEvent::Error(error.to_string()));
            return Err(error.into());
        }
        scene.enter(&mut self.world);
        self.current = Some(name.to_string());
        info!(scene = name, objects = self.object_count(), "active_scene_changed");
        self.events.emit(&EngineEvent::SceneLoaded {
            name: name.to_string(),
        });
        Ok(())
    }

    /// Fits the logical canvas into the container with a uniform scale.
    pub fn handle_resize(&mut self) -> f32 {
        let bounds = self.container.bounds();
        let scale_x = bounds.width / self.config.width as f32;
        let scale_y = bounds.height / self.config.height as f32;
        self.scale = scale_x.min(scale_y);
        info!(
            container_width = bounds.width,
            container_height = bounds.height,
            scale = self.scale,
            "engine_resized"
        );
        self.events.emit(&EngineEvent::Resize { scale: self.scale });
        self.scale
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == EngineState::Running
    }

    pub fn is_paused(&self) -> bool {
        self.state == EngineState::Paused
    }

    pub fn delta_time(&self) -> f32 {
        self.time.delta_seconds()
    }

    pub fn elapsed_time(&self) -> f64 {
        self.time.elapsed_seconds()
    }

    pub fn current_fps(&self) -> u32 {
        self.fps.fps()
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn pending_frame(&self) -> Option<FrameRequest> {
        self.pending_frame
    }

    pub fn current_scene_name(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn current_scene(&self) -> Option<&SceneRuntime> {
        self.current
            .as_deref()
            .and_then(|name| self.scenes.get(name))
    }

    pub fn current_scene_mut(&mut self) -> Option<&mut SceneRuntime> {
        let name = self.current.as_deref()?;
        self.scenes.get_mut(name)
    }

    pub fn scene(&self, name: &str) -> Option<&SceneRuntime> {
        self.scenes.get(name)
    }

    pub fn scene_mut(&mut self, name: &str) -> Option<&mut SceneRuntime> {
        self.scenes.get_mut(name)
    }

    /// Roots registered in the active scene.
    pub fn object_count(&self) -> usize {
        self.current_scene().map_or(0, SceneRuntime::object_count)
    }

    pub fn input(&self) -> &InputManager {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut InputManager {
        &mut self.input
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn scheduler(&self) -> &F {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut F {
        &mut self.scheduler
    }

    /// Metrics of the last completed FPS window.
    pub fn metrics(&self) -> LoopMetricsSnapshot {
        self.metrics
    }
}
