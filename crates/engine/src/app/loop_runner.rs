use std::sync::Arc;

use pixels::{Error as PixelsError, Pixels, SurfaceTexture};
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::{LogicalSize, PhysicalPosition};
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, MouseButton, TouchPhase, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowBuilder};

use super::engine::{Container, Engine, EngineError, FrameRequest, FrameScheduler};
use super::rendering::PixelSurface;
use super::touch::{TouchHandler, TouchId};
use super::{EngineConfig, Scene, Size, Vec2};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    pub window_title: String,
    pub engine: EngineConfig,
    pub initial_scene: String,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Kinetic".to_string(),
            engine: EngineConfig::default(),
            initial_scene: "main".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize pixel buffer: {0}")]
    CreatePixels(#[source] PixelsError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

/// Frame scheduler backed by window redraw requests. At most one request is
/// outstanding; the loop collects it when `RedrawRequested` arrives.
#[derive(Debug)]
pub struct RedrawScheduler {
    window: Arc<Window>,
    next_id: u64,
    pending: Option<FrameRequest>,
}

impl RedrawScheduler {
    pub fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            next_id: 0,
            pending: None,
        }
    }

    pub fn take_pending(&mut self) -> Option<FrameRequest> {
        self.pending.take()
    }
}

impl FrameScheduler for RedrawScheduler {
    fn request_frame(&mut self) -> FrameRequest {
        let request = FrameRequest::new(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.pending = Some(request);
        self.window.request_redraw();
        request
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        if self.pending == Some(request) {
            self.pending = None;
        }
    }

    // Redraws requested while the window was occluded may never arrive.
    fn renew_frame(&mut self, request: FrameRequest) {
        if self.pending == Some(request) {
            self.window.request_redraw();
        }
    }
}

/// The window's inner area, in physical pixels.
#[derive(Debug)]
pub struct WindowContainer {
    window: Arc<Window>,
}

impl WindowContainer {
    pub fn new(window: Arc<Window>) -> Self {
        Self { window }
    }
}

impl Container for WindowContainer {
    fn bounds(&self) -> Size {
        let size = self.window.inner_size();
        Size::new(size.width as f32, size.height as f32)
    }
}

type HostEngine = Engine<PixelSurface, RedrawScheduler>;

/// Opens a window sized to the logical canvas, registers `scenes`, loads
/// `config.initial_scene` and runs until the window closes.
pub fn run_app(config: LoopConfig, scenes: Vec<(String, Box<dyn Scene>)>) -> Result<(), AppError> {
    let width = config.engine.width;
    let height = config.engine.height;

    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(width as f64, height as f64))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let window_size = window.inner_size();
    let mut pixels = Pixels::new(
        width,
        height,
        SurfaceTexture::new(window_size.width, window_size.height, Arc::clone(&window)),
    )
    .map_err(AppError::CreatePixels)?;

    let mut engine: HostEngine = Engine::new(
        config.engine.clone(),
        Box::new(WindowContainer::new(Arc::clone(&window))),
        PixelSurface::new(width, height),
        RedrawScheduler::new(Arc::clone(&window)),
    );
    for (name, scene) in scenes {
        engine.add_scene(name, scene);
    }
    engine.initialize()?;
    engine.load_scene(&config.initial_scene)?;
    info!(
        title = config.window_title.as_str(),
        scene = config.initial_scene.as_str(),
        width,
        height,
        "app_started"
    );
    engine.start();

    let mut pointer = PointerRouter::default();
    event_loop.set_control_flow(ControlFlow::Wait);

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    if event.state == ElementState::Pressed
                        && matches!(event.physical_key, PhysicalKey::Code(KeyCode::Escape))
                    {
                        info!(reason = "escape_key", "shutdown_requested");
                        window_target.exit();
                    }
                }
                WindowEvent::Resized(size) => {
                    if size.width == 0 || size.height == 0 {
                        return;
                    }
                    if let Err(error) = pixels.resize_surface(size.width, size.height) {
                        warn!(error = %error, "surface_resize_failed");
                        window_target.exit();
                        return;
                    }
                    engine.handle_resize();
                }
                WindowEvent::Occluded(occluded) => {
                    if occluded {
                        engine.pause();
                    } else {
                        engine.resume();
                    }
                }
                WindowEvent::CursorMoved { position, .. } => {
                    let position = window_to_buffer(&pixels, position);
                    pointer.cursor_moved(engine.input_mut().touch_handler_mut(), position);
                }
                WindowEvent::MouseInput {
                    state,
                    button: MouseButton::Left,
                    ..
                } => {
                    pointer.mouse_button(engine.input_mut().touch_handler_mut(), state);
                }
                WindowEvent::Touch(touch) => {
                    let position = window_to_buffer(&pixels, touch.location);
                    pointer.touch(
                        engine.input_mut().touch_handler_mut(),
                        touch.id,
                        touch.phase,
                        position,
                    );
                }
                WindowEvent::RedrawRequested => {
                    if let Some(request) = engine.scheduler_mut().take_pending() {
                        engine.on_frame(request);
                    }
                    engine.surface().copy_into(pixels.frame_mut());
                    if let Err(error) = pixels.render() {
                        warn!(error = %error, "present_failed");
                        window_target.exit();
                    }
                }
                _ => {}
            },
            Event::LoopExiting => {
                engine.stop();
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

fn window_to_buffer(pixels: &Pixels<'_>, position: PhysicalPosition<f64>) -> Vec2 {
    let (x, y) = pixels
        .window_pos_to_pixel((position.x as f32, position.y as f32))
        .unwrap_or_else(|outside| pixels.clamp_pixel_pos(outside));
    Vec2::new(x as f32, y as f32)
}

/// Turns mouse and touch events into contact updates. The left mouse button
/// is contact 0; the first finger down while no finger holds contact 0 takes
/// it over, so touch alone can drive the primary pointer.
#[derive(Debug, Default)]
struct PointerRouter {
    cursor: Vec2,
    primary_finger: Option<u64>,
}

impl PointerRouter {
    fn cursor_moved(&mut self, touches: &mut TouchHandler, position: Vec2) {
        self.cursor = position;
        if self.primary_finger.is_none() {
            touches.move_to(TouchId::PRIMARY, position.x, position.y);
        }
    }

    fn mouse_button(&mut self, touches: &mut TouchHandler, state: ElementState) {
        if self.primary_finger.is_some() {
            return;
        }
        match state {
            ElementState::Pressed => touches.press(TouchId::PRIMARY, self.cursor.x, self.cursor.y),
            ElementState::Released => touches.release(TouchId::PRIMARY),
        }
    }

    fn touch(&mut self, touches: &mut TouchHandler, finger: u64, phase: TouchPhase, position: Vec2) {
        let id = self.route_finger(finger, phase);
        match phase {
            TouchPhase::Started => touches.press(id, position.x, position.y),
            TouchPhase::Moved => touches.move_to(id, position.x, position.y),
            TouchPhase::Ended | TouchPhase::Cancelled => touches.release(id),
        }
    }

    fn route_finger(&mut self, finger: u64, phase: TouchPhase) -> TouchId {
        match self.primary_finger {
            Some(primary) if primary == finger => {
                if matches!(phase, TouchPhase::Ended | TouchPhase::Cancelled) {
                    self.primary_finger = None;
                }
                TouchId::PRIMARY
            }
            None if phase == TouchPhase::Started => {
                self.primary_finger = Some(finger);
                TouchId::PRIMARY
            }
            _ => TouchId(finger.saturating_add(1)),
        }
    }
}
