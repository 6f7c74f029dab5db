mod component;
mod config;
mod debug_overlay;
mod engine;
mod geometry;
mod input;
mod loop_runner;
mod metrics;
pub mod rendering;
mod scene;
mod signal;
mod time;
mod touch;
mod world;

pub use component::{Component, ComponentContext, ComponentKind, RenderContext};
pub use config::{EngineConfig, DEFAULT_HEIGHT, DEFAULT_WIDTH};
pub use engine::{
    Container, Engine, EngineError, EngineEvent, EngineState, FixedContainer, FrameRequest,
    FrameScheduler, ManualScheduler,
};
pub use geometry::{Bounds, Size, Vec2};
pub use input::{InputManager, InputState, PointerEvent, DRAG_THRESHOLD};
pub use loop_runner::{run_app, AppError, LoopConfig, RedrawScheduler, WindowContainer};
pub use metrics::{FpsCounter, FpsSample, LoopMetricsSnapshot};
pub use rendering::{Color, PixelSurface, RecordingSurface, Surface, SurfaceCall};
pub use scene::{
    LoadError, Scene, SceneContext, SceneError, SceneEvent, SceneId, SceneRuntime, SceneState,
};
pub use signal::{Signal, SubscriptionId};
pub use time::{Clock, ManualClock, MonotonicClock, Time};
pub use touch::{TouchHandler, TouchId, TouchPoint};
pub use world::{
    ComponentEvent, EntityId, GameObject, GameObjectConfig, HierarchyEvent, TransformEvent, World,
    WorldError, WorldEvents, DEFAULT_OBJECT_NAME,
};
