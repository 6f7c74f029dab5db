pub mod app;

pub use app::{
    run_app, AppError, Bounds, Clock, Color, Component, ComponentContext, ComponentEvent,
    ComponentKind, Container, Engine, EngineConfig, EngineError, EngineEvent, EngineState,
    EntityId, FixedContainer, FpsCounter, FrameRequest, FrameScheduler, GameObject,
    GameObjectConfig, HierarchyEvent, InputManager, InputState, LoadError, LoopConfig,
    LoopMetricsSnapshot, ManualClock, ManualScheduler, MonotonicClock,
    PixelSurface, PointerEvent, RecordingSurface, RenderContext, Scene, SceneContext, SceneError,
    SceneEvent, SceneId, SceneRuntime, SceneState, Signal, Size, SubscriptionId, Surface,
    SurfaceCall, Time, TouchHandler, TouchId, TouchPoint, TransformEvent, Vec2, World,
    WorldError, WorldEvents, DRAG_THRESHOLD,
};
