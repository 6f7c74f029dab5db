mod components;

use kinetic_engine::{Color, EntityId, GameObjectConfig, LoadError, Scene, SceneContext, World};
use serde::Deserialize;
use tracing::{info, warn};

pub(crate) use components::{BoxRenderer, Draggable};

pub(crate) const DEMO_SCENE_NAME: &str = "game";
const BOX_NAME: &str = "draggableBox";
const NORMAL_COLOR: Color = Color::rgb(0x34, 0x98, 0xdb);
const HOVER_COLOR: Color = Color::rgb(0x29, 0x80, 0xb9);

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub(crate) struct DemoConfig {
    pub(crate) x: f32,
    pub(crate) y: f32,
    pub(crate) width: f32,
    pub(crate) height: f32,
    pub(crate) color: String,
    pub(crate) hover_color: String,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            x: 400.0,
            y: 300.0,
            width: 100.0,
            height: 100.0,
            color: "#3498db".to_string(),
            hover_color: "#2980b9".to_string(),
        }
    }
}

pub(crate) fn build_scenes(config: &DemoConfig) -> Vec<(String, Box<dyn Scene>)> {
    vec![(
        DEMO_SCENE_NAME.to_string(),
        Box::new(DragBoxScene::new(config.clone())) as Box<dyn Scene>,
    )]
}

fn parse_color_or(raw: &str, fallback: Color, field: &'static str) -> Color {
    match raw.parse::<Color>() {
        Ok(color) => color,
        Err(error) => {
            warn!(field, error = %error, "invalid demo color; using default");
            fallback
        }
    }
}

/// One draggable box in the middle of the canvas.
pub(crate) struct DragBoxScene {
    config: DemoConfig,
}

impl DragBoxScene {
    pub(crate) fn new(config: DemoConfig) -> Self {
        Self { config }
    }
}

impl Scene for DragBoxScene {
    fn on_load(&mut self, ctx: &mut SceneContext<'_>) -> Result<(), LoadError> {
        let renderer = BoxRenderer::new(
            parse_color_or(&self.config.color, NORMAL_COLOR, "color"),
            parse_color_or(&self.config.hover_color, HOVER_COLOR, "hover_color"),
        );
        let entity = ctx.spawn_object(
            GameObjectConfig::named(BOX_NAME)
                .at(self.config.x, self.config.y)
                .sized(self.config.width, self.config.height),
        );
        let world = ctx.world_mut();
        world.add_component(entity, renderer)?;
        world.add_component(entity, Draggable::default())?;
        info!(
            scene = DEMO_SCENE_NAME,
            x = self.config.x,
            y = self.config.y,
            "drag_box_spawned"
        );
        Ok(())
    }

    fn on_unload(&mut self, world: &mut World, released: &[EntityId]) {
        for id in released {
            world.despawn_recursive(*id);
        }
    }
}

#[cfg(test)]
mod tests;
