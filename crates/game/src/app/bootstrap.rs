use std::fs;

use kinetic_engine::{EngineConfig, LoopConfig, Scene};
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::gameplay::{self, DemoConfig};

const CONFIG_ENV_VAR: &str = "KINETIC_CONFIG";
const DEBUG_ENV_VAR: &str = "KINETIC_DEBUG";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub(crate) struct GameConfig {
    pub(crate) window_title: String,
    pub(crate) engine: EngineConfig,
    pub(crate) demo: DemoConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            window_title: "Kinetic Drag Box".to_string(),
            engine: EngineConfig {
                debug: true,
                ..EngineConfig::default()
            },
            demo: DemoConfig::default(),
        }
    }
}

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scenes: Vec<(String, Box<dyn Scene>)>,
}

pub(crate) fn build_app() -> AppWiring {
    init_tracing();
    info!("=== Kinetic Startup ===");

    let mut config = load_game_config(std::env::var(CONFIG_ENV_VAR).ok().as_deref());
    if let Some(debug) = parse_debug_override(std::env::var(DEBUG_ENV_VAR).ok().as_deref()) {
        config.engine.debug = debug;
    }
    info!(
        width = config.engine.width,
        height = config.engine.height,
        debug = config.engine.debug,
        "game_config"
    );

    wiring_from_config(config)
}

fn wiring_from_config(config: GameConfig) -> AppWiring {
    let scenes = gameplay::build_scenes(&config.demo);
    AppWiring {
        config: LoopConfig {
            window_title: config.window_title,
            engine: config.engine,
            initial_scene: gameplay::DEMO_SCENE_NAME.to_string(),
        },
        scenes,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn load_game_config(path: Option<&str>) -> GameConfig {
    let Some(path) = path else {
        return GameConfig::default();
    };
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) => {
            warn!(
                env_var = CONFIG_ENV_VAR,
                path,
                error = %error,
                "unable to read game config; falling back to defaults"
            );
            return GameConfig::default();
        }
    };
    match parse_game_config(&raw) {
        Ok(config) => {
            info!(path, "game_config_loaded");
            config
        }
        Err(error) => {
            warn!(
                env_var = CONFIG_ENV_VAR,
                path,
                error = error.as_str(),
                "invalid game config; falling back to defaults"
            );
            GameConfig::default()
        }
    }
}

fn parse_game_config(raw: &str) -> Result<GameConfig, String> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    match serde_path_to_error::deserialize::<_, GameConfig>(&mut deserializer) {
        Ok(config) => Ok(config),
        Err(error) => {
            let path = error.path().to_string();
            let source = error.into_inner();
            if path.is_empty() || path == "." {
                Err(format!("parse game config: {source}"))
            } else {
                Err(format!("parse game config at {path}: {source}"))
            }
        }
    }
}

fn parse_debug_override(raw: Option<&str>) -> Option<bool> {
    let value = raw?;
    match value.trim() {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        other => {
            warn!(
                env_var = DEBUG_ENV_VAR,
                value = other,
                "invalid debug flag; keeping config value"
            );
            None
        }
    }
}
