use serde::Deserialize;

pub const DEFAULT_WIDTH: u32 = 800;
pub const DEFAULT_HEIGHT: u32 = 600;

/// Logical canvas size and the debug overlay toggle.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub width: u32,
    pub height: u32,
    pub debug: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            debug: false,
        }
    }
}

impl EngineConfig {
    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err(format!(
                "logical size must be non-zero, got {}x{}",
                self.width, self.height
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_800_by_600_without_overlay() {
        let config = EngineConfig::default();
        assert_eq!((config.width, config.height, config.debug), (800, 600, false));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_dimension_is_rejected() {
        let config = EngineConfig {
            width: 0,
            ..EngineConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err("logical size must be non-zero, got 0x600".to_string())
        );
    }
}
