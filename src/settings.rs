use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::config::{FRAMEBUFFER_HEIGHT, WINDOW_HEIGHT, WINDOW_WIDTH};

/// Engine settings overlayed from `settings.json` next to the binary.
/// Missing file or bad values fall back to defaults, never abort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default)]
    pub resolution: Resolution,
    #[serde(default = "EngineSettings::default_shadow_map_size")]
    pub shadow_map_size: u32,
    /// Startup swap interval: 0 = no vsync, 1 = vsync, 2 = adaptive.
    #[serde(default)]
    pub swap_interval: u32,
    #[serde(default = "EngineSettings::default_font_path")]
    pub font_path: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            resolution: Resolution::default(),
            shadow_map_size: Self::default_shadow_map_size(),
            swap_interval: 0,
            font_path: Self::default_font_path(),
        }
    }
}

impl EngineSettings {
    pub fn load() -> Self {
        Self::load_from_path("settings.json")
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Self {
        use std::fs;

        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<EngineSettings>(&contents) {
                Ok(settings) => {
                    info!("Loaded settings from {:?}", path);
                    settings.validate()
                }
                Err(err) => {
                    warn!(
                        "Failed to parse {:?} ({}). Falling back to default settings.",
                        path, err
                    );
                    EngineSettings::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!("Settings file {:?} not found. Using default settings.", path);
                EngineSettings::default()
            }
            Err(err) => {
                warn!(
                    "Failed to read {:?} ({}). Falling back to default settings.",
                    path, err
                );
                EngineSettings::default()
            }
        }
    }

    fn validate(mut self) -> Self {
        if self.resolution.width == 0 || self.resolution.height == 0 {
            warn!("Resolution must be greater than zero. Using default resolution.");
            self.resolution = Resolution::default();
        }

        if self.shadow_map_size == 0 {
            warn!("Shadow map size must be greater than zero. Using default value.");
            self.shadow_map_size = Self::default_shadow_map_size();
        }

        if self.swap_interval > 2 {
            warn!("Swap interval must be 0, 1 or 2. Using 0 instead.");
            self.swap_interval = 0;
        }

        self
    }

    /// Index into the present mode cycle matching the configured swap
    /// interval.
    pub fn present_mode_index(&self) -> usize {
        self.swap_interval.min(2) as usize
    }

    const fn default_shadow_map_size() -> u32 {
        FRAMEBUFFER_HEIGHT
    }

    fn default_font_path() -> String {
        "assets/font.ttf".to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            width: WINDOW_WIDTH,
            height: WINDOW_HEIGHT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_replaces_invalid_values_with_defaults() {
        let validated = EngineSettings {
            resolution: Resolution {
                width: 0,
                height: 0,
            },
            shadow_map_size: 0,
            swap_interval: 7,
            font_path: "x.ttf".to_string(),
        }
        .validate();

        assert_eq!(validated.resolution.width, WINDOW_WIDTH);
        assert_eq!(validated.resolution.height, WINDOW_HEIGHT);
        assert_eq!(
            validated.shadow_map_size,
            EngineSettings::default_shadow_map_size()
        );
        assert_eq!(validated.swap_interval, 0);
        assert_eq!(validated.font_path, "x.ttf");
    }

    #[test]
    fn validate_preserves_valid_values() {
        let valid = EngineSettings {
            resolution: Resolution {
                width: 1920,
                height: 1080,
            },
            shadow_map_size: 2048,
            swap_interval: 1,
            font_path: "assets/font.ttf".to_string(),
        };
        let validated = valid.clone().validate();
        assert_eq!(validated.resolution.width, 1920);
        assert_eq!(validated.shadow_map_size, 2048);
        assert_eq!(validated.swap_interval, 1);
    }

    #[test]
    fn swap_interval_maps_to_cycle_index() {
        let mut settings = EngineSettings::default();
        assert_eq!(settings.present_mode_index(), 0);
        settings.swap_interval = 1;
        assert_eq!(settings.present_mode_index(), 1);
        settings.swap_interval = 2;
        assert_eq!(settings.present_mode_index(), 2);
    }

    #[test]
    fn missing_file_uses_defaults() {
        let settings = EngineSettings::load_from_path("does-not-exist.json");
        assert_eq!(settings.resolution.width, WINDOW_WIDTH);
        assert_eq!(settings.swap_interval, 0);
    }

    #[test]
    fn partial_json_fills_missing_fields() {
        let settings: EngineSettings =
            serde_json::from_str(r#"{"swap_interval": 1}"#).unwrap();
        assert_eq!(settings.swap_interval, 1);
        assert_eq!(settings.resolution.width, WINDOW_WIDTH);
        assert_eq!(
            settings.shadow_map_size,
            EngineSettings::default_shadow_map_size()
        );
    }
}
