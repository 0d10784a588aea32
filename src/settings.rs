//! User settings stored as settings.json in the app data directory

use crate::constants::DEFAULT_SERVER_URL;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Window geometry
    pub window_x: Option<f32>,
    pub window_y: Option<f32>,
    pub window_w: Option<f32>,
    pub window_h: Option<f32>,

    // Classifier backend
    pub server_url: String,

    // Last directory an image was picked from
    pub last_image_dir: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            window_x: None,
            window_y: None,
            window_w: None,
            window_h: None,
            server_url: DEFAULT_SERVER_URL.to_string(),
            last_image_dir: None,
        }
    }
}

impl Settings {
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join("settings.json");
        match std::fs::read_to_string(&path) {
            Ok(s) => match serde_json::from_str(&s) {
                Ok(settings) => {
                    debug!(path = %path.display(), "Settings loaded");
                    settings
                }
                Err(e) => {
                    warn!(error = %e, "Failed to parse settings, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                debug!("No settings file found, using defaults");
                Self::default()
            }
        }
    }

    pub fn save(&self, data_dir: &Path) {
        let path = data_dir.join("settings.json");
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    warn!(error = %e, "Failed to save settings");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize settings"),
        }
    }

    pub fn last_image_dir_or_default(&self) -> PathBuf {
        self.last_image_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| dirs::picture_dir().unwrap_or_else(|| PathBuf::from(".")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("gradcam-classifier-test-{}", tag));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = temp_dir("missing");
        std::fs::remove_file(dir.join("settings.json")).ok();
        let s = Settings::load(&dir);
        assert_eq!(s.server_url, DEFAULT_SERVER_URL);
        assert!(s.window_w.is_none());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = temp_dir("roundtrip");
        let mut s = Settings::default();
        s.server_url = "http://10.0.0.5:8080".to_string();
        s.window_w = Some(900.0);
        s.save(&dir);

        let loaded = Settings::load(&dir);
        assert_eq!(loaded.server_url, "http://10.0.0.5:8080");
        assert_eq!(loaded.window_w, Some(900.0));
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = temp_dir("corrupt");
        std::fs::write(dir.join("settings.json"), "{not json").unwrap();
        let s = Settings::load(&dir);
        assert_eq!(s.server_url, DEFAULT_SERVER_URL);
    }
}
