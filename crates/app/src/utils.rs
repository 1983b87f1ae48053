//! Settings persistence helpers.

use shared::settings::AppSettings;
use std::fs;
use std::path::PathBuf;

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("code-companion").join("settings.json"))
}

pub fn load_settings_or_default() -> AppSettings {
    let Some(path) = config_path() else {
        return AppSettings::default();
    };
    match fs::read(&path) {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("ignoring malformed settings file {:?}: {}", path, e);
                AppSettings::default()
            }
        },
        Err(_) => AppSettings::default(),
    }
}

pub fn save_settings(settings: &AppSettings) {
    let Some(path) = config_path() else { return };
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    if let Ok(bytes) = serde_json::to_vec_pretty(settings) {
        if let Err(e) = fs::write(&path, bytes) {
            tracing::warn!("failed to save settings to {:?}: {}", path, e);
        }
    }
}
