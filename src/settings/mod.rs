//! Display preferences.
//!
//! Three toggles persisted as one JSON object, with the camelCase key names
//! the dashboard has always written. Loading merges whatever record exists
//! over hard-coded defaults field-by-field, so partial or stale records never
//! fail; saving happens after every mutation.

use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerLayout {
    #[default]
    Classic,
    Cinematic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub show_lyrics: bool,
    /// Opacity of the dark overlay, 0..=100.
    pub background_darkness: u8,
    pub player_layout: PlayerLayout,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            show_lyrics: true,
            background_darkness: 0,
            player_layout: PlayerLayout::Classic,
        }
    }
}

/// A possibly partial persisted record; unknown fields are ignored, known
/// fields are optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PartialSettings {
    show_lyrics: Option<bool>,
    background_darkness: Option<u8>,
    player_layout: Option<PlayerLayout>,
}

impl Settings {
    fn merged(partial: PartialSettings) -> Self {
        let defaults = Self::default();
        Self {
            show_lyrics: partial.show_lyrics.unwrap_or(defaults.show_lyrics),
            background_darkness: partial
                .background_darkness
                .unwrap_or(defaults.background_darkness)
                .min(100),
            player_layout: partial.player_layout.unwrap_or(defaults.player_layout),
        }
    }

    pub fn set_show_lyrics(&mut self, on: bool) {
        self.show_lyrics = on;
    }

    pub fn set_darkness(&mut self, value: u8) {
        self.background_darkness = value.min(100);
    }

    pub fn set_layout(&mut self, layout: PlayerLayout) {
        self.player_layout = layout;
    }
}

pub fn default_settings_path() -> anyhow::Result<PathBuf> {
    let proj = ProjectDirs::from("dev", "standby", "standby").context("ProjectDirs unavailable")?;
    Ok(proj.config_dir().join("settings.json"))
}

/// Load settings; any missing or malformed record degrades to defaults.
pub fn load(path: &Path) -> Settings {
    let Ok(raw) = fs::read_to_string(path) else {
        return Settings::default();
    };
    match serde_json::from_str::<PartialSettings>(&raw) {
        Ok(partial) => Settings::merged(partial),
        Err(e) => {
            tracing::warn!("unreadable settings record, using defaults: {e}");
            Settings::default()
        }
    }
}

pub fn save(settings: &Settings, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create dir {}", parent.display()))?;
    }
    let raw = serde_json::to_string_pretty(settings).context("serialize settings")?;
    fs::write(path, raw).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_record_merges_over_defaults() {
        let partial: PartialSettings = serde_json::from_str(r#"{"showLyrics": false}"#).unwrap();
        let s = Settings::merged(partial);
        assert!(!s.show_lyrics);
        assert_eq!(s.background_darkness, 0);
        assert_eq!(s.player_layout, PlayerLayout::Classic);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let partial: PartialSettings =
            serde_json::from_str(r#"{"playerLayout": "cinematic", "legacyFlag": 1}"#).unwrap();
        let s = Settings::merged(partial);
        assert_eq!(s.player_layout, PlayerLayout::Cinematic);
    }

    #[test]
    fn darkness_is_clamped() {
        let partial: PartialSettings =
            serde_json::from_str(r#"{"backgroundDarkness": 250}"#).unwrap();
        let s = Settings::merged(partial);
        assert_eq!(s.background_darkness, 100);

        let mut s = Settings::default();
        s.set_darkness(180);
        assert_eq!(s.background_darkness, 100);
    }

    #[test]
    fn round_trips_with_camel_case_keys() {
        let mut s = Settings::default();
        s.set_layout(PlayerLayout::Cinematic);
        s.set_darkness(40);
        let raw = serde_json::to_string(&s).unwrap();
        assert!(raw.contains("showLyrics"));
        assert!(raw.contains("backgroundDarkness"));
        assert!(raw.contains("\"cinematic\""));

        let back = Settings::merged(serde_json::from_str(&raw).unwrap());
        assert_eq!(back, s);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let s = load(Path::new("/nonexistent/standby/settings.json"));
        assert_eq!(s, Settings::default());
    }
}
