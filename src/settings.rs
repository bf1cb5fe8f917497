//! Reader settings.
//!
//! One explicit struct owned by the application and handed to the reading
//! session; nothing here is global.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::pacing::PacingConfig;

/// Where a scrolled-to word lands in the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollAlignment {
    Start,
    #[default]
    Center,
    End,
    Nearest,
}

/// User-tunable reading settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base delay between word advances.
    pub pace_ms: u64,
    /// Words highlighted and advanced together.
    pub word_group_size: usize,
    pub scroll_alignment: ScrollAlignment,
    /// When off, playback never starts; navigation still works.
    pub sequential_reading_enabled: bool,
    /// Render the leading part of every word in bold.
    pub fast_reading_font: bool,
    /// Share of each word's characters rendered bold.
    pub fast_reading_fraction: f32,
    pub font_size_px: u32,
    pub dark_mode: bool,
    pub eye_saver_mode: bool,
    /// Groups moved per manual step.
    pub manual_step_multiplier: usize,
    /// Groups moved per tick while a continuous move is held.
    pub continuous_step_multiplier: usize,
    pub pacing: PacingConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pace_ms: 200,
            word_group_size: 1,
            scroll_alignment: ScrollAlignment::Center,
            sequential_reading_enabled: true,
            fast_reading_font: false,
            fast_reading_fraction: 0.45,
            font_size_px: 16,
            dark_mode: false,
            eye_saver_mode: false,
            manual_step_multiplier: 1,
            continuous_step_multiplier: 5,
            pacing: PacingConfig::default(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file; a missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&data)?;
        Ok(settings.normalized())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path, data)?;
        Ok(())
    }

    /// Clamp values that would stall or break navigation.
    pub fn normalized(mut self) -> Self {
        self.word_group_size = self.word_group_size.max(1);
        self.manual_step_multiplier = self.manual_step_multiplier.max(1);
        self.continuous_step_multiplier = self.continuous_step_multiplier.max(1);
        self.fast_reading_fraction = if self.fast_reading_fraction.is_finite() {
            self.fast_reading_fraction.clamp(0.0, 1.0)
        } else {
            Self::default().fast_reading_fraction
        };
        self
    }

    /// Set the base pace from a words-per-minute figure.
    pub fn with_wpm(mut self, wpm: u32) -> Self {
        self.pace_ms = 60_000 / u64::from(wpm.max(1));
        self
    }

    pub fn wpm(&self) -> u32 {
        (60_000 / self.pace_ms.max(1)) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.pace_ms, 200);
        assert_eq!(settings.word_group_size, 1);
        assert_eq!(settings.scroll_alignment, ScrollAlignment::Center);
        assert!(settings.sequential_reading_enabled);
        assert_eq!(settings.fast_reading_fraction, 0.45);
        assert_eq!(settings.pacing.paragraph_ms, 1000);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"word_group_size": 3, "scroll_alignment": "start"}"#)
                .expect("parse");
        assert_eq!(settings.word_group_size, 3);
        assert_eq!(settings.scroll_alignment, ScrollAlignment::Start);
        assert_eq!(settings.pace_ms, 200);
    }

    #[test]
    fn test_normalized_clamps() {
        let settings = Settings {
            word_group_size: 0,
            fast_reading_fraction: 3.0,
            ..Settings::default()
        }
        .normalized();
        assert_eq!(settings.word_group_size, 1);
        assert_eq!(settings.fast_reading_fraction, 1.0);
    }

    #[test]
    fn test_wpm() {
        let settings = Settings::default().with_wpm(300);
        assert_eq!(settings.pace_ms, 200);
        assert_eq!(settings.wpm(), 300);
    }

    #[test]
    fn test_load_missing_and_save() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        assert_eq!(Settings::load(&path).expect("load"), Settings::default());

        let custom = Settings {
            dark_mode: true,
            ..Settings::default()
        };
        custom.save(&path).expect("save");
        assert_eq!(Settings::load(&path).expect("load"), custom);
    }
}
