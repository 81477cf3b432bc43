use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use execstats_core::{DataView, Direction, Span};
use serde::{Deserialize, Serialize};

use super::themes::ThemeName;

const MIN_REFRESH_SECS: u64 = 10;
const MAX_REFRESH_SECS: u64 = 600;

/// Dashboard preferences remembered between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub theme: String,
    pub auto_refresh_interval: u64,
    #[serde(default)]
    pub view: Option<String>,
    #[serde(default)]
    pub interval: Option<String>,
    #[serde(default)]
    pub direction: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: "green".to_string(),
            auto_refresh_interval: 0,
            view: None,
            interval: None,
            direction: None,
        }
    }
}

impl Settings {
    /// `<config dir>/execstats/settings.json`
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("execstats").join("settings.json"))
    }

    pub fn load() -> Self {
        Self::path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default()
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn theme_name(&self) -> ThemeName {
        self.theme.parse().unwrap_or(ThemeName::Green)
    }

    pub fn set_theme(&mut self, theme: ThemeName) {
        self.theme = theme.as_str().to_string();
    }

    pub fn view(&self) -> DataView {
        parse_or_default(self.view.as_deref())
    }

    pub fn span(&self) -> Span {
        parse_or_default(self.interval.as_deref())
    }

    pub fn direction(&self) -> Direction {
        parse_or_default(self.direction.as_deref())
    }

    pub fn remember(&mut self, view: DataView, span: Span, direction: Direction) {
        self.view = Some(view.as_str().to_string());
        self.interval = Some(span.as_str().to_string());
        self.direction = Some(direction.as_str().to_string());
    }

    /// Seconds between automatic refreshes, 0 when never set.
    pub fn refresh_secs(&self) -> u64 {
        match self.auto_refresh_interval {
            0 => 0,
            secs => clamp_refresh(secs),
        }
    }
}

pub fn clamp_refresh(secs: u64) -> u64 {
    secs.clamp(MIN_REFRESH_SECS, MAX_REFRESH_SECS)
}

fn parse_or_default<T: std::str::FromStr + Default>(value: Option<&str>) -> T {
    value.and_then(|v| v.parse().ok()).unwrap_or_default()
}
