use anyhow::{anyhow, bail, Context, Result};
use clap::ValueEnum;
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::camera::{strategy, StrategyKind, DEFAULT_COOLDOWN_MS};
use crate::models::DEFAULT_VOLUME_ML;
use crate::timer::DEFAULT_INTERVAL_SECS;

pub const SETTINGS_FILE_NAME: &str = "settings.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CameraSettings {
    pub enabled: bool,
    /// Detection feed used when camera detection is on: a path or `-` for stdin.
    pub feed: Option<String>,
    pub strategy: StrategyKind,
    pub tilt_threshold: f64,
    pub bottle_min_score: f64,
    pub cooldown_ms: i64,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            feed: None,
            strategy: StrategyKind::HeadTilt,
            tilt_threshold: strategy::DEFAULT_TILT_THRESHOLD,
            bottle_min_score: strategy::DEFAULT_BOTTLE_MIN_SCORE,
            cooldown_ms: DEFAULT_COOLDOWN_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct UserSettings {
    pub timer_interval_secs: f64,
    pub volume_estimate_ml: u32,
    pub camera: CameraSettings,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            timer_interval_secs: DEFAULT_INTERVAL_SECS,
            volume_estimate_ml: DEFAULT_VOLUME_ML,
            camera: CameraSettings::default(),
        }
    }
}

impl UserSettings {
    pub const KEYS: [&'static str; 8] = [
        "timer-interval",
        "volume",
        "camera.enabled",
        "camera.feed",
        "camera.strategy",
        "camera.tilt-threshold",
        "camera.bottle-min-score",
        "camera.cooldown-ms",
    ];

    /// Set one value by its CLI key.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "timer-interval" => {
                let secs = parse_value::<f64>(key, value)?;
                if !(secs.is_finite() && secs > 0.0) {
                    bail!("timer-interval must be a positive number of seconds");
                }
                self.timer_interval_secs = secs;
            }
            "volume" => {
                let ml = parse_value::<u32>(key, value)?;
                if ml == 0 {
                    bail!("volume must be at least 1 ml");
                }
                self.volume_estimate_ml = ml;
            }
            "camera.enabled" => self.camera.enabled = parse_value::<bool>(key, value)?,
            "camera.feed" => {
                self.camera.feed = match value.trim() {
                    "" | "none" => None,
                    feed => Some(feed.to_string()),
                }
            }
            "camera.strategy" => {
                self.camera.strategy = StrategyKind::from_str(value, true)
                    .map_err(|err| anyhow!("invalid camera.strategy '{value}': {err}"))?;
            }
            "camera.tilt-threshold" => {
                self.camera.tilt_threshold = parse_value::<f64>(key, value)?
            }
            "camera.bottle-min-score" => {
                self.camera.bottle_min_score = parse_value::<f64>(key, value)?
            }
            "camera.cooldown-ms" => {
                let cooldown = parse_value::<i64>(key, value)?;
                if cooldown < 0 {
                    bail!("camera.cooldown-ms cannot be negative");
                }
                self.camera.cooldown_ms = cooldown;
            }
            other => bail!(
                "unknown setting '{other}' (expected one of: {})",
                Self::KEYS.join(", ")
            ),
        }
        Ok(())
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|err| anyhow!("invalid value '{value}' for {key}: {err}"))
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!(
                    "Ignoring unreadable settings at {}: {err}",
                    path.display()
                );
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn current(&self) -> UserSettings {
        self.read().clone()
    }

    /// Apply `change` and persist the result.
    pub fn update<F>(&self, change: F) -> Result<UserSettings>
    where
        F: FnOnce(&mut UserSettings) -> Result<()>,
    {
        let mut guard = self.write();
        let mut next = guard.clone();
        change(&mut next)?;
        self.persist(&next)?;
        *guard = next.clone();
        Ok(next)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, UserSettings> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, UserSettings> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
