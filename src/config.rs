use directories::ProjectDirs;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{Result, RingsideError};
use crate::session::Phase;
use crate::util::{parse_float_lossy, parse_int_lossy, round_tenth};

pub const MAX_ROUND_MINUTES: u32 = 99;
pub const MAX_ROUND_SECONDS: u32 = 59;
pub const MAX_REST_MINUTES: f64 = 99.9;
/// Rest is edited in tenths of a minute.
pub const REST_STEP_MINUTES: f64 = 0.1;
/// Round lengths offered as one-key presets, in minutes.
pub const PRESET_MINUTES: [u32; 6] = [4, 5, 6, 7, 8, 10];

/// Round and rest durations. Values are always within bounds once they
/// have passed through any constructor or edit in this module.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Configuration {
    pub round_minutes: u32,
    pub round_seconds: u32,
    pub rest_minutes: f64,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            round_minutes: 5,
            round_seconds: 0,
            rest_minutes: 1.0,
        }
    }
}

/// An editable setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum ConfigField {
    RoundMinutes,
    RoundSeconds,
    RestMinutes,
}

impl ConfigField {
    pub const ALL: [ConfigField; 3] = [
        ConfigField::RoundMinutes,
        ConfigField::RoundSeconds,
        ConfigField::RestMinutes,
    ];

    /// The phase whose duration this field controls.
    pub fn phase(self) -> Phase {
        match self {
            ConfigField::RoundMinutes | ConfigField::RoundSeconds => Phase::Round,
            ConfigField::RestMinutes => Phase::Rest,
        }
    }

    pub fn next(self) -> Self {
        match self {
            ConfigField::RoundMinutes => ConfigField::RoundSeconds,
            ConfigField::RoundSeconds => ConfigField::RestMinutes,
            ConfigField::RestMinutes => ConfigField::RoundMinutes,
        }
    }
}

/// Direction of a single-step edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Increment,
    Decrement,
}

impl Configuration {
    pub fn new(round_minutes: u32, round_seconds: u32, rest_minutes: f64) -> Self {
        Self {
            round_minutes,
            round_seconds,
            rest_minutes,
        }
        .clamped()
    }

    /// Builds a configuration from a round length in seconds.
    pub fn from_round_seconds(total: u32, rest_minutes: f64) -> Self {
        let total = total.min(MAX_ROUND_MINUTES * 60 + MAX_ROUND_SECONDS);
        Self::new(total / 60, total % 60, rest_minutes)
    }

    /// Brings every field back within bounds.
    pub fn clamped(self) -> Self {
        Self {
            round_minutes: self.round_minutes.min(MAX_ROUND_MINUTES),
            round_seconds: self.round_seconds.min(MAX_ROUND_SECONDS),
            rest_minutes: clamp_rest(self.rest_minutes),
        }
    }

    pub fn round_duration(&self) -> u32 {
        self.round_minutes * 60 + self.round_seconds
    }

    pub fn rest_duration(&self) -> u32 {
        (self.rest_minutes * 60.0).round() as u32
    }

    pub fn duration_for(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Round => self.round_duration(),
            Phase::Rest => self.rest_duration(),
        }
    }

    /// Applies a single step to `field`, clamping at the bounds.
    pub fn stepped(self, field: ConfigField, step: Step) -> Self {
        let mut next = self;
        match field {
            ConfigField::RoundMinutes => {
                next.round_minutes = step_int(self.round_minutes, step, MAX_ROUND_MINUTES);
            }
            ConfigField::RoundSeconds => {
                next.round_seconds = step_int(self.round_seconds, step, MAX_ROUND_SECONDS);
            }
            ConfigField::RestMinutes => {
                let delta = match step {
                    Step::Increment => REST_STEP_MINUTES,
                    Step::Decrement => -REST_STEP_MINUTES,
                };
                next.rest_minutes = clamp_rest(self.rest_minutes + delta);
            }
        }
        next
    }

    /// Replaces `field` with the value typed into a text box. Malformed text
    /// reads as 0 and out-of-range numbers clamp to the nearest bound.
    pub fn with_text(self, field: ConfigField, raw: &str) -> Self {
        let mut next = self;
        match field {
            ConfigField::RoundMinutes => {
                next.round_minutes = clamp_int(parse_int_lossy(raw), MAX_ROUND_MINUTES);
            }
            ConfigField::RoundSeconds => {
                next.round_seconds = clamp_int(parse_int_lossy(raw), MAX_ROUND_SECONDS);
            }
            ConfigField::RestMinutes => {
                // `30s` is read as seconds, anything else as minutes.
                let minutes = if raw.trim_end().ends_with('s') {
                    parse_int_lossy(raw) as f64 / 60.0
                } else {
                    parse_float_lossy(raw)
                };
                next.rest_minutes = clamp_rest(minutes);
            }
        }
        next
    }

    /// Sets the round to a whole number of minutes.
    pub fn with_preset(self, minutes: u32) -> Self {
        Self {
            round_minutes: minutes.min(MAX_ROUND_MINUTES),
            round_seconds: 0,
            ..self
        }
    }

    /// Display text for `field` as it would appear in its edit box.
    pub fn field_text(&self, field: ConfigField) -> String {
        match field {
            ConfigField::RoundMinutes => format!("{:02}", self.round_minutes),
            ConfigField::RoundSeconds => format!("{:02}", self.round_seconds),
            ConfigField::RestMinutes if self.rest_minutes > 0.0 && self.rest_minutes < 1.0 => {
                format!("{}s", self.rest_duration())
            }
            ConfigField::RestMinutes => format!("{:.1}m", self.rest_minutes),
        }
    }
}

fn step_int(value: u32, step: Step, max: u32) -> u32 {
    match step {
        Step::Increment => (value + 1).min(max),
        Step::Decrement => value.saturating_sub(1),
    }
}

fn clamp_int(value: i64, max: u32) -> u32 {
    value.clamp(0, i64::from(max)) as u32
}

fn clamp_rest(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    round_tenth(value).clamp(0.0, MAX_REST_MINUTES)
}

/// On-disk record. The three fields live under one named key.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    timer_settings: Configuration,
}

/// Source and sink of the timer configuration.
///
/// `load` never fails: a missing or unreadable record yields defaults, and
/// whatever is returned has already been clamped.
pub trait ConfigStore {
    fn load(&self) -> Configuration;
    fn save(&mut self, cfg: &Configuration) -> Result<()>;

    /// Re-reads the record after a change notification. `None` means there
    /// is no usable record right now and the caller keeps what it has.
    fn reload(&self) -> Option<Configuration> {
        Some(self.load())
    }
}

/// Keeps the configuration in memory only.
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigStore {
    current: Configuration,
    saves: usize,
}

impl MemoryConfigStore {
    pub fn new(cfg: Configuration) -> Self {
        Self {
            current: cfg.clamped(),
            saves: 0,
        }
    }

    /// Number of successful saves so far.
    pub fn saves(&self) -> usize {
        self.saves
    }

    /// Replaces the stored record without going through the engine, the way
    /// an outside editor would.
    pub fn replace(&mut self, cfg: Configuration) {
        self.current = cfg.clamped();
    }
}

impl ConfigStore for MemoryConfigStore {
    fn load(&self) -> Configuration {
        self.current
    }

    fn save(&mut self, cfg: &Configuration) -> Result<()> {
        self.current = cfg.clamped();
        self.saves += 1;
        Ok(())
    }
}

/// JSON settings file in the platform config directory.
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "ringside") {
            pd.config_dir().join("settings.json")
        } else {
            PathBuf::from("ringside_settings.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Option<Configuration>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(RingsideError::ReadConfig {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let file: SettingsFile = serde_json::from_slice(&bytes)?;
        Ok(Some(file.timer_settings.clamped()))
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Configuration {
        match self.read() {
            Ok(Some(cfg)) => cfg,
            Ok(None) => Configuration::default(),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "using default settings");
                Configuration::default()
            }
        }
    }

    fn reload(&self) -> Option<Configuration> {
        match self.read() {
            Ok(Some(cfg)) => Some(cfg),
            Ok(None) => {
                tracing::warn!(path = %self.path.display(), "settings file gone, keeping current settings");
                None
            }
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "keeping current settings");
                None
            }
        }
    }

    fn save(&mut self, cfg: &Configuration) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| RingsideError::WriteConfig {
                path: self.path.clone(),
                source,
            })?;
        }
        let data = serde_json::to_vec_pretty(&SettingsFile {
            timer_settings: *cfg,
        })?;
        fs::write(&self.path, data).map_err(|source| RingsideError::WriteConfig {
            path: self.path.clone(),
            source,
        })?;
        tracing::debug!(path = %self.path.display(), "settings saved");
        Ok(())
    }
}

/// Calls back whenever the settings file changes on disk. Dropping the
/// watcher stops the notifications.
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
}

impl ConfigWatcher {
    pub fn spawn<F>(path: &Path, on_change: F) -> Result<Self>
    where
        F: Fn() + Send + 'static,
    {
        // Watch the directory: editors often replace the file rather than
        // writing it in place.
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;
        let file_name = path.file_name().map(|name| name.to_os_string());

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(err) => {
                    tracing::warn!(error = %err, "settings watcher error");
                    return;
                }
            };
            if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                return;
            }
            let touches_settings = event
                .paths
                .iter()
                .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
            if touches_settings {
                on_change();
            }
        })
        .map_err(|source| RingsideError::Watch {
            path: path.to_path_buf(),
            source,
        })?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|source| RingsideError::Watch {
                path: path.to_path_buf(),
                source,
            })?;

        tracing::debug!(path = %path.display(), "watching settings file");
        Ok(Self { _watcher: watcher })
    }
}
