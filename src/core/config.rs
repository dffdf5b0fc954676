//! Configuration system: TOML file + env var overrides + board defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{BoardError, Result};
use crate::schedule::service::Service;

/// Full board configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub sources: SourcesConfig,
    pub timing: TimingConfig,
    pub clock: ClockConfig,
    pub defaults: DefaultsConfig,
    pub display: DisplayConfig,
    pub paths: PathsConfig,
}

/// Where service data comes from and how it is fetched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SourcesConfig {
    /// Local JSON file. `None` skips local reads entirely.
    pub local_path: Option<PathBuf>,
    /// Remote JSON endpoint. `None` (or empty) disables remote fetches.
    pub remote_url: Option<String>,
    /// Initial data-source preference; toggled at runtime by the second switch.
    pub prefer_remote: bool,
    pub http_timeout_ms: u64,
    /// Remote bodies larger than this are rejected.
    pub max_body_bytes: usize,
    /// When false every fetch runs synchronously on the render loop.
    pub background_fetch: bool,
}

/// Render-loop cadence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TimingConfig {
    pub tick_ms: u64,
    pub fetch_interval_secs: u64,
    /// Round-robin interval used only while the wall clock is unavailable.
    pub rotate_interval_secs: u64,
    pub debounce_ms: u32,
    pub ticker_ms: u32,
    pub ticker_step_px: u32,
    /// How long a signal-driven switch press reads as held.
    pub switch_hold_ms: u32,
}

/// Wall-clock settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClockConfig {
    pub utc_offset_hours: i32,
}

/// Field values substituted when an entry omits or blanks a field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DefaultsConfig {
    pub scheduled: String,
    pub destination: String,
    pub status: String,
    pub calling: String,
}

/// Panel geometry used for ticker measurement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DisplayConfig {
    pub width_px: u32,
    pub glyph_px: u32,
}

/// Filesystem paths used by the board.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    pub activity_log: PathBuf,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            local_path: Some(PathBuf::from("departures.json")),
            remote_url: None,
            prefer_remote: false,
            http_timeout_ms: 10_000,
            max_body_bytes: 64 * 1024,
            background_fetch: true,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_ms: 10,
            fetch_interval_secs: 30,
            rotate_interval_secs: 300,
            debounce_ms: 200,
            ticker_ms: 120,
            ticker_step_px: 1,
            switch_hold_ms: 100,
        }
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self { utc_offset_hours: 0 }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            scheduled: "12:24".to_string(),
            destination: "London Euston".to_string(),
            status: "On time".to_string(),
            calling: "Watford Junction, Milton Keynes Central, Rugby, Coventry, Birmingham Int'l"
                .to_string(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width_px: 128,
            glyph_px: 6,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!("[DB-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths");
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        Self {
            config_file: home_dir.join(".config").join("dboard").join("config.toml"),
            activity_log: home_dir
                .join(".local")
                .join("share")
                .join("dboard")
                .join("activity.jsonl"),
        }
    }
}

impl DefaultsConfig {
    /// The compiled-in fallback service built from these defaults.
    #[must_use]
    pub fn to_service(&self) -> Service {
        Service {
            scheduled: self.scheduled.trim().to_string(),
            destination: self.destination.trim().to_string(),
            status: self.status.trim().to_string(),
            calling: self.calling.trim().to_string(),
        }
    }
}

impl SourcesConfig {
    /// Remote URL with blank values treated as unconfigured.
    #[must_use]
    pub fn remote_url(&self) -> Option<&str> {
        self.remote_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| BoardError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(BoardError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(env_var)?;
        cfg.normalize();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Deterministic hash of the effective config for the start-up log.
    ///
    /// FNV-1a over canonical JSON, stable across processes and Rust releases.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self).map_err(|e| BoardError::Serialization {
            context: "config",
            details: e.to_string(),
        })?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| BoardError::Serialization {
            context: "toml",
            details: e.to_string(),
        })
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("DBOARD_LOCAL_PATH") {
            self.sources.local_path = Some(PathBuf::from(raw));
        }
        if let Some(raw) = lookup("DBOARD_REMOTE_URL") {
            self.sources.remote_url = Some(raw);
        }
        if let Some(raw) = lookup("DBOARD_PREFER_REMOTE") {
            self.sources.prefer_remote = parse_env("DBOARD_PREFER_REMOTE", &raw)?;
        }
        if let Some(raw) = lookup("DBOARD_HTTP_TIMEOUT_MS") {
            self.sources.http_timeout_ms = parse_env("DBOARD_HTTP_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = lookup("DBOARD_BACKGROUND_FETCH") {
            self.sources.background_fetch = parse_env("DBOARD_BACKGROUND_FETCH", &raw)?;
        }
        if let Some(raw) = lookup("DBOARD_FETCH_INTERVAL_SECS") {
            self.timing.fetch_interval_secs = parse_env("DBOARD_FETCH_INTERVAL_SECS", &raw)?;
        }
        if let Some(raw) = lookup("DBOARD_ROTATE_INTERVAL_SECS") {
            self.timing.rotate_interval_secs = parse_env("DBOARD_ROTATE_INTERVAL_SECS", &raw)?;
        }
        if let Some(raw) = lookup("DBOARD_DEBOUNCE_MS") {
            self.timing.debounce_ms = parse_env("DBOARD_DEBOUNCE_MS", &raw)?;
        }
        if let Some(raw) = lookup("DBOARD_TICKER_MS") {
            self.timing.ticker_ms = parse_env("DBOARD_TICKER_MS", &raw)?;
        }
        if let Some(raw) = lookup("DBOARD_TICK_MS") {
            self.timing.tick_ms = parse_env("DBOARD_TICK_MS", &raw)?;
        }
        if let Some(raw) = lookup("DBOARD_UTC_OFFSET_HOURS") {
            self.clock.utc_offset_hours = parse_env("DBOARD_UTC_OFFSET_HOURS", &raw)?;
        }
        if let Some(raw) = lookup("DBOARD_ACTIVITY_LOG") {
            self.paths.activity_log = PathBuf::from(raw);
        }
        Ok(())
    }

    /// Collapse blank optional values so "unset" has one representation.
    pub fn normalize(&mut self) {
        if self
            .sources
            .local_path
            .as_ref()
            .is_some_and(|p| p.as_os_str().is_empty())
        {
            self.sources.local_path = None;
        }
        self.sources.remote_url = self.sources.remote_url().map(str::to_string);
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("scheduled", &self.defaults.scheduled),
            ("destination", &self.defaults.destination),
            ("status", &self.defaults.status),
            ("calling", &self.defaults.calling),
        ] {
            if value.trim().is_empty() {
                return Err(BoardError::InvalidConfig {
                    details: format!("defaults.{name} must not be empty"),
                });
            }
        }

        for (name, value) in [
            ("timing.tick_ms", self.timing.tick_ms),
            ("timing.fetch_interval_secs", self.timing.fetch_interval_secs),
            ("timing.rotate_interval_secs", self.timing.rotate_interval_secs),
            ("timing.ticker_ms", u64::from(self.timing.ticker_ms)),
            ("timing.ticker_step_px", u64::from(self.timing.ticker_step_px)),
            ("sources.http_timeout_ms", self.sources.http_timeout_ms),
        ] {
            if value == 0 {
                return Err(BoardError::InvalidConfig {
                    details: format!("{name} must be > 0"),
                });
            }
        }

        // Tick differences are u32 milliseconds; longer intervals would never elapse.
        for (name, secs) in [
            ("timing.fetch_interval_secs", self.timing.fetch_interval_secs),
            ("timing.rotate_interval_secs", self.timing.rotate_interval_secs),
        ] {
            if secs.saturating_mul(1_000) > u64::from(i32::MAX.unsigned_abs()) {
                return Err(BoardError::InvalidConfig {
                    details: format!("{name} ({secs}) exceeds the tick counter range"),
                });
            }
        }

        if !(-12..=14).contains(&self.clock.utc_offset_hours) {
            return Err(BoardError::InvalidConfig {
                details: format!(
                    "clock.utc_offset_hours must be in [-12, 14], got {}",
                    self.clock.utc_offset_hours
                ),
            });
        }

        if let Some(url) = self.sources.remote_url() {
            let parsed = reqwest::Url::parse(url).map_err(|e| BoardError::InvalidConfig {
                details: format!("sources.remote_url {url:?}: {e}"),
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(BoardError::InvalidConfig {
                    details: format!(
                        "sources.remote_url must use http or https, got {}",
                        parsed.scheme()
                    ),
                });
            }
        }

        if self.sources.max_body_bytes == 0 {
            return Err(BoardError::InvalidConfig {
                details: "sources.max_body_bytes must be > 0".to_string(),
            });
        }

        if self.display.glyph_px == 0 || self.display.width_px < self.display.glyph_px {
            return Err(BoardError::InvalidConfig {
                details: format!(
                    "display.width_px ({}) must be >= display.glyph_px ({}) and glyph_px > 0",
                    self.display.width_px, self.display.glyph_px
                ),
            });
        }

        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env<T>(name: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|error| BoardError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })
}
