//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::errors::{KloadError, Result};
use crate::engine::layout::{DEFAULT_MAX_COLUMNS, DEFAULT_ON_SCREEN_CAP};
use crate::engine::session::SessionConfig;
use crate::engine::window::DEFAULT_WINDOW_WIDTH;
use crate::logger::jsonl::JsonlConfig;
use crate::source::filter::EntityFilter;

/// Polling faster than this buys nothing but terminal flicker.
pub const MIN_POLL_INTERVAL_MS: u64 = 50;

/// Full kload configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub dashboard: DashboardConfig,
    pub source: SourceConfig,
    pub log: LogConfig,
    /// File this config was loaded from (or would have been).
    #[serde(skip)]
    pub config_file: PathBuf,
}

/// Layout and cadence of the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DashboardConfig {
    pub max_columns: usize,
    /// Samples kept per series.
    pub window_width: usize,
    /// Panels shown at most; further entities are tracked without a panel.
    pub on_screen_cap: usize,
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Demo,
    File,
}

/// Which metrics source to poll and which of its entities to show.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// JSON snapshot re-read on every poll when `kind = "file"`.
    pub file: Option<PathBuf>,
    pub demo_entities: usize,
    /// Name prefixes to keep. Empty keeps everything.
    pub include: Vec<String>,
    /// Regex over the full entity name.
    pub exclude: Option<String>,
    /// Regex over the part after the last `/`.
    pub exclude_member: Option<String>,
}

/// JSONL session log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    pub enabled: bool,
    pub path: PathBuf,
    pub max_size_bytes: u64,
    pub max_rotated_files: u32,
    /// Write one `poll` event per iteration.
    pub poll_events: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            max_columns: DEFAULT_MAX_COLUMNS,
            window_width: DEFAULT_WINDOW_WIDTH,
            on_screen_cap: DEFAULT_ON_SCREEN_CAP,
            poll_interval_ms: 1000,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Demo,
            file: None,
            demo_entities: 2,
            include: Vec::new(),
            exclude: None,
            exclude_member: None,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        let defaults = JsonlConfig::default();
        Self {
            enabled: true,
            path: data_dir().join("session.jsonl"),
            max_size_bytes: defaults.max_size_bytes,
            max_rotated_files: defaults.max_rotated_files,
            poll_events: true,
        }
    }
}

fn home_dir() -> PathBuf {
    env::var_os("HOME").map_or_else(
        || {
            eprintln!("[KLD-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths");
            PathBuf::from("/tmp")
        },
        PathBuf::from,
    )
}

fn data_dir() -> PathBuf {
    home_dir().join(".local").join("share").join("kload")
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        home_dir().join(".config").join("kload").join("config.toml")
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, env_var)
    }

    /// [`Config::load`] with an injectable environment.
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|e| KloadError::io(&path_buf, e))?;
            toml::from_str::<Self>(&raw)?
        } else if is_explicit_path {
            return Err(KloadError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.config_file = path_buf;
        cfg.apply_env_overrides_from(lookup)?;
        cfg.normalize();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Deterministic hash of the effective config for the session log.
    ///
    /// FNV-1a over canonical JSON, stable across processes and toolchains.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    /// Effective config rendered back to TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| KloadError::Serialization {
            context: "toml",
            details: e.to_string(),
        })
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        // dashboard
        set_parsed(&mut lookup, "KLOAD_MAX_COLUMNS", &mut self.dashboard.max_columns)?;
        set_parsed(&mut lookup, "KLOAD_WINDOW_WIDTH", &mut self.dashboard.window_width)?;
        set_parsed(&mut lookup, "KLOAD_ON_SCREEN_CAP", &mut self.dashboard.on_screen_cap)?;
        set_parsed(
            &mut lookup,
            "KLOAD_POLL_INTERVAL_MS",
            &mut self.dashboard.poll_interval_ms,
        )?;

        // source
        if let Some(raw) = lookup("KLOAD_SOURCE") {
            self.source.kind = match raw.trim().to_ascii_lowercase().as_str() {
                "demo" => SourceKind::Demo,
                "file" => SourceKind::File,
                other => {
                    return Err(KloadError::ConfigParse {
                        context: "env",
                        details: format!("KLOAD_SOURCE={other:?}: expected demo or file"),
                    });
                }
            };
        }
        if let Some(raw) = lookup("KLOAD_SOURCE_FILE") {
            self.source.file = Some(PathBuf::from(raw));
        }
        set_parsed(
            &mut lookup,
            "KLOAD_DEMO_ENTITIES",
            &mut self.source.demo_entities,
        )?;
        if let Some(raw) = lookup("KLOAD_INCLUDE") {
            self.source.include = raw
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(raw) = lookup("KLOAD_EXCLUDE") {
            self.source.exclude = Some(raw);
        }
        if let Some(raw) = lookup("KLOAD_EXCLUDE_MEMBER") {
            self.source.exclude_member = Some(raw);
        }

        // log
        set_parsed(&mut lookup, "KLOAD_LOG_ENABLED", &mut self.log.enabled)?;
        if let Some(raw) = lookup("KLOAD_LOG_PATH") {
            self.log.path = PathBuf::from(raw);
        }
        set_parsed(&mut lookup, "KLOAD_LOG_POLL_EVENTS", &mut self.log.poll_events)?;

        Ok(())
    }

    /// Treat blank patterns as absent so the filter and the hash agree.
    fn normalize(&mut self) {
        for slot in [&mut self.source.exclude, &mut self.source.exclude_member] {
            if slot.as_deref().is_some_and(|p| p.trim().is_empty()) {
                *slot = None;
            }
        }
        self.source.include.retain(|p| !p.is_empty());
    }

    pub fn validate(&self) -> Result<()> {
        let d = &self.dashboard;
        if d.max_columns == 0 {
            return Err(invalid("dashboard.max_columns must be >= 1"));
        }
        if d.window_width < 2 {
            return Err(invalid(format!(
                "dashboard.window_width must be >= 2, got {}",
                d.window_width
            )));
        }
        if d.on_screen_cap == 0 {
            return Err(invalid("dashboard.on_screen_cap must be >= 1"));
        }
        if d.poll_interval_ms < MIN_POLL_INTERVAL_MS {
            return Err(invalid(format!(
                "dashboard.poll_interval_ms must be >= {MIN_POLL_INTERVAL_MS}, got {}",
                d.poll_interval_ms
            )));
        }
        if self.source.kind == SourceKind::Demo && self.source.demo_entities == 0 {
            return Err(invalid("source.demo_entities must be >= 1"));
        }
        if self.source.kind == SourceKind::File && self.source.file.is_none() {
            return Err(invalid("source.kind = \"file\" requires source.file"));
        }
        if self.log.max_size_bytes == 0 {
            return Err(invalid("log.max_size_bytes must be > 0"));
        }
        self.entity_filter()?;
        Ok(())
    }

    /// Compiled include/exclude rules from `[source]`.
    pub fn entity_filter(&self) -> Result<EntityFilter> {
        EntityFilter::new(
            self.source.include.clone(),
            self.source.exclude.as_deref(),
            self.source.exclude_member.as_deref(),
        )
    }

    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            window_width: self.dashboard.window_width,
            on_screen_cap: self.dashboard.on_screen_cap,
            poll_interval: Duration::from_millis(self.dashboard.poll_interval_ms),
            log_polls: self.log.poll_events,
        }
    }

    #[must_use]
    pub fn jsonl_config(&self) -> JsonlConfig {
        JsonlConfig {
            path: self.log.path.clone(),
            max_size_bytes: self.log.max_size_bytes,
            max_rotated_files: self.log.max_rotated_files,
        }
    }
}

fn invalid(details: impl Into<String>) -> KloadError {
    KloadError::InvalidConfig {
        details: details.into(),
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn set_parsed<F, T>(lookup: &mut F, name: &str, slot: &mut T) -> Result<()>
where
    F: FnMut(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = lookup(name) {
        *slot = raw
            .trim()
            .parse::<T>()
            .map_err(|error| KloadError::ConfigParse {
                context: "env",
                details: format!("{name}={raw:?}: {error}"),
            })?;
    }
    Ok(())
}
