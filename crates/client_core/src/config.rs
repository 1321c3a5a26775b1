use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "user_admin.toml";
pub const CONFIG_PATH_ENV: &str = "APP__CONFIG_PATH";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendMode {
    /// One mutable collection backs every operation.
    #[default]
    Shared,
    /// Fetches always return the seed list and writes touch nothing.
    StaticSeed,
}

impl FromStr for BackendMode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "shared" => Ok(Self::Shared),
            "static_seed" | "static-seed" => Ok(Self::StaticSeed),
            other => Err(format!(
                "unknown backend mode '{other}' (expected 'shared' or 'static_seed')"
            )),
        }
    }
}

impl fmt::Display for BackendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shared => f.write_str("shared"),
            Self::StaticSeed => f.write_str("static_seed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub latency_ms: u64,
    /// Zero disables the per-request timeout.
    pub request_timeout_ms: u64,
    pub backend_mode: BackendMode,
    pub propagate_deletes: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            latency_ms: 500,
            request_timeout_ms: 10_000,
            backend_mode: BackendMode::Shared,
            propagate_deletes: true,
        }
    }
}

impl ClientSettings {
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    latency_ms: Option<u64>,
    request_timeout_ms: Option<u64>,
    backend_mode: Option<BackendMode>,
    propagate_deletes: Option<bool>,
}

impl FileSettings {
    fn apply(self, settings: &mut ClientSettings) {
        if let Some(v) = self.latency_ms {
            settings.latency_ms = v;
        }
        if let Some(v) = self.request_timeout_ms {
            settings.request_timeout_ms = v;
        }
        if let Some(v) = self.backend_mode {
            settings.backend_mode = v;
        }
        if let Some(v) = self.propagate_deletes {
            settings.propagate_deletes = v;
        }
    }
}

pub fn config_path() -> PathBuf {
    std::env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

pub fn load_settings() -> ClientSettings {
    load_settings_from(&config_path())
}

/// Defaults, then the TOML file at `path` (if any), then `APP__*` variables.
pub fn load_settings_from(path: &Path) -> ClientSettings {
    let mut settings = ClientSettings::default();
    apply_file(&mut settings, path);
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn apply_file(settings: &mut ClientSettings, path: &Path) {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "config: unable to read settings file");
            return;
        }
    };

    match toml::from_str::<FileSettings>(&raw) {
        Ok(file_cfg) => file_cfg.apply(settings),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "config: ignoring malformed settings file")
        }
    }
}

pub fn apply_env_overrides(settings: &mut ClientSettings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = parsed_env(&lookup, "APP__LATENCY_MS", |raw| raw.parse::<u64>().ok()) {
        settings.latency_ms = v;
    }
    if let Some(v) = parsed_env(&lookup, "APP__REQUEST_TIMEOUT_MS", |raw| {
        raw.parse::<u64>().ok()
    }) {
        settings.request_timeout_ms = v;
    }
    if let Some(v) = parsed_env(&lookup, "APP__BACKEND_MODE", |raw| raw.parse().ok()) {
        settings.backend_mode = v;
    }
    if let Some(v) = parsed_env(&lookup, "APP__PROPAGATE_DELETES", parse_flag) {
        settings.propagate_deletes = v;
    }
}

fn parsed_env<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Option<T> {
    let raw = lookup(key)?;
    let parsed = parse(raw.trim());
    if parsed.is_none() {
        warn!(key, value = %raw, "config: ignoring unparseable environment override");
    }
    parsed
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
