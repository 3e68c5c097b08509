//! tunwatch.toml configuration parser.
//!
//! The file form ([`WatchConfig`]) keeps every field optional so that
//! command-line flags can be layered on top before [`WatchConfig::resolve`]
//! turns it into typed [`Settings`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::StaticTunnel;

pub const DEFAULT_THRESHOLD: u32 = 3;
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_RESTART_SETTLE: Duration = Duration::from_secs(3);
pub const DEFAULT_CONFIG_DIR: &str = "/etc/wireguard";
pub const DEFAULT_WINDOWS_CONFIG_DIR: &str = r"C:\Program Files\WireGuard\Data\Configurations";
pub const DEFAULT_LOG_FILE: &str = "logfile.log";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WatchConfig {
    pub watch: Option<WatchSection>,
    pub registry: Option<RegistrySection>,
    pub recovery: Option<RecoverySection>,
    pub logging: Option<LoggingSection>,
    #[serde(default, rename = "tunnel")]
    pub tunnels: Vec<StaticTunnel>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WatchSection {
    pub threshold: Option<u32>,
    pub interval: Option<String>,
    pub probe_timeout: Option<String>,
    pub restart_policy: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrySection {
    pub config_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecoverySection {
    pub settle: Option<String>,
    pub windows_config_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Log file path; empty disables file output.
    pub file: Option<String>,
    pub format: Option<String>,
}

/// When the recovery action fires once a link is past its threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RestartPolicy {
    /// Restart on every failing tick while the count exceeds the threshold.
    #[default]
    EveryTick,
    /// Restart only on the tick the count first exceeds the threshold.
    OncePerEpisode,
}

impl FromStr for RestartPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().replace('-', "_").as_str() {
            "every_tick" => Ok(RestartPolicy::EveryTick),
            "once_per_episode" => Ok(RestartPolicy::OncePerEpisode),
            _ => Err(ConfigError::UnknownRestartPolicy(s.to_string())),
        }
    }
}

impl fmt::Display for RestartPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestartPolicy::EveryTick => f.write_str("every_tick"),
            RestartPolicy::OncePerEpisode => f.write_str("once_per_episode"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(ConfigError::UnknownLogFormat(s.to_string())),
        }
    }
}

/// Fully resolved, validated settings. Fixed for the process lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Failures tolerated before recovery; compared with strict `>`.
    pub threshold: u32,
    /// Pause between monitoring rounds.
    pub tick_interval: Duration,
    pub probe_timeout: Duration,
    pub restart_policy: RestartPolicy,
    /// Directory scanned for `*.conf` tunnel definitions.
    pub config_dir: PathBuf,
    /// Pause between tearing a tunnel service down and reinstalling it.
    pub restart_settle: Duration,
    pub windows_config_dir: PathBuf,
    pub log_file: Option<PathBuf>,
    pub log_format: LogFormat,
    pub tunnels: Vec<StaticTunnel>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            tick_interval: DEFAULT_INTERVAL,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            restart_policy: RestartPolicy::EveryTick,
            config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
            restart_settle: DEFAULT_RESTART_SETTLE,
            windows_config_dir: PathBuf::from(DEFAULT_WINDOWS_CONFIG_DIR),
            log_file: Some(PathBuf::from(DEFAULT_LOG_FILE)),
            log_format: LogFormat::Text,
            tunnels: Vec::new(),
        }
    }
}

impl WatchConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn watch_mut(&mut self) -> &mut WatchSection {
        self.watch.get_or_insert_with(WatchSection::default)
    }

    pub fn registry_mut(&mut self) -> &mut RegistrySection {
        self.registry.get_or_insert_with(RegistrySection::default)
    }

    pub fn logging_mut(&mut self) -> &mut LoggingSection {
        self.logging.get_or_insert_with(LoggingSection::default)
    }

    /// Check the configuration without building [`Settings`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.resolve().map(|_| ())
    }

    /// Apply defaults and convert into typed settings.
    pub fn resolve(&self) -> Result<Settings, ConfigError> {
        let defaults = Settings::default();
        let watch = self.watch.clone().unwrap_or_default();
        let registry = self.registry.clone().unwrap_or_default();
        let recovery = self.recovery.clone().unwrap_or_default();
        let logging = self.logging.clone().unwrap_or_default();

        let threshold = watch.threshold.unwrap_or(defaults.threshold);
        if threshold == 0 {
            return Err(ConfigError::ZeroThreshold);
        }

        let tick_interval = positive_duration("watch.interval", watch.interval.as_deref())?
            .unwrap_or(defaults.tick_interval);
        let probe_timeout =
            positive_duration("watch.probe_timeout", watch.probe_timeout.as_deref())?
                .unwrap_or(defaults.probe_timeout);
        let restart_settle = match recovery.settle.as_deref() {
            Some(raw) => parse_duration(raw).ok_or_else(|| ConfigError::InvalidDuration {
                field: "recovery.settle",
                value: raw.to_string(),
            })?,
            None => defaults.restart_settle,
        };

        let restart_policy = match watch.restart_policy.as_deref() {
            Some(raw) => raw.parse()?,
            None => defaults.restart_policy,
        };
        let log_format = match logging.format.as_deref() {
            Some(raw) => raw.parse()?,
            None => defaults.log_format,
        };
        let log_file = match logging.file {
            Some(file) if file.trim().is_empty() => None,
            Some(file) => Some(PathBuf::from(file)),
            None => defaults.log_file,
        };

        Ok(Settings {
            threshold,
            tick_interval,
            probe_timeout,
            restart_policy,
            config_dir: registry.config_dir.unwrap_or(defaults.config_dir),
            restart_settle,
            windows_config_dir: recovery
                .windows_config_dir
                .unwrap_or(defaults.windows_config_dir),
            log_file,
            log_format,
            tunnels: self.tunnels.clone(),
        })
    }
}

fn positive_duration(
    field: &'static str,
    raw: Option<&str>,
) -> Result<Option<Duration>, ConfigError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    match parse_duration(raw) {
        Some(d) if !d.is_zero() => Ok(Some(d)),
        _ => Err(ConfigError::InvalidDuration {
            field,
            value: raw.to_string(),
        }),
    }
}

/// Parse a duration string like "5s", "500ms", "1m". A bare number is seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        ms.trim().parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.trim().parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.trim()
            .parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}
