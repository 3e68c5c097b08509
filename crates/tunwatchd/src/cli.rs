//! Command-line interface and config layering.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use tunwatch_core::{Settings, WatchConfig};

#[derive(Debug, Parser)]
#[command(
    name = "tunwatchd",
    about = "Tunnel link watchdog: restarts tunnels whose gateway stops answering",
    version
)]
pub struct Cli {
    /// Path to tunwatch.toml.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Consecutive failures tolerated before a restart.
    #[arg(long)]
    pub threshold: Option<u32>,

    /// Pause between rounds (e.g. "5s", "500ms").
    #[arg(long)]
    pub interval: Option<String>,

    /// Deadline for a single reachability probe.
    #[arg(long)]
    pub probe_timeout: Option<String>,

    /// Restart policy: every-tick or once-per-episode.
    #[arg(long)]
    pub restart_policy: Option<String>,

    /// Directory scanned for WireGuard *.conf files.
    #[arg(long)]
    pub config_dir: Option<PathBuf>,

    /// Log file; relative paths are resolved against the executable's directory.
    #[arg(long, conflicts_with = "no_log_file")]
    pub log_file: Option<String>,

    /// Log to stdout only.
    #[arg(long)]
    pub no_log_file: bool,

    /// Log format: text or json.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Tunnels to monitor, as NAME=ADDRESS.
    ///
    /// When given, the config directory is not scanned.
    #[arg(value_name = "NAME=ADDRESS")]
    pub tunnels: Vec<String>,
}

impl Cli {
    /// Load the config file (if any), layer flags on top, and resolve.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let mut config = match &self.config {
            Some(path) => WatchConfig::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => WatchConfig::default(),
        };
        self.apply(&mut config);

        let mut settings = config.resolve().context("invalid configuration")?;
        settings.log_file = settings.log_file.map(|p| resolve_log_path(&p));
        Ok(settings)
    }

    fn apply(&self, config: &mut WatchConfig) {
        let watch = config.watch_mut();
        if let Some(threshold) = self.threshold {
            watch.threshold = Some(threshold);
        }
        if let Some(interval) = &self.interval {
            watch.interval = Some(interval.clone());
        }
        if let Some(timeout) = &self.probe_timeout {
            watch.probe_timeout = Some(timeout.clone());
        }
        if let Some(policy) = &self.restart_policy {
            watch.restart_policy = Some(policy.clone());
        }

        if let Some(dir) = &self.config_dir {
            config.registry_mut().config_dir = Some(dir.clone());
        }

        let logging = config.logging_mut();
        if self.no_log_file {
            logging.file = Some(String::new());
        } else if let Some(file) = &self.log_file {
            logging.file = Some(file.clone());
        }
        if let Some(format) = &self.log_format {
            logging.format = Some(format.clone());
        }
    }
}

/// Resolve a relative log path against the directory holding the binary.
fn resolve_log_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(path)))
        .unwrap_or_else(|| path.to_path_buf())
}
