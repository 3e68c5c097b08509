//! Tunnel restart actions.
//!
//! One [`RecoveryAction`] is picked at startup for the host platform and
//! handed to the monitor. Restarts are best-effort: every failure is
//! logged here and never reported back to the caller, so the monitor
//! simply retries on a later tick if the link stays down.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tracing::{error, info};
use tunwatch_core::{Platform, Settings};

use crate::BoxFuture;

/// Restarts a tunnel by interface name.
pub trait RecoveryAction: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    /// The commands [`restart`](Self::restart) runs, in order.
    fn plan(&self, tunnel: &str) -> Vec<CommandLine>;

    fn restart<'a>(&'a self, tunnel: &'a str) -> BoxFuture<'a, ()>;
}

/// Why a recovery command did not complete successfully.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to spawn: {0}")]
    Spawn(#[source] io::Error),

    #[error("exited with {0}")]
    Exit(ExitStatus),
}

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Run to completion with output discarded. A non-zero exit is an error.
    async fn run(&self) -> Result<(), CommandError> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(CommandError::Spawn)?;
        if status.success() {
            Ok(())
        } else {
            Err(CommandError::Exit(status))
        }
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Pick the recovery action for a platform.
pub fn recovery_for(platform: &Platform, settings: &Settings) -> Box<dyn RecoveryAction> {
    match platform {
        Platform::Linux => Box::new(SystemdRestart),
        Platform::Windows => Box::new(TunnelServiceRestart::new(
            &settings.windows_config_dir,
            settings.restart_settle,
        )),
        Platform::Other(os) => Box::new(UnsupportedRestart { os: os.clone() }),
    }
}

// ── Linux ──────────────────────────────────────────────────────────

/// Restarts the `wg-quick@<name>` systemd unit.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemdRestart;

impl SystemdRestart {
    async fn restart_unit(&self, tunnel: &str) {
        for cmd in self.plan(tunnel) {
            if let Err(e) = cmd.run().await {
                error!(%tunnel, command = %cmd, error = %e, "systemctl restart failed");
            }
        }
        info!(%tunnel, "tunnel reconnected (systemd)");
    }
}

impl RecoveryAction for SystemdRestart {
    fn name(&self) -> &'static str {
        "systemd"
    }

    fn plan(&self, tunnel: &str) -> Vec<CommandLine> {
        vec![CommandLine::new(
            "systemctl",
            ["restart".to_string(), format!("wg-quick@{tunnel}")],
        )]
    }

    fn restart<'a>(&'a self, tunnel: &'a str) -> BoxFuture<'a, ()> {
        Box::pin(self.restart_unit(tunnel))
    }
}

// ── Windows ────────────────────────────────────────────────────────

/// Reinstalls the WireGuard tunnel service: uninstall, wait, install.
#[derive(Debug, Clone)]
pub struct TunnelServiceRestart {
    config_dir: PathBuf,
    /// Pause between uninstall and install.
    settle: Duration,
}

impl TunnelServiceRestart {
    pub fn new(config_dir: &Path, settle: Duration) -> Self {
        Self {
            config_dir: config_dir.to_path_buf(),
            settle,
        }
    }

    fn uninstall(&self, tunnel: &str) -> CommandLine {
        CommandLine::new("wireguard", ["/uninstalltunnelservice", tunnel])
    }

    fn install(&self, tunnel: &str) -> CommandLine {
        // Built as a string so the Windows separator survives on any host.
        let dir = self.config_dir.display().to_string();
        let config = format!(r"{}\{tunnel}.conf.dpapi", dir.trim_end_matches('\\'));
        CommandLine::new("wireguard", ["/installtunnelservice".to_string(), config])
    }

    async fn reinstall(&self, tunnel: &str) {
        let uninstall = self.uninstall(tunnel);
        if let Err(e) = uninstall.run().await {
            error!(%tunnel, command = %uninstall, error = %e, "failed to uninstall tunnel service");
        }

        tokio::time::sleep(self.settle).await;

        let install = self.install(tunnel);
        if let Err(e) = install.run().await {
            error!(%tunnel, command = %install, error = %e, "failed to install tunnel service");
        }

        info!(%tunnel, "tunnel reconnected (windows)");
    }
}

impl RecoveryAction for TunnelServiceRestart {
    fn name(&self) -> &'static str {
        "wireguard-service"
    }

    fn plan(&self, tunnel: &str) -> Vec<CommandLine> {
        vec![self.uninstall(tunnel), self.install(tunnel)]
    }

    fn restart<'a>(&'a self, tunnel: &'a str) -> BoxFuture<'a, ()> {
        Box::pin(self.reinstall(tunnel))
    }
}

// ── Unsupported ────────────────────────────────────────────────────

/// Placeholder for hosts without a known restart procedure.
#[derive(Debug, Clone)]
pub struct UnsupportedRestart {
    os: String,
}

impl RecoveryAction for UnsupportedRestart {
    fn name(&self) -> &'static str {
        "unsupported"
    }

    fn plan(&self, _tunnel: &str) -> Vec<CommandLine> {
        Vec::new()
    }

    fn restart<'a>(&'a self, tunnel: &'a str) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            error!(%tunnel, os = %self.os, "cannot restart tunnel: unsupported operating system");
        })
    }
}
