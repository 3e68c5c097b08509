//! tunwatchd — the tunnel watchdog daemon.
//!
//! Discovers the tunnels to watch, then probes each tunnel's gateway on
//! a fixed cadence and restarts tunnels that stay unreachable.
//!
//! # Usage
//!
//! ```text
//! tunwatchd                                  # scan /etc/wireguard (Linux)
//! tunwatchd wg0=10.0.0.1 office=10.8.0.1     # explicit tunnels
//! tunwatchd --config /etc/tunwatch.toml --threshold 5 --interval 10s
//! ```

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};

use tunwatch_core::{Platform, Registry};
use tunwatch_health::{LinkMonitor, MonitorSettings, PingProbe, recovery_for};

mod cli;
mod logging;
mod shutdown;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    let settings = cli.settings()?;
    let _log_guard = logging::init(settings.log_format, settings.log_file.as_deref())?;

    let platform = Platform::current();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        %platform,
        threshold = settings.threshold,
        restart_policy = %settings.restart_policy,
        "tunwatch running"
    );

    // ── Registry ───────────────────────────────────────────────

    let registry = match Registry::discover(&platform, &settings, &cli.tunnels) {
        Ok(registry) => registry,
        Err(e) => {
            error!(error = %e, "tunnel discovery failed");
            Registry::default()
        }
    };
    if registry.is_empty() {
        info!("no tunnels configured, exiting");
        return Ok(());
    }

    // ── Collaborators ──────────────────────────────────────────

    let probe = PingProbe::new(platform.clone(), settings.probe_timeout);
    let recovery = recovery_for(&platform, &settings);

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let listener = shutdown::spawn_listener(shutdown_tx);

    // ── Monitor loop ───────────────────────────────────────────

    let mut monitor = LinkMonitor::new(
        &registry.into_tunnels(),
        Box::new(probe),
        recovery,
        MonitorSettings::from(&settings),
    );
    monitor.run(shutdown_rx).await;

    listener.abort();
    info!("stopping tunwatch");
    Ok(())
}
