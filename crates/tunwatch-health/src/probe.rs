//! Reachability probes.
//!
//! A probe never fails with an error: anything that prevents a positive
//! answer (spawn failure, non-zero exit, timeout) reads as unreachable.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;
use tunwatch_core::Platform;

use crate::BoxFuture;

/// Answers whether an address is reachable right now.
///
/// Implementations must bound their own latency; the monitor waits for
/// every probe before moving on to the next link.
pub trait Probe: Send + Sync {
    fn probe<'a>(&'a self, address: &'a str) -> BoxFuture<'a, bool>;
}

/// Slack added on top of the ping deadline before the child is killed.
const PROBE_GRACE: Duration = Duration::from_secs(1);

/// Sends a single ICMP echo through the system `ping` binary.
#[derive(Debug, Clone)]
pub struct PingProbe {
    platform: Platform,
    timeout: Duration,
}

impl PingProbe {
    pub fn new(platform: Platform, timeout: Duration) -> Self {
        Self { platform, timeout }
    }

    /// Arguments passed to `ping` for one echo request.
    pub fn args(&self, address: &str) -> Vec<String> {
        if self.platform.is_windows() {
            let millis = self.timeout.as_millis().max(1);
            vec![
                "-n".to_string(),
                "1".to_string(),
                "-w".to_string(),
                millis.to_string(),
                address.to_string(),
            ]
        } else {
            // -W takes whole seconds; round up so sub-second timeouts still wait.
            let secs = self.timeout.as_millis().div_ceil(1000).max(1);
            vec![
                "-c".to_string(),
                "1".to_string(),
                "-W".to_string(),
                secs.to_string(),
                address.to_string(),
            ]
        }
    }

    /// Outer deadline for the child process.
    fn deadline(&self) -> Duration {
        self.timeout.saturating_add(PROBE_GRACE)
    }

    async fn ping(&self, address: &str) -> bool {
        let mut cmd = Command::new("ping");
        cmd.args(self.args(address))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        match tokio::time::timeout(self.deadline(), cmd.status()).await {
            Ok(Ok(status)) if status.success() => true,
            Ok(Ok(status)) => {
                debug!(%address, %status, "ping reported unreachable");
                false
            }
            Ok(Err(e)) => {
                debug!(%address, error = %e, "failed to run ping");
                false
            }
            Err(_) => {
                debug!(%address, "ping timed out");
                false
            }
        }
    }
}

impl Probe for PingProbe {
    fn probe<'a>(&'a self, address: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(self.ping(address))
    }
}
