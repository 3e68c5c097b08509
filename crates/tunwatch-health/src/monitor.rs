//! Link monitor — the loop that drives every tracker at a fixed cadence.
//!
//! Each round visits the links in registration order, one at a time:
//! probe, record, restart if asked, log. After the round the monitor
//! sleeps for the tick interval. A round that overruns the interval is
//! not compensated for; the next one starts right after it.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};
use tunwatch_core::{RestartPolicy, Settings, TunnelSpec};

use crate::checker::{LinkEvent, LinkTracker, TickOutcome};
use crate::probe::Probe;
use crate::recovery::RecoveryAction;

/// The subset of [`Settings`] the monitor consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSettings {
    pub threshold: u32,
    pub tick_interval: Duration,
    pub restart_policy: RestartPolicy,
}

impl From<&Settings> for MonitorSettings {
    fn from(settings: &Settings) -> Self {
        Self {
            threshold: settings.threshold,
            tick_interval: settings.tick_interval,
            restart_policy: settings.restart_policy,
        }
    }
}

/// Summary of one round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundReport {
    /// Links whose tick ran to completion. A tick cut short by shutdown
    /// during its restart is not counted, although its probe result has
    /// already been recorded.
    pub visited: usize,
    /// Restarts issued during the round.
    pub restarts: usize,
    /// The round stopped early because shutdown was requested.
    pub interrupted: bool,
}

/// Owns the per-link state and the probe and recovery collaborators.
pub struct LinkMonitor {
    links: Vec<LinkTracker>,
    probe: Box<dyn Probe>,
    recovery: Box<dyn RecoveryAction>,
    tick_interval: Duration,
    rounds: u64,
}

impl LinkMonitor {
    pub fn new(
        tunnels: &[TunnelSpec],
        probe: Box<dyn Probe>,
        recovery: Box<dyn RecoveryAction>,
        settings: MonitorSettings,
    ) -> Self {
        let links = tunnels
            .iter()
            .map(|spec| LinkTracker::new(spec, settings.threshold, settings.restart_policy))
            .collect();
        Self {
            links,
            probe,
            recovery,
            tick_interval: settings.tick_interval,
            rounds: 0,
        }
    }

    /// Read-only view of the trackers, in registration order.
    pub fn links(&self) -> &[LinkTracker] {
        &self.links
    }

    /// Completed (or interrupted) rounds so far.
    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    /// Run one tick for the link at `index`.
    ///
    /// Returns `None` if there is no such link.
    pub async fn tick_link(&mut self, index: usize) -> Option<TickOutcome> {
        let link = self.links.get_mut(index)?;

        let reachable = self.probe.probe(link.target()).await;
        let outcome = link.record(reachable);

        for event in &outcome.events {
            log_event(link, *event);
        }

        if outcome.restart {
            self.recovery.restart(link.name()).await;
        }

        Some(outcome)
    }

    /// Visit every link once.
    ///
    /// Shutdown is checked before each link and raced against the
    /// in-flight tick, which is dropped if shutdown wins.
    pub async fn run_round(&mut self, shutdown: &mut watch::Receiver<bool>) -> RoundReport {
        let mut report = RoundReport::default();
        self.rounds += 1;

        for index in 0..self.links.len() {
            if *shutdown.borrow() {
                report.interrupted = true;
                break;
            }

            tokio::select! {
                outcome = self.tick_link(index) => {
                    report.visited += 1;
                    if outcome.is_some_and(|o| o.restart) {
                        report.restarts += 1;
                    }
                }
                _ = shutdown_requested(shutdown) => {
                    report.interrupted = true;
                    break;
                }
            }
        }

        debug!(
            round = self.rounds,
            visited = report.visited,
            restarts = report.restarts,
            "round complete"
        );
        report
    }

    /// Run rounds until shutdown is requested.
    ///
    /// Returns immediately when there is nothing to monitor.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        if self.links.is_empty() {
            info!("no tunnels to monitor");
            return;
        }

        info!(
            links = self.links.len(),
            interval_ms = self.tick_interval.as_millis() as u64,
            recovery = self.recovery.name(),
            "link monitor started"
        );

        loop {
            let report = self.run_round(&mut shutdown).await;
            if report.interrupted {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.tick_interval) => {}
                _ = shutdown_requested(&mut shutdown) => break,
            }
        }

        info!(rounds = self.rounds, "link monitor stopped");
    }
}

/// Resolve once `true` has been sent. If the sender is gone nobody can
/// request shutdown any more, so this never resolves.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

fn log_event(link: &LinkTracker, event: LinkEvent) {
    let tunnel = link.name();
    let target = link.target();
    match event {
        LinkEvent::Recovered => info!(%tunnel, %target, "link up"),
        LinkEvent::Disconnected => info!(%tunnel, %target, "link down"),
        LinkEvent::Waiting { count } => info!(%tunnel, count, "waiting"),
        LinkEvent::Restarting { count } => warn!(
            %tunnel,
            count,
            threshold = link.threshold(),
            "failure threshold exceeded, restarting tunnel"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use tunwatch_core::TunnelSource;

    use crate::BoxFuture;
    use crate::recovery::CommandLine;

    /// Replays a fixed answer sequence; `true` once it runs out.
    struct FixedProbe(Mutex<VecDeque<bool>>);

    impl Probe for FixedProbe {
        fn probe<'a>(&'a self, _address: &'a str) -> BoxFuture<'a, bool> {
            let answer = self.0.lock().unwrap().pop_front().unwrap_or(true);
            Box::pin(async move { answer })
        }
    }

    #[derive(Default)]
    struct CountingRecovery(Arc<Mutex<Vec<String>>>);

    impl RecoveryAction for CountingRecovery {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn plan(&self, _tunnel: &str) -> Vec<CommandLine> {
            Vec::new()
        }

        fn restart<'a>(&'a self, tunnel: &'a str) -> BoxFuture<'a, ()> {
            self.0.lock().unwrap().push(tunnel.to_string());
            Box::pin(async {})
        }
    }

    /// Never finishes a restart.
    struct StuckRecovery;

    impl RecoveryAction for StuckRecovery {
        fn name(&self) -> &'static str {
            "stuck"
        }

        fn plan(&self, _tunnel: &str) -> Vec<CommandLine> {
            Vec::new()
        }

        fn restart<'a>(&'a self, _tunnel: &'a str) -> BoxFuture<'a, ()> {
            Box::pin(std::future::pending())
        }
    }

    fn settings(threshold: u32) -> MonitorSettings {
        MonitorSettings {
            threshold,
            tick_interval: Duration::from_millis(10),
            restart_policy: RestartPolicy::EveryTick,
        }
    }

    fn monitor(answers: &[bool], threshold: u32) -> (LinkMonitor, Arc<Mutex<Vec<String>>>) {
        let specs = [TunnelSpec::new("wg0", "10.0.0.1", TunnelSource::Argument)];
        let restarts = Arc::new(Mutex::new(Vec::new()));
        let monitor = LinkMonitor::new(
            &specs,
            Box::new(FixedProbe(Mutex::new(answers.iter().copied().collect()))),
            Box::new(CountingRecovery(restarts.clone())),
            settings(threshold),
        );
        (monitor, restarts)
    }

    #[test]
    fn settings_from_resolved_config() {
        let s = Settings::default();
        let m = MonitorSettings::from(&s);
        assert_eq!(m.threshold, 3);
        assert_eq!(m.tick_interval, Duration::from_secs(5));
        assert_eq!(m.restart_policy, RestartPolicy::EveryTick);
    }

    #[tokio::test]
    async fn tick_link_out_of_range() {
        let (mut monitor, _) = monitor(&[], 3);
        assert!(monitor.tick_link(1).await.is_none());
    }

    #[tokio::test]
    async fn tick_link_invokes_recovery_past_threshold() {
        let (mut monitor, restarts) = monitor(&[false, false, false, false, false], 3);
        for _ in 0..3 {
            assert!(!monitor.tick_link(0).await.unwrap().restart);
        }
        assert!(restarts.lock().unwrap().is_empty());

        assert!(monitor.tick_link(0).await.unwrap().restart);
        assert!(monitor.tick_link(0).await.unwrap().restart);
        assert_eq!(*restarts.lock().unwrap(), vec!["wg0", "wg0"]);
        assert_eq!(monitor.links()[0].consecutive_failures(), 5);
    }

    #[tokio::test]
    async fn round_reports_restarts() {
        let (mut monitor, _) = monitor(&[false, false], 1);
        let (_tx, mut rx) = watch::channel(false);

        assert_eq!(monitor.run_round(&mut rx).await.restarts, 0);
        let report = monitor.run_round(&mut rx).await;
        assert_eq!(report.visited, 1);
        assert_eq!(report.restarts, 1);
        assert!(!report.interrupted);
        assert_eq!(monitor.rounds(), 2);
    }

    #[tokio::test]
    async fn round_skips_everything_when_already_shut_down() {
        let (mut monitor, _) = monitor(&[false], 3);
        let (_tx, mut rx) = watch::channel(true);

        let report = monitor.run_round(&mut rx).await;
        assert!(report.interrupted);
        assert_eq!(report.visited, 0);
        assert_eq!(monitor.links()[0].consecutive_failures(), 0);
    }

    #[tokio::test]
    async fn shutdown_during_restart_keeps_recorded_failure() {
        let specs = [TunnelSpec::new("wg0", "10.0.0.1", TunnelSource::Argument)];
        let mut monitor = LinkMonitor::new(
            &specs,
            Box::new(FixedProbe(Mutex::new(VecDeque::from([false, false])))),
            Box::new(StuckRecovery),
            settings(1),
        );
        let (tx, mut rx) = watch::channel(false);

        assert_eq!(monitor.run_round(&mut rx).await.visited, 1);

        let (report, _) = tokio::join!(monitor.run_round(&mut rx), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            tx.send(true).unwrap();
        });
        assert!(report.interrupted);
        assert_eq!(report.visited, 0);
        assert_eq!(report.restarts, 0);
        assert_eq!(monitor.links()[0].consecutive_failures(), 2);
    }

    #[tokio::test]
    async fn run_returns_immediately_without_links() {
        let mut monitor = LinkMonitor::new(
            &[],
            Box::new(FixedProbe(Mutex::new(VecDeque::new()))),
            Box::new(CountingRecovery::default()),
            settings(3),
        );
        let (_tx, rx) = watch::channel(false);
        monitor.run(rx).await;
        assert_eq!(monitor.rounds(), 0);
    }

    #[tokio::test]
    async fn shutdown_ignores_dropped_sender() {
        let (tx, mut rx) = watch::channel(false);
        drop(tx);
        let waited = tokio::time::timeout(
            Duration::from_millis(20),
            shutdown_requested(&mut rx),
        )
        .await;
        assert!(waited.is_err());
    }
}
