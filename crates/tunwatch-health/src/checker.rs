//! Per-link failure tracking.
//!
//! [`LinkTracker`] is the state machine for one tunnel: it takes the
//! result of a single probe and decides which notifications to emit and
//! whether the tunnel must be restarted. It performs no I/O.

use tunwatch_core::{RestartPolicy, TunnelSpec};

/// Derived state of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No probe has succeeded or failed yet.
    Pending,
    /// The last probe succeeded.
    Up,
    /// Failing, but the count is still within the threshold.
    DegradedCounting,
    /// Failing past the threshold; recovery has been requested.
    FailedRecovering,
}

/// Notification produced by a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// The link became reachable after being down (or on the first
    /// successful probe after start).
    Recovered,
    /// First failure of an episode.
    Disconnected,
    /// Emitted on every failing tick.
    Waiting { count: u32 },
    /// The count exceeded the threshold and a restart was requested.
    Restarting { count: u32 },
}

/// What the monitor must do after a tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// Events in emission order.
    pub events: Vec<LinkEvent>,
    /// Whether the recovery action must be invoked.
    pub restart: bool,
}

/// Tracks consecutive probe results for a single tunnel.
#[derive(Debug, Clone)]
pub struct LinkTracker {
    name: String,
    target: String,
    /// Consecutive failed probes since the last success.
    consecutive_failures: u32,
    /// Reachability seen on the previous tick.
    was_reachable: bool,
    /// Failures tolerated before recovery (strict `>`).
    threshold: u32,
    policy: RestartPolicy,
}

impl LinkTracker {
    pub fn new(spec: &TunnelSpec, threshold: u32, policy: RestartPolicy) -> Self {
        Self {
            name: spec.name.clone(),
            target: spec.target.clone(),
            consecutive_failures: 0,
            was_reachable: false,
            threshold,
            policy,
        }
    }

    /// Record a probe result.
    pub fn record(&mut self, reachable: bool) -> TickOutcome {
        let mut outcome = TickOutcome::default();

        if reachable {
            if !self.was_reachable {
                outcome.events.push(LinkEvent::Recovered);
            }
            self.consecutive_failures = 0;
            self.was_reachable = true;
            return outcome;
        }

        let previous = self.consecutive_failures;
        self.consecutive_failures = previous.saturating_add(1);
        let count = self.consecutive_failures;

        if count == 1 {
            outcome.events.push(LinkEvent::Disconnected);
        }
        outcome.events.push(LinkEvent::Waiting { count });

        if count > self.threshold {
            let fire = match self.policy {
                RestartPolicy::EveryTick => true,
                RestartPolicy::OncePerEpisode => previous <= self.threshold,
            };
            if fire {
                outcome.events.push(LinkEvent::Restarting { count });
                outcome.restart = true;
            }
        }

        self.was_reachable = false;
        outcome
    }

    pub fn state(&self) -> LinkState {
        match (self.consecutive_failures, self.was_reachable) {
            (0, true) => LinkState::Up,
            (0, false) => LinkState::Pending,
            (n, _) if n > self.threshold => LinkState::FailedRecovering,
            _ => LinkState::DegradedCounting,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn was_reachable(&self) -> bool {
        self.was_reachable
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }
}
