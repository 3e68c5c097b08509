//! tunwatch-health — link checking and self-healing for tunnel interfaces.
//!
//! Probes each tunnel's peer gateway on a fixed cadence and restarts the
//! tunnel once it has stayed unreachable past a failure threshold.
//!
//! # Architecture
//!
//! ```text
//! LinkMonitor (one sequential loop)
//!   ├── LinkTracker per tunnel (failure count, last reachability)
//!   ├── Probe::probe(target) → bool
//!   └── RecoveryAction::restart(name) when the tracker asks for it
//! ```
//!
//! # Self-Healing
//!
//! A link that fails more than `threshold` consecutive probes is
//! restarted. With the default [`RestartPolicy::EveryTick`] the restart
//! is retried on every further failing round; a single successful probe
//! resets the count.
//!
//! [`RestartPolicy::EveryTick`]: tunwatch_core::RestartPolicy::EveryTick

pub mod checker;
pub mod monitor;
pub mod probe;
pub mod recovery;

use std::future::Future;
use std::pin::Pin;

pub use checker::{LinkEvent, LinkState, LinkTracker, TickOutcome};
pub use monitor::{LinkMonitor, MonitorSettings, RoundReport};
pub use probe::{PingProbe, Probe};
pub use recovery::{RecoveryAction, recovery_for};

/// Boxed future returned by the probe and recovery seams.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
