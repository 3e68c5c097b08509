//! Domain types shared by the registry, the health crate, and the daemon.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Name of a tunnel interface (e.g. `wg0`).
pub type TunnelName = String;

// ── Registry entries ───────────────────────────────────────────────

/// A monitored tunnel as produced by the registry.
///
/// Immutable once built; the health crate keeps its own mutable
/// per-tunnel state alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelSpec {
    /// Interface identifier passed to the recovery action.
    pub name: TunnelName,
    /// Address probed for reachability, usually the peer gateway.
    pub target: String,
    /// Where this entry was discovered.
    pub source: TunnelSource,
}

impl TunnelSpec {
    pub fn new(name: impl Into<String>, target: impl Into<String>, source: TunnelSource) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            source,
        }
    }
}

/// Origin of a registry entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TunnelSource {
    /// Parsed from a WireGuard `.conf` file.
    ConfigFile(PathBuf),
    /// Given as a `name=address` command-line argument.
    Argument,
    /// Listed under `[[tunnel]]` in `tunwatch.toml`.
    Static,
}

impl fmt::Display for TunnelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TunnelSource::ConfigFile(path) => write!(f, "{}", path.display()),
            TunnelSource::Argument => f.write_str("argument"),
            TunnelSource::Static => f.write_str("tunwatch.toml"),
        }
    }
}

/// A `[[tunnel]]` table in `tunwatch.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StaticTunnel {
    pub name: String,
    pub target: String,
}

// ── Platform ───────────────────────────────────────────────────────

/// Host platform, resolved once at startup to pick the probe flags and
/// the recovery action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Platform {
    Linux,
    Windows,
    Other(String),
}

impl Platform {
    /// The platform this binary was built for.
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    pub fn from_os(os: &str) -> Self {
        match os {
            "linux" => Platform::Linux,
            "windows" => Platform::Windows,
            other => Platform::Other(other.to_string()),
        }
    }

    pub fn is_windows(&self) -> bool {
        matches!(self, Platform::Windows)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Linux => f.write_str("linux"),
            Platform::Windows => f.write_str("windows"),
            Platform::Other(os) => f.write_str(os),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_from_os() {
        assert_eq!(Platform::from_os("linux"), Platform::Linux);
        assert_eq!(Platform::from_os("windows"), Platform::Windows);
        assert_eq!(
            Platform::from_os("macos"),
            Platform::Other("macos".to_string())
        );
        assert!(Platform::Windows.is_windows());
        assert!(!Platform::Linux.is_windows());
    }

    #[test]
    fn source_display() {
        let src = TunnelSource::ConfigFile(PathBuf::from("/etc/wireguard/wg0.conf"));
        assert_eq!(src.to_string(), "/etc/wireguard/wg0.conf");
        assert_eq!(TunnelSource::Argument.to_string(), "argument");
    }
}
