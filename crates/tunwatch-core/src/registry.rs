//! Tunnel discovery.
//!
//! Builds the list of monitored tunnels once at startup from three
//! sources: `name=address` arguments, `[[tunnel]]` entries in
//! `tunwatch.toml`, and WireGuard `*.conf` files in a config directory.

use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use ipnetwork::Ipv4Network;
use tracing::{error, info, warn};

use crate::config::Settings;
use crate::error::RegistryError;
use crate::types::{Platform, StaticTunnel, TunnelSource, TunnelSpec};

/// Deduplicated, ordered set of tunnels to monitor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    tunnels: Vec<TunnelSpec>,
}

impl Registry {
    /// Merge sources in precedence order. The first entry seen for a
    /// name wins; later duplicates are dropped.
    pub fn from_sources<I>(sources: I) -> Self
    where
        I: IntoIterator<Item = Vec<TunnelSpec>>,
    {
        let mut seen = HashSet::new();
        let mut tunnels = Vec::new();
        for spec in sources.into_iter().flatten() {
            if seen.insert(spec.name.clone()) {
                tunnels.push(spec);
            } else {
                warn!(tunnel = %spec.name, source = %spec.source, "duplicate tunnel ignored");
            }
        }
        Self { tunnels }
    }

    /// Build the registry for a platform.
    ///
    /// Explicit tunnels (arguments and `[[tunnel]]` tables) always take
    /// part. On Linux the config directory is scanned as well; elsewhere
    /// there is no standard location, so only explicit tunnels are used.
    pub fn discover(
        platform: &Platform,
        settings: &Settings,
        args: &[String],
    ) -> Result<Self, RegistryError> {
        let from_args = parse_tunnel_args(args);
        let from_file = static_tunnels(&settings.tunnels);

        let scanned = match platform {
            Platform::Linux if from_args.is_empty() && from_file.is_empty() => {
                scan_config_dir(&settings.config_dir)?
            }
            Platform::Linux | Platform::Windows => Vec::new(),
            Platform::Other(os) => {
                if from_args.is_empty() && from_file.is_empty() {
                    error!(%os, "unsupported platform, no tunnels can be discovered");
                }
                Vec::new()
            }
        };

        let registry = Self::from_sources([from_args, from_file, scanned]);
        for spec in registry.iter() {
            info!(tunnel = %spec.name, target = %spec.target, source = %spec.source, "found tunnel");
        }
        Ok(registry)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TunnelSpec> {
        self.tunnels.iter()
    }

    pub fn len(&self) -> usize {
        self.tunnels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tunnels.is_empty()
    }

    pub fn into_tunnels(self) -> Vec<TunnelSpec> {
        self.tunnels
    }
}

/// Parse `name=address` pairs. Only the first `=` splits.
pub fn parse_tunnel_args(args: &[String]) -> Vec<TunnelSpec> {
    let mut specs = Vec::new();
    for arg in args {
        match arg.split_once('=') {
            Some((name, target)) if !name.trim().is_empty() && !target.trim().is_empty() => {
                specs.push(TunnelSpec::new(
                    name.trim(),
                    target.trim(),
                    TunnelSource::Argument,
                ));
            }
            _ => error!(%arg, "malformed tunnel argument, expected name=address"),
        }
    }
    specs
}

fn static_tunnels(tunnels: &[StaticTunnel]) -> Vec<TunnelSpec> {
    tunnels
        .iter()
        .filter(|t| {
            let ok = !t.name.trim().is_empty() && !t.target.trim().is_empty();
            if !ok {
                error!(name = %t.name, target = %t.target, "incomplete [[tunnel]] entry skipped");
            }
            ok
        })
        .map(|t| TunnelSpec::new(t.name.trim(), t.target.trim(), TunnelSource::Static))
        .collect()
}

/// Scan `dir` for `*.conf` files, sorted by file name.
///
/// Files that cannot be read, or that have no usable IPv4 `Address`,
/// are logged and skipped.
pub fn scan_config_dir(dir: &Path) -> Result<Vec<TunnelSpec>, RegistryError> {
    let entries = std::fs::read_dir(dir).map_err(|source| RegistryError::ScanDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "conf"))
        .collect();
    files.sort();

    let mut specs = Vec::new();
    for path in files {
        match load_tunnel_file(&path) {
            Ok(spec) => specs.push(spec),
            Err(e) => error!(path = %path.display(), error = %e, "skipping tunnel config"),
        }
    }
    Ok(specs)
}

/// Load one WireGuard config file into a registry entry.
pub fn load_tunnel_file(path: &Path) -> Result<TunnelSpec, RegistryError> {
    let content = std::fs::read_to_string(path).map_err(|source| RegistryError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let addresses = interface_addresses(&content);
    if addresses.is_empty() {
        return Err(RegistryError::MissingAddress(path.to_path_buf()));
    }
    let gateway = gateway_for(&addresses.join(","))?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(TunnelSpec::new(
        name,
        gateway.to_string(),
        TunnelSource::ConfigFile(path.to_path_buf()),
    ))
}

/// Collect every `Address` value from the `[Interface]` section of an
/// INI-style WireGuard config. The key may repeat.
fn interface_addresses(content: &str) -> Vec<String> {
    let mut in_interface = false;
    let mut addresses = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            in_interface = section.trim().eq_ignore_ascii_case("interface");
            continue;
        }
        if !in_interface {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            if key.trim().eq_ignore_ascii_case("address") && !value.trim().is_empty() {
                addresses.push(value.trim().to_string());
            }
        }
    }
    addresses
}

/// Derive the tunnel gateway from an interface address: the first host
/// of the address's /24 (`10.0.0.2/24` becomes `10.0.0.1`).
///
/// A comma-separated list is accepted; the first IPv4 entry is used.
pub fn gateway_for(address: &str) -> Result<Ipv4Addr, RegistryError> {
    let network = address
        .split(',')
        .find_map(|part| part.trim().parse::<Ipv4Network>().ok())
        .ok_or_else(|| RegistryError::InvalidAddress(address.to_string()))?;

    let subnet = Ipv4Network::new(network.ip(), 24)
        .map_err(|_| RegistryError::InvalidAddress(address.to_string()))?;
    Ok(Ipv4Addr::from(u32::from(subnet.network()) + 1))
}
