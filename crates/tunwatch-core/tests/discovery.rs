//! Discovery tests against real WireGuard config directories.

use std::fs;
use std::path::PathBuf;

use tunwatch_core::registry::{load_tunnel_file, scan_config_dir};
use tunwatch_core::{Platform, Registry, RegistryError, Settings, StaticTunnel, TunnelSource};

const WG0: &str = "\
[Interface]
PrivateKey = aGVsbG8gd29ybGQgaGVsbG8gd29ybGQgaGVsbG8gd28=
Address = 10.0.0.2/24
DNS = 1.1.1.1

[Peer]
PublicKey = cGVlciBrZXkgcGVlciBrZXkgcGVlciBrZXkgcGVlcg==
Endpoint = vpn.example.com:51820
AllowedIPs = 0.0.0.0/0
";

const WG1: &str = "\
[Interface]
Address = 172.16.5.10/16, fd00::10/64
";

fn write(dir: &std::path::Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn scan_collects_conf_files_in_name_order() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "wg1.conf", WG1);
    write(dir.path(), "wg0.conf", WG0);
    write(dir.path(), "README.txt", "not a tunnel");

    let specs = scan_config_dir(dir.path()).unwrap();
    assert_eq!(specs.len(), 2);
    assert_eq!(specs[0].name, "wg0");
    assert_eq!(specs[0].target, "10.0.0.1");
    assert_eq!(specs[1].name, "wg1");
    assert_eq!(specs[1].target, "172.16.5.1");
    assert_eq!(
        specs[0].source,
        TunnelSource::ConfigFile(dir.path().join("wg0.conf"))
    );
}

#[test]
fn scan_skips_files_without_address() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "wg0.conf", WG0);
    write(dir.path(), "broken.conf", "[Interface]\nListenPort = 51820\n");
    write(dir.path(), "v6only.conf", "[Interface]\nAddress = fd00::2/64\n");

    let specs = scan_config_dir(dir.path()).unwrap();
    assert_eq!(specs.len(), 1);
    assert_eq!(specs[0].name, "wg0");
}

#[test]
fn load_uses_ipv4_from_later_address_line() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        dir.path(),
        "dual.conf",
        "[Interface]\nAddress = fd00::7/64\nAddress = 10.20.30.40/24\n",
    );
    let spec = load_tunnel_file(&path).unwrap();
    assert_eq!(spec.name, "dual");
    assert_eq!(spec.target, "10.20.30.1");
}

#[test]
fn load_reports_missing_address() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "empty.conf", "[Peer]\nAddress = 10.0.0.2/24\n");
    assert!(matches!(
        load_tunnel_file(&path),
        Err(RegistryError::MissingAddress(_))
    ));
}

#[test]
fn linux_discovery_scans_when_nothing_explicit() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "wg0.conf", WG0);
    let settings = Settings {
        config_dir: dir.path().to_path_buf(),
        ..Settings::default()
    };

    let registry = Registry::discover(&Platform::Linux, &settings, &[]).unwrap();
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.iter().next().unwrap().target, "10.0.0.1");
}

#[test]
fn linux_discovery_prefers_explicit_tunnels() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "wg0.conf", WG0);
    let settings = Settings {
        config_dir: dir.path().to_path_buf(),
        tunnels: vec![StaticTunnel {
            name: "office".to_string(),
            target: "10.50.0.1".to_string(),
        }],
        ..Settings::default()
    };

    let args = vec!["wg9=10.9.0.1".to_string(), "office=10.99.0.1".to_string()];
    let registry = Registry::discover(&Platform::Linux, &settings, &args).unwrap();
    let tunnels = registry.into_tunnels();

    assert_eq!(tunnels.len(), 2);
    assert_eq!(tunnels[0].name, "wg9");
    // Argument beats the [[tunnel]] entry with the same name.
    assert_eq!(tunnels[1].name, "office");
    assert_eq!(tunnels[1].target, "10.99.0.1");
}
