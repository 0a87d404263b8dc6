// ABOUTME: Integration tests for lanman-core.
// ABOUTME: Manifest isolation across device sets, write-once role files, and launching through a stub terminal.

use lanman_core::scope::McpManifest;
use lanman_core::{ensure_scope, launch, AppConfig, Category, Device, LanError, Space};
use std::collections::BTreeSet;
use std::path::Path;
use std::time::{Duration, Instant};

fn device(id: &str, port: u16) -> Device {
    Device {
        id: id.to_string(),
        name: id.to_uppercase(),
        address: format!("10.0.0.{port}"),
        port,
        description: String::new(),
        category: Category::Individual,
        icon: "computer".to_string(),
    }
}

fn lan_config(base: &Path) -> AppConfig {
    AppConfig::new(base)
        .with_device(device("nas", 10))
        .with_device(device("pi", 11))
        .with_device(device("router", 12))
}

fn read_manifest(space: &Space) -> McpManifest {
    let raw = std::fs::read_to_string(space.manifest_path()).unwrap();
    serde_json::from_str(&raw).unwrap()
}

// ============================================================================
// Scope Isolation Tests
// ============================================================================

#[test]
fn test_manifest_contains_exactly_resolvable_devices() {
    let cases: Vec<(Vec<&str>, Vec<&str>)> = vec![
        (vec![], vec![]),
        (vec!["nas"], vec!["nas-mcp"]),
        (vec!["nas", "pi", "router"], vec!["nas-mcp", "pi-mcp", "router-mcp"]),
        (vec!["ghost"], vec![]),
        (vec!["pi", "ghost", "nas"], vec!["nas-mcp", "pi-mcp"]),
        (vec!["pi", "pi"], vec!["pi-mcp"]),
    ];

    for (ids, expected) in cases {
        let tmp = tempfile::tempdir().unwrap();
        let config = lan_config(tmp.path())
            .with_space(Space::new("s", "S", tmp.path()).with_devices(ids.clone()));
        let space = config.space("s").unwrap();

        for _ in 0..2 {
            ensure_scope(&config, space).unwrap();
            let manifest = read_manifest(space);
            let keys: BTreeSet<_> = manifest.mcp_servers.keys().map(String::as_str).collect();
            let expected: BTreeSet<_> = expected.iter().copied().collect();
            assert_eq!(keys, expected, "device ids {ids:?}");
            for entry in manifest.mcp_servers.values() {
                assert_eq!(entry.transport, "http");
                assert!(entry.url.ends_with("/mcp"));
            }
        }
    }
}

#[test]
fn test_manifest_entry_urls() {
    let tmp = tempfile::tempdir().unwrap();
    let config = lan_config(tmp.path())
        .with_space(Space::new("nas", "NAS", tmp.path()).with_devices(["nas"]));
    let space = config.space("nas").unwrap();
    ensure_scope(&config, space).unwrap();

    let manifest = read_manifest(space);
    assert_eq!(manifest.mcp_servers["nas-mcp"].url, "http://10.0.0.10:10/mcp");
}

#[test]
fn test_manifest_replaces_stale_entries() {
    let tmp = tempfile::tempdir().unwrap();
    let config = lan_config(tmp.path())
        .with_space(Space::new("nas", "NAS", tmp.path()).with_devices(["nas"]));
    let space = config.space("nas").unwrap();

    std::fs::create_dir_all(space.root()).unwrap();
    std::fs::write(
        space.manifest_path(),
        r#"{"mcpServers": {"everything-mcp": {"type": "http", "url": "http://evil/mcp"}}}"#,
    )
    .unwrap();

    ensure_scope(&config, space).unwrap();
    let manifest = read_manifest(space);
    assert_eq!(manifest.mcp_servers.len(), 1);
    assert!(manifest.mcp_servers.contains_key("nas-mcp"));
}

#[test]
fn test_ensure_scope_creates_directories() {
    let tmp = tempfile::tempdir().unwrap();
    let base = tmp.path().join("deep").join("spaces");
    let config = lan_config(&base).with_space(Space::new("nas", "NAS", &base));
    let space = config.space("nas").unwrap();

    let report = ensure_scope(&config, space).unwrap();
    assert!(space.root().is_dir());
    assert!(space.logs_path().is_dir());
    assert!(report.role_written);
    assert_eq!(report.device_count, 0);

    // Directory creation is idempotent.
    ensure_scope(&config, space).unwrap();
}

#[test]
fn test_role_file_is_write_once() {
    let tmp = tempfile::tempdir().unwrap();
    let config = lan_config(tmp.path()).with_space(
        Space::new("lan", "LAN", tmp.path())
            .with_devices(["nas", "pi"])
            .with_category(Category::Consolidated),
    );
    let space = config.space("lan").unwrap();

    let first = ensure_scope(&config, space).unwrap();
    let role_before = std::fs::read(space.role_path()).unwrap();
    let manifest_before = std::fs::read(space.manifest_path()).unwrap();

    // Drop the manifest to prove the second call rewrites it.
    std::fs::remove_file(space.manifest_path()).unwrap();
    let second = ensure_scope(&config, space).unwrap();

    assert!(first.role_written);
    assert!(!second.role_written);
    assert_eq!(std::fs::read(space.role_path()).unwrap(), role_before);
    assert_eq!(std::fs::read(space.manifest_path()).unwrap(), manifest_before);
}

#[test]
fn test_role_file_user_edits_survive() {
    let tmp = tempfile::tempdir().unwrap();
    let config = lan_config(tmp.path())
        .with_space(Space::new("nas", "NAS", tmp.path()).with_devices(["nas"]));
    let space = config.space("nas").unwrap();

    ensure_scope(&config, space).unwrap();
    std::fs::write(space.role_path(), "# Custom role\n").unwrap();
    ensure_scope(&config, space).unwrap();
    assert_eq!(
        std::fs::read_to_string(space.role_path()).unwrap(),
        "# Custom role\n"
    );
}

// ============================================================================
// Launch Tests
// ============================================================================

#[cfg(unix)]
fn write_script(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = dir.join(name);
    std::fs::write(&script, body).unwrap();
    let mut perms = std::fs::metadata(&script).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&script, perms).unwrap();
    script
}

#[cfg(unix)]
fn stub_terminal(dir: &Path) -> std::path::PathBuf {
    write_script(
        dir,
        "stub-term",
        "#!/bin/sh\nout=\"$(dirname \"$0\")/argv.txt\"\npwd -P > \"$out.tmp\"\nprintf '%s\\n' \"$@\" >> \"$out.tmp\"\nmv \"$out.tmp\" \"$out\"\n",
    )
}

#[cfg(unix)]
fn wait_for(path: &Path) -> String {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if let Ok(contents) = std::fs::read_to_string(path) {
            return contents;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    panic!("{} never appeared", path.display());
}

#[cfg(unix)]
#[test]
fn test_launch_runs_terminal_with_strict_scope() {
    let tmp = tempfile::tempdir().unwrap();
    let bin = tmp.path().join("bin");
    std::fs::create_dir_all(&bin).unwrap();
    let terminal = stub_terminal(&bin);

    let base = tmp.path().join("spaces");
    let mut config = lan_config(&base)
        .with_space(Space::new("nas", "NAS", &base).with_devices(["nas"]));
    config.terminal_emulator = terminal.display().to_string();
    let space = config.space("nas").unwrap();

    let launched = launch(&config, space).unwrap();
    assert!(launched.session.pid > 0);
    assert_eq!(launched.session.terminal, config.terminal_emulator);
    assert_eq!(launched.scope.device_count, 1);

    let recorded = wait_for(&bin.join("argv.txt"));
    let lines: Vec<&str> = recorded.lines().collect();
    let cwd = std::fs::canonicalize(space.root()).unwrap();
    assert_eq!(Path::new(lines[0]), cwd.as_path());
    assert_eq!(lines[1], "-e");
    assert!(lines[2].starts_with("cd "));
    assert!(lines[2].contains("claude --strict-mcp-config --mcp-config"));
    assert!(lines[2].contains(".mcp.json"));
}

#[test]
fn test_launch_without_terminal_is_status_error() {
    let tmp = tempfile::tempdir().unwrap();
    let mut config = lan_config(tmp.path()).with_space(Space::new("nas", "NAS", tmp.path()));
    config.terminal_emulator = "definitely-not-a-terminal-xyz".to_string();
    let space = config.space("nas").unwrap();

    // Only meaningful when the fallback is not installed either.
    if which::which(lanman_core::terminal::FALLBACK_TERMINAL).is_ok() {
        return;
    }

    let err = launch(&config, space).unwrap_err();
    assert!(err.is_status());
    assert!(matches!(err, LanError::TerminalNotFound { ref tried } if tried.len() == 2));
    // Scope files are still in place for the next attempt.
    assert!(space.manifest_path().exists());
}

#[cfg(target_os = "linux")]
#[test]
fn test_launched_terminal_leads_its_own_session() {
    let tmp = tempfile::tempdir().unwrap();
    let bin = tmp.path().join("bin");
    std::fs::create_dir_all(&bin).unwrap();
    // Records the stat line of the terminal process itself.
    let terminal = write_script(
        &bin,
        "stat-term",
        "#!/bin/sh\nout=\"$(dirname \"$0\")/stat.txt\"\ncat /proc/$$/stat > \"$out.tmp\"\nmv \"$out.tmp\" \"$out\"\n",
    );

    let base = tmp.path().join("spaces");
    let mut config = lan_config(&base).with_space(Space::new("pi", "Pi", &base));
    config.terminal_emulator = terminal.display().to_string();
    let space = config.space("pi").unwrap();

    let launched = launch(&config, space).unwrap();
    let stat = wait_for(&bin.join("stat.txt"));

    // Fields after the command name: state, ppid, pgrp, session.
    let fields: Vec<i64> = stat
        .rsplit_once(')')
        .unwrap()
        .1
        .split_whitespace()
        .skip(2)
        .take(2)
        .map(|field| field.parse().unwrap())
        .collect();
    let pid = i64::from(launched.session.pid);
    assert_eq!(fields, vec![pid, pid], "terminal should lead a new session and group");

    let own_session = i64::from(unsafe { libc::getsid(0) });
    assert_ne!(fields[1], own_session);
}
