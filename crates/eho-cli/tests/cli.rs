//! CLI command integration tests.
//! Each test that touches disk uses its own temp directory.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn eho_cmd() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("eho").unwrap();
    cmd.env_remove("EHO_CONFIG");
    cmd
}

/// Phases short enough that a few cycles finish in well under a second.
fn fast_config(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("fast.toml");
    std::fs::write(
        &path,
        "[cycle]\ningest_ms = 30\noptimize_ms = 30\ndispatch_ms = 20\nverify_ms = 10\n\n\
         [herd]\ntime_budget_ms = 20\n",
    )
    .unwrap();
    path
}

#[test]
fn query_brand_042() {
    eho_cmd()
        .args([
            "query",
            "hot dashboard lookup",
            "--identity",
            "brand-042",
            "--memory-type",
            "long-term",
            "--access-frequency",
            "hot",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("identity:    brand-042"))
        .stdout(predicate::str::contains("verified:    true"));
}

#[test]
fn query_json_has_forty_components() {
    let output = eho_cmd()
        .args(["query", "anything at all", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["coordinate"].as_array().map(Vec::len), Some(40));
    assert_eq!(json["payload"]["identity"], "default");
    let convergence = json["convergence"].as_f64().unwrap();
    assert!(convergence > 0.0 && convergence <= 1.0);
}

#[test]
fn sign_then_verify_and_tamper() {
    let dir = TempDir::new().unwrap();
    let output = eho_cmd()
        .args(["sign", "--identity", "brand-001", "--splat", "0.1"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let sig_path = dir.path().join("sig.json");
    std::fs::write(&sig_path, &output.stdout).unwrap();

    eho_cmd()
        .arg("verify")
        .arg(&sig_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("verified: true"));

    let mut tampered = vec!["0.1"; 39];
    tampered.push("0.2");
    eho_cmd()
        .arg("verify")
        .arg(&sig_path)
        .args(["--coordinate", &tampered.join(",")])
        .assert()
        .failure()
        .stdout(predicate::str::contains("verified: false"));
}

#[test]
fn sign_rejects_short_coordinate() {
    eho_cmd()
        .args(["sign", "--identity", "brand-001", "--coordinate", "0.1,0.2,0.3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("40 components"));
}

#[test]
fn digest_writes_4096_bytes() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("digest.bin");
    eho_cmd()
        .args(["digest", "--identity", "brand-001", "--splat", "0.1"])
        .args(["--metadata", r#"{"sector":"retail"}"#])
        .arg("--out")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("wrote 4096 bytes"));
    assert_eq!(std::fs::read(&out).unwrap().len(), 4096);
}

#[test]
fn digest_hex_prefix_is_stable() {
    let run = |splat: &str| {
        let output = eho_cmd()
            .args(["digest", "--identity", "brand-001", "--splat", splat])
            .output()
            .unwrap();
        assert!(output.status.success());
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    };
    let a = run("0.1");
    let b = run("0.7");
    assert_eq!(a.len(), 8192);
    assert_eq!(a[..64], b[..64]);
}

#[test]
fn run_fixed_cycles_reports_stats() {
    let dir = TempDir::new().unwrap();
    let config = fast_config(&dir);
    let output = eho_cmd()
        .arg("--config")
        .arg(&config)
        .args(["run", "--cycles", "3", "--submit", "first unit", "--submit", "second unit"])
        .args(["--identity", "brand-042"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stats: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(stats["cycle_count"], 3);
    assert_eq!(stats["ingested_units"], 2);
    assert_eq!(stats["active_identities"], 1);
}

#[test]
fn config_from_env() {
    let dir = TempDir::new().unwrap();
    let config = fast_config(&dir);
    eho_cmd()
        .env("EHO_CONFIG", &config)
        .args(["run", "--cycles", "1"])
        .timeout(std::time::Duration::from_secs(5))
        .assert()
        .success()
        .stdout(predicate::str::contains("\"cycle_count\": 1"));
}

#[test]
fn missing_config_fails() {
    eho_cmd()
        .args(["--config", "/nonexistent/eho.toml", "run", "--cycles", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load config"));
}

#[cfg(unix)]
#[test]
fn run_stops_on_sigint_at_cycle_boundary() {
    use std::process::Stdio;
    use std::time::{Duration, Instant};

    let dir = TempDir::new().unwrap();
    let config = fast_config(&dir);
    let child = std::process::Command::new(assert_cmd::cargo::cargo_bin!("eho"))
        .arg("--config")
        .arg(&config)
        .arg("run")
        .env_remove("EHO_CONFIG")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn eho run");

    std::thread::sleep(Duration::from_millis(500));
    unsafe {
        libc::kill(child.id() as libc::pid_t, libc::SIGINT);
    }

    let start = Instant::now();
    let output = child.wait_with_output().expect("wait");
    assert!(start.elapsed() < Duration::from_secs(2));
    assert!(output.status.success(), "got {}", output.status);
    let stats: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(stats["cycle_count"].as_u64().unwrap() >= 1);
}
