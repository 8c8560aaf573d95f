// ==========================================
// 命令行端到端测试
// ==========================================
// 测试目标: 退出码、报表文件、--summary-json 输出
// ==========================================

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn run_cli(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_injection-audit"))
        .args(args)
        .current_dir(dir)
        .env("RUST_LOG", "warn")
        .env_remove("INJECTION_AUDIT_CONFIG")
        .output()
        .expect("Failed to run injection-audit")
}

const UNREACHABLE_GPDB: &str = r#"
[gpdb]
gpdb_user_name = audit
gpdb_pass = audit
gpdb_host = 127.0.0.1
gpdb_port = 1
gpdb_database = merit
gpdb_enums = 10,20

[injection]
start_ip = 10.1
injection_start_time = 2024-01-01 00:00:00
"#;

#[test]
fn test_missing_config_exits_with_error() {
    let dir = TempDir::new().unwrap();
    let output = run_cli(dir.path(), &["--config", "does-not-exist.ini"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(!dir.path().join("Stability_results.csv").exists());
}

#[test]
fn test_unreachable_source_still_writes_report() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("config.ini"), UNREACHABLE_GPDB).unwrap();

    let output = run_cli(dir.path(), &[]);
    assert_eq!(
        output.status.code(),
        Some(0),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let report = std::fs::read_to_string(dir.path().join("Stability_results.csv")).unwrap();
    assert_eq!(report, "Product Type,Total Received\r\n10,0\r\n20,0\r\n");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("GPDB Error"));
}

#[test]
fn test_summary_json_and_custom_output_path() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("audit.ini"), UNREACHABLE_GPDB).unwrap();

    let output = run_cli(
        dir.path(),
        &["--config", "audit.ini", "--output", "out.csv", "--summary-json"],
    );
    assert_eq!(output.status.code(), Some(0));
    assert!(dir.path().join("out.csv").exists());
    assert!(!dir.path().join("Stability_results.csv").exists());

    let summary: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout is not JSON");
    assert_eq!(summary["merged"].as_array().map(Vec::len), Some(2));
    assert_eq!(summary["sources"][0]["source"], "warehouse");
    assert_eq!(summary["sources"][0]["outcome"]["status"], "failed");
}

#[test]
fn test_missing_enums_key_is_fatal() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("config.ini"),
        "[ase]\nase_host = db1\n\n[injection]\nstart_ip = 10.1\ninjection_start_time = 2024-01-01 00:00:00\n",
    )
    .unwrap();

    let output = run_cli(dir.path(), &[]);
    assert_eq!(output.status.code(), Some(1));
    assert!(!dir.path().join("Stability_results.csv").exists());
}

#[test]
fn test_help_mentions_odbc_build_requirement() {
    let dir = TempDir::new().unwrap();
    let output = run_cli(dir.path(), &["--help"]);

    assert_eq!(output.status.code(), Some(0));
    let help = String::from_utf8_lossy(&output.stdout);
    assert!(help.contains("--features odbc"), "{}", help);
    assert!(help.contains("[ase]"), "{}", help);
}

#[cfg(not(feature = "odbc"))]
#[test]
fn test_default_build_warns_that_ase_is_unreachable() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("config.ini"),
        "[ase]\nase_user_name = sa\nase_pass = pw\nase_dsn = ASEDataSource\nase_enums = 7\n\n\
         [injection]\nstart_ip = 10.1\ninjection_start_time = 2024-01-01 00:00:00\n",
    )
    .unwrap();

    let output = run_cli(dir.path(), &[]);
    assert_eq!(output.status.code(), Some(0));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("未启用 odbc 特性"), "{}", stderr);
    let report = std::fs::read_to_string(dir.path().join("Stability_results.csv")).unwrap();
    assert_eq!(report, "Product Type,Total Received\r\n7,0\r\n");
}

#[test]
fn test_out_of_range_lookback_exits_with_config_error() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("config.ini"),
        format!("{}lookback_minutes = 9000000000000\n", UNREACHABLE_GPDB),
    )
    .unwrap();

    let output = run_cli(dir.path(), &[]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("lookback_minutes"));
    assert!(!dir.path().join("Stability_results.csv").exists());
}
