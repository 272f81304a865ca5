use std::process::Command;

fn homelink() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_homelink"));
    cmd.env_remove("HOMELINK_LOG_FILE");
    cmd
}

#[test]
fn test_cli_help() {
    let output = homelink()
        .arg("--help")
        .output()
        .expect("Failed to execute homelink binary");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage: homelink"));
}

#[test]
fn test_cli_list_ports_json() {
    let output = homelink()
        .args(["--list-ports", "--json"])
        .output()
        .expect("Failed to execute homelink binary");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).expect("port list is JSON");
    assert!(parsed.is_array());
}

#[test]
fn test_cli_simulated_get() {
    let output = homelink()
        .args(["--simulate", "--board", "curtain", "--get", "--json"])
        .output()
        .expect("Failed to execute homelink binary");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let snapshot: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(snapshot["board"], "curtain");
    assert_eq!(snapshot["channels"][0]["channel"], "curtain_status");
    assert_eq!(snapshot["channels"][0]["value"], 40.0);
    assert_eq!(snapshot["channels"][2]["value"], 1013.0);
}

#[test]
fn test_cli_simulated_set() {
    let output = homelink()
        .args(["--simulate", "--board", "curtain", "--set", "33.3", "--json"])
        .output()
        .expect("Failed to execute homelink binary");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let result: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(result["channel"], "curtain_status");
    assert_eq!(result["requested"], 33.3);
    assert!(result["error"].is_null());
}

#[test]
fn test_cli_simulated_set_rejected() {
    // 64 does not fit six bits, so the board stores 0.5 and every read-back misses.
    let output = homelink()
        .args(["--simulate", "--board", "curtain", "--set", "64.5", "--json"])
        .output()
        .expect("Failed to execute homelink binary");

    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let result: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    assert!(result["accepted"].is_null());
    assert!(result["error"].is_string());
}

#[test]
fn test_cli_simulated_poll() {
    let output = homelink()
        .args(["--simulate", "--poll", "--duration", "0.5", "--json"])
        .output()
        .expect("Failed to execute homelink binary");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let last = stdout.lines().last().expect("at least one snapshot");
    let snapshot: serde_json::Value = serde_json::from_str(last).unwrap();
    assert_eq!(snapshot["board"], "air_conditioner");
    assert_eq!(snapshot["channels"][0]["value"], 22.5);
}

#[test]
fn test_cli_requires_port() {
    let output = homelink()
        .args(["--board", "ac", "--get"])
        .output()
        .expect("Failed to execute homelink binary");

    assert!(!output.status.success());
}

#[test]
fn test_cli_rejects_unbounded_duration() {
    let output = homelink()
        .args(["--simulate", "--poll", "--duration", "inf"])
        .output()
        .expect("Failed to execute homelink binary");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!stderr.contains("panicked"));
    assert!(stderr.contains("--duration"));
}
