use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_path(file_name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("taskboard-{nanos}-{file_name}"))
}

fn write_store(path: &PathBuf, collections: serde_json::Value) {
    let content = serde_json::json!({
        "schema_version": 1,
        "collections": collections
    });
    std::fs::write(path, serde_json::to_string_pretty(&content).unwrap()).unwrap();
}

#[test]
fn show_missing_task_prints_empty_state() {
    let exe = env!("CARGO_BIN_EXE_taskboard");
    let store_path = temp_path("cli-show-missing.json");
    let config_path = temp_path("cli-show-missing-config.json");

    let output = Command::new(exe)
        .args(["show", "42"])
        .env("TASKBOARD_STORE_PATH", &store_path)
        .env("TASKBOARD_CONFIG_PATH", &config_path)
        .output()
        .expect("failed to run show command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("No task found with id 42"));
}

#[test]
fn show_expands_customer_resolver_and_comments() {
    let exe = env!("CARGO_BIN_EXE_taskboard");
    let store_path = temp_path("cli-show.json");
    let config_path = temp_path("cli-show-config.json");

    write_store(
        &store_path,
        serde_json::json!({
            "task-managements": {
                "next_id": 2,
                "records": [
                    {
                        "id": 1,
                        "issueDescription": "Calibrate scale",
                        "status": "To Do",
                        "priority": "Low",
                        "customer": 5,
                        "resolver": 3
                    }
                ]
            },
            "user2s": {
                "next_id": 6,
                "records": [ { "id": 5, "name": "Harbor Foods", "email": "ops@harbor.test" } ]
            },
            "users": {
                "next_id": 4,
                "records": [ { "id": 3, "username": "kim" } ]
            },
            "comments": {
                "next_id": 2,
                "records": [ { "id": 1, "content": "Parts arrive Friday", "task": 1, "author": 3 } ]
            }
        }),
    );

    let plain = Command::new(exe)
        .args(["show", "1"])
        .env("TASKBOARD_STORE_PATH", &store_path)
        .env("TASKBOARD_CONFIG_PATH", &config_path)
        .output()
        .expect("failed to run show command");
    let json = Command::new(exe)
        .args(["--json", "show", "1"])
        .env("TASKBOARD_STORE_PATH", &store_path)
        .env("TASKBOARD_CONFIG_PATH", &config_path)
        .output()
        .expect("failed to run show command");

    std::fs::remove_file(&store_path).ok();
    assert!(plain.status.success());
    let stdout = String::from_utf8_lossy(&plain.stdout);
    assert!(stdout.contains("#1 Calibrate scale"));
    assert!(stdout.contains("Harbor Foods"));
    assert!(stdout.contains("kim"));
    assert!(stdout.contains("Parts arrive Friday"));

    let parsed: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&json.stdout)).expect("json output");
    assert_eq!(parsed["customer"]["name"], "Harbor Foods");
    assert_eq!(parsed["resolver"]["username"], "kim");
    assert_eq!(parsed["comments"][0]["content"], "Parts arrive Friday");
}

#[test]
fn show_rejects_non_numeric_id() {
    let exe = env!("CARGO_BIN_EXE_taskboard");
    let output = Command::new(exe)
        .args(["show", "abc"])
        .output()
        .expect("failed to run show command");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: invalid_input - "));
}
