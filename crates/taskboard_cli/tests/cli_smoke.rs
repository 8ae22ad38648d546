use std::process::Command;

#[test]
fn cli_smoke_help() {
    let exe = env!("CARGO_BIN_EXE_taskboard");
    let output = Command::new(exe)
        .arg("--help")
        .output()
        .expect("failed to run taskboard --help");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("board"));
    assert!(stdout.contains("move"));
}

#[test]
fn cli_rejects_unknown_command() {
    let exe = env!("CARGO_BIN_EXE_taskboard");
    let output = Command::new(exe)
        .arg("archive")
        .output()
        .expect("failed to run taskboard archive");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("ERROR: invalid_input - "));
}
