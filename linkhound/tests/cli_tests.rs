use std::process::Command;

fn linkhound() -> Command {
    Command::new(env!("CARGO_BIN_EXE_linkhound"))
}

#[test]
fn test_banner_stays_off_stdout() {
    let output = linkhound()
        .args(["scan", "-u", "not-a-url", "-f", "json"])
        .env("NO_COLOR", "1")
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("LINKHOUND"));
    assert!(stderr.contains("Invalid"));
}

#[test]
fn test_quiet_suppresses_banner() {
    let output = linkhound()
        .args(["-q", "scan", "-u", "not-a-url"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(!String::from_utf8_lossy(&output.stderr).contains("LINKHOUND"));
}
