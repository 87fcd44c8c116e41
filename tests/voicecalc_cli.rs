use std::process::Command;

fn combined_output(output: &std::process::Output) -> String {
    let mut combined = String::new();
    combined.push_str(&String::from_utf8_lossy(&output.stdout));
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    combined
}

#[test]
fn voicecalc_help_mentions_service() {
    let output = Command::new(env!("CARGO_BIN_EXE_voicecalc"))
        .arg("--help")
        .output()
        .expect("run voicecalc --help");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("Voice calculator control service"));
    assert!(combined.contains("--stdin-feed"));
}

#[test]
fn voicecalc_list_input_devices_prints_message() {
    let output = Command::new(env!("CARGO_BIN_EXE_voicecalc"))
        .arg("--list-input-devices")
        .env("VOICECALC_TEST_DEVICES", "Test Mic,USB Array")
        .output()
        .expect("run voicecalc --list-input-devices");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("Available audio input devices"));
    assert!(combined.contains("USB Array"));
}

#[test]
fn voicecalc_rejects_invalid_tick() {
    let output = Command::new(env!("CARGO_BIN_EXE_voicecalc"))
        .args(["--tick-ms", "0", "--no-logs"])
        .output()
        .expect("run voicecalc --tick-ms 0");
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("--tick-ms"));
}

#[test]
fn client_help_mentions_reconnect_flags() {
    let output = Command::new(env!("CARGO_BIN_EXE_voicecalc-client"))
        .arg("--help")
        .output()
        .expect("run voicecalc-client --help");
    assert!(output.status.success());
    assert!(combined_output(&output).contains("--max-attempts"));
}
