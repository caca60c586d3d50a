use std::process::Command;

fn combined_output(output: &std::process::Output) -> String {
    let mut combined = String::new();
    combined.push_str(&String::from_utf8_lossy(&output.stdout));
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    combined
}

fn hark_bin() -> &'static str {
    option_env!("CARGO_BIN_EXE_hark").expect("hark test binary not built")
}

#[test]
fn hark_help_mentions_name() {
    let output = Command::new(hark_bin())
        .arg("--help")
        .output()
        .expect("run hark --help");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("hark"));
    assert!(combined.contains("--list-input-devices"));
}

#[test]
fn hark_list_input_devices_prints_message() {
    let output = Command::new(hark_bin())
        .arg("--list-input-devices")
        .output()
        .expect("run hark --list-input-devices");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(
        combined.contains("audio input devices")
            || combined.contains("Failed to list audio input devices")
    );
}

#[test]
fn hark_rejects_invalid_timing_arguments() {
    let output = Command::new(hark_bin())
        .args(["--record-timeout-ms", "0"])
        .output()
        .expect("run hark with zero timeout");
    assert!(!output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("--record-timeout-ms"));
}
