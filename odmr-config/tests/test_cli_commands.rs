mod common;

use common::{fixture_path, spawn_command, stderr, stdout};

#[test]
fn validate_valid_config() {
    let config = fixture_path("odmr.yaml");
    let output = spawn_command(&["validate", config.to_str().unwrap()]);
    assert!(
        output.status.success(),
        "validate should succeed for valid config: {}",
        stderr(&output)
    );
    assert!(stdout(&output).contains("ok:"));
}

#[test]
fn validate_json_output() {
    let good = fixture_path("odmr.yaml");
    let bad = fixture_path("duplicate_channels.yaml");
    let output = spawn_command(&[
        "validate",
        "--format",
        "json",
        good.to_str().unwrap(),
        bad.to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(2));

    let parsed: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("output should be valid JSON");
    assert_eq!(parsed["summary"]["total"], 2);
    assert_eq!(parsed["summary"]["failed"], 1);
    assert_eq!(parsed["files"][0]["valid"], true);
    assert_eq!(parsed["files"][1]["valid"], false);
    assert!(
        parsed["files"][1]["errors"][0]
            .as_str()
            .unwrap()
            .contains("already assigned")
    );
}

#[test]
fn validate_missing_file() {
    let output = spawn_command(&["validate", "/tmp/nonexistent_odmr_config_test_file.yaml"]);
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains("file not found"));
}

#[test]
fn show_human() {
    let config = fixture_path("odmr.yaml");
    let output = spawn_command(&["show", config.to_str().unwrap()]);
    assert!(output.status.success(), "{}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("experiment_type: ODMR"), "{out}");
    assert!(out.contains("MW=3"), "{out}");
    assert!(out.contains("mw_source (WindFreak @ COM3)"), "{out}");
}

#[test]
fn show_json() {
    let config = fixture_path("odmr.yaml");
    let output = spawn_command(&["show", "--format", "json", config.to_str().unwrap()]);
    assert!(output.status.success(), "{}", stderr(&output));

    let parsed: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("output should be valid JSON");
    assert_eq!(parsed["experiment_type"], "ODMR");
    assert_eq!(parsed["sensor"]["type"], "DAQ");
    assert_eq!(parsed["sensor"]["config"]["number_measurements"], 20);
    assert_eq!(parsed["synchroniser"]["channel_mapping"]["MW"], 3);
    assert_eq!(parsed["dynamic_devices"]["mw_source"]["device_type"], "WindFreak");
    assert_eq!(parsed["pulse_sequence"]["laser_duration"], 3);
}

#[test]
fn show_invalid_config_exits_with_config_error() {
    let config = fixture_path("mismatched_steps.yaml");
    let output = spawn_command(&["show", config.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("inconsistent configuration"));
}

#[test]
fn sequence_valid() {
    let sequence = fixture_path("sequence.yaml");
    let config = fixture_path("odmr.yaml");
    let output = spawn_command(&[
        "sequence",
        sequence.to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stdout(&output).contains("2 blocks, 4 pulses"));
}

#[test]
fn sequence_invalid_json() {
    let sequence = fixture_path("bad_sequence.yaml");
    let config = fixture_path("odmr.yaml");
    let output = spawn_command(&[
        "sequence",
        sequence.to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
        "--format",
        "json",
    ]);
    assert_eq!(output.status.code(), Some(2));

    let parsed: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("output should be valid JSON");
    assert_eq!(parsed["valid"], false);
    let paths: Vec<&str> = parsed["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["path"].as_str().unwrap())
        .collect();
    assert_eq!(
        paths,
        [
            "sequencing_repeats",
            "sequencing_order[1]",
            "init.TRIGGER",
            "init.TRIGGER.t"
        ]
    );
}

#[test]
fn snapshot_detects_changes() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("odmr.yaml");
    std::fs::copy(fixture_path("odmr.yaml"), &config).unwrap();
    let path = config.to_str().unwrap();

    let first = spawn_command(&["snapshot", path]);
    assert!(first.status.success(), "{}", stderr(&first));
    assert_eq!(stdout(&first).trim(), "first");
    assert!(dir.path().join("odmr.aux").exists());

    let again = spawn_command(&["snapshot", path]);
    assert_eq!(stdout(&again).trim(), "unchanged");

    let text = std::fs::read_to_string(&config).unwrap();
    std::fs::write(&config, text.replace("averages: 5", "averages: 6")).unwrap();
    let changed = spawn_command(&["snapshot", path]);
    assert_eq!(stdout(&changed).trim(), "changed");
}

#[test]
fn completions_bash() {
    let output = spawn_command(&["completions", "bash"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("odmr-config"));
}

#[test]
fn version_json() {
    let output = spawn_command(&["version", "--format", "json"]);
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_str(stdout(&output).trim()).unwrap();
    assert_eq!(parsed["name"], "odmr-config");
}

#[test]
fn quiet_suppresses_non_error_output() {
    let config = fixture_path("unknown_key.yaml");
    let output = spawn_command(&["validate", "--quiet", config.to_str().unwrap()]);
    assert!(output.status.success());
    assert!(stdout(&output).is_empty(), "{}", stdout(&output));
    assert!(stderr(&output).is_empty(), "{}", stderr(&output));
}

#[test]
fn quiet_still_reports_failures() {
    let config = fixture_path("missing_field.yaml");
    let output = spawn_command(&["validate", "--quiet", config.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stdout(&output).contains("FAILED:"));
    assert!(stderr(&output).contains("error:"));
}

#[test]
fn missing_arguments_exit_with_usage_error() {
    let output = spawn_command(&["validate"]);
    assert_eq!(output.status.code(), Some(64));
    assert!(stderr(&output).contains("<FILES>"));
}

#[test]
fn invalid_option_value_exits_with_usage_error() {
    let config = fixture_path("odmr.yaml");
    let output = spawn_command(&["show", config.to_str().unwrap(), "--format", "xml"]);
    assert_eq!(output.status.code(), Some(64));
    assert!(stderr(&output).contains("xml"));
}

#[test]
fn help_exits_successfully() {
    let output = spawn_command(&["--help"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("validate"));
}
