use probe_config::load_toml;
use rstest::rstest;

const BASE: &str = r#"
[probe]
z_offset = 0.8
accel_chip = "adxl345"
deactivate_on_each_sample = false
activate_gcode = "M280 P0 S10"
deactivate_gcode = "M280 P0 S90"

[homing]
fallback_trigger_s = 8.0

[trsync]
single_board_timeout_s = 0.025
multi_board_timeout_s = 0.250

[[board]]
name = "mcu"
frequency = 16000000.0

[[sensor]]
name = "adxl345"
board = "mcu"
rate_hz = 400
batch_size = 8

[[stepper]]
name = "stepper_z"
board = "mcu"
axes = ["z"]
"#;

#[test]
fn accepts_complete_config() {
    let cfg = load_toml(BASE).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert!(!cfg.probe.deactivate_on_each_sample);
    assert_eq!(cfg.steppers.len(), 1);
    assert_eq!(cfg.board("mcu").map(|b| b.frequency), Some(16_000_000.0));
}

#[test]
fn rejects_missing_z_offset() {
    let toml = BASE.replace("z_offset = 0.8\n", "");
    let err = load_toml(&toml).expect_err("z_offset is required");
    assert!(err.to_string().contains("z_offset"));
}

#[test]
fn rejects_missing_accel_chip() {
    let toml = BASE.replace("accel_chip = \"adxl345\"\n", "");
    assert!(load_toml(&toml).is_err());
}

#[rstest]
#[case("accel_chip = \"adxl345\"", "accel_chip = \"lis2dw\"", "does not match any [[sensor]]")]
#[case("fallback_trigger_s = 8.0", "fallback_trigger_s = 0.0", "fallback_trigger_s must be > 0")]
#[case("single_board_timeout_s = 0.025", "single_board_timeout_s = 0.5", "must not exceed")]
#[case("multi_board_timeout_s = 0.250", "multi_board_timeout_s = -1.0", "multi_board_timeout_s must be > 0")]
#[case("rate_hz = 400", "rate_hz = 0", "rate_hz must be > 0")]
#[case("batch_size = 8", "batch_size = 0", "batch_size must be >= 1")]
#[case("axes = [\"z\"]", "axes = [\"q\"]", "unknown axis")]
#[case("axes = [\"z\"]", "axes = []", "at least one axis")]
#[case("frequency = 16000000.0", "frequency = 0.0", "frequency must be > 0")]
fn rejects_invalid_values(#[case] from: &str, #[case] to: &str, #[case] needle: &str) {
    let toml = BASE.replace(from, to);
    let cfg = load_toml(&toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should be rejected");
    assert!(
        err.to_string().contains(needle),
        "expected '{needle}' in '{err}'"
    );
}

#[test]
fn rejects_unknown_rotation() {
    let toml = format!("{BASE}\n[logging]\nrotation = \"weekly\"\n");
    let cfg = load_toml(&toml).expect("parse TOML");
    let err = cfg.validate().expect_err("weekly is not supported");
    assert!(err.to_string().contains("logging.rotation"));
}

#[test]
fn rejects_duplicate_board() {
    let toml = format!("{BASE}\n[[board]]\nname = \"mcu\"\n");
    let cfg = load_toml(&toml).expect("parse TOML");
    let err = cfg.validate().expect_err("duplicate board");
    assert!(err.to_string().contains("declared twice"));
}
