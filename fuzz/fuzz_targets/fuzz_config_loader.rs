#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parsing and validation must reject bad input with an error, never a panic.
    let Ok(cfg) = probe_config::load_toml(data) else {
        return;
    };
    if cfg.validate().is_ok() {
        // A validated config always resolves its probe sensor.
        assert!(cfg.probe_sensor().is_some());
        let _ = cfg.board_names();
    }
});
