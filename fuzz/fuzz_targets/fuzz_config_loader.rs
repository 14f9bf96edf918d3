#![no_main]

use libfuzzer_sys::fuzz_target;
use odmr_config::config::RunSnapshot;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Any outcome is fine as long as loading does not panic.
    let _ = odmr_config::load(text);

    // Snapshot comparison parses the same text; keep it on a scratch path.
    let _ = RunSnapshot::at(std::env::temp_dir().join("odmr_config_fuzz.aux")).record(text);
});
