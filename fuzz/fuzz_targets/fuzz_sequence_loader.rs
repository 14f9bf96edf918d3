#![no_main]

use libfuzzer_sys::fuzz_target;
use odmr_config::config::SynchroniserSpec;
use odmr_config::sequence::load_sequence;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(document) = load_sequence(text) {
        let synchroniser = SynchroniserSpec {
            kind: odmr_config::config::SynchroniserKind::PulseBlaster,
            config: Default::default(),
            channel_mapping: [("LASER".to_string(), 2), ("MW".to_string(), 3)]
                .into_iter()
                .collect(),
            extra: Default::default(),
        };
        let _ = document.check_against(&synchroniser);
    }
});
