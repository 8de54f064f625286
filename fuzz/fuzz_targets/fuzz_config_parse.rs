#![no_main]

use libfuzzer_sys::fuzz_target;

// Arbitrary TOML must either parse into a valid config or fail cleanly;
// it must never panic.
fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(config) = toml::from_str::<cartflow::Config>(text) {
            let _ = config.validate();
        }
    }
});
