#![no_main]

use libfuzzer_sys::fuzz_target;

use cartflow::domain::{Entity, EntityType};
use cartflow::resolver::ReferencePatterns;

// Reference detection over arbitrary entity text must never panic and
// must keep base confidences inside the documented band.
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let patterns = ReferencePatterns::new();
    let entity = Entity::new(EntityType::Product, text, 0.9, (0, text.len()));
    for reference in patterns.detect(&[entity]) {
        assert!((0.7..=0.9).contains(&reference.confidence));
    }
});
