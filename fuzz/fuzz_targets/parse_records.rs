#![no_main]

use fleetaudit::input::parse_records;
use fleetaudit::record::{IdentityKey, SystemRecords};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary dumps must never panic, only skip entries or fail
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok(records) = parse_records(input) {
            let _ = SystemRecords::identify(records, IdentityKey::Serial);
        }
    }
});
