#![no_main]
use libfuzzer_sys::fuzz_target;
use navlog_fuzz::db;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes as a binary frame must never panic.
    let _ = navlog::decode(db(), data);
});
