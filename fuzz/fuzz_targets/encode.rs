#![no_main]
use libfuzzer_sys::fuzz_target;
use navlog_fuzz::db;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes as an ASCII message must never panic.
    let _ = navlog::encode(db(), data);
});
