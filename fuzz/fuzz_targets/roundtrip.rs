#![no_main]
use libfuzzer_sys::fuzz_target;
use navlog::ConvertedKind;
use navlog_fuzz::db;

fuzz_target!(|data: &[u8]| {
    // Text that encodes must decode again, and the re-encoded frame
    // must be byte-identical.
    let Ok(first) = navlog::encode(db(), data) else {
        return;
    };
    if first.kind != ConvertedKind::Complete {
        return;
    }
    let decoded = navlog::decode(db(), &first.bytes).expect("encoded frame must decode");
    if let Ok(second) = navlog::encode(db(), decoded.text.as_bytes()) {
        assert_eq!(second.bytes, first.bytes);
    }
});
