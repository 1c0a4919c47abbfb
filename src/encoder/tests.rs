use super::*;
use crate::decoder::decode;
use crate::schema::{BaseType, EnumTable, TypeDescriptor};
use std::sync::Arc;

/// Rahmen mit korrekter Prüfsumme um den Inhalt legen.
fn framed(sync: char, content: &str) -> Vec<u8> {
    format!("{sync}{content}*{:08x}\r\n", crc32(content.as_bytes())).into_bytes()
}

fn demo_db() -> MessageDatabase {
    let states = Arc::new(EnumTable::from_pairs("StateKind", [(0, "OFF"), (1, "ON")]));
    let mut db = MessageDatabase::new();
    db.insert(MessageSchema::new(
        "DEMO",
        42,
        HeaderStyle::Standard,
        vec![
            FieldEntry::new(
                "counter",
                TypeDescriptor::simple(BaseType::UShort, ConversionSpec::Unsigned, 2),
            ),
            FieldEntry::with_enum("state", TypeDescriptor::enumeration(4), states),
        ],
    ));
    db
}

fn nested_db() -> MessageDatabase {
    let mut db = MessageDatabase::new();
    db.insert(MessageSchema::new(
        "NEST",
        50,
        HeaderStyle::Standard,
        vec![
            FieldEntry::with_children("records", TypeDescriptor::class_array(8), 2),
            FieldEntry::new(
                "a",
                TypeDescriptor::simple(BaseType::UShort, ConversionSpec::Unsigned, 2),
            ),
            FieldEntry::new(
                "b",
                TypeDescriptor::simple(BaseType::UShort, ConversionSpec::Unsigned, 2),
            ),
            FieldEntry::new(
                "tail",
                TypeDescriptor::simple(BaseType::UInt, ConversionSpec::Unsigned, 4),
            ),
        ],
    ));
    db
}

const DEMO_CONTENT: &str =
    "DEMOA,COM1,0,0.0,FINESTEERING,2209,250.000,00000000,0000,0;7,ON";

#[test]
fn demo_message_builds_the_binary_frame() {
    let db = demo_db();
    let e = encode(&db, &framed('#', DEMO_CONTENT)).unwrap();
    assert_eq!(e.kind, ConvertedKind::Complete);
    assert_eq!(e.bytes.len(), STANDARD_HEADER_LENGTH + 8 + 4);

    let h = StandardHeader::from_bytes(&e.bytes).unwrap();
    assert_eq!(h.message_id, 42);
    assert_eq!(h.port, 0x20);
    assert_eq!(h.time_status, 180);
    assert_eq!(h.week, 2209);
    assert_eq!(h.week_ms, 250_000);
    assert_eq!(h.length, 8);

    // counter, zwei Füllbytes, dann der Enum-Wert
    assert_eq!(&e.bytes[28..36], &[0x07, 0, 0, 0, 0x01, 0, 0, 0]);

    let crc = u32::from_le_bytes(e.bytes[36..40].try_into().unwrap());
    assert_eq!(crc, crc32(&e.bytes[..36]));
}

#[test]
fn abbreviated_header_converts_without_time() {
    let db = demo_db();
    let e = encode(&db, &framed('#', "DEMOA,COM1,0;7,ON")).unwrap();
    assert_eq!(e.kind, ConvertedKind::MissingTime);
    let h = StandardHeader::from_bytes(&e.bytes).unwrap();
    assert_eq!(h.week, 0);
    assert_eq!(h.week_ms, 0);
    assert_eq!(h.time_status, 0);
    assert_eq!(h.length, 8);
    assert_eq!(&e.bytes[28..30], &[0x07, 0]);
}

#[test]
fn corrupted_body_fails_the_checksum() {
    let db = demo_db();
    let mut msg = framed('#', DEMO_CONTENT);
    let i = msg.iter().position(|&b| b == b'7').unwrap();
    msg[i] = b'8';
    assert!(matches!(
        encode(&db, &msg),
        Err(Error::InvalidChecksum { .. })
    ));
}

#[test]
fn blank_and_empty_inputs() {
    let db = demo_db();
    assert_eq!(encode(&db, b"\r\n").unwrap_err(), Error::Blank);
    assert_eq!(encode(&db, b"").unwrap_err(), Error::Empty);
    assert_eq!(encode(&db, b", ,\t,").unwrap_err(), Error::Empty);
}

#[test]
fn response_is_passed_through() {
    let db = demo_db();
    let e = encode(&db, b"<OK\r\n").unwrap();
    assert_eq!(e.kind, ConvertedKind::Response);
    assert_eq!(e.bytes, b"<OK\r\n");
}

#[test]
fn missing_sync_character() {
    let db = demo_db();
    let r = encode(&db, b"DEMOA,COM1;7,ON*00000000");
    assert!(matches!(r, Err(Error::InvalidFormat(_))), "{r:?}");
}

#[test]
fn unknown_message_name_is_rejected() {
    let db = demo_db();
    assert_eq!(
        encode(&db, &framed('#', "NOPE;")).unwrap_err(),
        Error::InvalidMessageId("NOPE".to_string())
    );
}

#[test]
fn port_prefix_is_skipped() {
    let db = demo_db();
    let mut msg = b"[COM1]".to_vec();
    msg.extend_from_slice(&framed('#', DEMO_CONTENT));
    let e = encode(&db, &msg).unwrap();
    assert_eq!(e.kind, ConvertedKind::Complete);
}

#[test]
fn idle_and_seconds_fields_are_scaled() {
    let db = demo_db();
    let content = "DEMOA,COM1,3,12.5,FINESTEERING,2209,250.123,00000000,0000,0;7,ON";
    let e = encode(&db, &framed('#', content)).unwrap();
    let h = StandardHeader::from_bytes(&e.bytes).unwrap();
    assert_eq!(h.sequence, 3);
    assert_eq!(h.idle_time, 25);
    assert_eq!(h.week_ms, 250_123);
}

#[test]
fn array_count_above_maximum_is_rejected() {
    let db = nested_db();
    let content = "NESTA,COM1,0,0.0,FINESTEERING,2209,250.000,00000000,0000,0;9,1,2";
    let r = encode(&db, &framed('#', content));
    assert!(matches!(r, Err(Error::InvalidFormat(_))), "{r:?}");
}

#[test]
fn nested_class_array_round_trips() {
    let db = nested_db();
    let content = "NESTA,COM1,0,0.0,FINESTEERING,2209,250.000,00000000,0000,0;3,1,2,3,4,5,6,7";
    let msg = framed('#', content);
    let e = encode(&db, &msg).unwrap();

    assert_eq!(&e.bytes[28..32], &3u32.to_le_bytes());
    let h = StandardHeader::from_bytes(&e.bytes).unwrap();
    assert_eq!(h.length, 20);
    assert_eq!(&e.bytes[44..48], &7u32.to_le_bytes());

    let d = decode(&db, &e.bytes).unwrap();
    assert_eq!(d.text.as_bytes(), &msg[..]);
}

#[test]
fn unknown_enum_name_is_rejected() {
    let db = demo_db();
    let content = "DEMOA,COM1,0,0.0,FINESTEERING,2209,250.000,00000000,0000,0;7,MAYBE";
    let r = encode(&db, &framed('#', content));
    assert!(matches!(r, Err(Error::InvalidFormat(_))), "{r:?}");
}

#[test]
fn truncated_body_needs_more_fields() {
    let db = demo_db();
    let content = "DEMOA,COM1,0,0.0,FINESTEERING,2209,250.000,00000000,0000,0;7";
    assert_eq!(
        encode(&db, &framed('#', content)).unwrap_err(),
        Error::UnexpectedEndOfMessage
    );
}

#[test]
fn short_header_message() {
    let mut db = MessageDatabase::new();
    db.insert(MessageSchema::new(
        "MARK",
        44,
        HeaderStyle::Short,
        vec![FieldEntry::new(
            "offset",
            TypeDescriptor::simple(BaseType::Double, ConversionSpec::Float { after: 3 }, 8),
        )],
    ));
    let e = encode(&db, &framed('%', "MARKA,2209,250.000;1.500")).unwrap();
    let h = ShortHeader::from_bytes(&e.bytes).unwrap();
    assert_eq!(h.message_id, 44);
    assert_eq!(h.week, 2209);
    assert_eq!(h.week_ms, 250_000);
    assert_eq!(h.length, 8);
    assert_eq!(&e.bytes[12..20], &1.5f64.to_le_bytes());
}

#[test]
fn glonass_satellite_id_is_split_into_halves() {
    let systems = Arc::new(EnumTable::from_pairs(
        "SystemKind",
        [(0, "GPS"), (1, "GLONASS")],
    ));
    let mut db = MessageDatabase::new();
    db.insert(MessageSchema::new(
        "SAT",
        51,
        HeaderStyle::Standard,
        vec![
            FieldEntry::with_enum("system", TypeDescriptor::enumeration(4), systems),
            FieldEntry::new(
                "id",
                TypeDescriptor::simple(BaseType::SatelliteId, ConversionSpec::SatelliteId, 4),
            ),
        ],
    ));
    let content = "SATA,COM1,0,0.0,FINESTEERING,2209,250.000,00000000,0000,0;GLONASS,12-3";
    let e = encode(&db, &framed('#', content)).unwrap();
    assert_eq!(&e.bytes[28..32], &1i32.to_le_bytes());
    assert_eq!(&e.bytes[32..34], &12u16.to_le_bytes());
    assert_eq!(&e.bytes[34..36], &(-3i16).to_le_bytes());
}

#[test]
fn fixed_string_slot_is_zero_padded() {
    let mut db = MessageDatabase::new();
    db.insert(MessageSchema::new(
        "NAME",
        52,
        HeaderStyle::Standard,
        vec![FieldEntry::new("label", TypeDescriptor::fixed_string(8))],
    ));
    let content = "NAMEA,COM1,0,0.0,FINESTEERING,2209,250.000,00000000,0000,0;\"HI\"";
    let e = encode(&db, &framed('#', content)).unwrap();
    let h = StandardHeader::from_bytes(&e.bytes).unwrap();
    assert_eq!(h.length, 8);
    assert_eq!(&e.bytes[28..36], b"HI\0\0\0\0\0\0");
}

#[test]
fn inline_string_is_null_terminated() {
    let mut db = MessageDatabase::new();
    db.insert(MessageSchema::new(
        "TXT",
        56,
        HeaderStyle::Standard,
        vec![FieldEntry::new("text", TypeDescriptor::string(16))],
    ));
    let content = "TXTA,COM1,0,0.0,FINESTEERING,2209,250.000,00000000,0000,0;\"HELLO\"";
    let e = encode(&db, &framed('#', content)).unwrap();
    let h = StandardHeader::from_bytes(&e.bytes).unwrap();
    assert_eq!(h.length, 6);
    assert_eq!(&e.bytes[28..34], b"HELLO\0");
}

#[test]
fn message_id_field_carries_the_format_bits() {
    let mut db = demo_db();
    db.insert(MessageSchema::new(
        "REF",
        57,
        HeaderStyle::Standard,
        vec![FieldEntry::new(
            "target",
            TypeDescriptor::simple(BaseType::UInt, ConversionSpec::MessageId, 4),
        )],
    ));
    let content = "REFA,COM1,0,0.0,FINESTEERING,2209,250.000,00000000,0000,0;DEMOB";
    let e = encode(&db, &framed('#', content)).unwrap();
    assert_eq!(&e.bytes[28..32], &(42u32 | 1 << 16).to_le_bytes());

    let content = "REFA,COM1,0,0.0,FINESTEERING,2209,250.000,00000000,0000,0;DEMOA";
    let e = encode(&db, &framed('#', content)).unwrap();
    assert_eq!(&e.bytes[28..32], &42u32.to_le_bytes());
}

#[test]
fn bool_field_is_strict() {
    let mut db = MessageDatabase::new();
    db.insert(MessageSchema::new(
        "FLAG",
        58,
        HeaderStyle::Standard,
        vec![FieldEntry::new(
            "enabled",
            TypeDescriptor::simple(BaseType::Bool, ConversionSpec::Bool, 4),
        )],
    ));
    let head = "FLAGA,COM1,0,0.0,FINESTEERING,2209,250.000,00000000,0000,0;";
    let e = encode(&db, &framed('#', &format!("{head}TRUE"))).unwrap();
    assert_eq!(&e.bytes[28..32], &1u32.to_le_bytes());
    let r = encode(&db, &framed('#', &format!("{head}true")));
    assert!(matches!(r, Err(Error::InvalidFormat(_))), "{r:?}");
}
