//! Gemeinsame Fixtures für die Integrationstests: eine kleine
//! Message-Datenbank im Stil der Empfänger-Firmware und Helfer zum
//! Rahmenbau.
#![allow(dead_code)]

use std::sync::Arc;

use navlog::crc32::crc32;
use navlog::header::{HeaderStyle, ShortHeader, StandardHeader};
use navlog::schema::{
    BaseType, ConversionSpec, EnumTable, FieldEntry, MessageDatabase, MessageSchema,
    TypeDescriptor,
};

pub const WEEK: u16 = 2209;
pub const WEEK_MS: u32 = 250_000;

/// Datenbank mit einer Handvoll Nachrichten, die zusammen alle
/// Feldarten abdecken.
pub fn database() -> MessageDatabase {
    let sol_status = Arc::new(EnumTable::from_pairs(
        "SolStatus",
        [(0, "SOL_COMPUTED"), (1, "INSUFFICIENT_OBS")],
    ));
    let pos_type = Arc::new(EnumTable::from_pairs(
        "PosType",
        [(16, "SINGLE"), (50, "NARROW_INT")],
    ));
    let systems = Arc::new(EnumTable::from_pairs(
        "SatelliteSystem",
        [(0, "GPS"), (1, "GLONASS"), (2, "GALILEO")],
    ));
    let components = Arc::new(EnumTable::from_pairs("ComponentType", [(1, "GPSCARD")]));
    let pass_ports = Arc::new(EnumTable::from_pairs("PassPort", [(1, "COM1_ALL")]));

    let mut db = MessageDatabase::new();

    db.insert(MessageSchema::new(
        "BESTPOS",
        42,
        HeaderStyle::Standard,
        vec![
            FieldEntry::with_enum("sol_status", TypeDescriptor::enumeration(4), sol_status),
            FieldEntry::with_enum("pos_type", TypeDescriptor::enumeration(4), pos_type),
            FieldEntry::new(
                "lat",
                TypeDescriptor::simple(
                    BaseType::Double,
                    ConversionSpec::SuperFloat { before: 3, after: 11 },
                    8,
                ),
            ),
            FieldEntry::new(
                "lon",
                TypeDescriptor::simple(
                    BaseType::Double,
                    ConversionSpec::SuperFloat { before: 3, after: 11 },
                    8,
                ),
            ),
            FieldEntry::new(
                "hgt",
                TypeDescriptor::simple(BaseType::Double, ConversionSpec::Float { after: 4 }, 8),
            ),
            FieldEntry::new(
                "undulation",
                TypeDescriptor::simple(BaseType::Float, ConversionSpec::Float { after: 4 }, 4),
            ),
            FieldEntry::new(
                "num_svs",
                TypeDescriptor::simple(BaseType::UChar, ConversionSpec::Unsigned, 1),
            ),
        ],
    ));

    db.insert(MessageSchema::new(
        "RANGE",
        43,
        HeaderStyle::Standard,
        vec![
            FieldEntry::with_children("records", TypeDescriptor::class_array(4), 3),
            FieldEntry::with_enum("system", TypeDescriptor::enumeration(4), systems),
            FieldEntry::new(
                "id",
                TypeDescriptor::simple(BaseType::SatelliteId, ConversionSpec::SatelliteId, 4),
            ),
            FieldEntry::new(
                "psr",
                TypeDescriptor::simple(BaseType::Double, ConversionSpec::Float { after: 3 }, 8),
            ),
        ],
    ));

    db.insert(MessageSchema::new(
        "VERSION",
        44,
        HeaderStyle::Standard,
        vec![
            FieldEntry::with_enum("comp_type", TypeDescriptor::enumeration(4), components),
            FieldEntry::new("model", TypeDescriptor::fixed_string(16)),
            FieldEntry::new("firmware", TypeDescriptor::string(16)),
        ],
    ));

    db.insert(MessageSchema::new(
        "INSPVAS",
        45,
        HeaderStyle::Short,
        vec![FieldEntry::new(
            "azimuth",
            TypeDescriptor::simple(BaseType::Double, ConversionSpec::Float { after: 3 }, 8),
        )],
    ));

    db.insert(MessageSchema::new(
        "MSGLIST",
        46,
        HeaderStyle::Standard,
        vec![FieldEntry::new(
            "ids",
            TypeDescriptor::var_array(BaseType::UInt, ConversionSpec::MessageId, 4, 8),
        )],
    ));

    db.insert(MessageSchema::new(
        "RXCONFIG",
        47,
        HeaderStyle::Standard,
        vec![FieldEntry::new("payload", TypeDescriptor::embedded())],
    ));

    db.insert(MessageSchema::new(
        "PASSCOM",
        48,
        HeaderStyle::Standard,
        vec![
            FieldEntry::with_enum("port", TypeDescriptor::enumeration(4), pass_ports),
            FieldEntry::new(
                "data",
                TypeDescriptor::var_array(BaseType::UChar, ConversionSpec::Passthrough, 1, 80),
            ),
        ],
    ));

    db
}

pub fn default_header(id: u16, body_len: u16) -> StandardHeader {
    StandardHeader {
        message_id: id,
        port: 0x20, // COM1
        time_status: 180, // FINESTEERING
        week: WEEK,
        week_ms: WEEK_MS,
        length: body_len,
        ..Default::default()
    }
}

pub fn frame_with_header(h: &StandardHeader, body: &[u8]) -> Vec<u8> {
    let mut v = h.to_bytes().to_vec();
    v.extend_from_slice(body);
    let crc = crc32(&v);
    v.extend_from_slice(&crc.to_le_bytes());
    v
}

pub fn standard_frame(id: u16, body: &[u8]) -> Vec<u8> {
    frame_with_header(&default_header(id, body.len() as u16), body)
}

pub fn short_frame(id: u16, body: &[u8]) -> Vec<u8> {
    let h = ShortHeader {
        length: body.len() as u8,
        message_id: id,
        week: WEEK,
        week_ms: WEEK_MS,
    };
    let mut v = h.to_bytes().to_vec();
    v.extend_from_slice(body);
    let crc = crc32(&v);
    v.extend_from_slice(&crc.to_le_bytes());
    v
}

/// ASCII-Rahmen mit korrekter Prüfsumme und CRLF.
pub fn text_frame(sync: char, content: &str) -> Vec<u8> {
    format!("{sync}{content}*{:08x}\r\n", crc32(content.as_bytes())).into_bytes()
}
