//! navlog – schema-driven codec for GNSS receiver logs
//!
//! Converts receiver messages between the compact binary framing
//! (sync bytes + fixed header + body + CRC-32) and the comma-separated
//! ASCII framing (`#NAME,...;field,field*crc\r\n`). Field layout is
//! driven by a runtime message database; the codec itself is
//! schema-agnostic.
//!
//! # Beispiel
//!
//! ```
//! use std::sync::Arc;
//! use navlog::schema::{
//!     BaseType, ConversionSpec, EnumTable, FieldEntry, MessageDatabase,
//!     MessageSchema, TypeDescriptor,
//! };
//! use navlog::header::{HeaderStyle, StandardHeader};
//! use navlog::{compose, Direction, Representation};
//!
//! // Message 42: a u16 counter and a state enum.
//! let states = Arc::new(EnumTable::from_pairs("StateKind", [(0, "OFF"), (1, "ON")]));
//! let mut db = MessageDatabase::new();
//! db.insert(MessageSchema::new(
//!     "DEMO",
//!     42,
//!     HeaderStyle::Standard,
//!     vec![
//!         FieldEntry::new(
//!             "counter",
//!             TypeDescriptor::simple(BaseType::UShort, ConversionSpec::Unsigned, 2),
//!         ),
//!         FieldEntry::with_enum("state", TypeDescriptor::enumeration(4), states),
//!     ],
//! ));
//!
//! // Binary frame: 28-byte header, 8-byte body, 4-byte CRC.
//! let mut header = StandardHeader::default();
//! header.message_id = 42;
//! header.port = 0x20; // COM1
//! header.time_status = 180; // FINESTEERING
//! header.length = 8;
//! let mut frame = header.to_bytes().to_vec();
//! frame.extend_from_slice(&[0x07, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00]);
//! let crc = navlog::crc32::crc32(&frame);
//! frame.extend_from_slice(&crc.to_le_bytes());
//!
//! let out = compose(&db, Direction::ToText, Representation::Binary, &frame).unwrap();
//! let text = String::from_utf8(out.bytes).unwrap();
//! assert!(text.starts_with("#DEMOA,COM1,"));
//! assert!(text.contains(";7,ON*"));
//! ```

pub mod composer;
pub mod crc32;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod header;
pub mod schema;
pub mod tokenizer;

pub use error::{Error, Result};

/// HashMap mit ahash (schneller, nicht DoS-resistent; nur für interne Datenstrukturen).
pub(crate) type FastHashMap<K, V> = hashbrown::HashMap<K, V, ahash::RandomState>;

/// IndexMap mit ahash (deterministische Iteration + schnelles Hashing).
pub(crate) type FastIndexMap<K, V> = indexmap::IndexMap<K, V, ahash::RandomState>;

// Public API: Composer
pub use composer::{compose, Converted, ConvertedKind, Direction, Representation};

// Public API: Richtungen einzeln
pub use decoder::{decode, Decoded};
pub use encoder::{encode, Encoded};

// Public API: Schema
pub use schema::{MessageDatabase, MessageSchema};
