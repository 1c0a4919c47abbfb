//! Direction dispatch.
//!
//! The single entry point callers use: pick a target representation,
//! hand over the buffer, get back the converted frame. A buffer that
//! is already in the target representation passes through untouched.

use crate::decoder;
use crate::encoder;
use crate::error::Result;
use crate::schema::MessageDatabase;

/// Target representation of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// To the comma-separated ASCII framing.
    ToText,
    /// To the binary framing.
    ToBinary,
}

/// Representation a buffer is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    Text,
    Binary,
}

/// Success-side classification of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertedKind {
    /// Fully converted.
    Complete,
    /// Converted, but the header carried no time fields (abbreviated
    /// input); week and seconds are zero.
    MissingTime,
    /// A receiver response, passed through rather than converted.
    Response,
    /// Input was already in the target representation.
    Unchanged,
}

/// A converted message.
#[derive(Debug, Clone)]
pub struct Converted {
    pub bytes: Vec<u8>,
    pub kind: ConvertedKind,
}

/// Converts one message into the target representation.
pub fn compose(
    db: &MessageDatabase,
    direction: Direction,
    representation: Representation,
    buf: &[u8],
) -> Result<Converted> {
    match (direction, representation) {
        (Direction::ToText, Representation::Text) | (Direction::ToBinary, Representation::Binary) => {
            Ok(Converted { bytes: buf.to_vec(), kind: ConvertedKind::Unchanged })
        }
        (Direction::ToText, Representation::Binary) => {
            let d = decoder::decode(db, buf)?;
            Ok(Converted { bytes: d.text.into_bytes(), kind: d.kind })
        }
        (Direction::ToBinary, Representation::Text) => {
            let e = encoder::encode(db, buf)?;
            Ok(Converted { bytes: e.bytes, kind: e.kind })
        }
    }
}
