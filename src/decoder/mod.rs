//! Binary → ASCII conversion.
//!
//! Parses the binary header, formats the text header from it, then
//! walks the schema fields over the body bytes. The text checksum is
//! computed over everything between the sync character and the `*`.

use core::fmt::Write as _;

use crate::composer::ConvertedKind;
use crate::crc32::{crc32, CrcMode};
use crate::error::{Error, Result};
use crate::header::{
    self, HeaderStyle, ShortHeader, StandardHeader, SHORT_HEADER_LENGTH, STANDARD_HEADER_LENGTH,
};
use crate::schema::{ConversionSpec, FieldEntry, MessageDatabase, MessageSchema, StorageKind};

mod value;


/// Result of a binary → ASCII conversion.
#[derive(Debug, Clone)]
pub struct Decoded {
    pub text: String,
    pub kind: ConvertedKind,
    /// Bytes of the input frame the conversion consumed (header, body
    /// and 4-byte CRC).
    pub consumed: usize,
}

/// Converts one binary frame to its ASCII form.
pub fn decode(db: &MessageDatabase, buf: &[u8]) -> Result<Decoded> {
    decode_with_mode(db, buf, CrcMode::Normal, true)
}

/// `outermost` controls the CRLF terminator; sub-messages spliced into
/// another frame carry none and use [`CrcMode::Flipped`].
pub(crate) fn decode_with_mode(
    db: &MessageDatabase,
    buf: &[u8],
    mode: CrcMode,
    outermost: bool,
) -> Result<Decoded> {
    let style = header::sniff_style(buf)?;
    let mut out = String::new();

    let (schema, header_len, body_len, message_type) = match style {
        HeaderStyle::Standard => {
            let h = StandardHeader::from_bytes(buf)?;
            let schema = db
                .find_variant(h.message_id, h.def_crc)
                .ok_or_else(|| Error::InvalidMessageId(h.message_id.to_string()))?;
            format_standard_header(&mut out, &schema.name, &h)?;
            (schema, STANDARD_HEADER_LENGTH, h.length as usize, h.message_type)
        }
        HeaderStyle::Short => {
            let h = ShortHeader::from_bytes(buf)?;
            let schema = db
                .find_by_id(h.message_id)
                .ok_or_else(|| Error::InvalidMessageId(h.message_id.to_string()))?;
            out.push('%');
            out.push_str(&schema.name);
            out.push('A');
            let _ = write!(out, ",{},{:.3};", h.week, h.week_ms as f64 / 1000.0);
            (schema, SHORT_HEADER_LENGTH, h.length as usize, 0u8)
        }
    };

    if buf.len() < header_len + body_len + 4 {
        return Err(Error::UnexpectedEndOfMessage);
    }
    let frame_end = header_len + body_len;

    let kind = if header::is_response(message_type) {
        // Antworten tragen rohen ASCII-Text als Body.
        for &b in &buf[header_len..frame_end] {
            if b == 0 {
                break;
            }
            out.push(b as char);
        }
        ConvertedKind::Response
    } else {
        let mut dec = FieldDecoder {
            db,
            schema: schema.as_ref(),
            reader: BinaryReader::new(&buf[..frame_end], header_len),
            out,
            param: 0,
            last_enum: None,
            source: header::measurement_source(message_type),
        };
        dec.run()?;
        out = dec.out;
        if out.ends_with(',') {
            out.pop();
        }
        ConvertedKind::Complete
    };

    let crc = mode.finish(crc32(&out.as_bytes()[1..]));
    let _ = write!(out, "*{crc:08x}");
    if outermost {
        out.push_str("\r\n");
    }

    Ok(Decoded { text: out, kind, consumed: frame_end + 4 })
}

fn format_standard_header(out: &mut String, name: &str, h: &StandardHeader) -> Result<()> {
    out.push('#');
    out.push_str(name);
    out.push('A');
    let source = header::measurement_source(h.message_type);
    if source > 0 {
        let _ = write!(out, "_{source}");
    }
    out.push(',');
    out.push_str(&header::port_name(h.port)?);
    let _ = write!(
        out,
        ",{},{:.1},{},{},{:.3},{:08x},{:04x},{};",
        h.sequence,
        h.idle_time as f64 / 2.0,
        header::time_status_name(h.time_status),
        h.week,
        h.week_ms as f64 / 1000.0,
        h.receiver_status,
        h.def_crc,
        h.sw_version,
    );
    Ok(())
}

// ============================================================================
// Read cursor
// ============================================================================

/// Byte cursor over one frame. Alignment pads to
/// `min(element_length, 4)`, the platform word cap of the wire format.
pub(crate) struct BinaryReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> BinaryReader<'a> {
    pub(crate) fn new(buf: &'a [u8], pos: usize) -> Self {
        Self { buf, pos }
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    pub(crate) fn align(&mut self, element_len: u32) {
        let a = element_len.clamp(1, 4) as usize;
        let rem = self.pos % a;
        if rem != 0 {
            self.pos += a - rem;
        }
    }

    pub(crate) fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.pos + n > self.buf.len() {
            return Err(Error::UnexpectedEndOfMessage);
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub(crate) fn tail(&self) -> &'a [u8] {
        &self.buf[self.pos.min(self.buf.len())..]
    }

    /// Advance by up to `n` bytes; trailing padding may step past the
    /// end of the frame, which simply ends the field walk.
    pub(crate) fn advance_clamped(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.buf.len());
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub(crate) fn read_i16(&mut self) -> Result<i16> {
        Ok(self.read_u16()? as i16)
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_u32()? as i32)
    }

    pub(crate) fn read_u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        Ok(u64::from_le_bytes(b.try_into().expect("8 bytes")))
    }

    pub(crate) fn read_unsigned(&mut self, len: u32) -> Result<u64> {
        match len {
            1 => Ok(self.read_u8()? as u64),
            2 => Ok(self.read_u16()? as u64),
            4 => Ok(self.read_u32()? as u64),
            8 => self.read_u64(),
            _ => Err(Error::format("unsupported integer width")),
        }
    }

    pub(crate) fn read_signed(&mut self, len: u32) -> Result<i64> {
        match len {
            1 => Ok(self.read_u8()? as i8 as i64),
            2 => Ok(self.read_i16()? as i64),
            4 => Ok(self.read_i32()? as i64),
            8 => Ok(self.read_u64()? as i64),
            _ => Err(Error::format("unsupported integer width")),
        }
    }

    pub(crate) fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    pub(crate) fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.read_u64()?))
    }
}

// ============================================================================
// Field walk
// ============================================================================

/// Walks the schema entries over the body bytes.
///
/// Nested records use structured recursion: a `ClassArray` makes
/// exactly `count × children` element conversions, rewinding the entry
/// cursor to the first child for every repetition, and resumes past
/// the whole child block afterwards.
struct FieldDecoder<'a> {
    db: &'a MessageDatabase,
    schema: &'a MessageSchema,
    reader: BinaryReader<'a>,
    out: String,
    param: usize,
    /// Last enum name rendered; a GLONASS system enum switches the
    /// following satellite id to its compound form.
    last_enum: Option<String>,
    source: u8,
}

impl<'a> FieldDecoder<'a> {
    fn field_limit(&self) -> usize {
        self.schema.field_count.min(self.schema.fields.len())
    }

    fn run(&mut self) -> Result<()> {
        let limit = self.field_limit();
        while self.param < limit && self.reader.pos() < self.reader.buf.len() {
            self.convert_entry()?;
        }
        Ok(())
    }

    fn convert_entry(&mut self) -> Result<()> {
        let schema = self.schema;
        let entry = &schema.fields[self.param];

        if entry.ty.spec == ConversionSpec::Embedded {
            self.param += 1;
            return self.embedded_to_text();
        }

        match entry.ty.kind {
            StorageKind::Class => {
                self.param += 1;
                self.convert_group(entry.children as usize)
            }
            StorageKind::ClassArray => {
                self.reader.align(4);
                let count = self.reader.read_u32()?;
                if count > entry.ty.array_len {
                    return Err(Error::format("record count exceeds declared maximum"));
                }
                let _ = write!(self.out, "{count},");
                self.param += 1;
                let first = self.param;
                let end = first + entry.children as usize;
                for _ in 0..count {
                    self.param = first;
                    self.convert_group(entry.children as usize)?;
                }
                self.param = end;
                Ok(())
            }
            StorageKind::VarArray => {
                self.reader.align(4);
                let count = self.reader.read_u32()?;
                if count > entry.ty.array_len {
                    return Err(Error::format("array count exceeds declared maximum"));
                }
                let _ = write!(self.out, "{count},");
                self.param += 1;
                self.convert_elements(entry, count)
            }
            StorageKind::FixedArray => {
                self.param += 1;
                self.convert_elements(entry, entry.ty.array_len)
            }
            StorageKind::String => {
                self.param += 1;
                self.inline_string_to_text(entry)
            }
            StorageKind::Enum => {
                self.param += 1;
                self.enum_to_text(entry)
            }
            StorageKind::Simple => {
                self.param += 1;
                self.simple_to_text(entry)
            }
        }
    }

    fn convert_group(&mut self, children: usize) -> Result<()> {
        let end = (self.param + children).min(self.field_limit());
        while self.param < end {
            self.convert_entry()?;
        }
        Ok(())
    }

    fn convert_elements(&mut self, entry: &FieldEntry, count: u32) -> Result<()> {
        match entry.ty.spec {
            ConversionSpec::HexBytes => self.hex_to_text(count),
            ConversionSpec::Passthrough => self.passthrough_to_text(count),
            ConversionSpec::String => self.string_block_to_text(entry, count),
            _ => {
                for _ in 0..count {
                    self.simple_to_text(entry)?;
                }
                Ok(())
            }
        }
    }
}
