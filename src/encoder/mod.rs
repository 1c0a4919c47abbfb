//! ASCII → binary conversion.
//!
//! Validates the text checksum eagerly, extracts the header fields,
//! then walks the schema entries over the tokenized body. The body
//! length is patched back into the emitted header once the high-water
//! mark is known; the CRC goes over header plus body.

use crate::composer::ConvertedKind;
use crate::crc32::{crc32, CrcMode};
use crate::error::{Error, Result};
use crate::header::{
    self, HeaderStyle, ShortHeader, StandardHeader, SHORT_HEADER_LENGTH, SHORT_TEXT_SYNC,
    STANDARD_HEADER_LENGTH, TEXT_SYNC,
};
use crate::schema::{ConversionSpec, FieldEntry, MessageDatabase, MessageSchema, StorageKind};
use crate::tokenizer::{Boundary, Tokenizer, CHECKSUM_PREFIX, HEADER_TERMINATOR};

mod value;

#[cfg(test)]
mod tests;

/// Result of an ASCII → binary conversion.
#[derive(Debug, Clone)]
pub struct Encoded {
    pub bytes: Vec<u8>,
    pub kind: ConvertedKind,
}

/// Converts one ASCII message to its binary frame.
pub fn encode(db: &MessageDatabase, text: &[u8]) -> Result<Encoded> {
    encode_with_mode(db, text, CrcMode::Normal)
}

/// `CrcMode::Flipped` is used when re-encoding a sub-message spliced
/// inside an outer frame.
pub(crate) fn encode_with_mode(
    db: &MessageDatabase,
    text: &[u8],
    mode: CrcMode,
) -> Result<Encoded> {
    let Some(&first) = text.first() else {
        return Err(Error::Empty);
    };
    if first == b'\r' || first == b'\n' {
        return Err(Error::Blank);
    }

    // Ein "[PORT]"-Präfix vor dem Sync-Zeichen wird übersprungen.
    let mut start = 0;
    if first == b'[' {
        match memchr::memchr(b']', text) {
            Some(p) => start = p + 1,
            None => return Err(Error::format("unterminated port prefix")),
        }
    }
    if start >= text.len()
        || text[start..]
            .iter()
            .all(|&b| matches!(b, b',' | b' ' | b'\t' | b'\r' | b'\n' | 0))
    {
        return Err(Error::Empty);
    }

    // Antworten werden unverändert durchgereicht.
    if text[start] == b'<' {
        return Ok(Encoded { bytes: text.to_vec(), kind: ConvertedKind::Response });
    }

    let style = match text[start] {
        TEXT_SYNC => HeaderStyle::Standard,
        SHORT_TEXT_SYNC => HeaderStyle::Short,
        _ => return Err(Error::format("missing sync character")),
    };

    // Nachricht endet am CR oder am Pufferende.
    let body = &text[start + 1..];
    let end = memchr::memchr(b'\r', body).unwrap_or(body.len());
    let content = &body[..end];

    // Prüfsumme zuerst, noch vor dem Schema-Lookup.
    if content.len() < 9 {
        return Err(Error::UnexpectedEndOfMessage);
    }
    let crc_start = content.len() - 8;
    if content[crc_start - 1] != CHECKSUM_PREFIX {
        return Err(Error::format("missing checksum delimiter"));
    }
    let written = parse_crc_digits(&content[crc_start..])?;
    let carried = mode.finish(written);
    let computed = crc32(&content[..crc_start - 1]);
    if computed != carried {
        return Err(Error::InvalidChecksum { expected: carried, computed });
    }

    // Felder ohne "*crc"-Anhang
    let mut tok = Tokenizer::new(&content[..crc_start - 1]);

    let name_token = tok.next_field()?;
    if name_token.text.is_empty() {
        return Err(Error::format("missing message name"));
    }
    let mut name = as_str(name_token.text)?;
    let mut source = 0u8;
    if let Some(base) = name.strip_suffix("_1") {
        name = base;
        source = 1;
    }
    let schema = db
        .resolve_name(name)
        .ok_or_else(|| Error::InvalidMessageId(name.to_string()))?;
    let name_terminated = match name_token.boundary {
        Boundary::HeaderTerminator => true,
        Boundary::Separator => false,
        Boundary::PastEnd => return Err(Error::UnexpectedEndOfMessage),
    };

    let mut writer = BinaryWriter::new();
    let (schema, header_len, kind) = match style {
        HeaderStyle::Standard => {
            let mut h = StandardHeader {
                message_id: schema.id,
                message_type: source,
                ..Default::default()
            };
            let last_field = parse_standard_header_fields(&mut tok, &mut h, name_terminated)?;
            // Ab dem Sekundenfeld abgeschnitten: Zeit fehlt.
            let kind = if last_field < 7 {
                ConvertedKind::MissingTime
            } else {
                ConvertedKind::Complete
            };
            let schema = db.find_variant(schema.id, h.def_crc).unwrap_or(schema);
            writer.write_bytes(&h.to_bytes());
            (schema, STANDARD_HEADER_LENGTH, kind)
        }
        HeaderStyle::Short => {
            let mut h = ShortHeader { message_id: schema.id, ..Default::default() };
            let last_field = parse_short_header_fields(&mut tok, &mut h, name_terminated)?;
            let kind = if last_field < 3 {
                ConvertedKind::MissingTime
            } else {
                ConvertedKind::Complete
            };
            writer.write_bytes(&h.to_bytes());
            (schema, SHORT_HEADER_LENGTH, kind)
        }
    };

    let mut enc = FieldEncoder {
        db,
        schema: schema.as_ref(),
        tok,
        writer,
        param: 0,
        last_enum: None,
    };
    enc.run()?;
    writer = enc.writer;

    // Bodylänge zurückschreiben, dann Prüfsumme über Header + Body.
    let body_len = writer.high_water.saturating_sub(header_len);
    match style {
        HeaderStyle::Standard => writer.patch(8, &(body_len as u16).to_le_bytes()),
        HeaderStyle::Short => writer.patch(3, &[body_len as u8]),
    }
    let mut bytes = writer.buf;
    bytes.truncate(writer.high_water.max(header_len));
    let crc = mode.finish(crc32(&bytes));
    bytes.extend_from_slice(&crc.to_le_bytes());

    Ok(Encoded { bytes, kind })
}

pub(super) fn as_str(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|_| Error::format("field is not valid UTF-8"))
}

fn parse_crc_digits(digits: &[u8]) -> Result<u32> {
    let s = as_str(digits)?;
    u32::from_str_radix(s, 16).map_err(|_| Error::format("checksum is not 8 hex digits"))
}

// ============================================================================
// Header fields
// ============================================================================

/// Parses the nine standard header fields after the name. A `;` before
/// field 10 leaves the remaining fields zeroed (abbreviated header);
/// the returned number is the last field actually present.
fn parse_standard_header_fields(
    tok: &mut Tokenizer<'_>,
    h: &mut StandardHeader,
    name_terminated: bool,
) -> Result<usize> {
    let mut terminated = name_terminated;
    let mut last_field = if terminated { 1 } else { 10 };
    for field_no in 2..=10 {
        let text: &[u8] = if terminated {
            b""
        } else {
            let t = tok.next_field()?;
            match t.boundary {
                Boundary::HeaderTerminator => {
                    terminated = true;
                    last_field = field_no;
                }
                Boundary::PastEnd => return Err(Error::UnexpectedEndOfMessage),
                Boundary::Separator => {}
            }
            t.text
        };
        if last_field < field_no {
            continue;
        }
        let s = as_str(text)?;
        match field_no {
            2 => h.port = header::port_code(s),
            3 => h.sequence = parse_dec(s, "sequence")?,
            4 => h.idle_time = (parse_float(s, "idle time")? * 2.0).round() as u8,
            5 => {
                h.time_status = header::time_status_value(s)
                    .ok_or_else(|| Error::format("unknown time status"))?;
            }
            6 => h.week = parse_dec(s, "week")?,
            7 => h.week_ms = (parse_float(s, "seconds")? * 1000.0).round() as u32,
            8 => {
                h.receiver_status = u32::from_str_radix(s, 16)
                    .map_err(|_| Error::format("receiver status is not hex"))?;
            }
            9 => {
                h.def_crc = u16::from_str_radix(s, 16)
                    .map_err(|_| Error::format("definition crc is not hex"))?;
            }
            10 => h.sw_version = parse_dec(s, "software version")?,
            _ => unreachable!(),
        }
    }
    if !terminated {
        let rest = tok.rest();
        match memchr::memchr(HEADER_TERMINATOR, rest) {
            Some(p) => tok.seek(tok.pos() + p + 1),
            None => return Err(Error::format("missing header terminator")),
        }
    }
    Ok(last_field)
}

fn parse_short_header_fields(
    tok: &mut Tokenizer<'_>,
    h: &mut ShortHeader,
    name_terminated: bool,
) -> Result<usize> {
    let mut terminated = name_terminated;
    let mut last_field = if terminated { 1 } else { 3 };
    for field_no in 2..=3 {
        let text: &[u8] = if terminated {
            b""
        } else {
            let t = tok.next_field()?;
            match t.boundary {
                Boundary::HeaderTerminator => {
                    terminated = true;
                    last_field = field_no;
                }
                Boundary::PastEnd => return Err(Error::UnexpectedEndOfMessage),
                Boundary::Separator => {}
            }
            t.text
        };
        if last_field < field_no {
            continue;
        }
        let s = as_str(text)?;
        match field_no {
            2 => h.week = parse_dec(s, "week")?,
            3 => h.week_ms = (parse_float(s, "seconds")? * 1000.0).round() as u32,
            _ => unreachable!(),
        }
    }
    if !terminated {
        let rest = tok.rest();
        match memchr::memchr(HEADER_TERMINATOR, rest) {
            Some(p) => tok.seek(tok.pos() + p + 1),
            None => return Err(Error::format("missing header terminator")),
        }
    }
    Ok(last_field)
}

fn parse_dec<T: std::str::FromStr>(s: &str, what: &'static str) -> Result<T> {
    s.parse().map_err(|_| Error::format(what))
}

fn parse_float(s: &str, what: &'static str) -> Result<f64> {
    s.parse().map_err(|_| Error::format(what))
}

// ============================================================================
// Write cursor
// ============================================================================

/// Growable write cursor with a separate high-water mark: alignment
/// and string padding move `pos` without extending the recorded body
/// length, only actual writes (and reserved fixed slots) do.
pub(crate) struct BinaryWriter {
    buf: Vec<u8>,
    pos: usize,
    high_water: usize,
}

impl BinaryWriter {
    pub(crate) fn new() -> Self {
        Self { buf: Vec::new(), pos: 0, high_water: 0 }
    }

    fn ensure(&mut self, end: usize) {
        if self.buf.len() < end {
            self.buf.resize(end, 0);
        }
    }

    fn bump(&mut self, end: usize) {
        if end > self.high_water {
            self.high_water = end;
        }
    }

    pub(crate) fn align(&mut self, element_len: u32) {
        let a = element_len.clamp(1, 4) as usize;
        let rem = self.pos % a;
        if rem != 0 {
            self.pos += a - rem;
        }
    }

    pub(crate) fn write_bytes(&mut self, bytes: &[u8]) {
        let end = self.pos + bytes.len();
        self.ensure(end);
        self.buf[self.pos..end].copy_from_slice(bytes);
        self.pos = end;
        self.bump(end);
    }

    /// Extends the recorded body length to `end` without writing;
    /// the bytes stay zero (fixed string slots).
    pub(crate) fn reserve_to(&mut self, end: usize) {
        self.ensure(end);
        self.bump(end);
    }

    pub(crate) fn patch(&mut self, at: usize, bytes: &[u8]) {
        self.buf[at..at + bytes.len()].copy_from_slice(bytes);
    }

    pub(crate) fn put_u8(&mut self, v: u8) {
        self.write_bytes(&[v]);
    }

    pub(crate) fn put_u16(&mut self, v: u16) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub(crate) fn put_i16(&mut self, v: i16) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub(crate) fn put_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub(crate) fn put_i32(&mut self, v: i32) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub(crate) fn put_f32(&mut self, v: f32) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub(crate) fn put_f64(&mut self, v: f64) {
        self.write_bytes(&v.to_le_bytes());
    }
}

// ============================================================================
// Field walk
// ============================================================================

/// Walks the schema entries over the tokenized body, the mirror image
/// of the decoder's traversal: a `ClassArray` converts exactly
/// `count × children` elements, rewinding to the first child per
/// repetition.
struct FieldEncoder<'a> {
    db: &'a MessageDatabase,
    schema: &'a MessageSchema,
    tok: Tokenizer<'a>,
    writer: BinaryWriter,
    param: usize,
    /// Last enum name encoded; GLONASS switches the following
    /// satellite id to its compound form.
    last_enum: Option<String>,
}

impl<'a> FieldEncoder<'a> {
    fn field_limit(&self) -> usize {
        self.schema.field_count.min(self.schema.fields.len())
    }

    fn run(&mut self) -> Result<()> {
        let limit = self.field_limit();
        while self.param < limit {
            self.convert_entry()?;
        }
        Ok(())
    }

    /// Next body token; an exhausted buffer where a field is expected
    /// means the message is truncated.
    fn next_token(&mut self) -> Result<crate::tokenizer::Token<'a>> {
        let t = self.tok.next_field()?;
        if t.boundary == Boundary::PastEnd && t.text.is_empty() {
            return Err(Error::UnexpectedEndOfMessage);
        }
        Ok(t)
    }

    fn convert_entry(&mut self) -> Result<()> {
        let schema = self.schema;
        let entry = &schema.fields[self.param];

        if entry.ty.spec == ConversionSpec::Embedded {
            self.param += 1;
            return self.embedded_from_text();
        }

        match entry.ty.kind {
            StorageKind::Class => {
                self.param += 1;
                self.convert_group(entry.children as usize)
            }
            StorageKind::ClassArray => {
                let count = self.parse_count(entry)?;
                self.writer.align(4);
                self.writer.put_u32(count);
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
                let count = self.parse_count(entry)?;
                self.writer.align(4);
                self.writer.put_u32(count);
                self.param += 1;
                self.convert_elements(entry, count, false)
            }
            StorageKind::FixedArray => {
                self.param += 1;
                self.convert_elements(entry, entry.ty.array_len, true)
            }
            StorageKind::String => {
                self.param += 1;
                self.inline_string_from_text(entry)
            }
            StorageKind::Enum => {
                self.param += 1;
                self.enum_from_text(entry)
            }
            StorageKind::Simple => {
                self.param += 1;
                self.simple_from_text(entry)
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

    fn parse_count(&mut self, entry: &FieldEntry) -> Result<u32> {
        let t = self.next_token()?;
        let s = as_str(t.text)?;
        let count: u32 = s
            .parse()
            .map_err(|_| Error::format("array count is not a number"))?;
        if count > entry.ty.array_len {
            return Err(Error::format("array count exceeds declared maximum"));
        }
        Ok(count)
    }

    fn convert_elements(&mut self, entry: &FieldEntry, count: u32, fixed: bool) -> Result<()> {
        match entry.ty.spec {
            ConversionSpec::HexBytes => self.hex_from_text(count),
            ConversionSpec::Passthrough => self.passthrough_from_text(count),
            ConversionSpec::String => self.slot_string_from_text(entry, count, fixed),
            _ => {
                for _ in 0..count {
                    self.simple_from_text(entry)?;
                }
                Ok(())
            }
        }
    }
}
