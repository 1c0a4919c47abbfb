//! Binary writing of single elements.

use super::{as_str, encode_with_mode, FieldEncoder};
use crate::crc32::CrcMode;
use crate::error::{Error, Result};
use crate::header::{self, WireFormat};
use crate::schema::{BaseType, ConversionSpec, FieldEntry};
use crate::tokenizer::Token;

/// Strips the surrounding quotes off a quoted token.
fn string_bytes(t: Token<'_>) -> &[u8] {
    let x = t.text;
    if x.len() >= 2 && x[0] == b'"' && x[x.len() - 1] == b'"' {
        &x[1..x.len() - 1]
    } else {
        x
    }
}

impl<'a> FieldEncoder<'a> {
    pub(super) fn simple_from_text(&mut self, entry: &FieldEntry) -> Result<()> {
        let t = self.next_token()?;
        let s = as_str(t.text)?;
        let ty = &entry.ty;
        self.writer.align(ty.length);
        match ty.spec {
            ConversionSpec::Signed => self.put_signed(s, ty.length)?,
            ConversionSpec::Unsigned => self.put_unsigned(s, ty.length)?,
            ConversionSpec::Hex { .. } => self.put_hex(s, ty.length)?,
            ConversionSpec::Float { .. } | ConversionSpec::SuperFloat { .. } => {
                match ty.base {
                    BaseType::Double => {
                        let v: f64 =
                            s.parse().map_err(|_| Error::format("not a float value"))?;
                        self.writer.put_f64(v);
                    }
                    _ => {
                        let v: f32 =
                            s.parse().map_err(|_| Error::format("not a float value"))?;
                        self.writer.put_f32(v);
                    }
                }
            }
            ConversionSpec::GpsTime => {
                let secs: f64 = s.parse().map_err(|_| Error::format("not a time value"))?;
                self.writer.put_u32((secs * 1000.0).round() as u32);
            }
            ConversionSpec::Bool => match s {
                "TRUE" => self.writer.put_u32(1),
                "FALSE" => self.writer.put_u32(0),
                _ => return Err(Error::format("boolean must be TRUE or FALSE")),
            },
            ConversionSpec::MessageId => self.message_id_from_text(s)?,
            ConversionSpec::SatelliteId => self.satellite_from_text(s)?,
            ConversionSpec::String
            | ConversionSpec::HexBytes
            | ConversionSpec::Passthrough
            | ConversionSpec::Embedded => {
                return Err(Error::format("specifier not valid for a simple element"));
            }
        }
        Ok(())
    }

    fn put_signed(&mut self, s: &str, len: u32) -> Result<()> {
        let bad = |_| Error::format("not a signed integer of this width");
        match len {
            1 => {
                let v: i8 = s.parse().map_err(bad)?;
                self.writer.put_u8(v as u8);
            }
            2 => {
                let v: i16 = s.parse().map_err(bad)?;
                self.writer.put_i16(v);
            }
            4 => {
                let v: i32 = s.parse().map_err(bad)?;
                self.writer.put_i32(v);
            }
            8 => {
                let v: i64 = s.parse().map_err(bad)?;
                self.writer.write_bytes(&v.to_le_bytes());
            }
            _ => return Err(Error::format("unsupported integer width")),
        }
        Ok(())
    }

    fn put_unsigned(&mut self, s: &str, len: u32) -> Result<()> {
        let bad = |_| Error::format("not an unsigned integer of this width");
        match len {
            1 => {
                let v: u8 = s.parse().map_err(bad)?;
                self.writer.put_u8(v);
            }
            2 => {
                let v: u16 = s.parse().map_err(bad)?;
                self.writer.put_u16(v);
            }
            4 => {
                let v: u32 = s.parse().map_err(bad)?;
                self.writer.put_u32(v);
            }
            8 => {
                let v: u64 = s.parse().map_err(bad)?;
                self.writer.write_bytes(&v.to_le_bytes());
            }
            _ => return Err(Error::format("unsupported integer width")),
        }
        Ok(())
    }

    fn put_hex(&mut self, s: &str, len: u32) -> Result<()> {
        let bad = |_| Error::format("not a hex value of this width");
        match len {
            1 => {
                let v = u8::from_str_radix(s, 16).map_err(bad)?;
                self.writer.put_u8(v);
            }
            2 => {
                let v = u16::from_str_radix(s, 16).map_err(bad)?;
                self.writer.put_u16(v);
            }
            4 => {
                let v = u32::from_str_radix(s, 16).map_err(bad)?;
                self.writer.put_u32(v);
            }
            8 => {
                let v = u64::from_str_radix(s, 16).map_err(bad)?;
                self.writer.write_bytes(&v.to_le_bytes());
            }
            _ => return Err(Error::format("unsupported integer width")),
        }
        Ok(())
    }

    /// `NAME[A|B][_1]` → 32-bit id field with format bits.
    fn message_id_from_text(&mut self, s: &str) -> Result<()> {
        let base = s.strip_suffix("_1").unwrap_or(s);
        let resolved = if let Some(schema) = self.db.find_by_name(base) {
            Some((schema.id, WireFormat::Text))
        } else if let Some(schema) = base.strip_suffix('A').and_then(|b| self.db.find_by_name(b)) {
            Some((schema.id, WireFormat::Text))
        } else if let Some(schema) = base.strip_suffix('B').and_then(|b| self.db.find_by_name(b)) {
            Some((schema.id, WireFormat::Binary))
        } else {
            None
        };
        let (id, format) = resolved.ok_or_else(|| Error::InvalidMessageId(s.to_string()))?;
        self.writer.put_u32(header::pack_message_id(id, format));
        Ok(())
    }

    /// GLONASS ids are `slot±freq` pairs of 16-bit halves, everything
    /// else a plain u32.
    fn satellite_from_text(&mut self, s: &str) -> Result<()> {
        if self.last_enum.as_deref() == Some("GLONASS") {
            let split = if s.is_ascii() && s.len() > 1 {
                s[1..].find(['+', '-']).map(|i| i + 1)
            } else {
                None
            };
            if let Some(i) = split {
                let slot: u16 = s[..i]
                    .parse()
                    .map_err(|_| Error::format("not a satellite slot"))?;
                let freq: i16 = s[i..]
                    .parse()
                    .map_err(|_| Error::format("not a frequency offset"))?;
                self.writer.put_u16(slot);
                self.writer.put_i16(freq);
                return Ok(());
            }
        }
        let v: u32 = s.parse().map_err(|_| Error::format("not a satellite id"))?;
        self.writer.put_u32(v);
        Ok(())
    }

    pub(super) fn enum_from_text(&mut self, entry: &FieldEntry) -> Result<()> {
        let t = self.next_token()?;
        let s = as_str(t.text)?;
        let table = entry
            .enum_table
            .as_ref()
            .ok_or_else(|| Error::format("field has no enum table"))?;
        let value = table
            .value_of(s)
            .ok_or_else(|| Error::format("unknown enum name"))?;
        self.writer.align(4);
        let start = self.writer.pos;
        self.writer.put_i32(value);
        let len = entry.ty.length.max(4) as usize;
        if len > 4 {
            self.writer.reserve_to(start + len);
            self.writer.pos = start + len;
        }
        self.last_enum = Some(s.to_string());
        Ok(())
    }

    /// `String`-kind: inline bytes, null-terminated unless the length
    /// equals the declared maximum, cursor rounded up to the next
    /// 4-byte boundary.
    pub(super) fn inline_string_from_text(&mut self, entry: &FieldEntry) -> Result<()> {
        let t = self.next_token()?;
        let bytes = string_bytes(t);
        let max = entry.ty.array_len as usize;
        if bytes.len() > max {
            return Err(Error::format("string exceeds declared maximum"));
        }
        let len = bytes.len();
        let start = self.writer.pos;
        self.writer.write_bytes(bytes);
        if len < max {
            self.writer.put_u8(0);
        }
        self.writer.pos = start + len + 4 - (len % 4);
        Ok(())
    }

    /// String stored as an array slot: fixed slots occupy the declared
    /// size (zero padded), counted slots must match their count token.
    pub(super) fn slot_string_from_text(
        &mut self,
        entry: &FieldEntry,
        count: u32,
        fixed: bool,
    ) -> Result<()> {
        let t = self.next_token()?;
        let bytes = string_bytes(t);
        let max = entry.ty.array_len as usize;
        if bytes.len() > max {
            return Err(Error::format("string exceeds declared maximum"));
        }
        let start = self.writer.pos;
        if fixed {
            self.writer.write_bytes(bytes);
            self.writer.reserve_to(start + max);
            self.writer.pos = start + max;
        } else {
            let len = count as usize;
            if bytes.len() != len {
                return Err(Error::format("string length does not match its count"));
            }
            self.writer.write_bytes(bytes);
            if len < max {
                self.writer.put_u8(0);
            }
            self.writer.pos = start + len + 4 - (len % 4);
        }
        Ok(())
    }

    pub(super) fn hex_from_text(&mut self, count: u32) -> Result<()> {
        let t = self.next_token()?;
        let s = as_str(t.text)?;
        if !s.is_ascii() || s.len() != count as usize * 2 {
            return Err(Error::format("hex field must be two digits per byte"));
        }
        for i in 0..count as usize {
            let b = u8::from_str_radix(&s[2 * i..2 * i + 2], 16)
                .map_err(|_| Error::format("invalid hex digit"))?;
            self.writer.put_u8(b);
        }
        Ok(())
    }

    /// Unescapes `count` bytes straight off the raw text: `\\` is a
    /// backslash, `\xHH` an arbitrary byte, everything else literal.
    pub(super) fn passthrough_from_text(&mut self, count: u32) -> Result<()> {
        let raw = self.tok.rest();
        let mut i = 0;
        let mut produced = 0;
        while produced < count {
            let Some(&b) = raw.get(i) else {
                return Err(Error::UnexpectedEndOfMessage);
            };
            if b == b'\\' {
                match raw.get(i + 1) {
                    Some(b'\\') => {
                        self.writer.put_u8(b'\\');
                        i += 2;
                    }
                    Some(b'x') => {
                        let pair = raw
                            .get(i + 2..i + 4)
                            .ok_or(Error::UnexpectedEndOfMessage)?;
                        let v = u8::from_str_radix(as_str(pair)?, 16)
                            .map_err(|_| Error::format("invalid byte escape"))?;
                        self.writer.put_u8(v);
                        i += 4;
                    }
                    _ => return Err(Error::format("invalid escape sequence")),
                }
            } else {
                self.writer.put_u8(b);
                i += 1;
            }
            produced += 1;
        }
        self.tok.seek(self.tok.pos() + i);
        // Das Trennzeichen hinter den Rohdaten gehört nicht zum Feld.
        if matches!(self.tok.peek(), Some(b',') | Some(b';')) {
            self.tok.seek(self.tok.pos() + 1);
        }
        Ok(())
    }

    /// Re-encodes the remaining text as a complete sub-message with a
    /// bit-inverted checksum and splices its frame in. The sub-message
    /// is always the final field.
    pub(super) fn embedded_from_text(&mut self) -> Result<()> {
        let rest = self.tok.rest();
        let inner = encode_with_mode(self.db, rest, CrcMode::Flipped)?;
        self.writer.write_bytes(&inner.bytes);
        self.tok.seek(self.tok.pos() + rest.len());
        self.param = self.field_limit();
        Ok(())
    }
}
