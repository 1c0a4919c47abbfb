//! Text rendering of single elements.

use core::fmt::Write as _;

use super::FieldDecoder;
use crate::crc32::CrcMode;
use crate::error::{Error, Result};
use crate::header::{self, WireFormat};
use crate::schema::{BaseType, ConversionSpec, FieldEntry, StorageKind};

impl<'a> FieldDecoder<'a> {
    pub(super) fn simple_to_text(&mut self, entry: &FieldEntry) -> Result<()> {
        let ty = &entry.ty;
        self.reader.align(ty.length);
        match ty.spec {
            ConversionSpec::Signed => {
                let v = self.reader.read_signed(ty.length)?;
                let _ = write!(self.out, "{v}");
            }
            ConversionSpec::Unsigned => {
                let v = self.reader.read_unsigned(ty.length)?;
                let _ = write!(self.out, "{v}");
            }
            ConversionSpec::Hex { width } => {
                let v = self.reader.read_unsigned(ty.length)?;
                if width > 0 {
                    let _ = write!(self.out, "{:0w$x}", v, w = width as usize);
                } else {
                    let _ = write!(self.out, "{v:x}");
                }
            }
            ConversionSpec::Float { after } => {
                let v = self.read_float(ty.base)?;
                let _ = write!(self.out, "{v:.0$}", after as usize);
            }
            ConversionSpec::SuperFloat { before, after } => {
                let v = self.read_float(ty.base)?;
                self.out.push_str(&format_super_float(v, before, after));
            }
            ConversionSpec::GpsTime => {
                let ms = self.reader.read_u32()?;
                let _ = write!(self.out, "{:.3}", ms as f64 / 1000.0);
            }
            ConversionSpec::Bool => {
                let v = self.reader.read_u32()?;
                self.out.push_str(if v != 0 { "TRUE" } else { "FALSE" });
            }
            ConversionSpec::MessageId => self.message_id_to_text()?,
            ConversionSpec::SatelliteId => self.satellite_to_text()?,
            ConversionSpec::String
            | ConversionSpec::HexBytes
            | ConversionSpec::Passthrough
            | ConversionSpec::Embedded => {
                return Err(Error::format("specifier not valid for a simple element"));
            }
        }
        self.out.push(',');
        Ok(())
    }

    fn read_float(&mut self, base: BaseType) -> Result<f64> {
        // printf promotes float varargs to double; matching that keeps
        // the digits identical.
        match base {
            BaseType::Double => self.reader.read_f64(),
            _ => Ok(self.reader.read_f32()? as f64),
        }
    }

    fn message_id_to_text(&mut self) -> Result<()> {
        let v = self.reader.read_u32()?;
        let (id, format) = header::unpack_message_id(v);
        let name = self.db.name_by_id(id).unwrap_or("UNKNOWN");
        self.out.push_str(name);
        match format {
            Some(WireFormat::Text) => {
                self.out.push('A');
                if self.source == 1 {
                    self.out.push_str("_1");
                }
            }
            Some(WireFormat::Binary) => self.out.push('B'),
            None => {}
        }
        Ok(())
    }

    /// After a GLONASS system enum the id is a compound
    /// `slot±frequency` pair of 16-bit halves.
    fn satellite_to_text(&mut self) -> Result<()> {
        if self.last_enum.as_deref() == Some("GLONASS") {
            let slot = self.reader.read_u16()?;
            let freq = self.reader.read_i16()?;
            let _ = write!(self.out, "{slot}");
            if freq != 0 {
                let _ = write!(self.out, "{freq:+}");
            }
        } else {
            let v = self.reader.read_u32()?;
            let _ = write!(self.out, "{v}");
        }
        Ok(())
    }

    pub(super) fn enum_to_text(&mut self, entry: &FieldEntry) -> Result<()> {
        self.reader.align(4);
        let value = self.reader.read_i32()?;
        match entry.enum_table.as_ref().and_then(|t| t.name_of(value)) {
            Some(name) => {
                self.last_enum = Some(name.to_string());
                self.out.push_str(name);
            }
            None => {
                // Unbekannter Wert: leeres Feld in Anführungszeichen
                self.last_enum = None;
                self.out.push_str("\"\"");
            }
        }
        if entry.ty.length > 4 {
            self.reader.advance_clamped(entry.ty.length as usize - 4);
        }
        self.out.push(',');
        Ok(())
    }

    /// `String`-kind: inline null-terminated bytes, advance rounded up
    /// past the terminator to the next 4-byte boundary.
    pub(super) fn inline_string_to_text(&mut self, entry: &FieldEntry) -> Result<()> {
        let max = entry.ty.array_len as usize;
        let tail = self.reader.tail();
        let cap = tail.len().min(max);
        let len = tail[..cap].iter().position(|&b| b == 0).unwrap_or(cap);
        self.push_quoted(&tail[..len]);
        self.reader.advance_clamped(len + 4 - (len % 4));
        self.out.push(',');
        Ok(())
    }

    /// String stored as an array slot: fixed slots consume exactly the
    /// declared size, counted slots consume the count plus padding.
    pub(super) fn string_block_to_text(&mut self, entry: &FieldEntry, count: u32) -> Result<()> {
        if entry.ty.kind == StorageKind::FixedArray {
            let max = entry.ty.array_len as usize;
            let slot = self.reader.take(max)?;
            let len = slot.iter().position(|&b| b == 0).unwrap_or(max);
            self.push_quoted(&slot[..len]);
        } else {
            let len = count as usize;
            let tail = self.reader.tail();
            if tail.len() < len {
                return Err(Error::UnexpectedEndOfMessage);
            }
            self.push_quoted(&tail[..len]);
            self.reader.advance_clamped(len + 4 - (len % 4));
        }
        self.out.push(',');
        Ok(())
    }

    fn push_quoted(&mut self, bytes: &[u8]) {
        self.out.push('"');
        for &b in bytes {
            self.out.push(b as char);
        }
        self.out.push('"');
    }

    pub(super) fn hex_to_text(&mut self, count: u32) -> Result<()> {
        for _ in 0..count {
            let b = self.reader.read_u8()?;
            let _ = write!(self.out, "{b:02x}");
        }
        self.out.push(',');
        Ok(())
    }

    pub(super) fn passthrough_to_text(&mut self, count: u32) -> Result<()> {
        for _ in 0..count {
            let b = self.reader.read_u8()?;
            match b {
                b'\\' => self.out.push_str("\\\\"),
                32..=126 => self.out.push(b as char),
                _ => {
                    let _ = write!(self.out, "\\x{b:02x}");
                }
            }
        }
        self.out.push(',');
        Ok(())
    }

    /// Splices a complete sub-message: recursion with the bit-inverted
    /// checksum, no CRLF on the inner segment. The sub-message is
    /// always the final field.
    pub(super) fn embedded_to_text(&mut self) -> Result<()> {
        let tail = self.reader.tail();
        let inner = super::decode_with_mode(self.db, tail, CrcMode::Flipped, false)?;
        self.out.push_str(&inner.text);
        self.reader.advance_clamped(inner.consumed);
        self.param = self.schema.field_count;
        self.out.push(',');
        Ok(())
    }
}

/// C-style scientific notation: explicit exponent sign, at least two
/// exponent digits.
fn fmt_scientific(v: f64, precision: usize) -> String {
    let s = format!("{v:.0$e}", precision);
    match s.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(d) => ('-', d),
                None => ('+', exp),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => s,
    }
}

/// Magnitude-switched rendering: fixed-point inside
/// `10^-before ..= 10^before`, scientific outside, digit counts from
/// the declared precision.
pub(crate) fn format_super_float(v: f64, before: u8, after: u8) -> String {
    if v == 0.0 {
        return format!("{v:.0$}", after as usize);
    }
    if before == 0 && after == 0 {
        return format!("{v:.1}");
    }
    if v.abs() > 10f64.powi(before as i32) {
        fmt_scientific(v, (before as usize + after as usize).saturating_sub(1))
    } else if v.abs() < 10f64.powi(-(before as i32)) {
        fmt_scientific(v, after as usize)
    } else {
        format!("{v:.0$}", after as usize)
    }
}
