//! Binary header layouts and the text-side lookup tables.
//!
//! Two framings exist: the standard 28-byte header (`0xAA 0x44 0x12`,
//! text sync `#`) and the short 12-byte header (`0xAA 0x44 0x13`,
//! text sync `%`). All multi-byte fields are little-endian.

use crate::error::{Error, Result};

pub const SYNC1: u8 = 0xAA;
pub const SYNC2: u8 = 0x44;
pub const STANDARD_SYNC3: u8 = 0x12;
pub const SHORT_SYNC3: u8 = 0x13;

pub const TEXT_SYNC: u8 = b'#';
pub const SHORT_TEXT_SYNC: u8 = b'%';

pub const STANDARD_HEADER_LENGTH: usize = 28;
pub const SHORT_HEADER_LENGTH: usize = 12;

/// Which of the two header framings a message uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderStyle {
    Standard,
    Short,
}

impl HeaderStyle {
    pub fn header_length(self) -> usize {
        match self {
            Self::Standard => STANDARD_HEADER_LENGTH,
            Self::Short => SHORT_HEADER_LENGTH,
        }
    }

    pub fn text_sync(self) -> u8 {
        match self {
            Self::Standard => TEXT_SYNC,
            Self::Short => SHORT_TEXT_SYNC,
        }
    }
}

/// Reads the style off the three binary sync bytes.
pub fn sniff_style(buf: &[u8]) -> Result<HeaderStyle> {
    if buf.len() < 3 {
        return Err(Error::UnexpectedEndOfMessage);
    }
    if buf[0] != SYNC1 || buf[1] != SYNC2 {
        return Err(Error::format("missing binary sync bytes"));
    }
    match buf[2] {
        STANDARD_SYNC3 => Ok(HeaderStyle::Standard),
        SHORT_SYNC3 => Ok(HeaderStyle::Short),
        _ => Err(Error::format("unknown third sync byte")),
    }
}

// ============================================================================
// Binary header structs
// ============================================================================

/// The standard 28-byte header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StandardHeader {
    pub message_id: u16,
    /// Bit 7: response flag; low 5 bits: measurement source.
    pub message_type: u8,
    /// Upper 3 bits port class, lower 5 bits virtual address.
    pub port: u8,
    /// Body length in bytes (header and CRC excluded).
    pub length: u16,
    pub sequence: u16,
    /// Half-percent units; text renders `raw / 2.0`.
    pub idle_time: u8,
    pub time_status: u8,
    pub week: u16,
    pub week_ms: u32,
    pub receiver_status: u32,
    /// CRC over the message definition (firmware variant selector).
    pub def_crc: u16,
    pub sw_version: u16,
}

impl StandardHeader {
    pub fn to_bytes(&self) -> [u8; STANDARD_HEADER_LENGTH] {
        let mut b = [0u8; STANDARD_HEADER_LENGTH];
        b[0] = SYNC1;
        b[1] = SYNC2;
        b[2] = STANDARD_SYNC3;
        b[3] = STANDARD_HEADER_LENGTH as u8;
        b[4..6].copy_from_slice(&self.message_id.to_le_bytes());
        b[6] = self.message_type;
        b[7] = self.port;
        b[8..10].copy_from_slice(&self.length.to_le_bytes());
        b[10..12].copy_from_slice(&self.sequence.to_le_bytes());
        b[12] = self.idle_time;
        b[13] = self.time_status;
        b[14..16].copy_from_slice(&self.week.to_le_bytes());
        b[16..20].copy_from_slice(&self.week_ms.to_le_bytes());
        b[20..24].copy_from_slice(&self.receiver_status.to_le_bytes());
        b[24..26].copy_from_slice(&self.def_crc.to_le_bytes());
        b[26..28].copy_from_slice(&self.sw_version.to_le_bytes());
        b
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < STANDARD_HEADER_LENGTH {
            return Err(Error::UnexpectedEndOfMessage);
        }
        if sniff_style(buf)? != HeaderStyle::Standard {
            return Err(Error::format("not a standard-header message"));
        }
        Ok(Self {
            message_id: u16::from_le_bytes([buf[4], buf[5]]),
            message_type: buf[6],
            port: buf[7],
            length: u16::from_le_bytes([buf[8], buf[9]]),
            sequence: u16::from_le_bytes([buf[10], buf[11]]),
            idle_time: buf[12],
            time_status: buf[13],
            week: u16::from_le_bytes([buf[14], buf[15]]),
            week_ms: u32::from_le_bytes([buf[16], buf[17], buf[18], buf[19]]),
            receiver_status: u32::from_le_bytes([buf[20], buf[21], buf[22], buf[23]]),
            def_crc: u16::from_le_bytes([buf[24], buf[25]]),
            sw_version: u16::from_le_bytes([buf[26], buf[27]]),
        })
    }
}

/// The short 12-byte header (high-rate logs).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShortHeader {
    /// Body length in bytes.
    pub length: u8,
    pub message_id: u16,
    pub week: u16,
    pub week_ms: u32,
}

impl ShortHeader {
    pub fn to_bytes(&self) -> [u8; SHORT_HEADER_LENGTH] {
        let mut b = [0u8; SHORT_HEADER_LENGTH];
        b[0] = SYNC1;
        b[1] = SYNC2;
        b[2] = SHORT_SYNC3;
        b[3] = self.length;
        b[4..6].copy_from_slice(&self.message_id.to_le_bytes());
        b[6..8].copy_from_slice(&self.week.to_le_bytes());
        b[8..12].copy_from_slice(&self.week_ms.to_le_bytes());
        b
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < SHORT_HEADER_LENGTH {
            return Err(Error::UnexpectedEndOfMessage);
        }
        if sniff_style(buf)? != HeaderStyle::Short {
            return Err(Error::format("not a short-header message"));
        }
        Ok(Self {
            length: buf[3],
            message_id: u16::from_le_bytes([buf[4], buf[5]]),
            week: u16::from_le_bytes([buf[6], buf[7]]),
            week_ms: u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]),
        })
    }
}

// ============================================================================
// Message-type byte
// ============================================================================

pub const MEASUREMENT_SOURCE_MASK: u8 = 0x1F;
pub const RESPONSE_BIT: u8 = 0x80;

pub fn is_response(message_type: u8) -> bool {
    message_type & RESPONSE_BIT != 0
}

/// 0 = primary antenna, 1 = secondary (`_1` name suffix).
pub fn measurement_source(message_type: u8) -> u8 {
    message_type & MEASUREMENT_SOURCE_MASK
}

// ============================================================================
// Message-id fields (32-bit, with embedded format bits)
// ============================================================================

/// Format letter carried in the upper bits of a 32-bit message-id
/// field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    /// Renders as `NAME` + `A`.
    Text,
    /// Renders as `NAME` + `B`.
    Binary,
}

pub fn pack_message_id(id: u16, format: WireFormat) -> u32 {
    let bits = match format {
        WireFormat::Text => 0u32,
        WireFormat::Binary => 1,
    };
    id as u32 | (bits << 16)
}

pub fn unpack_message_id(value: u32) -> (u16, Option<WireFormat>) {
    let id = (value & 0xFFFF) as u16;
    match value >> 16 {
        0 => (id, Some(WireFormat::Text)),
        1 => (id, Some(WireFormat::Binary)),
        _ => (id, None),
    }
}

// ============================================================================
// Time status
// ============================================================================

const TIME_STATUS: [(u8, &str); 14] = [
    (20, "UNKNOWN"),
    (40, "ADJUSTING"),
    (60, "APPROXIMATE"),
    (80, "COARSEADJUSTING"),
    (100, "COARSE"),
    (120, "COARSESTEERING"),
    (130, "FREEWHEELING"),
    (140, "FINEADJUSTING"),
    (160, "FINE"),
    (170, "FINEBACKUPSTEERING"),
    (180, "FINESTEERING"),
    (200, "SATTIME"),
    (220, "EXTERN"),
    (240, "EXACT"),
];

/// Text name of a time status value; out-of-table values render as
/// `ERROR` rather than failing the whole message.
pub fn time_status_name(value: u8) -> &'static str {
    TIME_STATUS
        .iter()
        .find(|(v, _)| *v == value)
        .map_or("ERROR", |(_, n)| n)
}

pub fn time_status_value(name: &str) -> Option<u8> {
    TIME_STATUS
        .iter()
        .find(|(_, n)| *n == name)
        .map(|(v, _)| *v)
}

// ============================================================================
// Port byte
// ============================================================================

const PORT_CLASSES: [(u8, &str); 7] = [
    (1, "COM1"),
    (2, "COM2"),
    (3, "COM3"),
    (4, "SPECIAL"),
    (5, "AUX"),
    (6, "USB"),
    (7, "XCOM"),
];

/// Text name of a port byte; a nonzero virtual address renders as a
/// `_{n}` suffix. Class 0 is unrecognized.
pub fn port_name(code: u8) -> Result<String> {
    let class = code >> 5;
    let vaddr = code & 0x1F;
    let base = PORT_CLASSES
        .iter()
        .find(|(c, _)| *c == class)
        .map(|(_, n)| *n)
        .ok_or_else(|| Error::format("unrecognized port class"))?;
    Ok(if vaddr == 0 {
        base.to_string()
    } else {
        format!("{base}_{vaddr}")
    })
}

/// Port byte for a text name. Unknown names fall back to COM1, the
/// receiver's own behavior for unroutable ports.
pub fn port_code(name: &str) -> u8 {
    let (base, vaddr) = match name.rsplit_once('_') {
        Some((b, v)) => (b, v.parse::<u8>().unwrap_or(0)),
        None => (name, 0),
    };
    let class = PORT_CLASSES
        .iter()
        .find(|(_, n)| *n == base)
        .map(|(c, _)| *c)
        .unwrap_or(1);
    (class << 5) | (vaddr & 0x1F)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_header_round_trip() {
        let h = StandardHeader {
            message_id: 42,
            message_type: 0x01,
            port: 0x20,
            length: 72,
            sequence: 3,
            idle_time: 111,
            time_status: 180,
            week: 2209,
            week_ms: 250_000,
            receiver_status: 0x0200_0040,
            def_crc: 0xCB0E,
            sw_version: 16_248,
        };
        let bytes = h.to_bytes();
        assert_eq!(bytes.len(), STANDARD_HEADER_LENGTH);
        assert_eq!(bytes[3] as usize, STANDARD_HEADER_LENGTH);
        assert_eq!(StandardHeader::from_bytes(&bytes).unwrap(), h);
    }

    #[test]
    fn short_header_round_trip() {
        let h = ShortHeader { length: 8, message_id: 99, week: 2209, week_ms: 1000 };
        let bytes = h.to_bytes();
        assert_eq!(sniff_style(&bytes).unwrap(), HeaderStyle::Short);
        assert_eq!(ShortHeader::from_bytes(&bytes).unwrap(), h);
    }

    #[test]
    fn sniff_rejects_bad_sync() {
        assert!(sniff_style(&[0xAA, 0x45, 0x12]).is_err());
        assert!(sniff_style(&[0xAA, 0x44, 0x14]).is_err());
        assert_eq!(sniff_style(&[0xAA]), Err(Error::UnexpectedEndOfMessage));
    }

    #[test]
    fn time_status_table() {
        assert_eq!(time_status_name(180), "FINESTEERING");
        assert_eq!(time_status_value("FINESTEERING"), Some(180));
        // Werte außerhalb der Tabelle
        assert_eq!(time_status_name(0), "ERROR");
        assert_eq!(time_status_value("BOGUS"), None);
    }

    #[test]
    fn port_byte_packing() {
        assert_eq!(port_name(0x20).unwrap(), "COM1");
        assert_eq!(port_name(0xE3).unwrap(), "XCOM_3");
        assert!(port_name(0x05).is_err()); // Klasse 0

        assert_eq!(port_code("COM1"), 0x20);
        assert_eq!(port_code("XCOM_3"), 0xE3);
        assert_eq!(port_code("NO_PORT"), 0x20); // Fallback COM1
        assert_eq!(port_code("USB"), 0xC0);
    }

    #[test]
    fn message_type_bits() {
        assert!(is_response(0x80));
        assert!(!is_response(0x01));
        assert_eq!(measurement_source(0x81), 1);
        assert_eq!(measurement_source(0x00), 0);
    }

    #[test]
    fn message_id_field_packing() {
        let v = pack_message_id(42, WireFormat::Binary);
        assert_eq!(unpack_message_id(v), (42, Some(WireFormat::Binary)));
        assert_eq!(unpack_message_id(42), (42, Some(WireFormat::Text)));
        assert_eq!(unpack_message_id(0x0005_002A).1, None);
    }
}
