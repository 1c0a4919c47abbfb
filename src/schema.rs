//! Message schema model.
//!
//! Field layout, element types and conversion specifiers for every
//! known message, loaded at runtime and shared immutably (`Arc`)
//! between converter instances. The codec itself never hardcodes a
//! message definition.

use std::sync::Arc;

use crate::header::HeaderStyle;
use crate::{FastHashMap, FastIndexMap};

/// Name ↔ value table for one enumerated type.
///
/// O(1) in both directions. Lookup misses return `None`; the decode
/// direction maps a miss to an empty quoted string in the output, the
/// encode direction treats it as a format error.
#[derive(Debug, Clone)]
pub struct EnumTable {
    name: String,
    by_name: FastHashMap<String, i32>,
    by_value: FastHashMap<i32, String>,
}

impl EnumTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            by_name: FastHashMap::default(),
            by_value: FastHashMap::default(),
        }
    }

    pub fn from_pairs<S: Into<String>>(
        name: impl Into<String>,
        pairs: impl IntoIterator<Item = (i32, S)>,
    ) -> Self {
        let mut table = Self::new(name);
        for (value, entry) in pairs {
            table.insert(value, entry);
        }
        table
    }

    pub fn insert(&mut self, value: i32, name: impl Into<String>) {
        let name = name.into();
        self.by_name.insert(name.clone(), value);
        self.by_value.insert(value, name);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_of(&self, name: &str) -> Option<i32> {
        self.by_name.get(name).copied()
    }

    pub fn name_of(&self, value: i32) -> Option<&str> {
        self.by_value.get(&value).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_value.is_empty()
    }
}

/// How a field occupies the binary body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    /// One element.
    Simple,
    /// `array_len` elements, no count prefix.
    FixedArray,
    /// 4-byte count prefix, then up to `array_len` elements.
    VarArray,
    /// 4-byte enumerated value.
    Enum,
    /// Grouping node: the next `children` entries form one record.
    Class,
    /// 4-byte count prefix, then count repetitions of the child record.
    ClassArray,
    /// Null-terminated bytes, padded to a 4-byte boundary.
    String,
}

/// Primitive width/signedness of one element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseType {
    Bool,
    Char,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    Float,
    Double,
    SatelliteId,
}

/// Text rendering of one element (closed set; schemas cannot inject
/// arbitrary format strings).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionSpec {
    /// Decimal, signed.
    Signed,
    /// Decimal, unsigned.
    Unsigned,
    /// Lowercase hex, zero-padded to `width` digits (0 = unpadded).
    Hex { width: u8 },
    /// Fixed-point float, `after` digits behind the decimal point.
    Float { after: u8 },
    /// Switches between fixed-point and scientific notation based on
    /// magnitude; `before`/`after` are the declared digit counts.
    SuperFloat { before: u8, after: u8 },
    /// u32 milliseconds in binary, `%.3f` seconds in text.
    GpsTime,
    /// 32-bit message id field; text side renders `NAME` plus an
    /// `A`/`B` format letter and `_1` source suffix.
    MessageId,
    /// Satellite id; a preceding GLONASS system enum switches it to a
    /// compound `slot±freq` pair of 16-bit halves.
    SatelliteId,
    /// Character data, optionally quoted in text.
    String,
    /// Raw bytes as hex digit pairs, two per byte.
    HexBytes,
    /// Raw bytes with `\\` / `\xHH` escapes for unprintables.
    Passthrough,
    /// A complete sub-message spliced into this field (bit-inverted
    /// checksum, recursion).
    Embedded,
    /// u32 in binary, `TRUE`/`FALSE` in text.
    Bool,
}

/// Shape of one schema entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub kind: StorageKind,
    pub base: BaseType,
    pub spec: ConversionSpec,
    /// Element length in bytes.
    pub length: u32,
    /// Declared element count (1 for non-arrays, maximum for arrays).
    pub array_len: u32,
}

impl TypeDescriptor {
    pub fn simple(base: BaseType, spec: ConversionSpec, length: u32) -> Self {
        Self { kind: StorageKind::Simple, base, spec, length, array_len: 1 }
    }

    pub fn fixed_array(base: BaseType, spec: ConversionSpec, length: u32, count: u32) -> Self {
        Self { kind: StorageKind::FixedArray, base, spec, length, array_len: count }
    }

    pub fn var_array(base: BaseType, spec: ConversionSpec, length: u32, max: u32) -> Self {
        Self { kind: StorageKind::VarArray, base, spec, length, array_len: max }
    }

    pub fn enumeration(length: u32) -> Self {
        Self {
            kind: StorageKind::Enum,
            base: BaseType::Int,
            spec: ConversionSpec::Signed,
            length,
            array_len: 1,
        }
    }

    /// Grouping node; the element itself occupies no bytes.
    pub fn class() -> Self {
        Self {
            kind: StorageKind::Class,
            base: BaseType::UChar,
            spec: ConversionSpec::Unsigned,
            length: 0,
            array_len: 1,
        }
    }

    pub fn class_array(max: u32) -> Self {
        Self {
            kind: StorageKind::ClassArray,
            base: BaseType::UChar,
            spec: ConversionSpec::Unsigned,
            length: 0,
            array_len: max,
        }
    }

    /// Variable-length string, inline null-terminated, max `max` bytes.
    pub fn string(max: u32) -> Self {
        Self {
            kind: StorageKind::String,
            base: BaseType::Char,
            spec: ConversionSpec::String,
            length: 1,
            array_len: max,
        }
    }

    /// String in a fixed `max`-byte slot.
    pub fn fixed_string(max: u32) -> Self {
        Self {
            kind: StorageKind::FixedArray,
            base: BaseType::Char,
            spec: ConversionSpec::String,
            length: 1,
            array_len: max,
        }
    }

    pub fn embedded() -> Self {
        Self {
            kind: StorageKind::Simple,
            base: BaseType::UChar,
            spec: ConversionSpec::Embedded,
            length: 0,
            array_len: 1,
        }
    }
}

/// One field of a message: name, shape, optional enum table, child
/// count for grouping nodes. Replaces the original's three parallel
/// per-field lists with a single bundled entry.
#[derive(Debug, Clone)]
pub struct FieldEntry {
    pub name: String,
    pub ty: TypeDescriptor,
    pub enum_table: Option<Arc<EnumTable>>,
    /// Number of immediately following entries forming the child
    /// record of a `Class`/`ClassArray` node.
    pub children: u32,
}

impl FieldEntry {
    pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self { name: name.into(), ty, enum_table: None, children: 0 }
    }

    pub fn with_enum(name: impl Into<String>, ty: TypeDescriptor, table: Arc<EnumTable>) -> Self {
        Self { name: name.into(), ty, enum_table: Some(table), children: 0 }
    }

    pub fn with_children(name: impl Into<String>, ty: TypeDescriptor, children: u32) -> Self {
        Self { name: name.into(), ty, enum_table: None, children }
    }
}

/// Complete definition of one message.
#[derive(Debug, Clone)]
pub struct MessageSchema {
    pub name: String,
    pub id: u16,
    pub style: HeaderStyle,
    /// CRC over the message definition; distinguishes firmware
    /// variants of the same id.
    pub def_crc: u16,
    pub fields: Vec<FieldEntry>,
    /// Number of top-level entries the converter walks. Normally
    /// `fields.len()`; variants may declare fewer.
    pub field_count: usize,
}

impl MessageSchema {
    pub fn new(
        name: impl Into<String>,
        id: u16,
        style: HeaderStyle,
        fields: Vec<FieldEntry>,
    ) -> Self {
        let field_count = fields.len();
        Self { name: name.into(), id, style, def_crc: 0, fields, field_count }
    }

    pub fn with_def_crc(mut self, def_crc: u16) -> Self {
        self.def_crc = def_crc;
        self
    }

    pub fn with_field_count(mut self, count: usize) -> Self {
        self.field_count = count;
        self
    }
}

/// All known messages, indexed by name, id and (id, definition CRC).
#[derive(Debug, Clone, Default)]
pub struct MessageDatabase {
    by_name: FastIndexMap<String, Arc<MessageSchema>>,
    by_id: FastHashMap<u16, Arc<MessageSchema>>,
    variants: FastHashMap<(u16, u16), Arc<MessageSchema>>,
}

impl MessageDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a message. The first definition of a name/id becomes
    /// the default; later ones remain reachable as (id, def CRC)
    /// variants.
    pub fn insert(&mut self, schema: MessageSchema) {
        let schema = Arc::new(schema);
        self.variants
            .insert((schema.id, schema.def_crc), Arc::clone(&schema));
        self.by_id
            .entry(schema.id)
            .or_insert_with(|| Arc::clone(&schema));
        self.by_name
            .entry(schema.name.clone())
            .or_insert(schema);
    }

    pub fn find_by_name(&self, name: &str) -> Option<Arc<MessageSchema>> {
        self.by_name.get(name).cloned()
    }

    pub fn find_by_id(&self, id: u16) -> Option<Arc<MessageSchema>> {
        self.by_id.get(&id).cloned()
    }

    /// Variant lookup; falls back to the default definition when the
    /// exact definition CRC is not registered.
    pub fn find_variant(&self, id: u16, def_crc: u16) -> Option<Arc<MessageSchema>> {
        self.variants
            .get(&(id, def_crc))
            .cloned()
            .or_else(|| self.find_by_id(id))
    }

    /// Resolves a text-side message name: tries the name as written,
    /// then with a trailing `A`/`B` format letter stripped.
    pub fn resolve_name(&self, name: &str) -> Option<Arc<MessageSchema>> {
        if let Some(schema) = self.find_by_name(name) {
            return Some(schema);
        }
        let stripped = name.strip_suffix('A').or_else(|| name.strip_suffix('B'))?;
        self.find_by_name(stripped)
    }

    pub fn name_by_id(&self, id: u16) -> Option<&str> {
        self.by_id.get(&id).map(|s| s.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Registered default definitions, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<MessageSchema>> {
        self.by_name.values()
    }
}
