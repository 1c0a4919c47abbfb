//! Shared fixture database for the fuzz targets.

use std::sync::{Arc, OnceLock};

use navlog::header::HeaderStyle;
use navlog::schema::{
    BaseType, ConversionSpec, EnumTable, FieldEntry, MessageDatabase, MessageSchema,
    TypeDescriptor,
};

pub fn db() -> &'static MessageDatabase {
    static DB: OnceLock<MessageDatabase> = OnceLock::new();
    DB.get_or_init(|| {
        let systems = Arc::new(EnumTable::from_pairs(
            "SatelliteSystem",
            [(0, "GPS"), (1, "GLONASS"), (2, "GALILEO")],
        ));
        let mut db = MessageDatabase::new();
        db.insert(MessageSchema::new(
            "BESTPOS",
            42,
            HeaderStyle::Standard,
            vec![
                FieldEntry::new(
                    "lat",
                    TypeDescriptor::simple(
                        BaseType::Double,
                        ConversionSpec::SuperFloat { before: 3, after: 11 },
                        8,
                    ),
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
                FieldEntry::with_children("records", TypeDescriptor::class_array(8), 2),
                FieldEntry::with_enum("system", TypeDescriptor::enumeration(4), systems),
                FieldEntry::new(
                    "id",
                    TypeDescriptor::simple(BaseType::SatelliteId, ConversionSpec::SatelliteId, 4),
                ),
            ],
        ));
        db.insert(MessageSchema::new(
            "VERSION",
            44,
            HeaderStyle::Standard,
            vec![
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
        db
    })
}
