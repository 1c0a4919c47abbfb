//! navlog CLI — binary <-> ASCII log conversion.
//!
//! Works on files of framed messages: binary input is sliced via the
//! header length fields, ASCII input is split on line breaks. The
//! message database is the built-in demo set; real deployments
//! construct their own [`MessageDatabase`] through the library API.

use clap::{Args, Parser, Subcommand};
use navlog::header::HeaderStyle;
use navlog::schema::{
    BaseType, ConversionSpec, EnumTable, FieldEntry, MessageDatabase, MessageSchema,
    TypeDescriptor,
};
use navlog::{compose, ConvertedKind, Direction, Representation};
use std::io::{Read, Write};
use std::process;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "navlog", about = "GNSS receiver log conversion")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert binary frames to ASCII
    ToText(CommonArgs),
    /// Convert ASCII messages to binary frames
    ToBinary(CommonArgs),
}

#[derive(Args)]
struct CommonArgs {
    /// Input file (- for stdin)
    #[arg(short, long, default_value = "-")]
    input: String,

    /// Output file (- for stdout)
    #[arg(short, long, default_value = "-")]
    output: String,

    /// Skip messages that fail to convert instead of aborting
    #[arg(long)]
    keep_going: bool,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let result = match cli.command {
        Command::ToText(args) => run(args, Direction::ToText),
        Command::ToBinary(args) => run(args, Direction::ToBinary),
    };
    if let Err(e) = result {
        eprintln!("navlog: {e}");
        process::exit(1);
    }
}

fn run(args: CommonArgs, direction: Direction) -> Result<(), Box<dyn std::error::Error>> {
    let data = read_input(&args.input)?;
    let db = demo_database();
    log::info!("using the built-in demo message database ({} messages)", db.len());

    let representation = match direction {
        Direction::ToText => Representation::Binary,
        Direction::ToBinary => Representation::Text,
    };
    let messages = match representation {
        Representation::Binary => split_binary_frames(&data),
        Representation::Text => split_text_messages(&data),
    };

    let mut out = Vec::new();
    for (i, msg) in messages.iter().enumerate() {
        match compose(&db, direction, representation, msg) {
            Ok(converted) => {
                if converted.kind == ConvertedKind::Response {
                    log::debug!("message {i} is a receiver response");
                }
                out.extend_from_slice(&converted.bytes);
            }
            Err(e) if args.keep_going => {
                log::warn!("message {i} skipped: {e}");
            }
            Err(e) => return Err(format!("message {i}: {e}").into()),
        }
    }

    write_output(&args.output, &out)?;
    Ok(())
}

fn read_input(path: &str) -> std::io::Result<Vec<u8>> {
    let mut data = Vec::new();
    if path == "-" {
        std::io::stdin().read_to_end(&mut data)?;
    } else {
        data = std::fs::read(path)?;
    }
    Ok(data)
}

fn write_output(path: &str, data: &[u8]) -> std::io::Result<()> {
    if path == "-" {
        std::io::stdout().write_all(data)
    } else {
        std::fs::write(path, data)
    }
}

/// Slices a byte stream into whole binary frames via the sync bytes
/// and header length fields. Bytes between frames are skipped.
fn split_binary_frames(data: &[u8]) -> Vec<&[u8]> {
    let mut frames = Vec::new();
    let mut pos = 0;
    while pos + 3 <= data.len() {
        let Ok(style) = navlog::header::sniff_style(&data[pos..]) else {
            pos += 1;
            continue;
        };
        let header_len = style.header_length();
        if pos + header_len > data.len() {
            break;
        }
        let body_len = match style {
            HeaderStyle::Standard => {
                u16::from_le_bytes([data[pos + 8], data[pos + 9]]) as usize
            }
            HeaderStyle::Short => data[pos + 3] as usize,
        };
        let total = header_len + body_len + 4;
        if pos + total > data.len() {
            log::warn!("trailing partial frame of {} bytes dropped", data.len() - pos);
            break;
        }
        frames.push(&data[pos..pos + total]);
        pos += total;
    }
    frames
}

fn split_text_messages(data: &[u8]) -> Vec<&[u8]> {
    data.split(|&b| b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .filter(|line| !line.is_empty())
        .collect()
}

/// Small built-in message set, enough to exercise the converter.
fn demo_database() -> MessageDatabase {
    let states = Arc::new(EnumTable::from_pairs("StateKind", [(0, "OFF"), (1, "ON")]));
    let systems = Arc::new(EnumTable::from_pairs(
        "SystemKind",
        [(0, "GPS"), (1, "GLONASS"), (2, "GALILEO")],
    ));

    let mut db = MessageDatabase::new();
    db.insert(MessageSchema::new(
        "DEMO",
        42,
        HeaderStyle::Standard,
        vec![
            FieldEntry::new(
                "counter",
                TypeDescriptor::simple(BaseType::UShort, ConversionSpec::Unsigned, 2),
            ),
            FieldEntry::with_enum("state", TypeDescriptor::enumeration(4), states),
        ],
    ));
    db.insert(MessageSchema::new(
        "SATLIST",
        43,
        HeaderStyle::Standard,
        vec![
            FieldEntry::with_children("records", TypeDescriptor::class_array(16), 2),
            FieldEntry::with_enum("system", TypeDescriptor::enumeration(4), systems),
            FieldEntry::new(
                "id",
                TypeDescriptor::simple(BaseType::SatelliteId, ConversionSpec::SatelliteId, 4),
            ),
        ],
    ));
    db.insert(MessageSchema::new(
        "MARK",
        44,
        HeaderStyle::Short,
        vec![FieldEntry::new(
            "offset",
            TypeDescriptor::simple(BaseType::Double, ConversionSpec::Float { after: 3 }, 8),
        )],
    ));
    db
}
