//! Central error types for the log codec.
//!
//! Mirrors the receiver's status taxonomy: hard failures live here,
//! success-side classifications (response message, missing time) are
//! carried in [`crate::ConvertedKind`] instead.

use core::fmt;
use std::borrow::Cow;

/// All failure classes a conversion can produce.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// A field or header element does not match its declared shape.
    InvalidFormat(Cow<'static, str>),
    /// The checksum in the message does not match the computed one.
    InvalidChecksum { expected: u32, computed: u32 },
    /// The message name or id is not in the database.
    InvalidMessageId(String),
    /// The buffer ended mid-field; more data may complete the message.
    UnexpectedEndOfMessage,
    /// The buffer starts with a bare line break.
    Blank,
    /// The buffer contains only separators and whitespace.
    Empty,
}

impl Error {
    /// Erstellt einen `InvalidFormat` Fehler mit Kontext.
    pub fn format(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidFormat(msg.into())
    }

    /// True for the statuses that signal "feed me more bytes", not a
    /// malformed message. Framers retry these, they drop the rest.
    pub fn is_incomplete(&self) -> bool {
        matches!(
            self,
            Self::UnexpectedEndOfMessage | Self::Blank | Self::Empty
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFormat(msg) => {
                if msg.is_empty() {
                    write!(f, "invalid message format")
                } else {
                    write!(f, "invalid message format: {msg}")
                }
            }
            Self::InvalidChecksum { expected, computed } => write!(
                f,
                "checksum mismatch: message carries {expected:08x}, computed {computed:08x}"
            ),
            Self::InvalidMessageId(id) => write!(f, "unknown message '{id}'"),
            Self::UnexpectedEndOfMessage => write!(f, "unexpected end of message"),
            Self::Blank => write!(f, "blank message"),
            Self::Empty => write!(f, "empty message"),
        }
    }
}

impl std::error::Error for Error {}

/// A convenience `Result` type alias using [`Error`].
pub type Result<T> = core::result::Result<T, Error>;
