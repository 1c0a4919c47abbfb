//! Field scanner for the ASCII framing.
//!
//! A message looks like `#NAME,h1,h2,...;f1,f2,...*crc\r\n`. The
//! tokenizer walks it as a `(buffer, position)` cursor and never
//! mutates the input. Quoted fields may contain separators; a bare
//! line break inside quotes is malformed.

use crate::error::{Error, Result};

pub const FIELD_SEPARATOR: u8 = b',';
pub const HEADER_TERMINATOR: u8 = b';';
pub const CHECKSUM_PREFIX: u8 = b'*';
pub const QUOTE: u8 = b'"';

/// What ended a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// `,`, `*`, CR or NUL. More fields (or the checksum) follow.
    Separator,
    /// `;`, the header portion is complete.
    HeaderTerminator,
    /// The buffer ran out. Not an error; the caller decides whether
    /// the remainder is usable or more data is needed.
    PastEnd,
}

/// One scanned field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    /// Field bytes, leading/trailing whitespace stripped, boundary
    /// byte excluded. Quotes around a quoted field are kept.
    pub text: &'a [u8],
    pub boundary: Boundary,
}

/// Non-mutating scanner over one ASCII message.
#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
    buf: &'a [u8],
    pos: usize,
}

#[inline]
fn is_boundary(b: u8) -> bool {
    matches!(
        b,
        FIELD_SEPARATOR | HEADER_TERMINATOR | CHECKSUM_PREFIX | QUOTE | b'\r' | b'\0'
    )
}

fn trim_trailing(mut s: &[u8]) -> &[u8] {
    while let [rest @ .., last] = s {
        if last.is_ascii_whitespace() {
            s = rest;
        } else {
            break;
        }
    }
    s
}

impl<'a> Tokenizer<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current cursor position (byte offset into the buffer).
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Moves the cursor. Used when a caller consumes bytes itself
    /// (embedded sub-messages, passthrough data).
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.buf.len());
    }

    /// Unscanned remainder of the buffer.
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    pub fn peek(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }

    /// Scans the next field: skips leading whitespace, finds the next
    /// boundary byte (`,` `;` `*` CR NUL, quote-aware), trims the
    /// token and advances past the boundary.
    pub fn next_field(&mut self) -> Result<Token<'a>> {
        while self.pos < self.buf.len() && self.buf[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
        let start = self.pos;
        if start >= self.buf.len() {
            return Ok(Token { text: &[], boundary: Boundary::PastEnd });
        }

        let mut i = start;
        loop {
            let Some(off) = self.buf[i..].iter().position(|&b| is_boundary(b)) else {
                self.pos = self.buf.len();
                return Ok(Token {
                    text: trim_trailing(&self.buf[start..]),
                    boundary: Boundary::PastEnd,
                });
            };
            let at = i + off;
            let b = self.buf[at];
            if b == QUOTE {
                let Some(q) = memchr::memchr(QUOTE, &self.buf[at + 1..]) else {
                    self.pos = self.buf.len();
                    return Ok(Token {
                        text: trim_trailing(&self.buf[start..]),
                        boundary: Boundary::PastEnd,
                    });
                };
                let close = at + 1 + q;
                if self.buf[at + 1..close].iter().any(|&c| c == b'\r' || c == b'\n') {
                    return Err(Error::format("line break inside quoted field"));
                }
                i = close + 1;
                continue;
            }
            let text = trim_trailing(&self.buf[start..at]);
            self.pos = at + 1;
            let boundary = if b == HEADER_TERMINATOR {
                Boundary::HeaderTerminator
            } else {
                Boundary::Separator
            };
            return Ok(Token { text, boundary });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(input: &[u8]) -> Vec<(Vec<u8>, Boundary)> {
        let mut tok = Tokenizer::new(input);
        let mut out = Vec::new();
        loop {
            let t = tok.next_field().unwrap();
            if t.boundary == Boundary::PastEnd && t.text.is_empty() {
                break;
            }
            out.push((t.text.to_vec(), t.boundary));
            if t.boundary == Boundary::PastEnd {
                break;
            }
        }
        out
    }

    #[test]
    fn splits_on_commas() {
        let f = fields(b"COM1,0,55.5,");
        assert_eq!(f.len(), 3);
        assert_eq!(f[0], (b"COM1".to_vec(), Boundary::Separator));
        assert_eq!(f[2], (b"55.5".to_vec(), Boundary::Separator));
    }

    #[test]
    fn semicolon_terminates_header() {
        let mut tok = Tokenizer::new(b"1337;42");
        let t = tok.next_field().unwrap();
        assert_eq!(t.text, b"1337");
        assert_eq!(t.boundary, Boundary::HeaderTerminator);
        let t = tok.next_field().unwrap();
        assert_eq!(t.text, b"42");
        assert_eq!(t.boundary, Boundary::PastEnd);
    }

    #[test]
    fn asterisk_and_cr_are_plain_separators() {
        let f = fields(b"7*b2c3d4f5\r\n");
        assert_eq!(f[0], (b"7".to_vec(), Boundary::Separator));
        assert_eq!(f[1], (b"b2c3d4f5".to_vec(), Boundary::Separator));
    }

    #[test]
    fn quoted_field_may_contain_separators() {
        let mut tok = Tokenizer::new(b"\"a,b;c\",next");
        let t = tok.next_field().unwrap();
        assert_eq!(t.text, b"\"a,b;c\"");
        assert_eq!(t.boundary, Boundary::Separator);
        assert_eq!(tok.next_field().unwrap().text, b"next");
    }

    #[test]
    fn line_break_inside_quotes_is_rejected() {
        let mut tok = Tokenizer::new(b"\"a\rb\",x");
        assert_eq!(
            tok.next_field(),
            Err(Error::format("line break inside quoted field"))
        );
    }

    #[test]
    fn unclosed_quote_yields_past_end() {
        let mut tok = Tokenizer::new(b"\"abc");
        let t = tok.next_field().unwrap();
        assert_eq!(t.boundary, Boundary::PastEnd);
    }

    #[test]
    fn whitespace_is_trimmed() {
        let mut tok = Tokenizer::new(b"  FINE \t,x");
        assert_eq!(tok.next_field().unwrap().text, b"FINE");
    }

    #[test]
    fn empty_buffer_is_past_end() {
        let mut tok = Tokenizer::new(b"");
        let t = tok.next_field().unwrap();
        assert!(t.text.is_empty());
        assert_eq!(t.boundary, Boundary::PastEnd);
    }

    #[test]
    fn seek_and_rest() {
        let mut tok = Tokenizer::new(b"abc,def");
        tok.next_field().unwrap();
        assert_eq!(tok.rest(), b"def");
        tok.seek(0);
        assert_eq!(tok.pos(), 0);
        assert_eq!(tok.peek(), Some(b'a'));
    }
}
