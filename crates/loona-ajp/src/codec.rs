//! Primitive AJP13 decoders.
//!
//! These never look further than they need to: on a short buffer they
//! consume whatever is there, park it in the caller-provided scratch state,
//! and return `None`. Calling them again with more input picks up exactly
//! where they left off.

use std::mem;

use bytes::Buf;
use http::HeaderName;
use pretty_hex::PrettyHex;
use tracing::trace;

use crate::{state::StringProgress, tables, AjpError};

/// Length value that stands for a null string: no content, no terminator
pub const NULL_STRING: u16 = 0xFFFF;

/// How the length of a string should be interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StringKind {
    Plain,
    /// Lengths starting with `0xA0` are compressed header codes
    HeaderName,
}

/// A string off the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DecodedString {
    /// A compressed header code, already resolved
    Header(&'static HeaderName),
    /// Literal content, terminator stripped. `url_chars` is set if any byte
    /// was `%` or `+`, i.e. the string may need URL decoding.
    Bytes { bytes: Vec<u8>, url_chars: bool },
    /// The null string
    Absent,
}

impl DecodedString {
    pub(crate) fn url_chars(&self) -> bool {
        matches!(
            self,
            DecodedString::Bytes {
                url_chars: true,
                ..
            }
        )
    }

    /// Raw content; empty for the null string
    pub(crate) fn into_bytes(self) -> Vec<u8> {
        match self {
            DecodedString::Header(name) => name.as_str().as_bytes().to_vec(),
            DecodedString::Bytes { bytes, .. } => bytes,
            DecodedString::Absent => Vec::new(),
        }
    }

    /// Content as text. AJP strings are ISO-8859-1.
    pub(crate) fn into_text(self) -> String {
        latin1(self.into_bytes())
    }
}

pub(crate) fn latin1(bytes: Vec<u8>) -> String {
    if bytes.is_ascii() {
        // ascii is valid utf-8 as-is
        return String::from_utf8(bytes).unwrap_or_default();
    }
    bytes.into_iter().map(char::from).collect()
}

/// Reads a single byte, if there is one.
pub(crate) fn read_u8(buf: &mut impl Buf) -> Option<u8> {
    buf.has_remaining().then(|| buf.get_u8())
}

/// Reads a big-endian `u16`, possibly across several calls. `carry` holds
/// the high byte when the input ran out between the two bytes.
pub(crate) fn read_u16(buf: &mut impl Buf, carry: &mut Option<u8>) -> Option<u16> {
    let hi = match carry.take() {
        Some(hi) => hi,
        None => read_u8(buf)?,
    };
    match read_u8(buf) {
        Some(lo) => Some(u16::from_be_bytes([hi, lo])),
        None => {
            trace!(hi, "read_u16: carrying high byte");
            *carry = Some(hi);
            None
        }
    }
}

/// Reads a length-prefixed, terminated string, possibly across several
/// calls. `progress` must be left alone by the caller between calls; it is
/// back to its default once a string completes.
pub(crate) fn read_string(
    buf: &mut impl Buf,
    progress: &mut StringProgress,
    kind: StringKind,
) -> Result<Option<DecodedString>, AjpError> {
    loop {
        match progress {
            StringProgress::Length(carry) => {
                let Some(len) = read_u16(buf, carry) else {
                    return Ok(None);
                };

                let [hi, lo] = len.to_be_bytes();
                if kind == StringKind::HeaderName && hi == tables::HEADER_CODE_MARKER {
                    trace!(code = lo, "read_string: compressed header code");
                    return match tables::header(lo) {
                        Some(name) => Ok(Some(DecodedString::Header(name))),
                        None => Err(AjpError::UnknownHeaderCode(lo)),
                    };
                }
                if len == NULL_STRING {
                    return Ok(Some(DecodedString::Absent));
                }

                let len = len as usize;
                *progress = StringProgress::Content {
                    len,
                    bytes: Vec::with_capacity(len),
                    url_chars: false,
                };
            }
            StringProgress::Content {
                len,
                bytes,
                url_chars,
            } => {
                if bytes.len() < *len {
                    let chunk = buf.chunk();
                    if chunk.is_empty() {
                        trace!(
                            "read_string: have {}/{len} bytes so far:\n{:?}",
                            bytes.len(),
                            bytes[..bytes.len().min(64)].hex_dump()
                        );
                        return Ok(None);
                    }
                    let n = (*len - bytes.len()).min(chunk.len());
                    let taken = &chunk[..n];
                    *url_chars |= memchr::memchr2(b'%', b'+', taken).is_some();
                    bytes.extend_from_slice(taken);
                    buf.advance(n);
                    continue;
                }

                let next = StringProgress::Terminator {
                    bytes: mem::take(bytes),
                    url_chars: *url_chars,
                };
                *progress = next;
            }
            StringProgress::Terminator { bytes, url_chars } => {
                if !buf.has_remaining() {
                    trace!("read_string: waiting on terminator");
                    return Ok(None);
                }
                buf.advance(1);

                let decoded = DecodedString::Bytes {
                    bytes: mem::take(bytes),
                    url_chars: *url_chars,
                };
                *progress = StringProgress::default();
                return Ok(Some(decoded));
            }
        }
    }
}
