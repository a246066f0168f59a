use std::{borrow::Cow, collections::HashMap};

use http::HeaderName;

/// Where the decoder is in the forward-request grammar. Phases are visited
/// strictly in declaration order, the derived `Ord` reflects that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Phase {
    #[default]
    Start,
    ReadDataSize,
    ReadPrefixCode,
    ReadMethod,
    ReadProtocol,
    ReadRequestUri,
    ReadRemoteAddress,
    ReadRemoteHost,
    ReadServerName,
    ReadServerPort,
    ReadIsSsl,
    ReadHeaderCount,
    ReadHeaders,
    ReadAttributes,
    Done,
}

impl Phase {
    /// The phase that follows this one when nothing short-circuits to `Done`
    pub(crate) fn next(self) -> Phase {
        match self {
            Phase::Start => Phase::ReadDataSize,
            Phase::ReadDataSize => Phase::ReadPrefixCode,
            Phase::ReadPrefixCode => Phase::ReadMethod,
            Phase::ReadMethod => Phase::ReadProtocol,
            Phase::ReadProtocol => Phase::ReadRequestUri,
            Phase::ReadRequestUri => Phase::ReadRemoteAddress,
            Phase::ReadRemoteAddress => Phase::ReadRemoteHost,
            Phase::ReadRemoteHost => Phase::ReadServerName,
            Phase::ReadServerName => Phase::ReadServerPort,
            Phase::ReadServerPort => Phase::ReadIsSsl,
            Phase::ReadIsSsl => Phase::ReadHeaderCount,
            Phase::ReadHeaderCount => Phase::ReadHeaders,
            Phase::ReadHeaders => Phase::ReadAttributes,
            Phase::ReadAttributes | Phase::Done => Phase::Done,
        }
    }
}

/// The packet type byte that follows the length. Only forward requests
/// carry a body the decoder understands; everything else ends parsing right
/// there and is left for the caller to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrefixCode {
    ForwardRequest,
    Shutdown,
    CPong,
    CPing,
    Other(u8),
}

impl PrefixCode {
    pub const FORWARD_REQUEST: u8 = 2;
    pub const SHUTDOWN: u8 = 7;
    pub const CPONG: u8 = 9;
    pub const CPING: u8 = 10;

    pub fn repr(self) -> u8 {
        match self {
            PrefixCode::ForwardRequest => Self::FORWARD_REQUEST,
            PrefixCode::Shutdown => Self::SHUTDOWN,
            PrefixCode::CPong => Self::CPONG,
            PrefixCode::CPing => Self::CPING,
            PrefixCode::Other(code) => code,
        }
    }
}

impl From<u8> for PrefixCode {
    fn from(code: u8) -> Self {
        match code {
            Self::FORWARD_REQUEST => PrefixCode::ForwardRequest,
            Self::SHUTDOWN => PrefixCode::Shutdown,
            Self::CPONG => PrefixCode::CPong,
            Self::CPING => PrefixCode::CPing,
            other => PrefixCode::Other(other),
        }
    }
}

/// Progress through the attribute list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AttributeCursor {
    /// Between attributes: the next byte is a tag
    #[default]
    Idle,
    /// Got the custom-name tag, the name string is being decoded
    ReadingCustomName,
    /// Name is known, its value is being decoded
    Named(Cow<'static, str>),
}

/// A header name whose value hasn't been read yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PendingHeader {
    Named(HeaderName),
    /// Not a valid header name: the value is still read, then dropped
    Rejected,
}

/// Partially decoded string, carried across suspensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StringProgress {
    /// Reading the 2-byte length, possibly with its first byte carried
    Length(Option<u8>),
    /// Copying content bytes
    Content {
        len: usize,
        bytes: Vec<u8>,
        url_chars: bool,
    },
    /// All content is in, only the terminator byte is missing
    Terminator { bytes: Vec<u8>, url_chars: bool },
}

impl Default for StringProgress {
    fn default() -> Self {
        StringProgress::Length(None)
    }
}

/// Decoder-local partial state. Only one primitive decode is ever in
/// flight, so a single scratch area is enough.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Scratch {
    /// First byte of a 16-bit integer
    pub(crate) int: Option<u8>,
    pub(crate) string: StringProgress,
}

impl Scratch {
    pub(crate) fn is_empty(&self) -> bool {
        self.int.is_none() && self.string == StringProgress::Length(None)
    }
}

/// Everything the decoder needs to resume a request where the last chunk
/// ended, plus the fields that are kept here rather than handed to the
/// [crate::RequestSink].
///
/// One per in-flight request. Call [ParseState::reset] (or make a new one)
/// once [ParseState::is_done] returns true.
#[derive(Debug, Clone, Default)]
pub struct ParseState {
    pub(crate) phase: Phase,
    pub(crate) data_size: Option<u16>,
    pub(crate) prefix_code: Option<PrefixCode>,
    pub(crate) header_count: u16,
    pub(crate) headers_read: u16,
    pub(crate) pending_header: Option<PendingHeader>,
    pub(crate) attribute_cursor: AttributeCursor,
    pub(crate) scratch: Scratch,
    pub(crate) attributes: HashMap<String, String>,
    pub(crate) remote_address: Option<String>,
    pub(crate) server_address: Option<String>,
    pub(crate) server_port: Option<u16>,
}

impl ParseState {
    pub fn new() -> Self {
        Default::default()
    }

    /// Makes this state ready for the next request on the same connection.
    pub fn reset(&mut self) {
        *self = Default::default();
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    /// Frame length announced by the proxy. Informational only.
    pub fn data_size(&self) -> Option<u16> {
        self.data_size
    }

    /// Packet type, once read. Anything but [PrefixCode::ForwardRequest]
    /// means the packet had no request in it.
    pub fn prefix_code(&self) -> Option<PrefixCode> {
        self.prefix_code
    }

    pub fn header_count(&self) -> u16 {
        self.header_count
    }

    pub fn headers_read(&self) -> u16 {
        self.headers_read
    }

    pub fn attribute_cursor(&self) -> &AttributeCursor {
        &self.attribute_cursor
    }

    pub fn remote_address(&self) -> Option<&str> {
        self.remote_address.as_deref()
    }

    pub fn server_address(&self) -> Option<&str> {
        self.server_address.as_deref()
    }

    pub fn server_port(&self) -> Option<u16> {
        self.server_port
    }

    /// Request attributes that weren't routed anywhere else (not the query
    /// string, not the authentication ones)
    pub fn attributes(&self) -> &HashMap<String, String> {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// True if no primitive decode is half-way through
    pub fn at_field_boundary(&self) -> bool {
        self.scratch.is_empty()
    }
}
