//! The forward-request phase machine.
//!
//! [RequestParser::parse] walks [Phase]s in order, as far as the input
//! allows. When a field can't be completed it saves the current phase (the
//! sub-decoders have already saved their own partial state) and returns
//! [Progress::Suspended]. The next call resumes at that exact spot.

use std::{borrow::Cow, collections::HashMap, mem};

use bytes::Buf;
use http::{uri::Scheme, HeaderName, HeaderValue};
use pretty_hex::PrettyHex;
use tracing::{debug, trace, warn};

use crate::{
    codec::{read_string, read_u16, read_u8, DecodedString, StringKind},
    state::{AttributeCursor, ParseState, PendingHeader, Phase, PrefixCode},
    tables::{
        self, ATTRIBUTES_END_TAG, AUTH_TYPE, CUSTOM_ATTRIBUTE_TAG, QUERY_STRING, REMOTE_USER,
        SSL_KEY_SIZE,
    },
    AjpError, Attachment, ParserConf, RequestSink,
};

/// Magic number at the start of every packet sent by the proxy
pub const MAGIC: u16 = 0x1234;

/// What [RequestParser::parse] got to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Ran out of input in the middle of the packet. Call again with the
    /// same [ParseState] once more bytes are in.
    Suspended,
    /// The packet is fully decoded. For anything but a forward request
    /// (see [ParseState::prefix_code]) there was nothing past the prefix.
    Done,
}

/// Unwraps a sub-decoder result, or suspends.
macro_rules! ready {
    ($state:expr, $e:expr) => {
        match $e {
            Some(v) => v,
            None => {
                trace!(phase = ?$state.phase, "suspending");
                return Ok(Progress::Suspended);
            }
        }
    };
}

/// Decodes AJP13 forward requests. Holds configuration only: a single
/// parser can serve any number of connections, as long as each request
/// gets its own [ParseState].
#[derive(Debug, Clone, Default)]
pub struct RequestParser {
    conf: ParserConf,
}

impl RequestParser {
    /// Builds a parser with the given configuration
    pub fn new(conf: ParserConf) -> Self {
        Self { conf }
    }

    /// The configuration this parser was built with
    pub fn conf(&self) -> &ParserConf {
        &self.conf
    }

    /// Decodes as much of the packet in `buf` as possible, writing request
    /// fields into `sink` as they complete.
    ///
    /// Only consumes bytes that are part of the packet. Once `Done` is
    /// returned, further calls are no-ops until the state is reset.
    ///
    /// On error, the state and sink hold a partial request that must be
    /// thrown away along with the connection.
    pub fn parse(
        &self,
        buf: &mut impl Buf,
        state: &mut ParseState,
        sink: &mut impl RequestSink,
    ) -> Result<Progress, AjpError> {
        trace!(phase = ?state.phase, available = buf.remaining(), "parse");

        loop {
            let next = match state.phase {
                Phase::Done => return Ok(Progress::Done),
                Phase::Start => {
                    let magic = ready!(state, read_u16(buf, &mut state.scratch.int));
                    if magic != MAGIC {
                        return Err(AjpError::BadMagic { found: magic });
                    }
                    Phase::ReadDataSize
                }
                Phase::ReadDataSize => {
                    let size = ready!(state, read_u16(buf, &mut state.scratch.int));
                    trace!(size, "data size");
                    state.data_size = Some(size);
                    Phase::ReadPrefixCode
                }
                Phase::ReadPrefixCode => {
                    let prefix = PrefixCode::from(ready!(state, read_u8(buf)));
                    state.prefix_code = Some(prefix);
                    if prefix == PrefixCode::ForwardRequest {
                        Phase::ReadMethod
                    } else {
                        debug!(?prefix, "not a forward request, nothing more to decode");
                        Phase::Done
                    }
                }
                Phase::ReadMethod => {
                    let code = ready!(state, read_u8(buf));
                    let method = tables::method(code).ok_or(AjpError::UnknownMethod(code))?;
                    trace!(%method, "method");
                    sink.set_method(method);
                    Phase::ReadProtocol
                }
                Phase::ReadProtocol => {
                    let protocol = ready!(state, self.read_plain(buf, state)?);
                    sink.set_protocol(protocol.into_text());
                    Phase::ReadRequestUri
                }
                Phase::ReadRequestUri => {
                    let uri = ready!(state, self.read_plain(buf, state)?);
                    self.apply_request_uri(uri, sink);
                    Phase::ReadRemoteAddress
                }
                Phase::ReadRemoteAddress => {
                    let addr = ready!(state, self.read_plain(buf, state)?);
                    state.remote_address = Some(addr.into_text());
                    Phase::ReadRemoteHost
                }
                Phase::ReadRemoteHost => {
                    // required on the wire, not used
                    ready!(state, self.read_plain(buf, state)?);
                    Phase::ReadServerName
                }
                Phase::ReadServerName => {
                    let name = ready!(state, self.read_plain(buf, state)?);
                    state.server_address = Some(name.into_text());
                    Phase::ReadServerPort
                }
                Phase::ReadServerPort => {
                    let port = ready!(state, read_u16(buf, &mut state.scratch.int));
                    state.server_port = Some(port);
                    Phase::ReadIsSsl
                }
                Phase::ReadIsSsl => {
                    let is_ssl = ready!(state, read_u8(buf));
                    sink.set_scheme(if is_ssl == 0 {
                        Scheme::HTTP
                    } else {
                        Scheme::HTTPS
                    });
                    Phase::ReadHeaderCount
                }
                Phase::ReadHeaderCount => {
                    let count = ready!(state, read_u16(buf, &mut state.scratch.int));
                    trace!(count, "header count");
                    state.header_count = count;
                    Phase::ReadHeaders
                }
                Phase::ReadHeaders => {
                    ready!(state, self.read_headers(buf, state, sink)?);
                    Phase::ReadAttributes
                }
                Phase::ReadAttributes => {
                    ready!(state, self.read_attributes(buf, state, sink)?);
                    debug!(
                        headers = state.header_count,
                        attributes = state.attributes.len(),
                        "forward request decoded"
                    );
                    Phase::Done
                }
            };
            debug_assert!(next == state.phase.next() || next == Phase::Done);
            state.phase = next;
        }
    }

    fn read_plain(
        &self,
        buf: &mut impl Buf,
        state: &mut ParseState,
    ) -> Result<Option<DecodedString>, AjpError> {
        read_string(buf, &mut state.scratch.string, StringKind::Plain)
    }

    /// Splits off path parameters, URL-decodes the path if it needs it.
    fn apply_request_uri(&self, uri: DecodedString, sink: &mut impl RequestSink) {
        let decode = self.conf.decode_url && uri.url_chars();
        let charset = self.conf.url_charset;
        let uri = uri.into_text();

        let (path, params) = match memchr::memchr(b';', uri.as_bytes()) {
            Some(i) => (&uri[..i], Some(&uri[i + 1..])),
            None => (&uri[..], None),
        };
        trace!(path, ?params, decode, "request uri");

        let decoded = if decode {
            sink.decode_url(path, charset)
        } else {
            path.to_owned()
        };
        sink.set_request_uri(path.to_owned());
        sink.set_request_path(decoded.clone());
        sink.set_relative_path(decoded);

        if let Some(params) = params {
            sink.parse_path_parameters(params, charset, decode);
        }
    }

    /// Returns `Some(())` once all announced headers are in. Headers whose
    /// name or value `http` won't take are skipped, but still counted.
    fn read_headers(
        &self,
        buf: &mut impl Buf,
        state: &mut ParseState,
        sink: &mut impl RequestSink,
    ) -> Result<Option<()>, AjpError> {
        while state.headers_read < state.header_count {
            let pending = match state.pending_header.take() {
                Some(pending) => pending,
                None => {
                    let Some(name) =
                        read_string(buf, &mut state.scratch.string, StringKind::HeaderName)?
                    else {
                        return Ok(None);
                    };
                    header_name(name)
                }
            };

            let Some(value) = read_string(buf, &mut state.scratch.string, StringKind::Plain)?
            else {
                state.pending_header = Some(pending);
                return Ok(None);
            };
            state.headers_read += 1;

            let PendingHeader::Named(name) = pending else {
                continue;
            };
            match HeaderValue::from_bytes(&value.into_bytes()) {
                Ok(value) => {
                    trace!(%name, ?value, "header");
                    sink.add_header(name, value);
                }
                Err(_) => warn!(%name, "dropping header with an invalid value"),
            }
        }
        Ok(Some(()))
    }

    /// Returns `Some(())` once the terminator tag has been read.
    fn read_attributes(
        &self,
        buf: &mut impl Buf,
        state: &mut ParseState,
        sink: &mut impl RequestSink,
    ) -> Result<Option<()>, AjpError> {
        loop {
            let is_key_size = match state.attribute_cursor {
                AttributeCursor::Idle => {
                    let Some(tag) = read_u8(buf) else {
                        return Ok(None);
                    };
                    state.attribute_cursor = match tag {
                        ATTRIBUTES_END_TAG => return Ok(Some(())),
                        CUSTOM_ATTRIBUTE_TAG => AttributeCursor::ReadingCustomName,
                        code => {
                            let name =
                                tables::attribute(code).ok_or(AjpError::UnknownAttribute(code))?;
                            AttributeCursor::Named(Cow::Borrowed(name))
                        }
                    };
                    continue;
                }
                AttributeCursor::ReadingCustomName => {
                    let Some(name) = self.read_plain(buf, state)? else {
                        return Ok(None);
                    };
                    state.attribute_cursor = AttributeCursor::Named(Cow::Owned(name.into_text()));
                    continue;
                }
                AttributeCursor::Named(ref name) => name.as_ref() == SSL_KEY_SIZE,
            };

            let value = if is_key_size {
                let Some(size) = read_u16(buf, &mut state.scratch.int) else {
                    return Ok(None);
                };
                itoa::Buffer::new().format(size).to_owned()
            } else {
                let Some(value) = self.read_plain(buf, state)? else {
                    return Ok(None);
                };
                value.into_text()
            };

            if let AttributeCursor::Named(name) = mem::take(&mut state.attribute_cursor) {
                self.route_attribute(name, value, &mut state.attributes, sink);
            }
        }
    }

    fn route_attribute(
        &self,
        name: Cow<'static, str>,
        value: String,
        attributes: &mut HashMap<String, String>,
        sink: &mut impl RequestSink,
    ) {
        trace!(%name, %value, "attribute");
        match name.as_ref() {
            QUERY_STRING => {
                sink.parse_query_string(&value, self.conf.url_charset, self.conf.decode_url);
                sink.set_query_string(value);
            }
            REMOTE_USER => sink.put_attachment(Attachment::ExternalPrincipal, value),
            AUTH_TYPE => sink.put_attachment(Attachment::ExternalAuthenticationType, value),
            _ => {
                attributes.insert(name.into_owned(), value);
            }
        }
    }
}

fn header_name(name: DecodedString) -> PendingHeader {
    match name {
        DecodedString::Header(name) => PendingHeader::Named(name.clone()),
        other => {
            let bytes = other.into_bytes();
            match HeaderName::from_bytes(&bytes) {
                Ok(name) => PendingHeader::Named(name),
                Err(_) => {
                    warn!(
                        "dropping header with an invalid name:\n{:?}",
                        bytes[..bytes.len().min(64)].hex_dump()
                    );
                    PendingHeader::Rejected
                }
            }
        }
    }
}
