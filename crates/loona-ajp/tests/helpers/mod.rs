#![allow(dead_code)]

use std::collections::HashMap;

use loona_ajp::{
    http::{uri::Scheme, HeaderName, HeaderValue, Method},
    AjpError, Attachment, ParseState, Progress, RequestParser, RequestSink, UrlCharset,
};

pub(crate) mod tracing_common;

/// A sink that writes down everything, including what it was asked to do
/// with URLs and query strings.
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct RecordingSink {
    pub method: Option<Method>,
    pub protocol: Option<String>,
    pub request_uri: Option<String>,
    pub request_path: Option<String>,
    pub relative_path: Option<String>,
    pub query_string: Option<String>,
    pub scheme: Option<Scheme>,
    pub headers: Vec<(HeaderName, HeaderValue)>,
    pub attachments: HashMap<Attachment, String>,

    pub decode_url_calls: Vec<String>,
    pub path_parameters: Vec<(String, bool)>,
    pub query_parameters: Vec<(String, String)>,
}

impl RequestSink for RecordingSink {
    fn set_method(&mut self, method: Method) {
        assert!(self.method.replace(method).is_none(), "method set twice");
    }

    fn set_protocol(&mut self, protocol: String) {
        assert!(self.protocol.replace(protocol).is_none(), "protocol set twice");
    }

    fn set_request_uri(&mut self, uri: String) {
        assert!(self.request_uri.replace(uri).is_none(), "uri set twice");
    }

    fn set_request_path(&mut self, path: String) {
        assert!(self.request_path.replace(path).is_none(), "path set twice");
    }

    fn set_relative_path(&mut self, path: String) {
        assert!(
            self.relative_path.replace(path).is_none(),
            "relative path set twice"
        );
    }

    fn set_query_string(&mut self, query: String) {
        assert!(
            self.query_string.replace(query).is_none(),
            "query string set twice"
        );
    }

    fn set_scheme(&mut self, scheme: Scheme) {
        assert!(self.scheme.replace(scheme).is_none(), "scheme set twice");
    }

    fn add_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.push((name, value));
    }

    fn put_attachment(&mut self, attachment: Attachment, value: String) {
        self.attachments.insert(attachment, value);
    }

    fn decode_url(&mut self, raw: &str, _charset: UrlCharset) -> String {
        self.decode_url_calls.push(raw.to_owned());
        percent_decode(raw)
    }

    fn parse_path_parameters(&mut self, params: &str, _charset: UrlCharset, decode: bool) {
        self.path_parameters.push((params.to_owned(), decode));
    }

    fn parse_query_string(&mut self, query: &str, _charset: UrlCharset, _decode: bool) {
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            self.query_parameters.push((k.to_owned(), v.to_owned()));
        }
    }
}

/// Just enough percent-decoding for tests
pub(crate) fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap();
                out.push(u8::from_str_radix(hex, 16).unwrap());
                i += 3;
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8(out).unwrap()
}

/// Everything a decode produces: the sink, and the parts that stay in the
/// parse state
#[derive(Debug, PartialEq)]
pub(crate) struct Outcome {
    pub sink: RecordingSink,
    pub remote_address: Option<String>,
    pub server_address: Option<String>,
    pub server_port: Option<u16>,
    pub attributes: Vec<(String, String)>,
}

impl Outcome {
    fn new(sink: RecordingSink, state: &ParseState) -> Self {
        let mut attributes: Vec<_> = state
            .attributes()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        attributes.sort();
        Self {
            sink,
            remote_address: state.remote_address().map(ToOwned::to_owned),
            server_address: state.server_address().map(ToOwned::to_owned),
            server_port: state.server_port(),
            attributes,
        }
    }
}

/// Decodes `packet` in one call
pub(crate) fn decode_whole(parser: &RequestParser, packet: &[u8]) -> Result<Outcome, AjpError> {
    decode_chunked(parser, &[packet])
}

/// Feeds `chunks` one after the other. Every chunk but the last must leave
/// the parser suspended, and every chunk must be consumed entirely.
pub(crate) fn decode_chunked(
    parser: &RequestParser,
    chunks: &[&[u8]],
) -> Result<Outcome, AjpError> {
    let mut state = ParseState::new();
    let mut sink = RecordingSink::default();

    for (i, chunk) in chunks.iter().enumerate() {
        let mut buf = *chunk;
        let progress = parser.parse(&mut buf, &mut state, &mut sink)?;
        assert!(buf.is_empty(), "chunk {i} not fully consumed");

        let last = i + 1 == chunks.len();
        let expected = if last {
            Progress::Done
        } else {
            Progress::Suspended
        };
        assert_eq!(progress, expected, "after chunk {i}/{}", chunks.len());
    }

    Ok(Outcome::new(sink, &state))
}

/// Splits `packet` at the given (sorted, in-range) offsets
pub(crate) fn split_at_offsets<'a>(packet: &'a [u8], offsets: &[usize]) -> Vec<&'a [u8]> {
    let mut chunks = Vec::with_capacity(offsets.len() + 1);
    let mut start = 0;
    for &offset in offsets {
        chunks.push(&packet[start..offset]);
        start = offset;
    }
    chunks.push(&packet[start..]);
    chunks
}
