//! Fixed code tables from the AJP13 protocol.
//!
//! The proxy avoids sending well-known method, header and attribute names
//! as text: it sends a small integer instead, which indexes one of these
//! tables. Index 0 is never valid in any of them.

use http::{header, HeaderName, Method};

/// Method names, indexed by method code (1..=27)
pub const METHODS: [&str; 28] = [
    "",
    "OPTIONS",
    "GET",
    "HEAD",
    "POST",
    "PUT",
    "DELETE",
    "TRACE",
    "PROPFIND",
    "PROPPATCH",
    "MKCOL",
    "COPY",
    "MOVE",
    "LOCK",
    "UNLOCK",
    "ACL",
    "REPORT",
    "VERSION-CONTROL",
    "CHECKIN",
    "CHECKOUT",
    "UNCHECKOUT",
    "SEARCH",
    "MKWORKSPACE",
    "UPDATE",
    "LABEL",
    "MERGE",
    "BASELINE-CONTROL",
    "MKACTIVITY",
];

/// Header names, indexed by the low byte of a compressed header code
/// (`0xA001..=0xA00E`)
pub static HEADERS: [Option<HeaderName>; 15] = [
    None,
    Some(header::ACCEPT),
    Some(header::ACCEPT_CHARSET),
    Some(header::ACCEPT_ENCODING),
    Some(header::ACCEPT_LANGUAGE),
    Some(header::AUTHORIZATION),
    Some(header::CONNECTION),
    Some(header::CONTENT_TYPE),
    Some(header::CONTENT_LENGTH),
    Some(header::COOKIE),
    Some(HeaderName::from_static("cookie2")),
    Some(header::HOST),
    Some(header::PRAGMA),
    Some(header::REFERER),
    Some(header::USER_AGENT),
];

/// High byte of a header name length that marks a compressed header code
pub const HEADER_CODE_MARKER: u8 = 0xA0;

pub const CONTEXT: &str = "context";
pub const SERVLET_PATH: &str = "servlet_path";
pub const REMOTE_USER: &str = "remote_user";
pub const AUTH_TYPE: &str = "auth_type";
pub const QUERY_STRING: &str = "query_string";
pub const ROUTE: &str = "route";
pub const SSL_CERT: &str = "ssl_cert";
pub const SSL_CIPHER: &str = "ssl_cipher";
pub const SSL_SESSION: &str = "ssl_session";
pub const REQ_ATTRIBUTE: &str = "req_attribute";
pub const SSL_KEY_SIZE: &str = "ssl_key_size";
pub const SECRET: &str = "secret";
pub const STORED_METHOD: &str = "stored_method";

/// Attribute names, indexed by attribute tag (1..=13)
pub const ATTRIBUTES: [&str; 14] = [
    "",
    CONTEXT,
    SERVLET_PATH,
    REMOTE_USER,
    AUTH_TYPE,
    QUERY_STRING,
    ROUTE,
    SSL_CERT,
    SSL_CIPHER,
    SSL_SESSION,
    REQ_ATTRIBUTE,
    SSL_KEY_SIZE,
    SECRET,
    STORED_METHOD,
];

/// Attribute tag announcing that the attribute name follows as a string
pub const CUSTOM_ATTRIBUTE_TAG: u8 = 0x0A;

/// Attribute tag ending the attribute list, and the request
pub const ATTRIBUTES_END_TAG: u8 = 0xFF;

/// Looks up a method code. Returns `None` for 0 and anything past the table.
pub fn method(code: u8) -> Option<Method> {
    let name = match code {
        1..=27 => METHODS[code as usize],
        _ => return None,
    };
    // the standard ones come out as their `http` constants
    Method::from_bytes(name.as_bytes()).ok()
}

/// Looks up the low byte of a compressed header code.
pub fn header(code: u8) -> Option<&'static HeaderName> {
    HEADERS.get(code as usize).and_then(Option::as_ref)
}

/// Looks up an attribute tag. The custom-name tag and the terminator are not
/// table entries and return `None`, as does anything out of range.
pub fn attribute(code: u8) -> Option<&'static str> {
    match code {
        CUSTOM_ATTRIBUTE_TAG => None,
        1..=13 => Some(ATTRIBUTES[code as usize]),
        _ => None,
    }
}

/// Reverse lookup for the encoder
pub(crate) fn method_code(method: &Method) -> Option<u8> {
    METHODS
        .iter()
        .skip(1)
        .position(|name| *name == method.as_str())
        .map(|i| i as u8 + 1)
}

/// Reverse lookup for the encoder
pub(crate) fn header_code(name: &HeaderName) -> Option<u8> {
    HEADERS
        .iter()
        .position(|h| h.as_ref() == Some(name))
        .map(|i| i as u8)
}

/// Reverse lookup for the encoder. `req_attribute` has no code of its own:
/// its tag is the custom-name tag.
pub(crate) fn attribute_code(name: &str) -> Option<u8> {
    (1..=13u8).find(|&code| code != CUSTOM_ATTRIBUTE_TAG && ATTRIBUTES[code as usize] == name)
}
