use http::{uri::Scheme, HeaderName, HeaderValue, Method};

use crate::UrlCharset;

/// Request data that doesn't belong on the request itself, but is handed
/// to the authentication layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attachment {
    /// The principal the proxy already authenticated (`remote_user`)
    ExternalPrincipal,
    /// How the proxy authenticated it (`auth_type`)
    ExternalAuthenticationType,
}

/// Where [crate::RequestParser] writes request fields as they complete.
///
/// Each setter is called at most once per request, `add_header` once per
/// header. Headers with a name or value `http` rejects never reach it.
///
/// The last three methods are hooks into URL handling that lives
/// outside the decoder: their default bodies do nothing (or return the
/// input unchanged), so a sink that doesn't care about them can skip them.
pub trait RequestSink {
    fn set_method(&mut self, method: Method);

    /// e.g. `HTTP/1.1`
    fn set_protocol(&mut self, protocol: String);

    /// The path portion of the request URI, as sent (before `;`)
    fn set_request_uri(&mut self, uri: String);

    /// The path portion of the request URI, percent-decoded if needed
    fn set_request_path(&mut self, path: String);

    fn set_relative_path(&mut self, path: String);

    fn set_query_string(&mut self, query: String);

    fn set_scheme(&mut self, scheme: Scheme);

    fn add_header(&mut self, name: HeaderName, value: HeaderValue);

    fn put_attachment(&mut self, attachment: Attachment, value: String);

    /// Percent-decodes a URL path. Only called when decoding is enabled and
    /// the path actually contains `%` or `+`.
    fn decode_url(&mut self, raw: &str, charset: UrlCharset) -> String {
        let _ = charset;
        raw.to_owned()
    }

    /// Handles everything after the first `;` in the request URI
    fn parse_path_parameters(&mut self, params: &str, charset: UrlCharset, decode: bool) {
        let _ = (params, charset, decode);
    }

    /// Handles the raw query string, right before it's passed to
    /// `set_query_string`
    fn parse_query_string(&mut self, query: &str, charset: UrlCharset, decode: bool) {
        let _ = (query, charset, decode);
    }
}
