use std::collections::HashMap;

use http::{uri::Scheme, HeaderMap, HeaderName, HeaderValue, Method};

use crate::{Attachment, RequestSink};

/// An owned forward request, for callers that don't have a request type of
/// their own to decode into.
///
/// URL decoding, path parameters and query parameters are left to the
/// application: the raw strings are kept as-is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForwardRequest {
    pub method: Method,

    /// e.g. `HTTP/1.1`
    pub protocol: String,

    /// Request path as sent, without path parameters
    pub request_uri: String,

    pub request_path: String,

    pub relative_path: String,

    /// Everything after the first `;` in the request URI, if anything
    pub path_parameters: Option<String>,

    pub query_string: Option<String>,

    pub scheme: Option<Scheme>,

    pub headers: HeaderMap,

    pub attachments: HashMap<Attachment, String>,
}

impl ForwardRequest {
    /// Request path plus query string, the way it'd appear in an HTTP/1.1
    /// request line.
    pub fn path_and_query(&self) -> String {
        match self.query_string.as_deref() {
            Some(q) if !q.is_empty() => format!("{}?{}", self.request_uri, q),
            _ => self.request_uri.clone(),
        }
    }

    pub fn is_secure(&self) -> bool {
        self.scheme.as_ref() == Some(&Scheme::HTTPS)
    }
}

impl RequestSink for ForwardRequest {
    fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    fn set_protocol(&mut self, protocol: String) {
        self.protocol = protocol;
    }

    fn set_request_uri(&mut self, uri: String) {
        self.request_uri = uri;
    }

    fn set_request_path(&mut self, path: String) {
        self.request_path = path;
    }

    fn set_relative_path(&mut self, path: String) {
        self.relative_path = path;
    }

    fn set_query_string(&mut self, query: String) {
        self.query_string = Some(query);
    }

    fn set_scheme(&mut self, scheme: Scheme) {
        self.scheme = Some(scheme);
    }

    fn add_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.append(name, value);
    }

    fn put_attachment(&mut self, attachment: Attachment, value: String) {
        self.attachments.insert(attachment, value);
    }

    fn parse_path_parameters(&mut self, params: &str, _charset: crate::UrlCharset, _decode: bool) {
        self.path_parameters = Some(params.to_owned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_and_query() {
        let mut req = ForwardRequest {
            request_uri: "/index.jsp".to_owned(),
            ..Default::default()
        };
        assert_eq!(req.path_and_query(), "/index.jsp");

        req.query_string = Some(String::new());
        assert_eq!(req.path_and_query(), "/index.jsp");

        req.query_string = Some("a=1&b=2".to_owned());
        assert_eq!(req.path_and_query(), "/index.jsp?a=1&b=2");
    }

    #[test]
    fn headers_keep_duplicates() {
        let mut req = ForwardRequest::default();
        req.add_header(http::header::COOKIE, HeaderValue::from_static("a=1"));
        req.add_header(http::header::COOKIE, HeaderValue::from_static("b=2"));
        assert_eq!(req.headers.get_all(http::header::COOKIE).iter().count(), 2);
    }
}
