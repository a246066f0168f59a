/// Character set that percent-encoded URL bytes should be decoded as.
///
/// The decoder itself never decodes URLs, it only forwards this to the
/// [crate::RequestSink] hooks that do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UrlCharset {
    #[default]
    Utf8,
    Latin1,
}

#[derive(Debug, Clone)]
pub struct ParserConf {
    /// Whether URL paths, path parameters and query strings should be
    /// percent-decoded at all.
    pub decode_url: bool,

    /// Charset used when percent-decoding
    pub url_charset: UrlCharset,
}

impl Default for ParserConf {
    fn default() -> Self {
        Self {
            decode_url: true,
            url_charset: UrlCharset::Utf8,
        }
    }
}
