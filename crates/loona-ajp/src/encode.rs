//! Encoding of proxy-to-container packets: what a front-end proxy sends.
//! Handy to test containers, and to build test fixtures for the decoder.

use std::io::Write;

use byteorder::{BigEndian, WriteBytesExt};
use http::{HeaderName, Method};

use crate::{
    codec::NULL_STRING,
    parser::MAGIC,
    state::PrefixCode,
    tables::{self, ATTRIBUTES_END_TAG, CUSTOM_ATTRIBUTE_TAG, HEADER_CODE_MARKER, SSL_KEY_SIZE},
};

/// Why a packet couldn't be encoded. Nothing is written in that case.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum EncodeError {
    /// A string doesn't fit its 16-bit length prefix. `0xFFFF` is taken by
    /// the null string, and literal header names must stay under `0xA000`.
    #[error("String too long: {len} bytes, at most {max} allowed")]
    StringTooLong { len: usize, max: usize },

    /// The packet body doesn't fit the 16-bit data size
    #[error("Packet too long: {len} bytes")]
    PacketTooLong { len: usize },

    /// The method has no code in the method table
    #[error("No method code for {0}")]
    UnknownMethod(Method),

    /// `ssl_key_size` values are sent as a `u16`
    #[error("Invalid ssl_key_size value {0:?}")]
    InvalidKeySize(String),

    /// Writing to the output failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Longest literal string: `0xFFFF` means null
const MAX_STRING_LEN: usize = NULL_STRING as usize - 1;

/// Longest literal header name: `0xA0xx` lengths are compressed codes
const MAX_HEADER_NAME_LEN: usize = ((HEADER_CODE_MARKER as usize) << 8) - 1;

#[derive(Debug, Clone)]
enum EncodedName {
    Code(u8),
    Literal(Vec<u8>),
}

/// Builds a forward request packet.
///
/// Well-known header and attribute names are sent as codes unless asked
/// otherwise, just like a proxy would.
#[derive(Debug, Clone)]
pub struct ForwardRequestEncoder {
    method: Method,
    protocol: String,
    request_uri: String,
    remote_address: String,
    remote_host: Option<String>,
    server_name: String,
    server_port: u16,
    is_ssl: bool,
    headers: Vec<(EncodedName, Vec<u8>)>,
    attributes: Vec<(EncodedName, String)>,
}

impl ForwardRequestEncoder {
    pub fn new(method: Method, request_uri: impl Into<String>) -> Self {
        Self {
            method,
            protocol: "HTTP/1.1".to_owned(),
            request_uri: request_uri.into(),
            remote_address: "127.0.0.1".to_owned(),
            remote_host: None,
            server_name: "localhost".to_owned(),
            server_port: 80,
            is_ssl: false,
            headers: Vec::new(),
            attributes: Vec::new(),
        }
    }

    pub fn protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    pub fn remote_address(mut self, addr: impl Into<String>) -> Self {
        self.remote_address = addr.into();
        self
    }

    /// Sent as the null string if never set
    pub fn remote_host(mut self, host: impl Into<String>) -> Self {
        self.remote_host = Some(host.into());
        self
    }

    pub fn server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = name.into();
        self
    }

    pub fn server_port(mut self, port: u16) -> Self {
        self.server_port = port;
        self
    }

    pub fn is_ssl(mut self, is_ssl: bool) -> Self {
        self.is_ssl = is_ssl;
        self
    }

    /// Adds a header, compressed if it's in the header table
    pub fn header(mut self, name: HeaderName, value: impl AsRef<[u8]>) -> Self {
        let name = match tables::header_code(&name) {
            Some(code) => EncodedName::Code(code),
            None => EncodedName::Literal(name.as_str().as_bytes().to_vec()),
        };
        self.headers.push((name, value.as_ref().to_vec()));
        self
    }

    /// Adds a header with its name spelled out, even if it's in the header
    /// table. The name isn't validated.
    pub fn literal_header(mut self, name: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Self {
        self.headers.push((
            EncodedName::Literal(name.as_ref().to_vec()),
            value.as_ref().to_vec(),
        ));
        self
    }

    /// Adds an attribute, by code if it's in the attribute table.
    /// `ssl_key_size` values must parse as a `u16`: they're sent as one.
    pub fn attribute(mut self, name: &str, value: impl Into<String>) -> Self {
        let name = match tables::attribute_code(name) {
            Some(code) => EncodedName::Code(code),
            None => EncodedName::Literal(name.as_bytes().to_vec()),
        };
        self.attributes.push((name, value.into()));
        self
    }

    /// Encodes the whole packet, header included.
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let mut body = Vec::new();
        self.write_body(&mut body)?;

        let len = u16::try_from(body.len())
            .map_err(|_| EncodeError::PacketTooLong { len: body.len() })?;
        let mut out = Vec::with_capacity(4 + body.len());
        out.write_u16::<BigEndian>(MAGIC)?;
        out.write_u16::<BigEndian>(len)?;
        out.extend_from_slice(&body);
        Ok(out)
    }

    fn write_body(&self, w: &mut impl Write) -> Result<(), EncodeError> {
        let method = tables::method_code(&self.method)
            .ok_or_else(|| EncodeError::UnknownMethod(self.method.clone()))?;

        w.write_u8(PrefixCode::FORWARD_REQUEST)?;
        w.write_u8(method)?;
        write_string(w, self.protocol.as_bytes())?;
        write_string(w, self.request_uri.as_bytes())?;
        write_string(w, self.remote_address.as_bytes())?;
        match &self.remote_host {
            Some(host) => write_string(w, host.as_bytes())?,
            None => w.write_u16::<BigEndian>(NULL_STRING)?,
        }
        write_string(w, self.server_name.as_bytes())?;
        w.write_u16::<BigEndian>(self.server_port)?;
        w.write_u8(self.is_ssl as u8)?;

        let count = u16::try_from(self.headers.len()).map_err(|_| EncodeError::PacketTooLong {
            len: self.headers.len(),
        })?;
        w.write_u16::<BigEndian>(count)?;
        for (name, value) in &self.headers {
            match name {
                EncodedName::Code(code) => {
                    w.write_u16::<BigEndian>(u16::from_be_bytes([HEADER_CODE_MARKER, *code]))?
                }
                EncodedName::Literal(name) => write_bounded(w, name, MAX_HEADER_NAME_LEN)?,
            }
            write_string(w, value)?;
        }

        for (name, value) in &self.attributes {
            let name_str = match name {
                EncodedName::Code(code) => {
                    w.write_u8(*code)?;
                    tables::ATTRIBUTES[*code as usize]
                }
                EncodedName::Literal(name) => {
                    w.write_u8(CUSTOM_ATTRIBUTE_TAG)?;
                    write_string(w, name)?;
                    std::str::from_utf8(name).unwrap_or_default()
                }
            };
            if name_str == SSL_KEY_SIZE {
                let size: u16 = value
                    .parse()
                    .map_err(|_| EncodeError::InvalidKeySize(value.clone()))?;
                w.write_u16::<BigEndian>(size)?;
            } else {
                write_string(w, value.as_bytes())?;
            }
        }
        w.write_u8(ATTRIBUTES_END_TAG)?;

        Ok(())
    }
}

/// Encodes a packet that's just a prefix code, like CPing or Shutdown.
pub fn encode_signal(prefix: PrefixCode) -> Vec<u8> {
    let mut out = Vec::with_capacity(5);
    out.extend_from_slice(&MAGIC.to_be_bytes());
    out.extend_from_slice(&1u16.to_be_bytes());
    out.push(prefix.repr());
    out
}

fn write_string(w: &mut impl Write, s: &[u8]) -> Result<(), EncodeError> {
    write_bounded(w, s, MAX_STRING_LEN)
}

fn write_bounded(w: &mut impl Write, s: &[u8], max: usize) -> Result<(), EncodeError> {
    if s.len() > max {
        return Err(EncodeError::StringTooLong { len: s.len(), max });
    }
    w.write_u16::<BigEndian>(s.len() as u16)?;
    w.write_all(s)?;
    w.write_u8(0)?;
    Ok(())
}
