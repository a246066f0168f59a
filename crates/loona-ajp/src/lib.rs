//! A resumable decoder for AJP13 forward requests, the packets a front-end
//! proxy (mod_jk, mod_proxy_ajp...) sends to an application container.
//!
//! The decoder does no I/O. Feed it whatever bytes came off the socket,
//! in chunks of any size, along with a [ParseState] that lives as long as
//! the request does:
//!
//! ```rust
//! use loona_ajp::{encode::ForwardRequestEncoder, ForwardRequest, ParseState, Progress, RequestParser};
//! use loona_ajp::http::Method;
//!
//! let packet = ForwardRequestEncoder::new(Method::GET, "/index.html")
//!     .attribute("query_string", "page=2")
//!     .encode()
//!     .unwrap();
//!
//! let parser = RequestParser::default();
//! let mut state = ParseState::new();
//! let mut req = ForwardRequest::default();
//!
//! let (first, second) = packet.split_at(7);
//! assert_eq!(parser.parse(&mut &first[..], &mut state, &mut req).unwrap(), Progress::Suspended);
//! assert_eq!(parser.parse(&mut &second[..], &mut state, &mut req).unwrap(), Progress::Done);
//!
//! assert_eq!(req.method, Method::GET);
//! assert_eq!(req.path_and_query(), "/index.html?page=2");
//! ```

mod codec;
mod conf;
mod error;
mod parser;
mod request;
mod sink;
mod state;

pub mod encode;
pub mod tables;

pub use codec::NULL_STRING;
pub use conf::*;
pub use error::AjpError;
pub use parser::{Progress, RequestParser, MAGIC};
pub use request::ForwardRequest;
pub use sink::{Attachment, RequestSink};
pub use state::{AttributeCursor, ParseState, Phase, PrefixCode};

/// re-exported so consumers can use whatever version we use
pub use http;
