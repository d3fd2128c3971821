//! # minnow-proto
//!
//! The wire-protocol layer of the minnow IRC engine: CRLF line framing,
//! message parsing and serialization, CTCP sub-message extraction, and
//! RFC 1459 case folding.
//!
//! ## Quick Start
//!
//! ```rust
//! use minnow_proto::Message;
//!
//! let msg = Message::parse(":nick!user@host PRIVMSG #channel :Hello, world!").unwrap();
//! assert_eq!(msg.command, "PRIVMSG");
//! assert_eq!(msg.params, vec!["#channel", "Hello, world!"]);
//!
//! let out = Message::privmsg("#channel", "Hello, world!");
//! assert_eq!(out.to_wire(), "PRIVMSG #channel :Hello, world!");
//! ```
//!
//! The framing codec is gated behind the `tokio` feature and plugs into
//! `tokio_util::codec::Framed` like any other line codec.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod casemap;
pub mod ctcp;
pub mod error;
#[cfg(feature = "tokio")]
pub mod line;
pub mod message;

pub use self::casemap::{irc_eq, irc_lower_char, irc_to_lower};
pub use self::ctcp::{extract, CtcpMessage, CTCP_DELIM};
pub use self::error::ProtocolError;
#[cfg(feature = "tokio")]
pub use self::line::LineCodec;
pub use self::message::Message;

/// Maximum length of a wire line, including the 2-byte CRLF terminator.
pub const MAX_LINE_LEN: usize = 512;

/// Maximum line content length, excluding the terminator.
pub const MAX_CONTENT_LEN: usize = MAX_LINE_LEN - 2;

/// Maximum number of parameters a message may carry.
pub const MAX_PARAMS: usize = 15;

/// Lines of this length or shorter are protocol keep-alive noise and are
/// silently discarded before parsing.
pub const MIN_LINE_LEN: usize = 5;
