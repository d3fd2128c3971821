//! CRLF line framing for tokio.
//!
//! [`LineCodec`] turns the unbounded inbound byte stream into discrete
//! protocol lines and serializes outbound lines with the two-byte
//! terminator. The terminator is exactly `\r\n`; a bare `\n` does not end
//! a line.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, warn};

use crate::error::ProtocolError;
use crate::{MAX_CONTENT_LEN, MAX_LINE_LEN};

/// Line-based codec splitting on `\r\n`.
///
/// The decoder tolerates arbitrarily long accumulation: a stream that
/// never sends a terminator is a backpressure condition, not an error,
/// so no data is dropped and no fault is raised. Inbound bytes are
/// decoded as UTF-8 lossily; the wire is ASCII in practice and a stray
/// high byte must not tear down the session.
#[derive(Debug, Default)]
pub struct LineCodec {
    /// Index of the next byte to check for a terminator.
    next_index: usize,
    /// Whether the oversized-accumulation warning has fired.
    warned: bool,
}

impl LineCodec {
    /// Create a new codec.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, ProtocolError> {
        // Resume scanning where the last call stopped. Back up one byte:
        // the buffer may have ended mid-terminator on a lone `\r`.
        let search_from = self.next_index.saturating_sub(1);

        if let Some(pos) = src[search_from..].windows(2).position(|w| w == b"\r\n") {
            let line = src.split_to(search_from + pos + 2);
            self.next_index = 0;
            let content = &line[..line.len() - 2];
            Ok(Some(String::from_utf8_lossy(content).into_owned()))
        } else {
            self.next_index = src.len();
            if src.len() > 64 * MAX_LINE_LEN && !self.warned {
                self.warned = true;
                warn!(buffered = src.len(), "no line terminator seen; buffering");
            }
            Ok(None)
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>, ProtocolError> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        // A partial trailing fragment at EOF was never a message; drop it.
        if !src.is_empty() {
            debug!(dropped = src.len(), "discarding unterminated fragment at EOF");
            src.clear();
            self.next_index = 0;
        }
        Ok(None)
    }
}

impl Encoder<String> for LineCodec {
    type Error = ProtocolError;

    fn encode(&mut self, line: String, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        if line.len() > MAX_CONTENT_LEN {
            return Err(ProtocolError::MessageTooLong {
                actual: line.len(),
                limit: MAX_CONTENT_LEN,
            });
        }
        dst.reserve(line.len() + 2);
        dst.put_slice(line.as_bytes());
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_complete_line() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from("PING :test\r\n");
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("PING :test"));
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_partial_then_complete() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from("PING :te");
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"st\r\n");
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("PING :test"));
    }

    #[test]
    fn decode_terminator_split_across_reads() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from("NICK minnow\r");
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"\n");
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("NICK minnow"));
    }

    #[test]
    fn decode_multiple_lines_one_read() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from("NICK a\r\nUSER a 0 * :A\r\npartial");
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("NICK a"));
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("USER a 0 * :A"));
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert_eq!(&buf[..], b"partial");
    }

    #[test]
    fn bare_newline_does_not_terminate() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from("one\ntwo\r\n");
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("one\ntwo"));
    }

    #[test]
    fn long_partial_buffer_is_not_an_error() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(vec![b'A'; 4 * MAX_LINE_LEN].as_slice());
        assert!(codec.decode(&mut buf).unwrap().is_none());

        // Data survives and the line completes once a terminator shows up.
        buf.extend_from_slice(b"\r\n");
        let line = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(line.len(), 4 * MAX_LINE_LEN);
    }

    #[test]
    fn eof_drops_unterminated_fragment() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from("half a mess");
        assert!(codec.decode_eof(&mut buf).unwrap().is_none());
        assert!(buf.is_empty());
    }

    #[test]
    fn invalid_utf8_is_replaced_not_fatal() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&b"PRIVMSG #x :caf\xe9\r\n"[..]);
        let line = codec.decode(&mut buf).unwrap().unwrap();
        assert!(line.starts_with("PRIVMSG #x :caf"));
    }

    #[test]
    fn encode_appends_crlf() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::new();
        codec.encode("PONG :test".to_string(), &mut buf).unwrap();
        assert_eq!(&buf[..], b"PONG :test\r\n");
    }

    #[test]
    fn encode_rejects_oversized_line() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::new();
        let err = codec.encode("x".repeat(MAX_CONTENT_LEN + 1), &mut buf);
        assert!(matches!(
            err,
            Err(ProtocolError::MessageTooLong { actual: 511, .. })
        ));
    }
}
