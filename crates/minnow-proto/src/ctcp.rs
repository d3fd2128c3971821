//! CTCP (Client-to-Client Protocol) sub-message extraction.
//!
//! CTCP messages ride inside ordinary PRIVMSG/NOTICE payloads, delimited
//! by the `\x01` control byte on both sides. A single payload may embed
//! several of them, interleaved with visible text; [`extract`] removes
//! every delimited sub-message and returns the visible remainder.

use std::fmt;

/// The CTCP delimiter character (`\x01`), used as both the opening and
/// closing marker.
pub const CTCP_DELIM: char = '\x01';

/// One extracted CTCP sub-message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CtcpMessage {
    /// The CTCP command, exactly as it appeared on the wire.
    /// Lookup is case-insensitive; normalization happens at dispatch.
    pub command: String,
    /// Everything after the first space, or empty when the command stood
    /// alone.
    pub argument: String,
}

impl CtcpMessage {
    /// Build a CTCP message for transmission.
    pub fn new(command: impl Into<String>, argument: impl Into<String>) -> Self {
        CtcpMessage {
            command: command.into(),
            argument: argument.into(),
        }
    }

    fn from_body(body: &str) -> Self {
        match body.find(' ') {
            Some(pos) => CtcpMessage {
                command: body[..pos].to_owned(),
                argument: body[pos + 1..].to_owned(),
            },
            None => CtcpMessage {
                command: body.to_owned(),
                argument: String::new(),
            },
        }
    }
}

impl fmt::Display for CtcpMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", CTCP_DELIM, self.command)?;
        if !self.argument.is_empty() {
            write!(f, " {}", self.argument)?;
        }
        write!(f, "{}", CTCP_DELIM)
    }
}

/// Scan a chat payload for delimited CTCP sub-messages.
///
/// Returns the payload with every marker pair and its contents removed,
/// plus the extracted messages in left-to-right order. A final unmatched
/// marker is closed by the end of the text (some clients omit the closing
/// delimiter), so extraction always terminates. Empty marker pairs are
/// dropped.
///
/// # Example
///
/// ```
/// use minnow_proto::ctcp::extract;
///
/// let (visible, messages) = extract("hello \x01PING 42\x01 world");
/// assert_eq!(visible, "hello  world");
/// assert_eq!(messages.len(), 1);
/// assert_eq!(messages[0].command, "PING");
/// assert_eq!(messages[0].argument, "42");
/// ```
pub fn extract(text: &str) -> (String, Vec<CtcpMessage>) {
    let mut visible = String::with_capacity(text.len());
    let mut messages = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find(CTCP_DELIM) {
        visible.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find(CTCP_DELIM) {
            Some(end) => {
                if end > 0 {
                    messages.push(CtcpMessage::from_body(&after[..end]));
                }
                rest = &after[end + 1..];
            }
            None => {
                if !after.is_empty() {
                    messages.push(CtcpMessage::from_body(after));
                }
                rest = "";
            }
        }
    }

    visible.push_str(rest);
    (visible, messages)
}
