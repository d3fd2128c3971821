//! Message parsing and serialization.
//!
//! Implements the RFC 2812 message shape:
//!
//! ```text
//! [':' prefix SPACE] command [SPACE params] [SPACE ':' trailing]
//! ```
//!
//! Parsing operates on line content without the CRLF terminator (a
//! terminator is tolerated and stripped). Messages carry at most
//! [`MAX_PARAMS`](crate::MAX_PARAMS) parameters; only the last parameter
//! may contain spaces, and only when the raw line marked it with a leading
//! colon or the fifteenth split occurred.

use std::fmt;

use crate::{MAX_PARAMS, MIN_LINE_LEN};

/// A parsed IRC message.
///
/// # Example
///
/// ```
/// use minnow_proto::Message;
///
/// let msg = Message::parse(":server 001 nick :Welcome").unwrap();
/// assert_eq!(msg.prefix.as_deref(), Some("server"));
/// assert_eq!(msg.command, "001");
/// assert_eq!(msg.params, vec!["nick", "Welcome"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Sender identity (`nick!user@host` or a server name), without the
    /// leading colon. `None` when the line carried no prefix.
    pub prefix: Option<String>,
    /// The command token: a word, or exactly three ASCII digits for
    /// numeric replies. Both share one namespace.
    pub command: String,
    /// Ordered parameters. The last entry may contain spaces (the
    /// trailing parameter); no other entry can.
    pub params: Vec<String>,
}

impl Message {
    /// Parse one line of wire content.
    ///
    /// Returns `None` for lines that must be silently discarded rather
    /// than treated as errors: keep-alive noise of 4 bytes or fewer
    /// (RFC 2812 §2.3.1 tolerance), and shapeless lines such as a prefix
    /// with nothing after it.
    pub fn parse(line: &str) -> Option<Message> {
        let line = line.trim_end_matches(['\r', '\n']);

        // Short lines are standard-mandated noise, not errors.
        if line.len() < MIN_LINE_LEN {
            return None;
        }

        let mut rest = line;
        let mut prefix = None;
        if let Some(stripped) = rest.strip_prefix(':') {
            let end = stripped.find(' ')?;
            prefix = Some(stripped[..end].to_owned());
            rest = &stripped[end + 1..];
        }

        let (command, param_text) = match rest.find(' ') {
            Some(end) => (&rest[..end], &rest[end + 1..]),
            None => (rest, ""),
        };
        if command.is_empty() {
            return None;
        }

        Some(Message {
            prefix,
            command: command.to_owned(),
            params: split_params(param_text),
        })
    }

    /// Serialize to wire format, without the CRLF terminator.
    ///
    /// The final parameter is written with a leading colon whenever the
    /// receiver could not otherwise reconstruct it: it contains a space,
    /// is empty, or itself starts with a colon.
    pub fn to_wire(&self) -> String {
        let mut out = String::with_capacity(64);

        if let Some(ref prefix) = self.prefix {
            out.push(':');
            out.push_str(prefix);
            out.push(' ');
        }

        out.push_str(&self.command);

        if let Some((last, middle)) = self.params.split_last() {
            for param in middle {
                out.push(' ');
                out.push_str(param);
            }
            out.push(' ');
            if last.is_empty() || last.starts_with(':') || last.contains(' ') {
                out.push(':');
            }
            out.push_str(last);
        }

        out
    }

    /// `NICK <nick>`
    pub fn nick(nick: impl Into<String>) -> Self {
        Self::from_parts("NICK", vec![nick.into()])
    }

    /// `USER <user> <mode> * :<realname>`
    pub fn user(user: impl Into<String>, mode: u8, realname: impl Into<String>) -> Self {
        Self::from_parts(
            "USER",
            vec![user.into(), mode.to_string(), "*".to_owned(), realname.into()],
        )
    }

    /// `PONG :<argument>`
    pub fn pong(argument: impl Into<String>) -> Self {
        Self::from_parts("PONG", vec![argument.into()])
    }

    /// `JOIN <channel>`
    pub fn join(channel: impl Into<String>) -> Self {
        Self::from_parts("JOIN", vec![channel.into()])
    }

    /// `PART <channel> :<message>`
    pub fn part(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::from_parts("PART", vec![channel.into(), message.into()])
    }

    /// `PRIVMSG <target> :<text>`
    pub fn privmsg(target: impl Into<String>, text: impl Into<String>) -> Self {
        Self::from_parts("PRIVMSG", vec![target.into(), text.into()])
    }

    /// `NOTICE <target> :<text>`
    pub fn notice(target: impl Into<String>, text: impl Into<String>) -> Self {
        Self::from_parts("NOTICE", vec![target.into(), text.into()])
    }

    /// `QUIT :<message>`
    pub fn quit(message: impl Into<String>) -> Self {
        Self::from_parts("QUIT", vec![message.into()])
    }

    /// `TOPIC <channel> :<topic>`
    pub fn topic(channel: impl Into<String>, topic: impl Into<String>) -> Self {
        Self::from_parts("TOPIC", vec![channel.into(), topic.into()])
    }

    fn from_parts(command: &str, params: Vec<String>) -> Self {
        Message {
            prefix: None,
            command: command.to_owned(),
            params,
        }
    }

    /// The nick portion of the prefix: everything before the first `!`.
    ///
    /// Server-originated prefixes have no `!`, so the whole prefix is
    /// returned for those.
    pub fn source_nick(&self) -> Option<&str> {
        let prefix = self.prefix.as_deref()?;
        Some(prefix.split('!').next().unwrap_or(prefix))
    }
}

/// Split parameter text into at most [`MAX_PARAMS`] entries.
///
/// The first token carrying the colon marker absorbs everything after it,
/// re-joined with single spaces and with the marker stripped from its
/// first character only. With no marker, a plain split up to the limit is
/// used, so a fifteenth token keeps its interior spaces.
fn split_params(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let tokens: Vec<&str> = text.splitn(MAX_PARAMS, ' ').collect();
    for (i, token) in tokens.iter().enumerate() {
        if let Some(stripped) = token.strip_prefix(':') {
            let mut params: Vec<String> = tokens[..i].iter().map(|s| (*s).to_owned()).collect();
            let mut trailing = stripped.to_owned();
            for rest in &tokens[i + 1..] {
                trailing.push(' ');
                trailing.push_str(rest);
            }
            params.push(trailing);
            return params;
        }
    }

    tokens.into_iter().map(str::to_owned).collect()
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_privmsg_with_trailing() {
        let msg = Message::parse(":nick!user@host PRIVMSG #channel :Hello, world!").unwrap();
        assert_eq!(msg.prefix.as_deref(), Some("nick!user@host"));
        assert_eq!(msg.command, "PRIVMSG");
        assert_eq!(msg.params, vec!["#channel", "Hello, world!"]);
    }

    #[test]
    fn parse_without_prefix() {
        let msg = Message::parse("PING :irc.example.net").unwrap();
        assert_eq!(msg.prefix, None);
        assert_eq!(msg.command, "PING");
        assert_eq!(msg.params, vec!["irc.example.net"]);
    }

    #[test]
    fn parse_numeric_reply() {
        let msg = Message::parse(":server 001 nick :Welcome to IRC").unwrap();
        assert_eq!(msg.command, "001");
        assert_eq!(msg.params, vec!["nick", "Welcome to IRC"]);
    }

    #[test]
    fn parse_discards_short_lines() {
        assert_eq!(Message::parse(""), None);
        assert_eq!(Message::parse("PING"), None);
        assert_eq!(Message::parse("\r\n"), None);
        // 5 bytes is the minimum that gets through
        assert!(Message::parse("PING1").is_some());
    }

    #[test]
    fn parse_discards_prefix_without_command() {
        assert_eq!(Message::parse(":prefix_only"), None);
    }

    #[test]
    fn parse_no_params_is_empty_vec() {
        let msg = Message::parse("MOTD1").unwrap();
        assert_eq!(msg.params, Vec::<String>::new());
    }

    #[test]
    fn parse_trailing_preserves_interior_spaces() {
        let msg = Message::parse("PRIVMSG #ch :a  b   c").unwrap();
        assert_eq!(msg.params, vec!["#ch", "a  b   c"]);
    }

    #[test]
    fn parse_trailing_empty() {
        let msg = Message::parse("TOPIC #ch :").unwrap();
        assert_eq!(msg.params, vec!["#ch", ""]);
    }

    #[test]
    fn parse_trailing_starting_with_colon() {
        let msg = Message::parse("PRIVMSG #ch ::)").unwrap();
        assert_eq!(msg.params, vec!["#ch", ":)"]);
    }

    #[test]
    fn parse_colon_stops_splitting_early() {
        let msg = Message::parse("KICK #ch victim :no reason at all").unwrap();
        assert_eq!(msg.params, vec!["#ch", "victim", "no reason at all"]);
    }

    #[test]
    fn parse_caps_at_fifteen_params() {
        let line = format!("CMD {}", (1..=20).map(|n| n.to_string()).collect::<Vec<_>>().join(" "));
        let msg = Message::parse(&line).unwrap();
        assert_eq!(msg.params.len(), 15);
        // the fifteenth token absorbs the rest verbatim
        assert_eq!(msg.params[14], "15 16 17 18 19 20");
    }

    #[test]
    fn parse_colon_past_fifteenth_is_literal() {
        let mut tokens: Vec<String> = (1..=14).map(|n| n.to_string()).collect();
        tokens.push(":tail with spaces".to_owned());
        let line = format!("CMD {}", tokens.join(" "));
        let msg = Message::parse(&line).unwrap();
        assert_eq!(msg.params.len(), 15);
        assert_eq!(msg.params[14], "tail with spaces");
    }

    #[test]
    fn wire_simple() {
        assert_eq!(Message::join("#minnow").to_wire(), "JOIN #minnow");
    }

    #[test]
    fn wire_trailing_with_spaces() {
        assert_eq!(
            Message::privmsg("#minnow", "hello there").to_wire(),
            "PRIVMSG #minnow :hello there"
        );
    }

    #[test]
    fn wire_empty_trailing_gets_colon() {
        assert_eq!(Message::topic("#minnow", "").to_wire(), "TOPIC #minnow :");
    }

    #[test]
    fn wire_user_registration() {
        assert_eq!(
            Message::user("minnow", 0, "Minnow Bot").to_wire(),
            "USER minnow 0 * :Minnow Bot"
        );
    }

    #[test]
    fn roundtrip_trailing_exact() {
        let input = ":nick!u@h PRIVMSG #ch :some text  with  doubled spaces";
        let msg = Message::parse(input).unwrap();
        assert_eq!(msg.to_wire(), input);
    }

    #[test]
    fn roundtrip_reparse_equal() {
        let msg = Message::parse("MODE #ch +o nick1").unwrap();
        let reparsed = Message::parse(&msg.to_wire()).unwrap();
        assert_eq!(msg, reparsed);
    }

    #[test]
    fn source_nick_from_full_prefix() {
        let msg = Message::parse(":alice!ident@host PRIVMSG bob :hi").unwrap();
        assert_eq!(msg.source_nick(), Some("alice"));
    }

    #[test]
    fn source_nick_from_server_prefix() {
        let msg = Message::parse(":irc.example.net NOTICE * :look").unwrap();
        assert_eq!(msg.source_nick(), Some("irc.example.net"));
    }
}
