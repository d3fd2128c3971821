//! The session: one transport, its buffers, and the dispatch loop.
//!
//! A session exclusively owns its TCP stream. Inbound bytes are framed by
//! [`LineCodec`], parsed into [`Message`]s, and routed through the
//! session's [`HandlerTable`]; handlers enqueue replies into the
//! [`Outbound`] buffers, which the run loop flushes between reads. One
//! task drives everything, so messages are dispatched in arrival order
//! and output leaves in enqueue order with no locking.
//!
//! Registration gating: until the server acknowledges registration with
//! numeric 001, everything sent through the gated path is held in
//! `pending`. The two identity lines (NICK, USER) and PONG replies bypass
//! the gate. When 001 arrives, held output is promoted — exactly once —
//! behind any forced lines already waiting.

use std::collections::HashSet;

use bytes::{BufMut, BytesMut};
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio_util::codec::FramedRead;
use tracing::{debug, info, trace, warn};

use minnow_proto::ctcp::{extract, CtcpMessage, CTCP_DELIM};
use minnow_proto::{irc_eq, irc_to_lower, LineCodec, Message, MAX_CONTENT_LEN};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::handler::{Context, CtcpEvent, CtcpHandler, CtcpHandlerTable, Handler, HandlerTable};
use crate::topic::TopicHistory;

/// Registration-complete numeric.
const RPL_WELCOME: &str = "001";
/// Topic numeric sent on join.
const RPL_TOPIC: &str = "332";
/// Nick-collision numeric.
const ERR_NICKNAMEINUSE: &str = "433";

/// Output buffers with registration gating.
///
/// `pending` is non-empty only while unregistered; `ready` is what the
/// run loop writes to the transport next.
#[derive(Debug, Default)]
pub struct Outbound {
    pending: BytesMut,
    ready: BytesMut,
    registered: bool,
    closed: bool,
}

impl Outbound {
    fn append(buf: &mut BytesMut, line: &str) {
        buf.reserve(line.len() + 2);
        buf.put_slice(line.as_bytes());
        buf.put_slice(b"\r\n");
    }

    fn admit(&self, line: &str) -> Result<()> {
        if self.closed {
            return Err(Error::Closed);
        }
        if line.len() > MAX_CONTENT_LEN {
            return Err(Error::MessageTooLong { len: line.len() });
        }
        Ok(())
    }

    /// Queue a line behind registration gating.
    pub fn push(&mut self, line: &str) -> Result<()> {
        self.admit(line)?;
        if self.registered {
            Self::append(&mut self.ready, line);
        } else {
            Self::append(&mut self.pending, line);
        }
        Ok(())
    }

    /// Queue a line regardless of registration state. Only the identity
    /// bootstrap and PONG use this.
    pub fn force(&mut self, line: &str) -> Result<()> {
        self.admit(line)?;
        Self::append(&mut self.ready, line);
        Ok(())
    }

    /// Promote held output after the registration-complete signal.
    /// Idempotent: the held bytes move exactly once.
    pub fn mark_registered(&mut self) {
        if !self.registered {
            self.registered = true;
            self.ready.extend_from_slice(&self.pending);
            self.pending.clear();
        }
    }

    /// Whether registration has completed.
    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// Take everything queued for transmission.
    pub fn take_ready(&mut self) -> BytesMut {
        self.ready.split()
    }

    /// Refuse all further output.
    pub fn close(&mut self) {
        self.closed = true;
    }
}

/// Mutable per-session state handed to every handler.
pub struct SessionState {
    nickname: String,
    realname: String,
    mode: u8,
    /// Joined channels, case-folded.
    channels: HashSet<String>,
    autojoin: Vec<String>,
    rejoin_on_kick: bool,
    quitting: bool,
    outbound: Outbound,
    topics: TopicHistory,
}

impl SessionState {
    /// Fresh state for one connection.
    pub fn new(config: &Config) -> Self {
        SessionState {
            nickname: config.identity.nick.clone(),
            realname: config.identity.realname.clone(),
            mode: config.identity.mode,
            channels: HashSet::new(),
            autojoin: config.channels.clone(),
            rejoin_on_kick: config.rejoin_on_kick,
            quitting: false,
            outbound: Outbound::default(),
            topics: TopicHistory::new(config.topics.max_undo),
        }
    }

    /// The nick the session currently holds.
    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    /// Whether the server has acknowledged registration.
    pub fn is_registered(&self) -> bool {
        self.outbound.is_registered()
    }

    /// Whether a deliberate QUIT was sent. Suppresses reconnection.
    pub fn is_quitting(&self) -> bool {
        self.quitting
    }

    /// Whether the session is on the given channel (case-folded).
    pub fn on_channel(&self, channel: &str) -> bool {
        self.channels.contains(&irc_to_lower(channel))
    }

    /// Joined channels, case-folded.
    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.channels.iter().map(String::as_str)
    }

    /// The per-channel topic history.
    pub fn topics(&mut self) -> &mut TopicHistory {
        &mut self.topics
    }

    /// Enqueue a message through registration gating.
    pub fn send(&mut self, msg: &Message) -> Result<()> {
        self.outbound.push(&msg.to_wire())
    }

    /// Enqueue a message, bypassing registration gating.
    pub fn send_now(&mut self, msg: &Message) -> Result<()> {
        self.outbound.force(&msg.to_wire())
    }

    /// `PRIVMSG <target> :<text>`
    pub fn send_privmsg(&mut self, target: &str, text: &str) -> Result<()> {
        self.send(&Message::privmsg(target, text))
    }

    /// `NOTICE <target> :<text>`
    pub fn send_notice(&mut self, target: &str, text: &str) -> Result<()> {
        self.send(&Message::notice(target, text))
    }

    /// `JOIN <channel>`
    pub fn send_join(&mut self, channel: &str) -> Result<()> {
        self.send(&Message::join(channel))
    }

    /// `PART <channel> :<message>`
    pub fn send_part(&mut self, channel: &str, message: &str) -> Result<()> {
        self.send(&Message::part(channel, message))
    }

    /// `NICK <nick>` — the local nick updates when the server echoes it.
    pub fn send_nick(&mut self, nick: &str) -> Result<()> {
        self.send(&Message::nick(nick))
    }

    /// `TOPIC <channel> :<topic>`
    pub fn send_topic(&mut self, channel: &str, topic: &str) -> Result<()> {
        self.send(&Message::topic(channel, topic))
    }

    /// `PONG :<argument>`, bypassing the gate: keep-alives must flow
    /// before registration completes.
    pub fn send_pong(&mut self, argument: &str) -> Result<()> {
        self.send_now(&Message::pong(argument))
    }

    /// `QUIT :<message>`. Marks the session as deliberately quitting.
    pub fn send_quit(&mut self, message: &str) -> Result<()> {
        self.quitting = true;
        self.send(&Message::quit(message))
    }

    /// Mark registration complete, promote held output, and join the
    /// configured channels.
    fn complete_registration(&mut self) -> Result<()> {
        self.outbound.mark_registered();
        for channel in self.autojoin.clone() {
            self.send_join(&channel)?;
        }
        Ok(())
    }
}

/// One IRC session over one TCP connection.
pub struct Session {
    reader: FramedRead<OwnedReadHalf, LineCodec>,
    writer: OwnedWriteHalf,
    state: SessionState,
    handlers: HandlerTable,
    ctcp: CtcpHandlerTable,
}

impl Session {
    /// Dial the configured server and bootstrap identity.
    pub async fn connect(config: &Config) -> Result<Session> {
        let addr = (config.server.host.as_str(), config.server.port);
        let stream = TcpStream::connect(addr).await?;
        info!(host = %config.server.host, port = config.server.port, "connected");
        Self::from_stream(stream, config)
    }

    /// Build a session over an already-connected stream.
    ///
    /// Sends the two identity lines (NICK, USER) that must precede
    /// registration; they bypass output gating.
    pub fn from_stream(stream: TcpStream, config: &Config) -> Result<Session> {
        let (read_half, write_half) = stream.into_split();
        let mut state = SessionState::new(config);

        let nick = Message::nick(config.identity.nick.clone());
        let user = Message::user(
            config.identity.nick.clone(),
            config.identity.mode,
            config.identity.realname.clone(),
        );
        state.send_now(&nick)?;
        state.send_now(&user)?;

        let mut session = Session {
            reader: FramedRead::new(read_half, LineCodec::new()),
            writer: write_half,
            state,
            handlers: HandlerTable::new(),
            ctcp: CtcpHandlerTable::new(),
        };
        session.install_builtins();
        Ok(session)
    }

    /// Drive the session until the peer closes the connection or the
    /// transport faults. Returns `Ok(())` on a clean peer close.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            self.flush().await?;
            match self.reader.next().await {
                Some(Ok(line)) => self.handle_line(&line),
                Some(Err(minnow_proto::ProtocolError::Io(e))) => return Err(e.into()),
                Some(Err(e)) => warn!(error = %e, "framing error"),
                None => break,
            }
        }
        // Replies to the peer's final messages may still be queued; the
        // peer may have only half-closed, so try to hand them over.
        if let Err(e) = self.flush().await {
            debug!(error = %e, "final flush failed");
        }
        info!("peer closed connection");
        Ok(())
    }

    /// Parse one line and dispatch it. Sub-minimum and shapeless lines
    /// are dropped here and never reach a handler.
    pub fn handle_line(&mut self, line: &str) {
        let Some(msg) = Message::parse(line) else {
            trace!(%line, "discarding line");
            return;
        };
        trace!(command = %msg.command, params = ?msg.params, "dispatch");
        let mut ctx = Context {
            state: &mut self.state,
            ctcp: &mut self.ctcp,
        };
        self.handlers.dispatch(&mut ctx, &msg);
    }

    async fn flush(&mut self) -> Result<()> {
        let ready = self.state.outbound.take_ready();
        if !ready.is_empty() {
            self.writer.write_all(&ready).await?;
        }
        Ok(())
    }

    /// Close the transport: flush what we can, refuse further output,
    /// and shut the write half down. A pending read unblocks via EOF.
    pub async fn close(&mut self) -> Result<()> {
        let _ = self.flush().await;
        self.state.outbound.close();
        self.writer.shutdown().await?;
        Ok(())
    }

    /// Session state, read-only.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Session state, for enqueueing output or touching topic history.
    pub fn state_mut(&mut self) -> &mut SessionState {
        &mut self.state
    }

    /// Register a message handler, replacing any existing one for the
    /// token (built-ins included).
    pub fn register(&mut self, token: impl Into<String>, handler: Handler) {
        self.handlers.register(token, handler);
    }

    /// Remove a message handler.
    pub fn unregister(&mut self, token: &str) -> Result<()> {
        self.handlers.unregister(token)
    }

    /// Replace the default handler for unknown commands.
    pub fn set_default_handler(&mut self, handler: Handler) {
        self.handlers.set_default(handler);
    }

    /// Register a CTCP handler, replacing any existing one.
    pub fn register_ctcp(&mut self, command: &str, handler: CtcpHandler) {
        self.ctcp.register(command, handler);
    }

    /// Remove a CTCP handler.
    pub fn unregister_ctcp(&mut self, command: &str) -> Result<()> {
        self.ctcp.unregister(command)
    }

    /// Replace the default CTCP handler.
    pub fn set_default_ctcp(&mut self, handler: CtcpHandler) {
        self.ctcp.set_default(handler);
    }

    fn install_builtins(&mut self) {
        self.handlers.register(
            "PING",
            Box::new(|ctx, msg| {
                let token = msg.params.first().map(String::as_str).unwrap_or_default();
                ctx.state.send_pong(token)?;
                Ok(())
            }),
        );

        self.handlers.register(
            RPL_WELCOME,
            Box::new(|ctx, _msg| {
                info!(nick = %ctx.state.nickname(), "registration complete");
                ctx.state.complete_registration()?;
                Ok(())
            }),
        );

        self.handlers.register(
            "NICK",
            Box::new(|ctx, msg| {
                let Some(new_nick) = msg.params.first() else {
                    return Ok(());
                };
                if from_self(ctx.state, msg) {
                    debug!(old = %ctx.state.nickname, new = %new_nick, "nick changed");
                    ctx.state.nickname = new_nick.clone();
                }
                Ok(())
            }),
        );

        self.handlers.register(
            "JOIN",
            Box::new(|ctx, msg| {
                let Some(channel) = msg.params.first() else {
                    return Ok(());
                };
                if from_self(ctx.state, msg) {
                    ctx.state.channels.insert(irc_to_lower(channel));
                    info!(%channel, "joined");
                }
                Ok(())
            }),
        );

        self.handlers.register(
            "PART",
            Box::new(|ctx, msg| {
                let Some(channel) = msg.params.first() else {
                    return Ok(());
                };
                if from_self(ctx.state, msg) {
                    ctx.state.channels.remove(&irc_to_lower(channel));
                    info!(%channel, "parted");
                }
                Ok(())
            }),
        );

        self.handlers.register(
            "KICK",
            Box::new(|ctx, msg| {
                let (Some(channel), Some(victim)) = (msg.params.first(), msg.params.get(1))
                else {
                    return Ok(());
                };
                if irc_eq(victim, ctx.state.nickname()) {
                    ctx.state.channels.remove(&irc_to_lower(channel));
                    warn!(%channel, by = msg.source_nick().unwrap_or("?"), "kicked");
                    if ctx.state.rejoin_on_kick {
                        ctx.state.send_join(channel)?;
                    }
                }
                Ok(())
            }),
        );

        self.handlers.register(
            ERR_NICKNAMEINUSE,
            Box::new(|ctx, msg| {
                warn!(nick = %ctx.state.nickname(), params = ?msg.params, "nickname in use");
                Ok(())
            }),
        );

        self.handlers.register(
            "TOPIC",
            Box::new(|ctx, msg| {
                if let (Some(channel), Some(topic)) = (msg.params.first(), msg.params.get(1)) {
                    ctx.state.topics.observe(channel, topic);
                }
                Ok(())
            }),
        );

        self.handlers.register(
            RPL_TOPIC,
            Box::new(|ctx, msg| {
                // :server 332 <me> <channel> :<topic>
                if let (Some(channel), Some(topic)) = (msg.params.get(1), msg.params.get(2)) {
                    ctx.state.topics.observe(channel, topic);
                }
                Ok(())
            }),
        );

        self.handlers
            .register("PRIVMSG", Box::new(|ctx, msg| handle_chat(ctx, msg)));

        self.install_ctcp_builtins();
    }

    fn install_ctcp_builtins(&mut self) {
        self.ctcp.register(
            "PING",
            Box::new(|state, event| {
                // Echo the payload back so the peer can time the round trip.
                let reply = CtcpMessage::new("PING", event.message.argument.clone());
                state.send_notice(&event.sender, &reply.to_string())?;
                Ok(())
            }),
        );

        self.ctcp.register(
            "TIME",
            Box::new(|state, event| {
                let now = chrono::Local::now().format("%a, %d %b %Y %H:%M:%S %Z");
                let reply = CtcpMessage::new("TIME", now.to_string());
                state.send_notice(&event.sender, &reply.to_string())?;
                Ok(())
            }),
        );

        // Automated peers probe VERSION constantly; answering is a policy
        // decision left to an overriding handler.
        self.ctcp.register("VERSION", Box::new(|_state, _event| Ok(())));

        self.ctcp.register(
            "DCC",
            Box::new(|state, event| {
                let mut words = event.message.argument.split_whitespace();
                let Some(subcommand) = words.next() else {
                    anyhow::bail!("empty DCC request");
                };
                let reply = match subcommand {
                    "CHAT" => CtcpMessage::new("ERRMSG", "DCC CHAT Rejected"),
                    "SEND" => {
                        let file = words.next().unwrap_or("?");
                        CtcpMessage::new("ERRMSG", format!("DCC SEND {file} Rejected"))
                    }
                    other => CtcpMessage::new("ERRMSG", format!("DCC {other} Not Implemented")),
                };
                state.send_notice(&event.sender, &reply.to_string())?;
                Ok(())
            }),
        );
    }
}

/// Whether a message's prefix names this session's own nick.
fn from_self(state: &SessionState, msg: &Message) -> bool {
    msg.source_nick()
        .is_some_and(|nick| irc_eq(nick, state.nickname()))
}

/// Built-in chat handler: pull CTCP sub-messages out of the payload and
/// dispatch each through the CTCP table. The visible remainder is left
/// for replacement handlers; the engine itself has no chat commands.
fn handle_chat(ctx: &mut Context<'_>, msg: &Message) -> anyhow::Result<()> {
    let (Some(target), Some(payload)) = (msg.params.first(), msg.params.get(1)) else {
        return Ok(());
    };
    if !payload.contains(CTCP_DELIM) {
        return Ok(());
    }

    let sender = msg.source_nick().unwrap_or_default().to_owned();
    let (visible, extracted) = extract(payload);
    if !visible.trim().is_empty() {
        trace!(%visible, "text alongside CTCP");
    }
    for message in extracted {
        let event = CtcpEvent {
            sender: sender.clone(),
            target: target.clone(),
            message,
        };
        ctx.ctcp.dispatch(ctx.state, &event);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::net::TcpListener;

    fn test_config(channels: &[&str]) -> Config {
        let mut config: Config =
            toml::from_str("[server]\nhost = \"127.0.0.1\"").expect("valid config");
        config.channels = channels.iter().map(|c| (*c).to_owned()).collect();
        config
    }

    async fn test_session(config: &Config) -> (Session, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (client, accepted) = tokio::join!(TcpStream::connect(addr), listener.accept());
        let session = Session::from_stream(client.unwrap(), config).unwrap();
        (session, accepted.unwrap().0)
    }

    fn ready_string(state: &mut SessionState) -> String {
        String::from_utf8(state.outbound.take_ready().to_vec()).unwrap()
    }

    // ── Outbound gating ──────────────────────────────────────────

    #[test]
    fn outbound_length_boundary() {
        let mut out = Outbound::default();
        assert!(out.push(&"x".repeat(510)).is_ok());
        let err = out.push(&"x".repeat(511));
        assert!(matches!(err, Err(Error::MessageTooLong { len: 511 })));
    }

    #[test]
    fn outbound_holds_until_registered() {
        let mut out = Outbound::default();
        out.push("PRIVMSG #a :one").unwrap();
        out.push("PRIVMSG #a :two").unwrap();
        assert!(out.take_ready().is_empty());

        out.force("PONG x").unwrap();
        assert_eq!(&out.ready[..], b"PONG x\r\n");

        out.mark_registered();
        assert_eq!(
            &out.ready[..],
            b"PONG x\r\nPRIVMSG #a :one\r\nPRIVMSG #a :two\r\n"
        );
        assert!(out.pending.is_empty());

        // Promotion happens exactly once.
        out.mark_registered();
        let first = out.take_ready();
        out.mark_registered();
        assert!(out.take_ready().is_empty());
        assert!(!first.is_empty());
    }

    #[test]
    fn outbound_post_registration_is_direct() {
        let mut out = Outbound::default();
        out.mark_registered();
        out.push("JOIN #a").unwrap();
        assert_eq!(&out.take_ready()[..], b"JOIN #a\r\n");
        assert!(out.pending.is_empty());
    }

    #[test]
    fn closed_outbound_rejects() {
        let mut out = Outbound::default();
        out.close();
        assert!(matches!(out.push("PING x"), Err(Error::Closed)));
        assert!(matches!(out.force("PING x"), Err(Error::Closed)));
    }

    // ── Dispatch through a session ───────────────────────────────

    #[tokio::test]
    async fn short_lines_never_reach_dispatcher() {
        let config = test_config(&[]);
        let (mut session, _peer) = test_session(&config).await;

        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        session.set_default_handler(Box::new(move |_ctx, _msg| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        session.handle_line("");
        session.handle_line("PING");
        session.handle_line("1234");
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        session.handle_line("WOBBL");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn bootstrap_lines_precede_everything() {
        let config = test_config(&[]);
        let (mut session, _peer) = test_session(&config).await;
        let ready = ready_string(session.state_mut());
        assert_eq!(ready, "NICK minnow\r\nUSER minnow 0 * :minnow bot\r\n");
    }

    #[tokio::test]
    async fn welcome_promotes_pending_and_autojoins() {
        let config = test_config(&["#minnow"]);
        let (mut session, _peer) = test_session(&config).await;
        let _ = session.state_mut().outbound.take_ready(); // drop bootstrap

        session.state_mut().send_privmsg("#minnow", "queued").unwrap();
        assert!(!session.state().is_registered());
        assert!(ready_string(session.state_mut()).is_empty());

        session.handle_line(":irc.test 001 minnow :Welcome to the test net");
        assert!(session.state().is_registered());
        assert_eq!(
            ready_string(session.state_mut()),
            "PRIVMSG #minnow :queued\r\nJOIN #minnow\r\n"
        );
    }

    #[tokio::test]
    async fn ping_is_answered_before_registration() {
        let config = test_config(&[]);
        let (mut session, _peer) = test_session(&config).await;
        let _ = session.state_mut().outbound.take_ready();

        session.handle_line("PING :irc.test");
        assert_eq!(ready_string(session.state_mut()), "PONG irc.test\r\n");
    }

    #[tokio::test]
    async fn join_part_kick_track_channels() {
        let config = test_config(&[]);
        let (mut session, _peer) = test_session(&config).await;

        session.handle_line(":minnow!m@host JOIN #One");
        assert!(session.state().on_channel("#one"));

        // Someone else joining is not us.
        session.handle_line(":alice!a@host JOIN #two");
        assert!(!session.state().on_channel("#two"));

        session.handle_line(":minnow!m@host PART #One :bye");
        assert!(!session.state().on_channel("#one"));

        session.handle_line(":minnow!m@host JOIN #three");
        session.handle_line(":op!o@host KICK #three minnow :out");
        assert!(!session.state().on_channel("#three"));
    }

    #[tokio::test]
    async fn kick_rejoins_when_configured() {
        let mut config = test_config(&[]);
        config.rejoin_on_kick = true;
        let (mut session, _peer) = test_session(&config).await;
        session.state_mut().outbound.mark_registered();
        let _ = session.state_mut().outbound.take_ready();

        session.handle_line(":minnow!m@host JOIN #pit");
        session.handle_line(":op!o@host KICK #pit minnow :out");
        assert_eq!(ready_string(session.state_mut()), "JOIN #pit\r\n");
    }

    #[tokio::test]
    async fn nick_echo_updates_own_nick() {
        let config = test_config(&[]);
        let (mut session, _peer) = test_session(&config).await;

        session.handle_line(":minnow!m@host NICK newname");
        assert_eq!(session.state().nickname(), "newname");

        session.handle_line(":alice!a@host NICK bob");
        assert_eq!(session.state().nickname(), "newname");
    }

    #[tokio::test]
    async fn ctcp_ping_gets_echo_reply() {
        let config = test_config(&[]);
        let (mut session, _peer) = test_session(&config).await;
        session.state_mut().outbound.mark_registered();
        let _ = session.state_mut().outbound.take_ready();

        session.handle_line(":alice!a@host PRIVMSG minnow :\x01PING 42\x01");
        assert_eq!(
            ready_string(session.state_mut()),
            "NOTICE alice :\x01PING 42\x01\r\n"
        );
    }

    #[tokio::test]
    async fn ctcp_dcc_requests_are_rejected() {
        let config = test_config(&[]);
        let (mut session, _peer) = test_session(&config).await;
        session.state_mut().outbound.mark_registered();
        let _ = session.state_mut().outbound.take_ready();

        session.handle_line(":a!a@h PRIVMSG minnow :\x01DCC CHAT chat 1234 5678\x01");
        assert_eq!(
            ready_string(session.state_mut()),
            "NOTICE a :\x01ERRMSG DCC CHAT Rejected\x01\r\n"
        );

        session.handle_line(":a!a@h PRIVMSG minnow :\x01DCC SEND secrets.txt 1 2 3\x01");
        assert_eq!(
            ready_string(session.state_mut()),
            "NOTICE a :\x01ERRMSG DCC SEND secrets.txt Rejected\x01\r\n"
        );

        session.handle_line(":a!a@h PRIVMSG minnow :\x01DCC RESUME f 1 2\x01");
        assert_eq!(
            ready_string(session.state_mut()),
            "NOTICE a :\x01ERRMSG DCC RESUME Not Implemented\x01\r\n"
        );
    }

    #[tokio::test]
    async fn ctcp_version_is_silent_by_default() {
        let config = test_config(&[]);
        let (mut session, _peer) = test_session(&config).await;
        session.state_mut().outbound.mark_registered();
        let _ = session.state_mut().outbound.take_ready();

        session.handle_line(":a!a@h PRIVMSG minnow :\x01VERSION\x01");
        assert!(ready_string(session.state_mut()).is_empty());
    }

    #[tokio::test]
    async fn topic_changes_are_observed() {
        let config = test_config(&[]);
        let (mut session, _peer) = test_session(&config).await;

        session.handle_line(":irc.test 332 minnow #ch :old | topic");
        session.handle_line(":alice!a@h TOPIC #ch :new topic");

        assert_eq!(session.state_mut().topics().get("#ch"), "new topic");
        let restored = session.state_mut().topics().undo("#ch").unwrap();
        assert_eq!(restored, "old | topic");
    }

    #[tokio::test]
    async fn builtin_handlers_are_replaceable() {
        let config = test_config(&[]);
        let (mut session, _peer) = test_session(&config).await;
        let _ = session.state_mut().outbound.take_ready();

        session.register("PING", Box::new(|_ctx, _msg| Ok(())));
        session.handle_line("PING :irc.test");
        assert!(ready_string(session.state_mut()).is_empty());

        session.unregister("PING").unwrap();
        assert!(matches!(
            session.unregister("PING"),
            Err(Error::NotRegistered(_))
        ));
    }
}
