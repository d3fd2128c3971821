//! Command dispatch tables.
//!
//! One table maps protocol command tokens to handlers; a second, separate
//! table does the same for CTCP sub-messages. Word tokens and 3-digit
//! numeric tokens share a single namespace, keyed by the literal token
//! string — a numeric reply is dispatched exactly like any other command.
//!
//! A handler failure is a programming error in that handler, not a
//! protocol error: it is contained at the dispatch boundary, logged, and
//! never tears down the session.

use std::collections::HashMap;

use minnow_proto::ctcp::CtcpMessage;
use minnow_proto::Message;
use tracing::{debug, warn};

use crate::error::Error;
use crate::session::SessionState;

/// Outcome of a dispatched handler.
pub type HandlerResult = anyhow::Result<()>;

/// A protocol message handler.
pub type Handler = Box<dyn FnMut(&mut Context<'_>, &Message) -> HandlerResult + Send>;

/// A CTCP sub-message handler.
pub type CtcpHandler = Box<dyn FnMut(&mut SessionState, &CtcpEvent) -> HandlerResult + Send>;

/// What a message handler sees: the session state, plus the CTCP table so
/// chat-payload handlers can push extracted sub-messages onward.
pub struct Context<'a> {
    /// Mutable session state: buffers, identity, channels, topics.
    pub state: &'a mut SessionState,
    /// The CTCP dispatch table.
    pub ctcp: &'a mut CtcpHandlerTable,
}

/// One extracted CTCP sub-message together with its wire context.
#[derive(Debug, Clone)]
pub struct CtcpEvent {
    /// Nick portion of the sender prefix.
    pub sender: String,
    /// The chat target the enclosing message was addressed to.
    pub target: String,
    /// The extracted sub-message.
    pub message: CtcpMessage,
}

/// Mapping from command token to handler, with an overridable default
/// for unknown tokens.
pub struct HandlerTable {
    handlers: HashMap<String, Handler>,
    default: Handler,
}

impl HandlerTable {
    /// Create a table whose default handler logs and moves on.
    pub fn new() -> Self {
        HandlerTable {
            handlers: HashMap::new(),
            default: Box::new(|_ctx, msg| {
                debug!(command = %msg.command, "unhandled command");
                Ok(())
            }),
        }
    }

    /// Register a handler for a token, replacing any existing one.
    pub fn register(&mut self, token: impl Into<String>, handler: Handler) {
        self.handlers.insert(token.into(), handler);
    }

    /// Remove the handler for a token.
    pub fn unregister(&mut self, token: &str) -> Result<(), Error> {
        self.handlers
            .remove(token)
            .map(|_| ())
            .ok_or_else(|| Error::NotRegistered(token.to_owned()))
    }

    /// Replace the default handler invoked for unknown tokens.
    pub fn set_default(&mut self, handler: Handler) {
        self.default = handler;
    }

    /// Whether a handler is registered for this token.
    pub fn contains(&self, token: &str) -> bool {
        self.handlers.contains_key(token)
    }

    /// Route one message to its handler, or to the default. A failing
    /// handler is logged; processing of later messages continues.
    pub fn dispatch(&mut self, ctx: &mut Context<'_>, msg: &Message) {
        let result = match self.handlers.get_mut(&msg.command) {
            Some(handler) => handler(ctx, msg),
            None => (self.default)(ctx, msg),
        };
        if let Err(err) = result {
            warn!(command = %msg.command, "handler failed: {err:#}");
        }
    }
}

impl Default for HandlerTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Dispatch table for CTCP sub-messages. Lookup is case-insensitive:
/// commands are normalized to ASCII uppercase.
pub struct CtcpHandlerTable {
    handlers: HashMap<String, CtcpHandler>,
    default: CtcpHandler,
}

impl CtcpHandlerTable {
    /// Create a table whose default handler logs and moves on.
    pub fn new() -> Self {
        CtcpHandlerTable {
            handlers: HashMap::new(),
            default: Box::new(|_state, event| {
                debug!(command = %event.message.command, "unhandled CTCP");
                Ok(())
            }),
        }
    }

    /// Register a handler, replacing any existing one for that command.
    pub fn register(&mut self, command: &str, handler: CtcpHandler) {
        self.handlers.insert(command.to_ascii_uppercase(), handler);
    }

    /// Remove the handler for a command.
    pub fn unregister(&mut self, command: &str) -> Result<(), Error> {
        self.handlers
            .remove(&command.to_ascii_uppercase())
            .map(|_| ())
            .ok_or_else(|| Error::NotRegistered(command.to_owned()))
    }

    /// Replace the default handler.
    pub fn set_default(&mut self, handler: CtcpHandler) {
        self.default = handler;
    }

    /// Route one extracted sub-message, containing failures like
    /// [`HandlerTable::dispatch`].
    pub fn dispatch(&mut self, state: &mut SessionState, event: &CtcpEvent) {
        let key = event.message.command.to_ascii_uppercase();
        let result = match self.handlers.get_mut(&key) {
            Some(handler) => handler(state, event),
            None => (self.default)(state, event),
        };
        if let Err(err) = result {
            warn!(command = %key, "CTCP handler failed: {err:#}");
        }
    }
}

impl Default for CtcpHandlerTable {
    fn default() -> Self {
        Self::new()
    }
}
