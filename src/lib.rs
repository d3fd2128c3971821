//! minnow — a line-oriented IRC session engine.
//!
//! The engine owns one transport per session, frames the inbound byte
//! stream into messages, routes each message through a mutable handler
//! table, extracts CTCP sub-messages from chat payloads, gates outbound
//! traffic on registration, and keeps a bounded undo/redo history of
//! channel topics.
//!
//! Protocol-level pieces (framing, parsing, CTCP, case folding) live in
//! the `minnow-proto` crate; this crate adds the stateful session layer
//! and the bot binary.

pub mod config;
pub mod error;
pub mod handler;
pub mod session;
pub mod topic;

pub use self::config::Config;
pub use self::error::{Error, Result};
pub use self::handler::{Context, CtcpEvent, CtcpHandlerTable, HandlerTable};
pub use self::session::{Session, SessionState};
pub use self::topic::TopicHistory;
