//! Engine error taxonomy.
//!
//! These are caller-contract and transport failures. Malformed inbound
//! lines never show up here: the parser recovers from them silently, and
//! handler failures are contained and logged at the dispatch boundary.

use thiserror::Error;

use minnow_proto::MAX_CONTENT_LEN;

/// Convenience type alias for Results using [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors reported synchronously to callers of the engine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// I/O fault on the underlying transport.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// An enqueued line would exceed the wire limit (510 bytes of content,
    /// 512 with the terminator).
    #[error("message too long: {len} bytes (limit: {MAX_CONTENT_LEN})")]
    MessageTooLong {
        /// Length of the rejected line content.
        len: usize,
    },

    /// `unregister` was called for a token with no handler.
    #[error("no handler registered for command {0:?}")]
    NotRegistered(String),

    /// Undo or redo was requested on a channel with an empty stack.
    #[error("no topic history for {0}")]
    NoHistory(String),

    /// A topic edit named a segment index past the end of the topic.
    #[error("segment index {index} out of range (topic has {len})")]
    BadIndex {
        /// The requested index.
        index: usize,
        /// Number of segments in the current topic.
        len: usize,
    },

    /// The session has been closed; no further output is accepted.
    #[error("session is closed")]
    Closed,
}
