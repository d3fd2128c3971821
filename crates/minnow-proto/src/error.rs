//! Error types for the protocol layer.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Errors surfaced by the framing and serialization layer.
///
/// Malformed inbound lines are not errors: the parser recovers from them
/// silently, as the protocol mandates. Only transport faults and
/// caller-side serialization violations appear here.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// An outbound line exceeded the protocol's maximum length.
    #[error("message too long: {actual} bytes (limit: {limit})")]
    MessageTooLong {
        /// Actual line length in bytes, excluding the terminator.
        actual: usize,
        /// Maximum allowed content length.
        limit: usize,
    },
}
