//! Deterministic exit codes.
//!
//! Scripts drive this CLI, so every failure category maps to a stable
//! exit code rather than a prose-only error.
//!
//! - **0**: success
//! - **1**: generic/unexpected error
//! - **10-19**: request rejected by the daemon
//! - **20-29**: could not talk to the daemon

use paddock_daemon::protocol::messages::ErrorKind;
use paddock_daemon::protocol::ClientError;

/// Exit code constants.
pub mod codes {
    /// Success.
    pub const SUCCESS: u8 = 0;

    /// Generic error (fallback for unmapped failures).
    pub const GENERIC_ERROR: u8 = 1;

    /// Validation error (bad arguments or field values).
    pub const VALIDATION_ERROR: u8 = 10;

    /// Missing/invalid operator session or bettor credential.
    pub const UNAUTHORIZED: u8 = 11;

    /// Referenced row does not exist.
    pub const NOT_FOUND: u8 = 12;

    /// Duplicate bet or already-recorded results.
    pub const CONFLICT: u8 = 13;

    /// The betting window is closed.
    pub const BETTING_CLOSED: u8 = 14;

    /// Could not connect to the daemon socket.
    pub const DAEMON_UNAVAILABLE: u8 = 20;

    /// Frame-level or encoding error talking to the daemon.
    pub const PROTOCOL_ERROR: u8 = 21;
}

/// Maps a daemon error kind to its exit code.
#[must_use]
pub fn map_error_kind(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::Validation => codes::VALIDATION_ERROR,
        ErrorKind::Unauthorized => codes::UNAUTHORIZED,
        ErrorKind::BettingClosed => codes::BETTING_CLOSED,
        ErrorKind::Conflict => codes::CONFLICT,
        ErrorKind::NotFound => codes::NOT_FOUND,
        ErrorKind::DependencyUnavailable | ErrorKind::Internal => codes::GENERIC_ERROR,
    }
}

/// Maps a transport-level client error to its exit code.
#[must_use]
pub fn map_client_error(error: &ClientError) -> u8 {
    match error {
        ClientError::Connect { .. } | ClientError::Io(_) => codes::DAEMON_UNAVAILABLE,
        ClientError::ConnectionClosed | ClientError::Protocol(_) => codes::PROTOCOL_ERROR,
    }
}
