//! The paddock wire protocol.
//!
//! Length-delimited JSON frames over a Unix domain socket. One frame is
//! one request or one response; connections are plain request/response
//! with no handshake state. Frames are bounded at [`server::MAX_FRAME_LEN`]
//! and oversized frames fail the connection closed.

pub mod client;
pub mod messages;
pub mod server;

pub use client::{ClientError, ProtocolClient};
pub use messages::{ApiError, ErrorKind, Reply, Request, Response};
pub use server::ProtocolServer;
