//! Protocol client.
//!
//! Thin request/response client over the daemon socket, shared by the CLI
//! and the integration tests.

use std::path::Path;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::UnixStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use super::messages::{Request, Response};
use super::server::MAX_FRAME_LEN;

/// Errors from the protocol client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The daemon socket could not be reached.
    #[error("daemon unavailable at {path}: {source}")]
    Connect {
        /// The socket path tried.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The daemon closed the connection before answering.
    #[error("connection closed by daemon")]
    ConnectionClosed,

    /// Transport failure mid-exchange.
    #[error("transport failure: {0}")]
    Io(#[from] std::io::Error),

    /// A frame could not be encoded or decoded.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// One connection to the daemon.
pub struct ProtocolClient {
    framed: Framed<UnixStream, LengthDelimitedCodec>,
}

impl ProtocolClient {
    /// Connects to the daemon socket.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Connect`] when the socket is absent or
    /// refuses the connection.
    pub async fn connect(socket_path: &Path) -> Result<Self, ClientError> {
        let stream = UnixStream::connect(socket_path)
            .await
            .map_err(|source| ClientError::Connect {
                path: socket_path.display().to_string(),
                source,
            })?;
        let codec = LengthDelimitedCodec::builder()
            .max_frame_length(MAX_FRAME_LEN)
            .new_codec();
        Ok(Self {
            framed: Framed::new(stream, codec),
        })
    }

    /// Sends one request and awaits its response.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport or encoding failures. A
    /// failure response from the daemon is a successful exchange; it
    /// comes back as `Response::Err`.
    pub async fn request(&mut self, request: &Request) -> Result<Response, ClientError> {
        let encoded = serde_json::to_vec(request)
            .map_err(|e| ClientError::Protocol(format!("request encoding failed: {e}")))?;
        self.framed.send(Bytes::from(encoded)).await?;

        let frame = self
            .framed
            .next()
            .await
            .ok_or(ClientError::ConnectionClosed)??;
        serde_json::from_slice(&frame)
            .map_err(|e| ClientError::Protocol(format!("response decoding failed: {e}")))
    }
}
