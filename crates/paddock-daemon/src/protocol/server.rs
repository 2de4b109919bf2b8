//! Socket server for the paddock protocol.
//!
//! One accept loop, one task per connection. Connections carry no state of
//! their own: every frame is an independent request dispatched through the
//! orchestrator, so a single connection may serve an operator, a bettor,
//! or both in turn.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::{UnixListener, UnixStream};
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tracing::{debug, warn};

use super::messages::{ApiError, Request, Response};
use crate::orchestrator::Orchestrator;

/// Maximum frame size accepted or produced, in bytes.
///
/// Large enough for a full result set, small enough that a hostile client
/// cannot balloon memory per connection.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// Errors from binding the server socket.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The socket path could not be bound.
    #[error("failed to bind socket at {path}: {source}")]
    Bind {
        /// The path that failed.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Builds the length-delimited codec with the protocol frame bound.
fn codec() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .max_frame_length(MAX_FRAME_LEN)
        .new_codec()
}

/// The protocol server: an accept loop over one Unix domain socket.
pub struct ProtocolServer {
    listener: UnixListener,
    orchestrator: Orchestrator,
}

impl ProtocolServer {
    /// Binds the socket and prepares the accept loop.
    ///
    /// A stale socket file from a previous run is removed first; binding
    /// over a live daemon's socket is not detected here and is the
    /// deployment's responsibility.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the socket cannot be bound.
    pub fn bind(socket_path: &Path, orchestrator: Orchestrator) -> Result<Self, ServerError> {
        if socket_path.exists() {
            let _ = std::fs::remove_file(socket_path);
        }
        let listener = UnixListener::bind(socket_path).map_err(|source| ServerError::Bind {
            path: socket_path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            listener,
            orchestrator,
        })
    }

    /// Runs the accept loop until the listener fails.
    ///
    /// # Errors
    ///
    /// Returns the I/O error that ended the accept loop.
    pub async fn run(self) -> std::io::Result<()> {
        loop {
            let (stream, _addr) = self.listener.accept().await?;
            let orchestrator = self.orchestrator.clone();
            tokio::spawn(handle_connection(stream, orchestrator));
        }
    }
}

/// Serves one connection: read a frame, dispatch, answer, repeat.
async fn handle_connection(stream: UnixStream, orchestrator: Orchestrator) {
    let mut framed = Framed::new(stream, codec());
    while let Some(frame) = framed.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                // Oversized or torn frame: the stream is no longer
                // trustworthy, so drop the connection.
                warn!(error = %e, "closing connection on frame error");
                return;
            },
        };

        let response = match serde_json::from_slice::<Request>(&frame) {
            Ok(request) => orchestrator.dispatch(request).await,
            Err(e) => {
                debug!(error = %e, "rejecting malformed request frame");
                Response::Err(ApiError::validation(
                    "request",
                    "request frame is not a recognized operation",
                ))
            },
        };

        let encoded = match serde_json::to_vec(&response) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(error = %e, "failed to encode response");
                return;
            },
        };
        if let Err(e) = framed.send(Bytes::from(encoded)).await {
            debug!(error = %e, "connection closed while sending response");
            return;
        }
    }
}
