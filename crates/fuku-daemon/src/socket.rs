//! Exposes the Log Broadcast Hub to out-of-process followers over a
//! Unix-domain socket: `<runtime-dir>/fuku-<profile>.sock`.
//!
//! Connection lifecycle mirrors the teacher's `listener` module: accept,
//! hand the stream to its own task, split into read/write halves, and race
//! the outbox-to-wire pump against client-disconnect detection so a dead
//! peer doesn't leak a subscriber forever.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncReadExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use fuku_wire::{read_frame, write_frame, SubscribeRequest};

use crate::hub::Hub;

/// How long a connect probe against a candidate stale socket waits before
/// concluding nobody is listening.
const CONNECT_PROBE_TIMEOUT: Duration = Duration::from_millis(200);

#[derive(Debug, Error)]
pub enum SocketError {
    #[error("another instance is already listening on {0}")]
    InUse(PathBuf),

    #[error("io error binding {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

/// Binds `path`, first checking whether a live instance already owns it.
///
/// If the path exists, a connect attempt is made: success means another
/// instance owns the socket ([`SocketError::InUse`]); failure means the
/// path is stale (the owning process is gone without cleaning up), so it's
/// unlinked and binding proceeds.
pub async fn bind(path: &Path) -> Result<UnixListener, SocketError> {
    if path.exists() {
        match tokio::time::timeout(CONNECT_PROBE_TIMEOUT, UnixStream::connect(path)).await {
            Ok(Ok(_stream)) => return Err(SocketError::InUse(path.to_path_buf())),
            _ => {
                debug!(?path, "stale socket with no live owner, unlinking");
                std::fs::remove_file(path).map_err(|source| SocketError::Io { path: path.to_path_buf(), source })?;
            }
        }
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| SocketError::Io { path: path.to_path_buf(), source })?;
    }
    UnixListener::bind(path).map_err(|source| SocketError::Io { path: path.to_path_buf(), source })
}

/// Runs the accept loop until `cancel` fires. Only new connections are cut
/// off at that point; connections already accepted keep draining until the
/// hub itself closes their outbox (step 5 of the shutdown sequence, a
/// separate signal from this one).
pub async fn run(listener: UnixListener, hub: Hub, cancel: CancellationToken) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, _addr)) => {
                        let hub = hub.clone();
                        tokio::spawn(async move { handle_connection(stream, hub).await });
                    }
                    Err(e) => {
                        warn!(error = %e, "accept failed");
                    }
                }
            }
        }
    }
}

async fn handle_connection(stream: UnixStream, hub: Hub) {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let subscribe: SubscribeRequest = match read_frame(&mut reader).await {
        Ok(Some(req)) => req,
        Ok(None) => return,
        Err(e) => {
            debug!(error = %e, "closing connection: expected a subscribe request first");
            return;
        }
    };

    let Some((id, outbox)) = hub.register(subscribe.services).await else {
        return;
    };

    loop {
        tokio::select! {
            biased;
            frame = outbox.recv() => {
                let Some(frame) = frame else { break };
                if write_frame(&mut write_half, &frame).await.is_err() {
                    break;
                }
            }
            disconnected = detect_disconnect(&mut reader) => {
                if disconnected {
                    break;
                }
            }
        }
    }
    hub.unregister(id);
}

/// Resolves once the peer closes its write half (read returns `Ok(0)`) or
/// sends unexpected bytes — either way the connection is done being used
/// as a one-shot subscribe-then-stream channel.
async fn detect_disconnect<R>(reader: &mut R) -> bool
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut buf = [0u8; 1];
    matches!(reader.read(&mut buf).await, Ok(0) | Err(_))
}

#[cfg(test)]
#[path = "socket_tests.rs"]
mod tests;
