//! Syslog relay.
//!
//! Listens on a filesystem-path Unix socket (`/dev/log` by default) and
//! copies every byte a client writes, verbatim and in order, to the
//! supervisor's output. No framing, no acknowledgement.
//!
//! The accept loop runs until the quit broadcast fires. From then on no new
//! connection is accepted and the socket file is removed, while connections
//! accepted earlier keep being served until their clients close them.

use crate::error::{Error, Result};
use crate::quit::QuitBroadcast;
use std::io::ErrorKind;
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Well-known path of the syslog socket.
pub const DEFAULT_SYSLOG_SOCKET: &str = "/dev/log";

const READ_BUFFER_SIZE: usize = 8192;

/// Bound syslog socket, not yet accepting.
pub struct LogRelay {
    socket_path: PathBuf,
    listener: UnixListener,
}

impl LogRelay {
    /// Claim the socket path.
    ///
    /// A stale socket left at `path` (for example by the image that
    /// re-executed into this one) is removed first. Any other kind of entry
    /// at `path` is left alone and the bind fails. Must be called from
    /// within a tokio runtime.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        let socket_path = path.as_ref().to_path_buf();
        let bind_err = |source: std::io::Error| Error::RelayBind {
            path: socket_path.clone(),
            source,
        };

        if let Ok(meta) = socket_path.symlink_metadata() {
            if !meta.file_type().is_socket() {
                return Err(bind_err(std::io::Error::new(
                    ErrorKind::AlreadyExists,
                    "path exists and is not a socket",
                )));
            }
            std::fs::remove_file(&socket_path).map_err(bind_err)?;
        }

        let listener = UnixListener::bind(&socket_path).map_err(bind_err)?;
        info!(path = %socket_path.display(), "Syslog socket listening");

        Ok(Self {
            socket_path,
            listener,
        })
    }

    /// Get the socket path
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Start accepting connections.
    ///
    /// Each connection is copied into a fresh writer from `make_writer`.
    /// The returned handle completes once the accept loop has stopped.
    pub fn spawn<F, W>(self, quit: QuitBroadcast, make_writer: F) -> JoinHandle<()>
    where
        F: Fn() -> W + Send + Sync + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        tokio::spawn(self.accept_loop(quit, make_writer))
    }

    async fn accept_loop<F, W>(self, quit: QuitBroadcast, make_writer: F)
    where
        F: Fn() -> W + Send + Sync + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        loop {
            tokio::select! {
                biased;

                _ = quit.fired() => {
                    info!(path = %self.socket_path.display(), "Closing syslog socket");
                    break;
                }

                accepted = self.listener.accept() => match accepted {
                    Ok((stream, _addr)) => {
                        debug!("Accepted syslog connection");
                        tokio::spawn(relay_connection(stream, make_writer()));
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to accept syslog connection");
                    }
                },
            }
        }

        let LogRelay {
            socket_path,
            listener,
        } = self;
        drop(listener);
        if let Err(e) = std::fs::remove_file(&socket_path) {
            warn!(path = %socket_path.display(), error = %e, "Failed to remove syslog socket");
        }
    }
}

/// Copy one connection to `out` until the client closes it or a read fails.
async fn relay_connection<W>(mut stream: UnixStream, mut out: W)
where
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    loop {
        let n = match stream.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
                continue
            }
            Err(e) => {
                warn!(error = %e, "Error while reading data from syslog socket");
                break;
            }
        };

        if let Err(e) = out.write_all(&buf[..n]).await {
            warn!(error = %e, "Failed to write syslog data");
            break;
        }
        if let Err(e) = out.flush().await {
            warn!(error = %e, "Failed to flush syslog data");
            break;
        }
    }
    debug!("Syslog connection closed");
}
