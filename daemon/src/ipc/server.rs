//! Unix domain socket server for IPC
//!
//! Provides request-response communication and push notifications of
//! session events to subscribed clients. Requests that change the session
//! are forwarded to the session loop; the server never touches it directly.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

use crate::events::SessionEvent;
use crate::session::{DurationOption, SessionHandle};

use super::protocol::{DaemonStatus, Notification, Request, Response, MAX_MESSAGE_LEN};

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: UnixListener,
    context: Arc<ClientContext>,
    shutdown_tx: broadcast::Sender<()>,
}

/// Shared by every client handler
struct ClientContext {
    session: SessionHandle,
    event_tx: broadcast::Sender<SessionEvent>,
    start_time: Instant,
}

impl Server {
    /// Create a new IPC server bound to `socket_path`
    pub fn new(
        socket_path: &Path,
        session: SessionHandle,
        event_tx: broadcast::Sender<SessionEvent>,
    ) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Set socket permissions to owner-only (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))
                .context("failed to restrict socket permissions")?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener,
            context: Arc::new(ClientContext {
                session,
                event_tx,
                start_time: Instant::now(),
            }),
            shutdown_tx,
        })
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let context = Arc::clone(&self.context);
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = handle_client(stream, context) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        // Remove socket file
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

/// Handle a single client connection
async fn handle_client(stream: UnixStream, context: Arc<ClientContext>) -> Result<()> {
    let (mut reader, writer) = stream.into_split();
    let writer = Arc::new(Mutex::new(writer));
    let mut forwarder: Option<tokio::task::JoinHandle<()>> = None;

    let result = async {
        while let Some(request) = read_message::<_, Request>(&mut reader).await? {
            debug!(?request, "received request");

            if matches!(request, Request::Subscribe) && forwarder.is_none() {
                debug!("client subscribed to notifications");
                forwarder = Some(tokio::spawn(forward_events(
                    context.event_tx.subscribe(),
                    Arc::clone(&writer),
                )));
            }

            let response = process_request(request, &context).await;
            write_message(&mut *writer.lock().await, &response).await?;
        }
        debug!("client disconnected");
        Ok::<_, anyhow::Error>(())
    }
    .await;

    if let Some(forwarder) = forwarder {
        forwarder.abort();
    }
    result
}

/// Push session events to a subscribed client until it goes away
async fn forward_events(
    mut event_rx: broadcast::Receiver<SessionEvent>,
    writer: Arc<Mutex<OwnedWriteHalf>>,
) {
    loop {
        let notification = match event_rx.recv().await {
            Ok(event) => Notification::Event { event },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "subscriber lagged");
                Notification::Lagged { skipped }
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        if let Err(e) = write_message(&mut *writer.lock().await, &notification).await {
            debug!(?e, "stopping notifications");
            break;
        }
    }
}

/// Process a request and return a response
async fn process_request(request: Request, context: &ClientContext) -> Response {
    match request {
        Request::Ping => Response::Pong,
        Request::Subscribe => Response::Subscribed,
        Request::ListDurations => Response::Durations {
            options: DurationOption::all(),
        },
        request => {
            let Some(action) = request.action() else {
                return Response::error("unsupported", "request has no session action");
            };
            match context.session.request(action).await {
                Ok(snapshot) => Response::Status(DaemonStatus::new(
                    snapshot,
                    context.start_time.elapsed().as_secs(),
                )),
                Err(e) => {
                    warn!(?action, error = %e, "request rejected");
                    Response::from(&e)
                }
            }
        }
    }
}

/// Read one length-prefixed JSON message. `None` on clean EOF.
pub async fn read_message<R, T>(reader: &mut R) -> Result<Option<T>>
where
    R: AsyncRead + Unpin,
    T: serde::de::DeserializeOwned,
{
    // Read message length (4-byte little-endian)
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_LEN {
        anyhow::bail!("message too large ({len} bytes)");
    }

    // Read message body
    let mut msg_buf = vec![0u8; len];
    reader.read_exact(&mut msg_buf).await?;

    let msg = serde_json::from_slice(&msg_buf).context("failed to parse message")?;
    Ok(Some(msg))
}

/// Send a length-prefixed JSON message
pub async fn write_message<W, T>(writer: &mut W, msg: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let msg_bytes = serde_json::to_vec(msg)?;
    let msg_len = (msg_bytes.len() as u32).to_le_bytes();

    writer.write_all(&msg_len).await?;
    writer.write_all(&msg_bytes).await?;

    Ok(())
}
