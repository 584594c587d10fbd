//! Individual console session handling

use super::manager::SessionManager;
use crate::command::RequestExecutor;
use anyhow::Result;
use robofleet_shared::codec::{self, CodecError, FrameDecoder};
use robofleet_shared::{Envelope, ErrorCode, Header, Response};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Why reading from a session stopped
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("decode error: {0}")]
    Codec(#[from] CodecError),

    #[error("read error: {0}")]
    Io(#[from] std::io::Error),
}

/// Handle to send messages to a specific console
#[derive(Clone)]
pub struct SessionHandle {
    pub addr: SocketAddr,
    writer: Arc<Mutex<WriteHalf<TcpStream>>>,
    pub connected_at: Instant,
}

impl SessionHandle {
    /// Send an envelope to this console
    pub async fn send(&self, envelope: &Envelope) -> Result<()> {
        let encoded = codec::encode(envelope)?;
        let mut writer = self.writer.lock().await;
        writer.write_all(&encoded).await?;
        Ok(())
    }
}

/// Active console session
pub struct ClientSession {
    pub handle: SessionHandle,
    reader: ReadHalf<TcpStream>,
    decoder: FrameDecoder,
    read_buf: Vec<u8>,
}

impl ClientSession {
    /// Create a new session from an accepted TCP stream
    pub fn new(stream: TcpStream, addr: SocketAddr) -> Self {
        let (reader, writer) = tokio::io::split(stream);

        let handle = SessionHandle {
            addr,
            writer: Arc::new(Mutex::new(writer)),
            connected_at: Instant::now(),
        };

        Self {
            handle,
            reader,
            decoder: FrameDecoder::new(),
            read_buf: vec![0u8; 4096],
        }
    }

    /// Get a cloneable handle for sending messages
    pub fn get_handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Read the next envelope from this session.
    ///
    /// Returns `Ok(None)` once the console closes the connection.
    pub async fn recv(&mut self) -> Result<Option<Envelope>, SessionError> {
        loop {
            // First try to decode from existing buffer
            if let Some(envelope) = self.decoder.decode_next()? {
                return Ok(Some(envelope));
            }

            let n = self.reader.read(&mut self.read_buf).await?;
            if n == 0 {
                return Ok(None);
            }
            self.decoder.extend(&self.read_buf[..n]);
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.handle.addr
    }
}

/// Serve one console until it disconnects, goes idle, or breaks framing
pub async fn serve(
    mut session: ClientSession,
    executor: Arc<RequestExecutor>,
    sessions: Arc<SessionManager>,
    idle_timeout: Duration,
) -> Result<()> {
    let addr = session.addr();
    let handle = session.get_handle();
    sessions.register(&handle).await;
    info!("Console connected: {} ({} open)", addr, sessions.count().await);

    let result = loop {
        let next = match timeout(idle_timeout, session.recv()).await {
            Ok(next) => next,
            Err(_) => {
                info!("Session {} idle for {:?}, closing", addr, idle_timeout);
                break Ok(());
            }
        };

        let reply = match next {
            Ok(Some(envelope)) => {
                sessions
                    .record_request(&addr, &envelope.header.sender_id)
                    .await;
                executor.execute(&envelope).await
            }
            Ok(None) => {
                info!("Console disconnected: {}", addr);
                break Ok(());
            }
            Err(SessionError::Codec(CodecError::Json(e))) => {
                // the bad frame was consumed, so the stream is still aligned
                warn!("Malformed request from {}: {}", addr, e);
                executor.reply(
                    Header::UNREADABLE_ACK,
                    Response::error(ErrorCode::BadRequest, format!("Malformed request: {}", e)),
                )
            }
            Err(e) => {
                error!("Session {} failed: {}", addr, e);
                break Err(e.into());
            }
        };

        if let Err(e) = handle.send(&reply).await {
            error!("Failed to answer {}: {}", addr, e);
            break Err(e);
        }
        debug!("Answered seq={:?} on {}", reply.header.ack_sequence_id, addr);
    };

    if let Some(info) = sessions.get(&addr).await {
        info!(
            "Session {} ({}) closed after {} requests in {:?}",
            addr,
            info.client_id,
            info.requests,
            info.connected_at.elapsed()
        );
    }
    sessions.unregister(&addr).await;
    result
}

/// Accept consoles forever, serving each on its own task
pub async fn accept_loop(
    listener: TcpListener,
    executor: Arc<RequestExecutor>,
    sessions: Arc<SessionManager>,
    idle_timeout: Duration,
) -> Result<()> {
    loop {
        let (stream, addr) = listener.accept().await?;
        let session = ClientSession::new(stream, addr);
        let executor = executor.clone();
        let sessions = sessions.clone();

        tokio::spawn(async move {
            if let Err(e) = serve(session, executor, sessions, idle_timeout).await {
                warn!("Session {} ended with error: {}", addr, e);
            }
        });
    }
}
