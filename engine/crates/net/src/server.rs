use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use session::SessionId;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};

use crate::channels::{
    OutputTx, RegisterSession, RegisterTx, SessionInputRx, SessionInputTx, SessionWriteRx,
    UnregisterTx,
};
use crate::rate_limiter::{ConnectionLimiter, ConnectionSlot, RateLimitConfig, RateLimitRejection};
use crate::telnet::LineBuffer;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

const WRITER_DRAIN: Duration = Duration::from_secs(2);

/// Channels shared by every connection task.
#[derive(Clone)]
pub struct ServerChannels {
    pub output_tx: OutputTx,
    pub register_tx: RegisterTx,
    pub unregister_tx: UnregisterTx,
}

/// Everything a session driver needs to talk to its connection.
#[derive(Debug)]
pub struct SessionLink {
    pub session_id: SessionId,
    pub peer_addr: SocketAddr,
    /// Closed when the peer disconnects.
    pub input: SessionInputRx,
    pub output: OutputTx,
}

/// Accept connections until shutdown, spawning a reader, a writer and a
/// session driver (`on_session`) for each.
pub async fn run_tcp_server<F, Fut>(
    addr: String,
    limits: RateLimitConfig,
    channels: ServerChannels,
    mut shutdown_rx: watch::Receiver<bool>,
    on_session: F,
) -> Result<(), std::io::Error>
where
    F: Fn(SessionLink) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("TCP server listening on {}", addr);

    let max_line = limits.max_input_length;
    let limiter = ConnectionLimiter::new(limits);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer_addr) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        tracing::warn!("accept failed: {}", e);
                        continue;
                    }
                };

                let slot = match ConnectionSlot::acquire(&limiter, peer_addr.ip()) {
                    Ok(slot) => slot,
                    Err(reason) => {
                        tracing::warn!(%peer_addr, %reason, "Connection refused");
                        tokio::spawn(refuse(stream, reason));
                        continue;
                    }
                };

                let session_id = SessionId(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed));
                tracing::info!(%session_id, %peer_addr, "New connection");

                let channels = channels.clone();
                let on_session = on_session.clone();
                tokio::spawn(async move {
                    handle_connection(stream, session_id, peer_addr, channels, max_line, on_session).await;
                    drop(slot);
                });
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    tracing::info!("TCP server no longer accepting connections");
                    break;
                }
            }
        }
    }

    Ok(())
}

async fn refuse(mut stream: TcpStream, reason: RateLimitRejection) {
    let msg = format!("Connection refused: {}.\r\n", reason);
    let _ = stream.write_all(msg.as_bytes()).await;
    let _ = stream.shutdown().await;
}

async fn handle_connection<F, Fut>(
    stream: TcpStream,
    session_id: SessionId,
    peer_addr: SocketAddr,
    channels: ServerChannels,
    max_line: usize,
    on_session: F,
) where
    F: Fn(SessionLink) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (mut reader, mut writer) = stream.into_split();

    let (write_tx, mut write_rx): (_, SessionWriteRx) = mpsc::unbounded_channel();
    let _ = channels.register_tx.send(RegisterSession {
        session_id,
        write_tx,
    });

    let writer_handle = tokio::spawn(async move {
        while let Some(text) = write_rx.recv().await {
            // Telnet clients expect CRLF line endings.
            let text = text.replace("\r\n", "\n").replace('\n', "\r\n");
            let msg = format!("{}\r\n", text);
            if writer.write_all(msg.as_bytes()).await.is_err() {
                break;
            }
        }
        let _ = writer.shutdown().await;
    });

    let (input_tx, input_rx) = mpsc::unbounded_channel();
    let link = SessionLink {
        session_id,
        peer_addr,
        input: input_rx,
        output: channels.output_tx.clone(),
    };
    let mut session_task = tokio::spawn(on_session(link));

    tokio::select! {
        _ = read_lines(&mut reader, input_tx, max_line) => {
            // Peer went away; let the driver finish its flush.
            if let Err(e) = (&mut session_task).await {
                tracing::error!(%session_id, "session task failed: {}", e);
            }
        }
        joined = &mut session_task => {
            if let Err(e) = joined {
                tracing::error!(%session_id, "session task failed: {}", e);
            }
        }
    }

    let _ = channels.unregister_tx.send(session_id);
    if tokio::time::timeout(WRITER_DRAIN, writer_handle).await.is_err() {
        tracing::debug!(%session_id, "writer did not drain in time");
    }
    tracing::info!(%session_id, "Session ended");
}

async fn read_lines(reader: &mut OwnedReadHalf, input_tx: SessionInputTx, max_line: usize) {
    let mut line_buffer = LineBuffer::with_max_len(max_line);
    let mut buf = [0u8; 4096];

    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                for event in line_buffer.feed(&buf[..n]) {
                    if input_tx.send(event).is_err() {
                        return;
                    }
                }
            }
            Err(e) => {
                tracing::debug!("read error: {}", e);
                break;
            }
        }
    }
}
