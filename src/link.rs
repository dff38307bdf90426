// TCP link plumbing: frame writes with short-write handling, chunk reads,
// timeouts and the link error type.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::protocol::{ControlFrame, FRAME_LEN};

/// Error types for the control link
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Connection refused by {addr}")]
    ConnectionRefused { addr: SocketAddr },

    #[error("Connection broken after {written} of 4 frame bytes")]
    ConnectionBroken { written: usize },

    #[error("No data from peer for {0:?}")]
    ReadTimeout(Duration),

    #[error("Frame not accepted within {0:?}")]
    WriteTimeout(Duration),
}

pub type Result<T> = std::result::Result<T, LinkError>;

/// Result of pushing one frame into the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// All frame bytes were accepted
    Sent,
    /// The transport accepted zero bytes: peer is gone
    Broken { written: usize },
    /// The transport cannot take more right now; `written` bytes already went out
    WouldBlock { written: usize },
}

/// Write `frame[offset..]`, retrying the remaining suffix on short writes.
///
/// Stops at the first zero-length write (`Broken`) or `WouldBlock`. Other
/// I/O errors are returned as-is.
pub async fn send_from<W>(conn: &mut W, frame: &ControlFrame, offset: usize) -> io::Result<SendOutcome>
where
    W: AsyncWrite + Unpin,
{
    let bytes = frame.as_bytes();
    let mut written = offset.min(FRAME_LEN);

    while written < FRAME_LEN {
        match conn.write(&bytes[written..]).await {
            Ok(0) => return Ok(SendOutcome::Broken { written }),
            Ok(n) => {
                written += n;
                if written < FRAME_LEN {
                    debug!("Short write: {}/{} bytes", written, FRAME_LEN);
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                return Ok(SendOutcome::WouldBlock { written });
            }
            Err(e) => return Err(e),
        }
    }

    Ok(SendOutcome::Sent)
}

/// Write one whole frame
pub async fn send_frame<W>(conn: &mut W, frame: &ControlFrame) -> io::Result<SendOutcome>
where
    W: AsyncWrite + Unpin,
{
    send_from(conn, frame, 0).await
}

/// Read one chunk of at most FRAME_LEN bytes.
///
/// Mirrors a single `recv(4)`: whatever one read yields is the chunk, there
/// is no reassembly across reads. Zero means the peer closed.
pub async fn read_chunk<R>(
    conn: &mut R,
    buf: &mut [u8; FRAME_LEN],
    timeout: Option<Duration>,
) -> Result<usize>
where
    R: AsyncRead + Unpin,
{
    let n = match timeout {
        Some(limit) => tokio::time::timeout(limit, conn.read(buf))
            .await
            .map_err(|_| LinkError::ReadTimeout(limit))??,
        None => conn.read(buf).await?,
    };
    Ok(n)
}

/// Connect to the server, distinguishing refusal from other socket errors
pub async fn connect(addr: SocketAddr) -> Result<TcpStream> {
    info!("Connecting to {}...", addr);
    let stream = TcpStream::connect(addr).await.map_err(|e| {
        if e.kind() == io::ErrorKind::ConnectionRefused {
            LinkError::ConnectionRefused { addr }
        } else {
            LinkError::Io(e)
        }
    })?;

    // 4-byte frames at 60 Hz; don't let Nagle batch them
    stream.set_nodelay(true)?;
    info!("Connected to {}", addr);
    Ok(stream)
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory transports with controllable short writes / reads.

    use std::collections::VecDeque;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

    /// Accepts at most `per_write` bytes per call, then optionally reports
    /// closure (Ok(0)) once `budget` bytes went through, WouldBlock once at
    /// `would_block_at`, or WouldBlock forever from `stall_at` on.
    pub struct TrickleWriter {
        pub data: Vec<u8>,
        pub per_write: usize,
        pub budget: Option<usize>,
        pub would_block_at: Option<usize>,
        pub stall_at: Option<usize>,
        pub writes: usize,
    }

    impl TrickleWriter {
        pub fn new(per_write: usize) -> Self {
            Self {
                data: Vec::new(),
                per_write,
                budget: None,
                would_block_at: None,
                stall_at: None,
                writes: 0,
            }
        }
    }

    impl AsyncWrite for TrickleWriter {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            self.writes += 1;
            if let Some(at) = self.would_block_at
                && self.data.len() >= at
            {
                self.would_block_at = None;
                return Poll::Ready(Err(io::ErrorKind::WouldBlock.into()));
            }
            if let Some(at) = self.stall_at
                && self.data.len() >= at
            {
                return Poll::Ready(Err(io::ErrorKind::WouldBlock.into()));
            }
            let room = match self.budget {
                Some(budget) => budget.saturating_sub(self.data.len()),
                None => usize::MAX,
            };
            let n = buf.len().min(self.per_write).min(room);
            self.data.extend_from_slice(&buf[..n]);
            Poll::Ready(Ok(n))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    /// Yields one scripted chunk per read, then EOF
    pub struct ScriptedReader {
        chunks: VecDeque<Vec<u8>>,
    }

    impl ScriptedReader {
        pub fn new(chunks: Vec<Vec<u8>>) -> Self {
            Self {
                chunks: chunks.into(),
            }
        }
    }

    impl AsyncRead for ScriptedReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            if let Some(chunk) = self.chunks.pop_front() {
                let n = chunk.len().min(buf.remaining());
                buf.put_slice(&chunk[..n]);
            }
            Poll::Ready(Ok(()))
        }
    }
}
