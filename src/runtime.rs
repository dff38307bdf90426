// Server receive loop: one client, 4-byte frames in, motor commands out
// States: Listening -> Streaming (on accept) -> Closed (peer closed, stale
// link or shutdown). No reconnect; a finished session ends the server.
// Watchdog: if the link goes quiet for longer than the read timeout the
// motors get a stop command before the connection is dropped.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::link::{self, LinkError};
use crate::messages::MotorCommands;
use crate::motor::{MotorSink, SinkError, open_sink};
use crate::protocol::{FRAME_LEN, decode_frame};
use crate::shutdown::Shutdown;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

pub type Result<T> = std::result::Result<T, ServerError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Listening,
    Streaming,
    Closed,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LinkState::Listening => "listening",
            LinkState::Streaming => "streaming",
            LinkState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Per-session counters, logged when the session ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames: u64,
    pub malformed: u64,
}

pub struct Receiver<S> {
    sink: S,
    read_timeout: Option<Duration>,
    state: LinkState,
    stats: SessionStats,
}

impl<S: MotorSink> Receiver<S> {
    pub fn new(sink: S, read_timeout: Option<Duration>) -> Self {
        Self {
            sink,
            read_timeout,
            state: LinkState::Listening,
            stats: SessionStats::default(),
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    fn set_state(&mut self, next: LinkState) {
        debug!("Link {} -> {}", self.state, next);
        self.state = next;
    }

    /// Decode one received chunk and emit it, or count it as malformed
    async fn on_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        match decode_frame(chunk) {
            Some(commands) => {
                debug!("Frame {:?} -> {}", chunk, commands);
                self.sink.emit(&commands).await?;
                self.stats.frames += 1;
            }
            None => {
                warn!("Data incorrectly formatted: {} bytes, dropping (malformed)", chunk.len());
                self.stats.malformed += 1;
            }
        }
        Ok(())
    }

    /// Watchdog: link went quiet, stop the motors
    async fn on_stale(&mut self, quiet_for: Duration) -> Result<()> {
        warn!("No frames for {:?}, stopping motors", quiet_for);
        self.sink.emit(&MotorCommands::stop()).await?;
        Ok(())
    }

    /// Stream frames from an accepted connection until the peer closes,
    /// the link goes stale or a stop is requested.
    pub async fn run_session<R>(&mut self, conn: &mut R, shutdown: &mut Shutdown) -> Result<SessionStats>
    where
        R: AsyncRead + Unpin,
    {
        self.set_state(LinkState::Streaming);
        let mut buf = [0u8; FRAME_LEN];

        let result = loop {
            let read = tokio::select! {
                biased;
                _ = shutdown.wait() => {
                    info!("Shutdown requested, closing connection");
                    break Ok(());
                }
                read = link::read_chunk(conn, &mut buf, self.read_timeout) => read,
            };

            let n = match read {
                Ok(n) => n,
                Err(LinkError::ReadTimeout(quiet_for)) => {
                    break match self.on_stale(quiet_for).await {
                        Ok(()) => Err(LinkError::ReadTimeout(quiet_for).into()),
                        Err(e) => Err(e),
                    };
                }
                Err(e) => break Err(e.into()),
            };

            if n == 0 {
                info!("Stopped receiving data.");
                break Ok(());
            }

            if let Err(e) = self.on_chunk(&buf[..n]).await {
                break Err(e);
            }
        };

        self.set_state(LinkState::Closed);
        info!(
            "Session ended: {} frames, {} malformed",
            self.stats.frames, self.stats.malformed
        );
        result.map(|()| self.stats)
    }
}

/// Bind the listening socket
pub async fn listen(bind: SocketAddr) -> Result<TcpListener> {
    let listener = TcpListener::bind(bind).await.map_err(LinkError::from)?;
    info!("Listening on {}...", listener.local_addr().map_err(LinkError::from)?);
    Ok(listener)
}

/// Wait for the single client. `None` if a stop came first.
pub async fn accept_one(listener: TcpListener, shutdown: &mut Shutdown) -> Result<Option<(TcpStream, SocketAddr)>> {
    tokio::select! {
        biased;
        _ = shutdown.wait() => Ok(None),
        accepted = listener.accept() => {
            let (stream, peer) = accepted.map_err(LinkError::from)?;
            info!("Connection address: {}", peer);
            // Listener dropped here: one client per run
            Ok(Some((stream, peer)))
        }
    }
}

/// Accept one client on `listener` and stream it into `sink`
pub async fn serve<S: MotorSink>(
    listener: TcpListener,
    sink: S,
    read_timeout: Option<Duration>,
    mut shutdown: Shutdown,
) -> Result<SessionStats> {
    let mut receiver = Receiver::new(sink, read_timeout);

    let Some((mut stream, _peer)) = accept_one(listener, &mut shutdown).await? else {
        info!("Shutdown before any client connected");
        return Ok(SessionStats::default());
    };

    let result = receiver.run_session(&mut stream, &mut shutdown).await;

    if let Err(e) = stream.shutdown().await {
        debug!("Socket shutdown: {}", e);
    }
    info!("Socket closed.");
    result
}

/// Server entry point: open the sink, bind, serve one client
pub async fn run(config: ServerConfig, shutdown: Shutdown) -> Result<SessionStats> {
    let sink = open_sink(&config.sink).await?;
    let listener = listen(config.bind).await?;

    match config.read_timeout {
        Some(limit) => info!("Watchdog: stop after {}ms without frames", limit.as_millis()),
        None => info!("Watchdog disabled"),
    }

    serve(listener, sink, config.read_timeout, shutdown).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::testing::ScriptedReader;
    use crate::messages::{Direction, MotorCommand};
    use crate::motor::MemorySink;
    use crate::shutdown;

    #[tokio::test]
    async fn test_session_emits_valid_and_skips_malformed() {
        let mut conn = ScriptedReader::new(vec![
            vec![255, 200, 0, 100],
            vec![1, 2],
            vec![0, 10, 255, 20],
            vec![9, 9, 9],
        ]);
        let (_stop, mut shutdown) = shutdown::channel();
        let mut receiver = Receiver::new(MemorySink::default(), None);

        let stats = receiver.run_session(&mut conn, &mut shutdown).await.unwrap();

        assert_eq!(stats, SessionStats { frames: 2, malformed: 2 });
        assert_eq!(receiver.state(), LinkState::Closed);

        let emitted = &receiver.sink().emitted;
        assert_eq!(emitted.len(), 2);
        assert_eq!(emitted[0].left(), MotorCommand::new(Direction::Reverse, 200));
        assert_eq!(emitted[0].right(), MotorCommand::new(Direction::Forward, 100));
        assert_eq!(emitted[1].to_string(), "[f10][f10][r20][r20]");
    }

    #[tokio::test]
    async fn test_zero_byte_read_ends_session_cleanly() {
        let mut conn = ScriptedReader::new(vec![]);
        let (_stop, mut shutdown) = shutdown::channel();
        let mut receiver = Receiver::new(MemorySink::default(), None);

        let stats = receiver.run_session(&mut conn, &mut shutdown).await.unwrap();

        assert_eq!(stats, SessionStats::default());
        assert!(receiver.sink().emitted.is_empty());
    }

    #[tokio::test]
    async fn test_stale_link_stops_motors() {
        let (_client, mut server_side) = tokio::io::duplex(64);
        let (_stop, mut shutdown) = shutdown::channel();
        let mut receiver = Receiver::new(MemorySink::default(), Some(Duration::from_millis(20)));

        let err = receiver
            .run_session(&mut server_side, &mut shutdown)
            .await
            .unwrap_err();

        assert!(matches!(err, ServerError::Link(LinkError::ReadTimeout(_))));
        assert_eq!(receiver.sink().emitted, vec![MotorCommands::stop()]);
        assert_eq!(receiver.state(), LinkState::Closed);
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_blocked_read() {
        let (_client, mut server_side) = tokio::io::duplex(64);
        let (stop, mut shutdown) = shutdown::channel();
        let mut receiver = Receiver::new(MemorySink::default(), None);

        stop.stop();
        let stats = receiver.run_session(&mut server_side, &mut shutdown).await.unwrap();

        assert_eq!(stats, SessionStats::default());
        assert_eq!(receiver.state(), LinkState::Closed);
    }

    #[tokio::test]
    async fn test_serve_returns_when_stopped_before_accept() {
        let listener = listen("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let (stop, shutdown) = shutdown::channel();
        stop.stop();

        let stats = serve(listener, MemorySink::default(), None, shutdown).await.unwrap();
        assert_eq!(stats, SessionStats::default());
    }
}
