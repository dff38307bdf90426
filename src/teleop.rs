// Client transmit loop: sample sticks, encode, send, wait for the next tick
//
// Runs until a stop is requested (Ctrl-C / operator quit) or the link
// breaks. A broken link is fatal; there is no reconnect.

use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::config::{ClientConfig, tick_interval};
use crate::input::{self, AxisSource, InputError};
use crate::link::{self, LinkError, SendOutcome};
use crate::protocol::ControlFrame;
use crate::shutdown::Shutdown;

#[derive(Debug, thiserror::Error)]
pub enum TeleopError {
    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Input(#[from] InputError),
}

pub type Result<T> = std::result::Result<T, TeleopError>;

/// Transmit counters, logged when the loop stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxStats {
    pub frames_sent: u64,
    pub ticks_dropped: u64,
}

/// Push one frame, finishing a frame that stalled part-way.
///
/// Returns `false` when the transport was not ready for the first byte
/// and the tick was dropped (the next tick carries a fresher sample).
async fn push_frame<W>(conn: &mut W, frame: &ControlFrame) -> Result<bool>
where
    W: AsyncWrite + Unpin,
{
    let mut offset = 0;
    loop {
        let outcome = link::send_from(conn, frame, offset)
            .await
            .map_err(LinkError::from)?;
        match outcome {
            SendOutcome::Sent => return Ok(true),
            SendOutcome::Broken { written } => {
                return Err(LinkError::ConnectionBroken { written }.into());
            }
            SendOutcome::WouldBlock { written: 0 } => return Ok(false),
            // Mid-frame: must finish or the stream desyncs
            SendOutcome::WouldBlock { written } => {
                offset = written;
                tokio::task::yield_now().await;
            }
        }
    }
}

/// `push_frame` under one deadline covering every retry of the frame
async fn transmit<W>(conn: &mut W, frame: &ControlFrame, write_timeout: Option<Duration>) -> Result<bool>
where
    W: AsyncWrite + Unpin,
{
    match write_timeout {
        Some(limit) => tokio::time::timeout(limit, push_frame(conn, frame))
            .await
            .map_err(|_| LinkError::WriteTimeout(limit))?,
        None => push_frame(conn, frame).await,
    }
}

/// Run the tick loop over an established connection
pub async fn run_transmitter<W, A>(
    conn: &mut W,
    source: &mut A,
    tick: Duration,
    write_timeout: Option<Duration>,
    shutdown: &mut Shutdown,
) -> Result<TxStats>
where
    W: AsyncWrite + Unpin,
    A: AxisSource + ?Sized,
{
    let mut stats = TxStats::default();
    let mut ticker = interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.wait() => {
                info!("Stop requested");
                break;
            }
            _ = ticker.tick() => {}
        }

        // 1. Sample the sticks (drift-suppressed, clamped)
        let Some(raw) = source.sample()? else {
            info!("Operator quit");
            break;
        };
        let axes = input::normalize(raw);

        // 2. Encode
        let frame = ControlFrame::from(axes);

        // 3. Send
        if transmit(conn, &frame, write_timeout).await? {
            debug!("Sent {:?} for left={}, right={}", frame.as_bytes(), axes.left, axes.right);
            stats.frames_sent += 1;
        } else {
            warn!("Transport not ready, dropped tick");
            stats.ticks_dropped += 1;
        }
    }

    info!(
        "Transmitter stopped: {} frames sent, {} ticks dropped",
        stats.frames_sent, stats.ticks_dropped
    );
    Ok(stats)
}

/// Client entry point: connect, open the input device, stream until stopped
pub async fn run(config: ClientConfig, mut shutdown: Shutdown) -> Result<TxStats> {
    let mut conn = link::connect(config.server).await?;
    let mut source = input::open_input(&config.device)?;

    info!("Transmitting at {}Hz", config.tick_hz);
    let result = run_transmitter(
        &mut conn,
        &mut *source,
        tick_interval(config.tick_hz),
        config.write_timeout,
        &mut shutdown,
    )
    .await;

    // Restore the terminal before anything else is printed
    drop(source);

    if let Err(e) = conn.shutdown().await {
        debug!("Socket shutdown: {}", e);
    }
    result
}
