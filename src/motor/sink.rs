// Motor command sinks
//
// The receive loop hands every decoded frame to a MotorSink in
// left-front, left-rear, right-front, right-rear order. Sinks own any
// side-specific direction inversion; the protocol never inverts.

use std::io::{self, Write};

use tracing::info;

use super::publish::ZenohSink;
use super::serial::SerialSink;
use crate::config::SinkKind;
use crate::messages::MotorCommands;

/// Error types for motor command output
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Zenoh error: {0}")]
    Zenoh(String),
}

pub type Result<T> = std::result::Result<T, SinkError>;

/// Consumer of decoded motor commands
#[allow(async_fn_in_trait)]
pub trait MotorSink {
    async fn emit(&mut self, commands: &MotorCommands) -> Result<()>;
}

/// Prints each command set on its own stdout line
pub struct ConsoleSink<W: Write = io::Stdout> {
    out: W,
    json: bool,
}

impl ConsoleSink {
    pub fn stdout(json: bool) -> Self {
        Self::new(io::stdout(), json)
    }
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W, json: bool) -> Self {
        Self { out, json }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> MotorSink for ConsoleSink<W> {
    async fn emit(&mut self, commands: &MotorCommands) -> Result<()> {
        if self.json {
            serde_json::to_writer(&mut self.out, commands)?;
            writeln!(self.out)?;
        } else {
            writeln!(self.out, "{}", commands)?;
        }
        self.out.flush()?;
        Ok(())
    }
}

/// Keeps every emitted command set (tests, dry runs)
#[derive(Debug, Default)]
pub struct MemorySink {
    pub emitted: Vec<MotorCommands>,
}

impl MotorSink for MemorySink {
    async fn emit(&mut self, commands: &MotorCommands) -> Result<()> {
        self.emitted.push(*commands);
        Ok(())
    }
}

/// Runtime-selected sink
pub enum AnySink {
    Console(ConsoleSink),
    Serial(SerialSink),
    Zenoh(ZenohSink),
}

impl MotorSink for AnySink {
    async fn emit(&mut self, commands: &MotorCommands) -> Result<()> {
        match self {
            AnySink::Console(sink) => sink.emit(commands).await,
            AnySink::Serial(sink) => sink.emit(commands).await,
            AnySink::Zenoh(sink) => sink.emit(commands).await,
        }
    }
}

/// Open the sink named by the configuration
pub async fn open_sink(kind: &SinkKind) -> Result<AnySink> {
    let sink = match kind {
        SinkKind::Console { json } => {
            info!("Emitting motor commands to stdout");
            AnySink::Console(ConsoleSink::stdout(*json))
        }
        SinkKind::Serial { port, baudrate } => AnySink::Serial(SerialSink::open(port, *baudrate)?),
        SinkKind::Zenoh { topic } => AnySink::Zenoh(ZenohSink::open(topic).await?),
    };
    Ok(sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{Direction, MotorCommand};

    fn sample() -> MotorCommands {
        MotorCommands::from_sides(
            MotorCommand::new(Direction::Forward, 200),
            MotorCommand::new(Direction::Reverse, 35),
        )
    }

    #[tokio::test]
    async fn test_console_sink_text_line() {
        let mut sink = ConsoleSink::new(Vec::new(), false);
        sink.emit(&sample()).await.unwrap();
        sink.emit(&MotorCommands::stop()).await.unwrap();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(out, "[f200][f200][r35][r35]\n[f0][f0][f0][f0]\n");
    }

    #[tokio::test]
    async fn test_console_sink_json_line() {
        let mut sink = ConsoleSink::new(Vec::new(), true);
        sink.emit(&sample()).await.unwrap();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let parsed: Vec<MotorCommand> = serde_json::from_str(out.trim_end()).unwrap();
        assert_eq!(parsed.len(), 4);
        assert_eq!(parsed[1], MotorCommand::new(Direction::Forward, 200));
        assert_eq!(parsed[3], MotorCommand::new(Direction::Reverse, 35));
    }

    #[tokio::test]
    async fn test_memory_sink_keeps_order() {
        let mut sink = MemorySink::default();
        sink.emit(&sample()).await.unwrap();
        sink.emit(&MotorCommands::stop()).await.unwrap();
        assert_eq!(sink.emitted, vec![sample(), MotorCommands::stop()]);
    }
}
