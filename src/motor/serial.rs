// Serial link to a motor controller board
//
// Line protocol: one "[f200][f200][r35][r35]\n" line per decoded frame, in
// left-front, left-rear, right-front, right-rear order.

use serialport::{self, SerialPort};
use std::io::Write;
use std::time::Duration;
use tracing::{debug, info};

use super::sink::{MotorSink, Result};
use crate::messages::MotorCommands;

/// Write timeout for the serial line
pub const SERIAL_TIMEOUT_MS: u64 = 100;

pub struct SerialSink {
    port: Box<dyn SerialPort>,
}

impl SerialSink {
    /// Open the motor board's serial port
    pub fn open(port_name: &str, baudrate: u32) -> Result<Self> {
        info!("Opening motor board on {} @ {} baud", port_name, baudrate);
        let port = serialport::new(port_name, baudrate)
            .timeout(Duration::from_millis(SERIAL_TIMEOUT_MS))
            .open()?;

        Ok(Self { port })
    }
}

/// Encode one command set as a serial line
fn encode_line(commands: &MotorCommands) -> String {
    format!("{}\n", commands)
}

impl MotorSink for SerialSink {
    async fn emit(&mut self, commands: &MotorCommands) -> Result<()> {
        let line = encode_line(commands);
        debug!("Serial write: {}", line.trim_end());
        self.port.write_all(line.as_bytes())?;
        self.port.flush()?;
        Ok(())
    }
}

impl Drop for SerialSink {
    fn drop(&mut self) {
        // Leave the motors stopped when the server goes away
        let stop = encode_line(&MotorCommands::stop());
        if let Err(e) = self.port.write_all(stop.as_bytes()) {
            tracing::warn!("Failed to stop motors on drop: {}", e);
        }
    }
}
