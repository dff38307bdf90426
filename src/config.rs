// Endpoints, loop rates, timeouts, sink settings
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::messages::AxisPair;

// Default endpoint (loopback, single client)
pub const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
pub const DEFAULT_PORT: u16 = 2002;

// Transmit loop frequency
pub const TICK_HZ: u64 = 60;

// Server: no chunk within this window -> watchdog stop + close
pub const READ_TIMEOUT: Duration = Duration::from_secs(2);

// Client: a frame that cannot be handed to the OS within this window is fatal
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(1);

// Zenoh topic for decoded motor commands
pub const TOPIC_RT_MOTORS: &str = "tank/rt/motors";

// Serial link to the motor controller board
pub const SERIAL_BAUDRATE: u32 = 115_200;

// Accepted `--hz` range
pub const MAX_TICK_HZ: u64 = 1000;

pub fn default_endpoint() -> SocketAddr {
    SocketAddr::new(DEFAULT_HOST, DEFAULT_PORT)
}

/// Tick interval for a given loop frequency, never shorter than 1µs
pub fn tick_interval(hz: u64) -> Duration {
    Duration::from_micros((1_000_000 / hz.max(1)).max(1))
}

/// Where decoded commands go
#[derive(Debug, Clone, PartialEq)]
pub enum SinkKind {
    /// Print `[f200][f200][r10][r10]` lines (or JSON) to stdout
    Console { json: bool },
    /// Write lines to a serial-attached motor controller
    Serial { port: String, baudrate: u32 },
    /// Publish JSON on a zenoh topic
    Zenoh { topic: String },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub read_timeout: Option<Duration>,
    pub sink: SinkKind,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_endpoint(),
            read_timeout: Some(READ_TIMEOUT),
            sink: SinkKind::Console { json: false },
        }
    }
}

/// Which input device feeds the transmit loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputDevice {
    /// Terminal keyboard emulating two vertical sticks
    Keyboard,
    /// Constant readings, for scripted runs and bench tests
    Fixed(AxisPair),
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server: SocketAddr,
    pub tick_hz: u64,
    pub write_timeout: Option<Duration>,
    pub device: InputDevice,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: default_endpoint(),
            tick_hz: TICK_HZ,
            write_timeout: Some(WRITE_TIMEOUT),
            device: InputDevice::Keyboard,
        }
    }
}
