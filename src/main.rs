use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use tank_teleop::config::{
    self, ClientConfig, DEFAULT_HOST, DEFAULT_PORT, InputDevice, MAX_TICK_HZ, SERIAL_BAUDRATE,
    ServerConfig, SinkKind, TICK_HZ, TOPIC_RT_MOTORS,
};
use tank_teleop::messages::AxisPair;
use tank_teleop::{runtime, shutdown, teleop};

#[derive(Parser)]
#[command(name = "tank-teleop")]
#[command(about = "Tank-drive teleoperation over a 4-byte TCP control stream")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Accept one client and turn its frames into motor commands
    Serve(ServeArgs),
    /// Connect to a server and stream stick readings at a fixed rate
    Drive(DriveArgs),
}

#[derive(Clone, Copy, ValueEnum)]
enum SinkArg {
    Console,
    Serial,
    Zenoh,
}

#[derive(Clone, Copy, ValueEnum)]
enum DeviceArg {
    Keyboard,
    Fixed,
}

#[derive(Args)]
struct ServeArgs {
    /// Address to listen on
    #[arg(long, default_value_t = DEFAULT_HOST)]
    host: IpAddr,

    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Stop the motors and close after this long without data (0 = never)
    #[arg(long, default_value_t = config::READ_TIMEOUT.as_millis() as u64)]
    read_timeout_ms: u64,

    /// Where decoded motor commands go
    #[arg(long, value_enum, default_value = "console")]
    sink: SinkArg,

    /// Console sink: print JSON instead of [f200]... lines
    #[arg(long)]
    json: bool,

    /// Serial sink: motor board port
    #[arg(long, required_if_eq("sink", "serial"))]
    serial_port: Option<String>,

    #[arg(long, default_value_t = SERIAL_BAUDRATE)]
    baudrate: u32,

    /// Zenoh sink: topic to publish on
    #[arg(long, default_value = TOPIC_RT_MOTORS)]
    topic: String,
}

#[derive(Args)]
struct DriveArgs {
    /// Server address
    #[arg(long, default_value_t = DEFAULT_HOST)]
    host: IpAddr,

    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Frames per second
    #[arg(long, default_value_t = TICK_HZ, value_parser = clap::value_parser!(u64).range(1..=MAX_TICK_HZ))]
    hz: u64,

    /// Give up when a frame is not accepted within this long (0 = never)
    #[arg(long, default_value_t = config::WRITE_TIMEOUT.as_millis() as u64)]
    write_timeout_ms: u64,

    #[arg(long, value_enum, default_value = "keyboard")]
    device: DeviceArg,

    /// Fixed device: left stick reading
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    left: f32,

    /// Fixed device: right stick reading
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    right: f32,
}

fn timeout_from_ms(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

impl From<ServeArgs> for ServerConfig {
    fn from(args: ServeArgs) -> Self {
        let sink = match args.sink {
            SinkArg::Console => SinkKind::Console { json: args.json },
            SinkArg::Serial => SinkKind::Serial {
                port: args.serial_port.unwrap_or_default(),
                baudrate: args.baudrate,
            },
            SinkArg::Zenoh => SinkKind::Zenoh { topic: args.topic },
        };
        Self {
            bind: SocketAddr::new(args.host, args.port),
            read_timeout: timeout_from_ms(args.read_timeout_ms),
            sink,
        }
    }
}

impl From<DriveArgs> for ClientConfig {
    fn from(args: DriveArgs) -> Self {
        let device = match args.device {
            DeviceArg::Keyboard => InputDevice::Keyboard,
            DeviceArg::Fixed => InputDevice::Fixed(AxisPair::new(args.left, args.right)),
        };
        Self {
            server: SocketAddr::new(args.host, args.port),
            tick_hz: args.hz,
            write_timeout: timeout_from_ms(args.write_timeout_ms),
            device,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug); stderr keeps stdout for motor output
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let (_stop, stop_signal) = shutdown::on_ctrl_c();

    match cli.command {
        Command::Serve(args) => {
            if let Err(e) = runtime::run(args.into(), stop_signal).await {
                eprintln!("Server error: {}", e);
                std::process::exit(1);
            }
        }
        Command::Drive(args) => {
            if let Err(e) = teleop::run(args.into(), stop_signal).await {
                eprintln!("Client error: {}", e);
                std::process::exit(1);
            }
        }
    }
}
