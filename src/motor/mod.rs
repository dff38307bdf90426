// Output side of the server: where decoded motor commands end up
//
// Provides:
// - The MotorSink trait the receive loop emits into
// - Console (stdout), serial motor board and zenoh publisher sinks
// - Sink selection from configuration

mod publish;
mod serial;
mod sink;

pub use publish::ZenohSink;
pub use serial::SerialSink;
pub use sink::{AnySink, ConsoleSink, MemorySink, MotorSink, Result, SinkError, open_sink};
