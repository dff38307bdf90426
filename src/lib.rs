// Tank-drive teleoperation over TCP
//
// Client: sticks -> 4-byte control frames at 60Hz (teleop)
// Server: frames -> four motor commands -> sink (runtime)

pub mod config;
pub mod input;
pub mod link;
pub mod messages;
pub mod motor;
pub mod protocol;
pub mod runtime;
pub mod shutdown;
pub mod teleop;
