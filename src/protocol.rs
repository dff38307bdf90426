// Tank-drive control frame
//
// Frame format (4 bytes, no header, no checksum, no length prefix):
//   [left_dir, left_mag, right_dir, right_mag]
// dir: 0x00 = forward, 0xFF = reverse
// mag: 0..=255 speed magnitude (PWM duty)
//
// Frames are streamed back to back over TCP. A read that does not yield
// exactly FRAME_LEN bytes is an invalid frame, never a partial one.

use crate::messages::{AxisPair, Direction, MotorCommand, MotorCommands};

/// Size of one control frame on the wire
pub const FRAME_LEN: usize = 4;

/// Direction flag bytes
pub const DIR_FORWARD: u8 = 0x00;
pub const DIR_REVERSE: u8 = 0xFF;

/// Byte offsets within a frame
const LEFT_DIR: usize = 0;
const LEFT_MAG: usize = 1;
const RIGHT_DIR: usize = 2;
const RIGHT_MAG: usize = 3;

/// Full-scale magnitude for |axis| == 1.0
const MAG_SCALE: f32 = 255.0;

/// One encoded control sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlFrame([u8; FRAME_LEN]);

impl ControlFrame {
    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }
}

/// Encode one axis reading as (direction flag, magnitude)
///
/// Negative readings are reverse. Magnitude is `|value| * 255` rounded half
/// away from zero and saturated to 255. NaN encodes as a stop.
pub fn encode_axis(value: f32) -> (u8, u8) {
    if value.is_nan() {
        return (DIR_FORWARD, 0);
    }

    let direction = if value < 0.0 { DIR_REVERSE } else { DIR_FORWARD };
    let magnitude = (value.abs().min(1.0) * MAG_SCALE).round() as u8;

    (direction, magnitude)
}

/// Build a frame from left/right readings
pub fn build_frame(left: f32, right: f32) -> ControlFrame {
    let (left_dir, left_mag) = encode_axis(left);
    let (right_dir, right_mag) = encode_axis(right);

    ControlFrame([left_dir, left_mag, right_dir, right_mag])
}

impl From<AxisPair> for ControlFrame {
    fn from(axes: AxisPair) -> Self {
        build_frame(axes.left, axes.right)
    }
}

fn decode_direction(flag: u8) -> Direction {
    if flag == DIR_REVERSE {
        Direction::Reverse
    } else {
        Direction::Forward
    }
}

/// Decode a received chunk into per-motor commands
///
/// Returns `None` unless `raw` is exactly one frame long. An empty chunk
/// (peer closed) is also `None`; the receive loop tells the two apart.
pub fn decode_frame(raw: &[u8]) -> Option<MotorCommands> {
    if raw.len() != FRAME_LEN {
        return None;
    }

    let left = MotorCommand::new(decode_direction(raw[LEFT_DIR]), raw[LEFT_MAG]);
    let right = MotorCommand::new(decode_direction(raw[RIGHT_DIR]), raw[RIGHT_MAG]);

    Some(MotorCommands::from_sides(left, right))
}
