// Message types shared by the client, the server and the sinks

use std::fmt;

use serde::{Deserialize, Serialize};

/// One tick worth of stick readings, each in [-1.0, 1.0]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AxisPair {
    pub left: f32,
    pub right: f32,
}

impl AxisPair {
    pub fn new(left: f32, right: f32) -> Self {
        Self { left, right }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

impl Direction {
    /// Single-letter tag used in the debug rendering
    pub fn letter(self) -> char {
        match self {
            Direction::Forward => 'f',
            Direction::Reverse => 'r',
        }
    }
}

/// Direction + 8-bit PWM for one motor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MotorCommand {
    pub direction: Direction,
    pub pwm: u8,
}

impl MotorCommand {
    pub fn new(direction: Direction, pwm: u8) -> Self {
        Self { direction, pwm }
    }

    pub fn stop() -> Self {
        Self::default()
    }
}

// f200, r15, ...
impl fmt::Display for MotorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.direction.letter(), self.pwm)
    }
}

/// Commands for all four motors, always in the order
/// left-front, left-rear, right-front, right-rear.
///
/// Only constructible from one command per side, so both motors on a side
/// always receive the same command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MotorCommands([MotorCommand; 4]);

impl MotorCommands {
    pub fn from_sides(left: MotorCommand, right: MotorCommand) -> Self {
        Self([left, left, right, right])
    }

    /// All four motors forward at zero PWM
    pub fn stop() -> Self {
        Self::from_sides(MotorCommand::stop(), MotorCommand::stop())
    }

    pub fn left(&self) -> MotorCommand {
        self.0[0]
    }

    pub fn right(&self) -> MotorCommand {
        self.0[2]
    }

    pub fn as_array(&self) -> &[MotorCommand; 4] {
        &self.0
    }
}

// [f200][f200][r100][r100]
impl fmt::Display for MotorCommands {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for cmd in &self.0 {
            write!(f, "[{}]", cmd)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_rendering() {
        assert_eq!(MotorCommand::new(Direction::Forward, 200).to_string(), "f200");
        assert_eq!(MotorCommand::new(Direction::Reverse, 0).to_string(), "r0");
    }

    #[test]
    fn test_commands_rendering_order() {
        let cmds = MotorCommands::from_sides(
            MotorCommand::new(Direction::Reverse, 200),
            MotorCommand::new(Direction::Forward, 100),
        );
        assert_eq!(cmds.to_string(), "[r200][r200][f100][f100]");
    }

    #[test]
    fn test_stop_is_all_forward_zero() {
        assert_eq!(MotorCommands::stop().to_string(), "[f0][f0][f0][f0]");
    }

    #[test]
    fn test_commands_serialize_as_array() {
        let cmds = MotorCommands::from_sides(
            MotorCommand::new(Direction::Reverse, 7),
            MotorCommand::stop(),
        );
        let json = serde_json::to_string(&cmds).unwrap();
        assert_eq!(
            json,
            r#"[{"direction":"reverse","pwm":7},{"direction":"reverse","pwm":7},{"direction":"forward","pwm":0},{"direction":"forward","pwm":0}]"#
        );
    }
}
