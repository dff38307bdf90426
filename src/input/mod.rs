// Client-side input: turns an input device into one AxisPair per tick
//
// Devices are opened from an explicit InputDevice value carried in the
// client configuration; nothing here keeps process-wide device state.

mod keyboard;

use tracing::info;

pub use keyboard::KeyboardAxes;

use crate::config::InputDevice;
use crate::messages::AxisPair;

/// Error types for input devices
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Terminal IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, InputError>;

/// Source of two stick readings per tick
pub trait AxisSource {
    /// Latest readings, or `None` once the operator asked to stop.
    fn sample(&mut self) -> Result<Option<AxisPair>>;
}

/// Clamp to [-1, 1] and round to one decimal to suppress stick drift.
/// NaN reads as centered.
pub fn normalize_axis(raw: f32) -> f32 {
    if raw.is_nan() {
        return 0.0;
    }
    let rounded = (raw.clamp(-1.0, 1.0) * 10.0).round() / 10.0;
    // -0.0 -> 0.0 so a centered stick never reads as reverse
    if rounded == 0.0 { 0.0 } else { rounded }
}

pub fn normalize(axes: AxisPair) -> AxisPair {
    AxisPair::new(normalize_axis(axes.left), normalize_axis(axes.right))
}

/// Same readings every tick
#[derive(Debug, Clone, Copy)]
pub struct FixedAxes {
    axes: AxisPair,
}

impl FixedAxes {
    pub fn new(axes: AxisPair) -> Self {
        Self { axes }
    }
}

impl AxisSource for FixedAxes {
    fn sample(&mut self) -> Result<Option<AxisPair>> {
        Ok(Some(self.axes))
    }
}

/// Open the configured device
pub fn open_input(device: &InputDevice) -> Result<Box<dyn AxisSource>> {
    match device {
        InputDevice::Keyboard => Ok(Box::new(KeyboardAxes::open()?)),
        InputDevice::Fixed(axes) => {
            info!("Using fixed axes: left={}, right={}", axes.left, axes.right);
            Ok(Box::new(FixedAxes::new(*axes)))
        }
    }
}
