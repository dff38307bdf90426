// Keyboard sticks: W/S left, I/K right, Space stop, R/F speed, Q quit
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use super::{AxisSource, Result};
use crate::messages::AxisPair;

const SPEEDS: [f32; 3] = [0.3, 0.6, 1.0];
const SPEED_LABELS: [&str; 3] = ["LOW", "MED", "HIGH"];
const INPUT_TIMEOUT: Duration = Duration::from_millis(100); // Stick springs back after this much time with no key

/// Key-driven stick state, independent of the terminal
#[derive(Debug)]
struct Sticks {
    speed_idx: usize,
    left: f32,
    right: f32,
    left_at: Instant,
    right_at: Instant,
    quit: bool,
}

impl Sticks {
    fn new(now: Instant) -> Self {
        Self {
            speed_idx: 0,
            left: 0.0,
            right: 0.0,
            left_at: now,
            right_at: now,
            quit: false,
        }
    }

    fn on_key(&mut self, code: KeyCode, modifiers: KeyModifiers, now: Instant) {
        let speed = SPEEDS[self.speed_idx];
        match code {
            KeyCode::Char('w') => {
                self.left = speed;
                self.left_at = now;
            }
            KeyCode::Char('s') => {
                self.left = -speed;
                self.left_at = now;
            }
            KeyCode::Char('i') => {
                self.right = speed;
                self.right_at = now;
            }
            KeyCode::Char('k') => {
                self.right = -speed;
                self.right_at = now;
            }
            KeyCode::Char(' ') => {
                self.left = 0.0;
                self.right = 0.0;
            }
            KeyCode::Char('r') => {
                self.speed_idx = (self.speed_idx + 1).min(SPEEDS.len() - 1);
                info!("Speed: {}", SPEED_LABELS[self.speed_idx]);
            }
            KeyCode::Char('f') => {
                self.speed_idx = self.speed_idx.saturating_sub(1);
                info!("Speed: {}", SPEED_LABELS[self.speed_idx]);
            }
            // Raw mode swallows SIGINT, so Ctrl-C arrives as a key
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => self.quit = true,
            KeyCode::Char('q') | KeyCode::Esc => self.quit = true,
            _ => {}
        }
    }

    fn axes(&mut self, now: Instant) -> AxisPair {
        if now.duration_since(self.left_at) > INPUT_TIMEOUT {
            self.left = 0.0;
        }
        if now.duration_since(self.right_at) > INPUT_TIMEOUT {
            self.right = 0.0;
        }
        AxisPair::new(self.left, self.right)
    }
}

/// Terminal keyboard emulating two vertical sticks.
///
/// Holds the terminal in raw mode while alive.
pub struct KeyboardAxes {
    sticks: Sticks,
}

impl KeyboardAxes {
    pub fn open() -> Result<Self> {
        enable_raw_mode()?;
        info!("Controls: W/S=left stick, I/K=right stick, Space=stop, R/F=speed, Q=quit");
        info!("Speed: {}", SPEED_LABELS[0]);
        Ok(Self {
            sticks: Sticks::new(Instant::now()),
        })
    }
}

impl AxisSource for KeyboardAxes {
    fn sample(&mut self) -> Result<Option<AxisPair>> {
        // Drain everything queued since the last tick without blocking
        while event::poll(Duration::ZERO)? {
            if let Event::Key(KeyEvent {
                code,
                modifiers,
                kind,
                ..
            }) = event::read()?
                && (kind == KeyEventKind::Press || kind == KeyEventKind::Repeat)
            {
                self.sticks.on_key(code, modifiers, Instant::now());
            }
        }

        if self.sticks.quit {
            return Ok(None);
        }
        Ok(Some(self.sticks.axes(Instant::now())))
    }
}

impl Drop for KeyboardAxes {
    fn drop(&mut self) {
        if let Err(e) = disable_raw_mode() {
            warn!("Failed to restore terminal: {}", e);
        }
    }
}
