//! The pass/drop decision for each event.
//!
//! Every new keystroke opens a suppression window; trackpad events that land
//! inside it are dropped. A keystroke identical to the previous one is taken
//! as auto-repeat and does not extend the window, so a held key cannot keep
//! the trackpad blocked.

use crate::core::resolver::{Role, Roles};
use crate::driver::{InputEvent, Stroke};
use std::time::{Duration, Instant};

/// Default suppression window after a keystroke.
pub const DEFAULT_SUPPRESSION_WINDOW: Duration = Duration::from_millis(300);

/// Longest window the gate accepts, the same ceiling the command line has.
pub const MAX_SUPPRESSION_WINDOW: Duration = Duration::from_millis(u32::MAX as u64);

/// What the gate made of one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// New keystroke, window (re)armed
    Keystroke,
    /// Same payload as the previous keystroke, window left alone
    Repeat,
    /// Trackpad event outside the window
    TrackpadPassed,
    /// Trackpad event inside the window
    TrackpadSuppressed,
    /// Event from a device holding no role
    Unrelated,
}

impl Decision {
    /// Whether the event goes on to the OS.
    pub fn forwards(&self) -> bool {
        !matches!(self, Decision::TrackpadSuppressed)
    }
}

/// Suppression state for one keyboard/trackpad pair.
#[derive(Debug, Clone)]
pub struct EventGate {
    window: Duration,
    suppress_until: Option<Instant>,
    last_key: Option<Stroke>,
}

impl EventGate {
    /// Windows longer than [`MAX_SUPPRESSION_WINDOW`] are clamped to it.
    pub fn new(window: Duration) -> Self {
        Self {
            window: window.min(MAX_SUPPRESSION_WINDOW),
            suppress_until: None,
            last_key: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// End of the current suppression window, `None` before any keystroke.
    pub fn suppress_until(&self) -> Option<Instant> {
        self.suppress_until
    }

    /// Decide one event and update the window.
    pub fn decide(&mut self, roles: &Roles, event: &InputEvent) -> Decision {
        match roles.role_of(event.device) {
            None => Decision::Unrelated,
            Some(Role::Keyboard) => {
                // Raw payload comparison; a genuinely repeated keystroke with
                // identical bytes is indistinguishable from auto-repeat.
                if self.last_key == Some(event.stroke) {
                    return Decision::Repeat;
                }
                // Past the clock's range the previous deadline stays
                if let Some(until) = event.timestamp.checked_add(self.window) {
                    self.suppress_until = Some(until);
                }
                self.last_key = Some(event.stroke);
                Decision::Keystroke
            }
            Some(Role::Trackpad) => match self.suppress_until {
                Some(until) if event.timestamp <= until => Decision::TrackpadSuppressed,
                _ => Decision::TrackpadPassed,
            },
        }
    }
}

impl Default for EventGate {
    fn default() -> Self {
        Self::new(DEFAULT_SUPPRESSION_WINDOW)
    }
}
