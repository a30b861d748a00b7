//! Event and device types shared by every driver backend.
//!
//! Strokes mirror the raw records the Interception driver exchanges, field for
//! field, so that comparing two strokes is the same as comparing their bytes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// Handle the driver assigns to an attached device for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub u16);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Device class as tagged by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Keyboard,
    Pointer,
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceClass::Keyboard => write!(f, "keyboard"),
            DeviceClass::Pointer => write!(f, "pointer"),
        }
    }
}

/// Key stroke states.
pub mod key_state {
    pub const DOWN: u16 = 0x00;
    pub const UP: u16 = 0x01;
    pub const E0: u16 = 0x02;
    pub const E1: u16 = 0x04;
}

/// Mouse stroke states. A stroke with no state bit set is pure motion.
pub mod mouse_state {
    pub const LEFT_BUTTON_DOWN: u16 = 0x001;
    pub const LEFT_BUTTON_UP: u16 = 0x002;
    pub const RIGHT_BUTTON_DOWN: u16 = 0x004;
    pub const RIGHT_BUTTON_UP: u16 = 0x008;
    pub const MIDDLE_BUTTON_DOWN: u16 = 0x010;
    pub const MIDDLE_BUTTON_UP: u16 = 0x020;
    pub const WHEEL: u16 = 0x400;
    pub const HWHEEL: u16 = 0x800;
}

/// Driver filter masks.
pub mod filter {
    pub const KEY_ALL: u16 = 0xFFFF;
    pub const MOUSE_ALL: u16 = 0xFFFF;
    pub const MOUSE_MOVE: u16 = 0x1000;
    /// Every pointer event except relative motion.
    pub const MOUSE_BUTTONS: u16 = MOUSE_ALL & !MOUSE_MOVE;
}

/// Raw key stroke.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyStroke {
    /// Scan code
    pub code: u16,
    /// Combination of `key_state` bits
    pub state: u16,
    /// Driver-specific extra information
    pub information: u32,
}

/// Raw mouse stroke.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MouseStroke {
    /// Combination of `mouse_state` bits
    pub state: u16,
    pub flags: u16,
    /// Wheel delta for wheel states
    pub rolling: i16,
    pub x: i32,
    pub y: i32,
    pub information: u32,
}

impl MouseStroke {
    /// A button press/release with no movement.
    pub fn button(state: u16) -> Self {
        Self {
            state,
            ..Self::default()
        }
    }

    /// Relative motion carries no state bits.
    pub fn is_motion(&self) -> bool {
        self.state == 0
    }
}

/// The full payload of one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stroke {
    Key(KeyStroke),
    Mouse(MouseStroke),
}

impl Stroke {
    pub fn key(code: u16, state: u16) -> Self {
        Stroke::Key(KeyStroke {
            code,
            state,
            information: 0,
        })
    }

    pub fn mouse_button(state: u16) -> Self {
        Stroke::Mouse(MouseStroke::button(state))
    }
}

/// One event received from the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    /// Source device
    pub device: DeviceId,
    /// Raw payload, forwarded unmodified
    pub stroke: Stroke,
    /// Monotonic clock reading taken once when the event was received
    pub timestamp: Instant,
}

/// Which devices of one class a subscription selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceSelector {
    /// Every device of the class
    AnyOfClass,
    /// Exactly one device
    Only(DeviceId),
}

impl DeviceSelector {
    pub fn selects(&self, device: DeviceId) -> bool {
        match self {
            DeviceSelector::AnyOfClass => true,
            DeviceSelector::Only(id) => *id == device,
        }
    }
}

/// What the driver should deliver to the filter.
///
/// Events outside the subscription never reach the filter and flow to the
/// OS untouched. Pointer motion is never subscribed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription {
    pub keyboards: DeviceSelector,
    pub pointers: DeviceSelector,
    pub key_filter: u16,
    pub pointer_filter: u16,
}

impl Subscription {
    /// All keyboards and all pointing devices.
    pub fn broad() -> Self {
        Self {
            keyboards: DeviceSelector::AnyOfClass,
            pointers: DeviceSelector::AnyOfClass,
            key_filter: filter::KEY_ALL,
            pointer_filter: filter::MOUSE_BUTTONS,
        }
    }

    /// Exactly the resolved keyboard and trackpad.
    pub fn narrowed(keyboard: DeviceId, trackpad: DeviceId) -> Self {
        Self {
            keyboards: DeviceSelector::Only(keyboard),
            pointers: DeviceSelector::Only(trackpad),
            ..Self::broad()
        }
    }

    /// Whether an event of the given class would be delivered.
    pub fn admits(&self, class: DeviceClass, device: DeviceId, stroke: &Stroke) -> bool {
        match (class, stroke) {
            (DeviceClass::Keyboard, Stroke::Key(_)) => {
                self.key_filter != 0 && self.keyboards.selects(device)
            }
            (DeviceClass::Pointer, Stroke::Mouse(m)) => {
                let motion_ok = !m.is_motion() || self.pointer_filter & filter::MOUSE_MOVE != 0;
                motion_ok && self.pointers.selects(device)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stroke_equality_covers_whole_payload() {
        let a = Stroke::key(30, key_state::DOWN);
        let mut b = a;
        assert_eq!(a, b);

        if let Stroke::Key(ref mut k) = b {
            k.information = 7;
        }
        assert_ne!(a, b);
        assert_ne!(a, Stroke::key(30, key_state::UP));
    }

    #[test]
    fn test_pointer_filter_excludes_motion() {
        assert_eq!(Subscription::broad().pointer_filter & filter::MOUSE_MOVE, 0);
        let narrowed = Subscription::narrowed(DeviceId(1), DeviceId(11));
        assert_eq!(narrowed.pointer_filter & filter::MOUSE_MOVE, 0);
        assert_eq!(narrowed.key_filter, filter::KEY_ALL);
    }

    #[test]
    fn test_subscription_admits() {
        let sub = Subscription::narrowed(DeviceId(1), DeviceId(11));
        let click = Stroke::mouse_button(mouse_state::LEFT_BUTTON_DOWN);
        let motion = Stroke::Mouse(MouseStroke {
            x: 4,
            y: -2,
            ..MouseStroke::default()
        });

        assert!(sub.admits(DeviceClass::Keyboard, DeviceId(1), &Stroke::key(30, 0)));
        assert!(!sub.admits(DeviceClass::Keyboard, DeviceId(2), &Stroke::key(30, 0)));
        assert!(sub.admits(DeviceClass::Pointer, DeviceId(11), &click));
        assert!(!sub.admits(DeviceClass::Pointer, DeviceId(12), &click));
        assert!(!sub.admits(DeviceClass::Pointer, DeviceId(11), &motion));

        let broad = Subscription::broad();
        assert!(broad.admits(DeviceClass::Pointer, DeviceId(15), &click));
        assert!(!broad.admits(DeviceClass::Pointer, DeviceId(15), &motion));
    }

    #[test]
    fn test_stroke_trace_format() {
        let stroke: Stroke = serde_json::from_str(r#"{"key":{"code":30}}"#).unwrap();
        assert_eq!(stroke, Stroke::key(30, key_state::DOWN));

        let stroke: Stroke = serde_json::from_str(r#"{"mouse":{"state":1}}"#).unwrap();
        assert_eq!(stroke, Stroke::mouse_button(mouse_state::LEFT_BUTTON_DOWN));
    }
}
