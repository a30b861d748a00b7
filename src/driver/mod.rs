//! Driver layer: the collaborator that delivers raw device events and accepts
//! re-injected ones.
//!
//! The filter only talks to [`InputDriver`]. Two backends implement it:
//! - `interception`: live capture through the Interception driver (Windows,
//!   `interception` feature)
//! - `replay`: a recorded JSON Lines trace, for dry runs and tests

pub mod replay;
pub mod types;

#[cfg(all(target_os = "windows", feature = "interception"))]
pub mod interception;

// Re-export commonly used types
pub use replay::{ReplayDriver, TraceRecord};
pub use types::{
    DeviceClass, DeviceId, DeviceSelector, InputEvent, KeyStroke, MouseStroke, Stroke,
    Subscription,
};

#[cfg(all(target_os = "windows", feature = "interception"))]
pub use interception::InterceptionDriver;

/// Read-only view of the attached devices.
pub trait DeviceDirectory {
    /// Every identifier the driver can currently report on.
    fn device_ids(&self) -> Vec<DeviceId>;

    /// Hardware descriptor for a device, `None` when unavailable.
    fn hardware_id(&self, device: DeviceId) -> Option<String>;

    fn is_keyboard(&self, device: DeviceId) -> bool;

    fn is_pointer(&self, device: DeviceId) -> bool;

    /// Class of a device, checking the pointer predicate first like role
    /// discovery does.
    fn class_of(&self, device: DeviceId) -> Option<DeviceClass> {
        if self.is_pointer(device) {
            Some(DeviceClass::Pointer)
        } else if self.is_keyboard(device) {
            Some(DeviceClass::Keyboard)
        } else {
            None
        }
    }
}

/// A source of input events that can re-inject what it delivered.
pub trait InputDriver: DeviceDirectory {
    /// Replace the active subscription.
    fn subscribe(&mut self, subscription: &Subscription) -> Result<(), DriverError>;

    /// Block until the next subscribed event arrives. `None` ends the stream.
    fn receive(&mut self) -> Result<Option<InputEvent>, DriverError>;

    /// Forward an event, unmodified, to the OS input pipeline.
    fn send(&mut self, event: &InputEvent) -> Result<(), DriverError>;
}

/// An attached device as shown by `--list-devices`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub id: DeviceId,
    pub class: Option<DeviceClass>,
    pub hardware_id: Option<String>,
}

/// List every device that reports a class or a descriptor.
pub fn enumerate_devices<D: DeviceDirectory + ?Sized>(directory: &D) -> Vec<DeviceInfo> {
    directory
        .device_ids()
        .into_iter()
        .map(|id| DeviceInfo {
            id,
            class: directory.class_of(id),
            hardware_id: directory.hardware_id(id),
        })
        .filter(|info| info.class.is_some() || info.hardware_id.is_some())
        .collect()
}

/// Errors raised by a driver backend.
#[derive(Debug)]
pub enum DriverError {
    /// The driver context could not be created
    Unavailable,
    /// Receiving the next event failed
    Receive,
    /// Re-injecting an event failed
    Send(DeviceId),
    /// Reading or writing a trace failed
    Io(String),
    /// A trace line could not be parsed
    Trace { line: usize, message: String },
}

impl std::fmt::Display for DriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriverError::Unavailable => {
                write!(f, "Input driver unavailable (is the Interception driver installed?)")
            }
            DriverError::Receive => write!(f, "Failed to receive event from driver"),
            DriverError::Send(device) => write!(f, "Failed to re-inject event from device {device}"),
            DriverError::Io(e) => write!(f, "IO error: {e}"),
            DriverError::Trace { line, message } => write!(f, "Trace line {line}: {message}"),
        }
    }
}

impl std::error::Error for DriverError {}
