//! Windows implementation of the driver layer on top of the Interception
//! kernel driver.
//!
//! Interception delivers keyboard and mouse strokes per device, lets us drop
//! them by simply not sending them back, and reports each device's hardware
//! id. Requires the driver to be installed and `interception.dll` on the
//! library path.

use crate::driver::types::{
    DeviceId, DeviceSelector, InputEvent, KeyStroke, MouseStroke, Stroke, Subscription,
};
use crate::driver::{DeviceDirectory, DriverError, InputDriver};
use std::os::raw::{c_int, c_uint, c_void};
use std::time::Instant;
use tracing::{info, warn};
use windows::Win32::System::Threading::{GetCurrentProcess, SetPriorityClass, HIGH_PRIORITY_CLASS};

/// Keyboards are 1..=10, mice 11..=20.
const MAX_KEYBOARD: u16 = 10;
const MAX_MOUSE: u16 = 10;
const MAX_DEVICE: u16 = MAX_KEYBOARD + MAX_MOUSE;

/// Hardware id buffer size, in UTF-16 code units.
const MAX_HARDWARE_ID: usize = 500;

mod ffi {
    use std::os::raw::{c_int, c_uint, c_ushort, c_void};

    pub type Context = *mut c_void;
    pub type Predicate = extern "C" fn(device: c_int) -> c_int;

    #[repr(C)]
    #[derive(Clone, Copy, Default)]
    pub struct RawKeyStroke {
        pub code: c_ushort,
        pub state: c_ushort,
        pub information: c_uint,
    }

    #[repr(C)]
    #[derive(Clone, Copy, Default)]
    pub struct RawMouseStroke {
        pub state: c_ushort,
        pub flags: c_ushort,
        pub rolling: i16,
        pub x: c_int,
        pub y: c_int,
        pub information: c_uint,
    }

    /// `InterceptionStroke` is sized for the larger mouse record.
    #[repr(C)]
    #[derive(Clone, Copy)]
    pub union RawStroke {
        pub key: RawKeyStroke,
        pub mouse: RawMouseStroke,
    }

    #[link(name = "interception")]
    extern "C" {
        pub fn interception_create_context() -> Context;
        pub fn interception_destroy_context(context: Context);
        pub fn interception_set_filter(context: Context, predicate: Predicate, filter: c_ushort);
        pub fn interception_wait(context: Context) -> c_int;
        pub fn interception_send(
            context: Context,
            device: c_int,
            stroke: *const RawStroke,
            nstroke: c_uint,
        ) -> c_int;
        pub fn interception_receive(
            context: Context,
            device: c_int,
            stroke: *mut RawStroke,
            nstroke: c_uint,
        ) -> c_int;
        pub fn interception_get_hardware_id(
            context: Context,
            device: c_int,
            hardware_id_buffer: *mut c_void,
            buffer_size: c_uint,
        ) -> c_uint;
        pub fn interception_is_keyboard(device: c_int) -> c_int;
        pub fn interception_is_mouse(device: c_int) -> c_int;
    }
}

/// Predicate selecting exactly one device, fixed at compile time.
extern "C" fn is_device<const ID: c_int>(device: c_int) -> c_int {
    (device == ID) as c_int
}

extern "C" fn is_keyboard_class(device: c_int) -> c_int {
    unsafe { ffi::interception_is_keyboard(device) }
}

extern "C" fn is_mouse_class(device: c_int) -> c_int {
    unsafe { ffi::interception_is_mouse(device) }
}

/// One predicate per device id, index `id - 1`.
const DEVICE_PREDICATES: [ffi::Predicate; MAX_DEVICE as usize] = [
    is_device::<1>,
    is_device::<2>,
    is_device::<3>,
    is_device::<4>,
    is_device::<5>,
    is_device::<6>,
    is_device::<7>,
    is_device::<8>,
    is_device::<9>,
    is_device::<10>,
    is_device::<11>,
    is_device::<12>,
    is_device::<13>,
    is_device::<14>,
    is_device::<15>,
    is_device::<16>,
    is_device::<17>,
    is_device::<18>,
    is_device::<19>,
    is_device::<20>,
];

fn predicate_for(selector: DeviceSelector, class: ffi::Predicate) -> Option<ffi::Predicate> {
    match selector {
        DeviceSelector::AnyOfClass => Some(class),
        DeviceSelector::Only(DeviceId(id)) if (1..=MAX_DEVICE).contains(&id) => {
            Some(DEVICE_PREDICATES[id as usize - 1])
        }
        DeviceSelector::Only(_) => None,
    }
}

/// Live driver backed by an Interception context.
pub struct InterceptionDriver {
    context: ffi::Context,
}

impl InterceptionDriver {
    /// Open a driver context and raise the process priority, since we sit in
    /// the path of every click.
    pub fn new() -> Result<Self, DriverError> {
        let context = unsafe { ffi::interception_create_context() };
        if context.is_null() {
            return Err(DriverError::Unavailable);
        }

        if let Err(e) = unsafe { SetPriorityClass(GetCurrentProcess(), HIGH_PRIORITY_CLASS) } {
            warn!("Could not raise process priority: {e}");
        }

        Ok(Self { context })
    }

    fn install(context: ffi::Context, subscription: &Subscription) {
        if let Some(predicate) = predicate_for(subscription.keyboards, is_keyboard_class) {
            unsafe { ffi::interception_set_filter(context, predicate, subscription.key_filter) };
        }
        if let Some(predicate) = predicate_for(subscription.pointers, is_mouse_class) {
            unsafe {
                ffi::interception_set_filter(context, predicate, subscription.pointer_filter)
            };
        }
    }
}

impl Drop for InterceptionDriver {
    fn drop(&mut self) {
        unsafe { ffi::interception_destroy_context(self.context) };
    }
}

impl DeviceDirectory for InterceptionDriver {
    fn device_ids(&self) -> Vec<DeviceId> {
        (1..=MAX_DEVICE).map(DeviceId).collect()
    }

    fn hardware_id(&self, device: DeviceId) -> Option<String> {
        let mut buffer = [0u16; MAX_HARDWARE_ID];
        let written = unsafe {
            ffi::interception_get_hardware_id(
                self.context,
                c_int::from(device.0),
                buffer.as_mut_ptr() as *mut c_void,
                std::mem::size_of_val(&buffer) as c_uint,
            )
        };

        // Bytes written; 0 or a truncated buffer means no usable descriptor
        let units = written as usize / 2;
        if units == 0 || units > MAX_HARDWARE_ID {
            return None;
        }

        // The buffer holds a multi-string; the first entry names the device
        let first = buffer[..units].split(|&u| u == 0).next().unwrap_or(&[]);
        let id = String::from_utf16_lossy(first);
        (!id.is_empty()).then_some(id)
    }

    fn is_keyboard(&self, device: DeviceId) -> bool {
        unsafe { ffi::interception_is_keyboard(c_int::from(device.0)) != 0 }
    }

    fn is_pointer(&self, device: DeviceId) -> bool {
        unsafe { ffi::interception_is_mouse(c_int::from(device.0)) != 0 }
    }
}

impl InputDriver for InterceptionDriver {
    /// Filters can only be added to a context, never removed from it, so a
    /// new subscription gets a fresh context.
    fn subscribe(&mut self, subscription: &Subscription) -> Result<(), DriverError> {
        let context = unsafe { ffi::interception_create_context() };
        if context.is_null() {
            return Err(DriverError::Unavailable);
        }

        Self::install(context, subscription);

        let previous = std::mem::replace(&mut self.context, context);
        unsafe { ffi::interception_destroy_context(previous) };
        info!(?subscription, "Installed driver filter");
        Ok(())
    }

    fn receive(&mut self) -> Result<Option<InputEvent>, DriverError> {
        let device = unsafe { ffi::interception_wait(self.context) };
        let mut raw = ffi::RawStroke {
            mouse: ffi::RawMouseStroke::default(),
        };

        if unsafe { ffi::interception_receive(self.context, device, &mut raw, 1) } <= 0 {
            return Err(DriverError::Receive);
        }
        let timestamp = Instant::now();

        let stroke = if unsafe { ffi::interception_is_keyboard(device) } != 0 {
            let k = unsafe { raw.key };
            Stroke::Key(KeyStroke {
                code: k.code,
                state: k.state,
                information: k.information,
            })
        } else {
            let m = unsafe { raw.mouse };
            Stroke::Mouse(MouseStroke {
                state: m.state,
                flags: m.flags,
                rolling: m.rolling,
                x: m.x,
                y: m.y,
                information: m.information,
            })
        };

        let device = u16::try_from(device).map_err(|_| DriverError::Receive)?;
        Ok(Some(InputEvent {
            device: DeviceId(device),
            stroke,
            timestamp,
        }))
    }

    fn send(&mut self, event: &InputEvent) -> Result<(), DriverError> {
        let mut raw = ffi::RawStroke {
            mouse: ffi::RawMouseStroke::default(),
        };
        match event.stroke {
            Stroke::Key(k) => {
                raw.key = ffi::RawKeyStroke {
                    code: k.code,
                    state: k.state,
                    information: k.information,
                };
            }
            Stroke::Mouse(m) => {
                raw.mouse = ffi::RawMouseStroke {
                    state: m.state,
                    flags: m.flags,
                    rolling: m.rolling,
                    x: m.x,
                    y: m.y,
                    information: m.information,
                };
            }
        }

        let sent =
            unsafe { ffi::interception_send(self.context, c_int::from(event.device.0), &raw, 1) };
        if sent <= 0 {
            return Err(DriverError::Send(event.device));
        }
        Ok(())
    }
}
