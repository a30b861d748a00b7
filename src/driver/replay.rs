//! Trace replay driver.
//!
//! Reads a JSON Lines trace of device declarations and timestamped events and
//! plays it back as if it came from the live driver. Subscriptions are honoured
//! the same way: events the filter did not subscribe to (other devices,
//! pointer motion) bypass it and go straight to the output, like they would
//! reach the OS untouched. Everything that reaches the OS is written to the
//! sink as a trace in the same format.
//!
//! ```text
//! {"type":"device","id":1,"class":"keyboard","hardware_id":"ACPI\\VEN_ATML&DEV_1000"}
//! {"type":"device","id":11,"class":"pointer","hardware_id":"HID\\VID_04F3&PID_3125"}
//! {"type":"event","device":1,"at_ms":0,"stroke":{"key":{"code":30,"state":0}}}
//! {"type":"event","device":11,"at_ms":100,"stroke":{"mouse":{"state":1}}}
//! ```

use crate::driver::types::{DeviceClass, DeviceId, InputEvent, Stroke, Subscription};
use crate::driver::{DeviceDirectory, DriverError, InputDriver};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::io::{BufRead, Write};
use std::time::{Duration, Instant};
use tracing::debug;

/// One line of a trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TraceRecord {
    /// An attached device
    Device {
        id: DeviceId,
        class: DeviceClass,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hardware_id: Option<String>,
    },
    /// An event, `at_ms` milliseconds after the start of the trace
    Event {
        device: DeviceId,
        at_ms: u64,
        stroke: Stroke,
    },
}

#[derive(Debug, Clone)]
struct TraceDevice {
    class: DeviceClass,
    hardware_id: Option<String>,
}

/// An event waiting to be played back, with the trace line it came from.
#[derive(Debug, Clone)]
struct PendingEvent {
    line: usize,
    device: DeviceId,
    at_ms: u64,
    stroke: Stroke,
}

/// Driver that replays a recorded trace into a sink.
pub struct ReplayDriver<W: Write> {
    devices: BTreeMap<DeviceId, TraceDevice>,
    pending: VecDeque<PendingEvent>,
    origin: Instant,
    subscription: Option<Subscription>,
    subscriptions_applied: usize,
    sink: W,
}

impl<W: Write> ReplayDriver<W> {
    /// Load a whole trace. Blank lines and lines starting with `#` are skipped.
    pub fn from_reader<R: BufRead>(reader: R, sink: W) -> Result<Self, DriverError> {
        let mut devices = BTreeMap::new();
        let mut pending = VecDeque::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| DriverError::Io(e.to_string()))?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let record: TraceRecord =
                serde_json::from_str(line).map_err(|e| DriverError::Trace {
                    line: index + 1,
                    message: e.to_string(),
                })?;

            match record {
                TraceRecord::Device {
                    id,
                    class,
                    hardware_id,
                } => {
                    devices.insert(id, TraceDevice { class, hardware_id });
                }
                TraceRecord::Event {
                    device,
                    at_ms,
                    stroke,
                } => pending.push_back(PendingEvent {
                    line: index + 1,
                    device,
                    at_ms,
                    stroke,
                }),
            }
        }

        Ok(Self {
            devices,
            pending,
            origin: Instant::now(),
            subscription: None,
            subscriptions_applied: 0,
            sink,
        })
    }

    /// Currently installed subscription, if any.
    pub fn subscription(&self) -> Option<&Subscription> {
        self.subscription.as_ref()
    }

    /// How many times a subscription was installed.
    pub fn subscriptions_applied(&self) -> usize {
        self.subscriptions_applied
    }

    /// Number of events not yet delivered.
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    /// Consume the driver and hand back the sink.
    pub fn into_sink(self) -> W {
        self.sink
    }

    fn admitted(&self, device: DeviceId, stroke: &Stroke) -> bool {
        let (Some(subscription), Some(info)) = (&self.subscription, self.devices.get(&device))
        else {
            return false;
        };
        subscription.admits(info.class, device, stroke)
    }

    fn write(&mut self, device: DeviceId, at_ms: u64, stroke: Stroke) -> Result<(), DriverError> {
        let record = TraceRecord::Event {
            device,
            at_ms,
            stroke,
        };
        serde_json::to_writer(&mut self.sink, &record)
            .map_err(|e| DriverError::Io(e.to_string()))?;
        writeln!(self.sink).map_err(|e| DriverError::Io(e.to_string()))
    }
}

impl<W: Write> DeviceDirectory for ReplayDriver<W> {
    fn device_ids(&self) -> Vec<DeviceId> {
        self.devices.keys().copied().collect()
    }

    fn hardware_id(&self, device: DeviceId) -> Option<String> {
        self.devices
            .get(&device)
            .and_then(|d| d.hardware_id.clone())
            .filter(|id| !id.is_empty())
    }

    fn is_keyboard(&self, device: DeviceId) -> bool {
        matches!(
            self.devices.get(&device),
            Some(TraceDevice {
                class: DeviceClass::Keyboard,
                ..
            })
        )
    }

    fn is_pointer(&self, device: DeviceId) -> bool {
        matches!(
            self.devices.get(&device),
            Some(TraceDevice {
                class: DeviceClass::Pointer,
                ..
            })
        )
    }
}

impl<W: Write> InputDriver for ReplayDriver<W> {
    fn subscribe(&mut self, subscription: &Subscription) -> Result<(), DriverError> {
        self.subscription = Some(*subscription);
        self.subscriptions_applied += 1;
        Ok(())
    }

    fn receive(&mut self) -> Result<Option<InputEvent>, DriverError> {
        while let Some(PendingEvent {
            line,
            device,
            at_ms,
            stroke,
        }) = self.pending.pop_front()
        {
            if self.admitted(device, &stroke) {
                let timestamp = self
                    .origin
                    .checked_add(Duration::from_millis(at_ms))
                    .ok_or_else(|| DriverError::Trace {
                        line,
                        message: format!("at_ms {at_ms} is out of the clock's range"),
                    })?;
                return Ok(Some(InputEvent {
                    device,
                    stroke,
                    timestamp,
                }));
            }

            debug!(%device, at_ms, "event bypasses the filter");
            self.write(device, at_ms, stroke)?;
        }

        self.sink
            .flush()
            .map_err(|e| DriverError::Io(e.to_string()))?;
        Ok(None)
    }

    fn send(&mut self, event: &InputEvent) -> Result<(), DriverError> {
        let at_ms = event.timestamp.saturating_duration_since(self.origin).as_millis() as u64;
        self.write(event.device, at_ms, event.stroke)
    }
}
