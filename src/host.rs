//! The filter loop.
//!
//! One event at a time: receive, let the resolver learn from it, let the gate
//! decide, re-inject unless dropped. Nothing here blocks except the driver's
//! receive, and events leave in the order they arrived.

use crate::core::{Decision, DeviceResolver, EventGate};
use crate::driver::{DeviceDirectory, DriverError, InputDriver, InputEvent, Subscription};
use crate::stats::SharedFilterStats;
use tracing::{debug, info, warn};

/// Outcome of handling a single event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub decision: Decision,
    /// Narrower subscription to install, once both devices are known
    pub narrowing: Option<Subscription>,
}

/// Why the loop stopped.
#[derive(Debug)]
pub enum Shutdown {
    /// The driver reported no more events
    EndOfStream,
    /// Receiving or re-injecting failed; treated as the end of the stream
    Transport(DriverError),
}

/// Resolver and gate driven together over an event stream.
pub struct PalmFilter {
    resolver: DeviceResolver,
    gate: EventGate,
    stats: SharedFilterStats,
}

impl PalmFilter {
    pub fn new(resolver: DeviceResolver, gate: EventGate, stats: SharedFilterStats) -> Self {
        Self {
            resolver,
            gate,
            stats,
        }
    }

    pub fn resolver(&self) -> &DeviceResolver {
        &self.resolver
    }

    pub fn gate(&self) -> &EventGate {
        &self.gate
    }

    /// Learn from an event, then decide it. The resolver always sees the
    /// event first so the gate acts on up-to-date roles.
    pub fn handle<D: DeviceDirectory + ?Sized>(
        &mut self,
        directory: &D,
        event: &InputEvent,
    ) -> Step {
        let narrowing = self.resolver.observe(directory, event.device);
        let decision = self.gate.decide(&self.resolver.roles(), event);
        self.stats.record(decision);
        Step {
            decision,
            narrowing,
        }
    }

    /// Install the initial subscription and filter events until the stream
    /// ends or the transport fails.
    pub fn run<D: InputDriver>(&mut self, driver: &mut D) -> Shutdown {
        if let Err(e) = driver.subscribe(&self.resolver.subscription()) {
            return Shutdown::Transport(e);
        }
        info!(
            window_ms = self.gate.window().as_millis() as u64,
            resolved = self.resolver.is_resolved(),
            "Filtering events"
        );

        loop {
            let event = match driver.receive() {
                Ok(Some(event)) => event,
                Ok(None) => return Shutdown::EndOfStream,
                Err(e) => return Shutdown::Transport(e),
            };

            let step = self.handle(&*driver, &event);

            if let Some(subscription) = step.narrowing {
                info!("Both devices found, narrowing the driver filter");
                // Narrowing only saves work; the gate filters by role anyway
                if let Err(e) = driver.subscribe(&subscription) {
                    warn!("Could not narrow the driver filter: {e}");
                }
            }

            debug!(device = %event.device, stroke = ?event.stroke, decision = ?step.decision);

            if !step.decision.forwards() {
                debug!(device = %event.device, "Ignoring trackpad event");
                continue;
            }

            if let Err(e) = driver.send(&event) {
                return Shutdown::Transport(e);
            }
        }
    }
}
