//! palm-guard - drops trackpad clicks caused by palms resting on the pad
//! while typing.
//!
//! The filter sits between a low-level input driver and the OS. Every
//! keystroke opens a short suppression window; trackpad button events that
//! land inside it never reach the OS. Pointer motion is never intercepted.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐  event   ┌──────────┐  roles   ┌──────────┐  pass   ┌──────────┐
//! │  Driver  │─────────▶│ Resolver │─────────▶│   Gate   │────────▶│  Driver  │
//! │ (receive)│          │ (learn)  │          │ (decide) │         │  (send)  │
//! └──────────┘          └──────────┘          └──────────┘         └──────────┘
//!                             │ narrowed subscription
//!                             ▼
//!                       driver.subscribe()
//! ```
//!
//! # Example
//!
//! ```no_run
//! use palm_guard::{create_shared_stats, DeviceResolver, EventGate, PalmFilter, ReplayDriver};
//! use std::io::{self, BufReader};
//!
//! let trace = std::fs::File::open("session.jsonl").unwrap();
//! let mut driver = ReplayDriver::from_reader(BufReader::new(trace), io::stdout()).unwrap();
//!
//! let mut filter = PalmFilter::new(
//!     DeviceResolver::discovering(),
//!     EventGate::default(),
//!     create_shared_stats(),
//! );
//! filter.run(&mut driver);
//! ```

pub mod config;
pub mod core;
pub mod driver;
pub mod host;
pub mod stats;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError, DeviceDescriptors};
pub use crate::core::{Decision, DeviceResolver, EventGate, ResolveError, Role, Roles};
pub use driver::{
    DeviceDirectory, DeviceId, DriverError, InputDriver, InputEvent, ReplayDriver, Stroke,
    Subscription,
};
pub use host::{PalmFilter, Shutdown};
pub use stats::{create_shared_stats, FilterStats, SharedFilterStats};

#[cfg(all(target_os = "windows", feature = "interception"))]
pub use driver::InterceptionDriver;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
