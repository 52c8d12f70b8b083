//! Sensor collection infrastructure.
//!
//! This module provides the filesystem abstraction and the battery
//! collector that reads power-supply attributes from sysfs, with an
//! in-memory mock for testing away from laptop hardware.
//!
//! # Usage
//!
//! ## Production (on the laptop)
//!
//! ```ignore
//! use pwrlog::collector::{BatteryCollector, RealFs};
//!
//! let fs = RealFs::new();
//! let battery = BatteryCollector::discover(fs, "/sys/class/power_supply")?;
//! let snapshot = battery.snapshot();
//! ```
//!
//! ## Testing (with MockFs)
//!
//! ```
//! use pwrlog::collector::{BatteryCollector, MockFs};
//!
//! let fs = MockFs::xo15_discharging();
//! let battery = BatteryCollector::new(fs, "/sys/class/power_supply/olpc-battery");
//! assert!(battery.snapshot().status.is_some());
//! ```

pub mod mock;
pub mod sysfs;
pub mod traits;

pub use mock::MockFs;
pub use sysfs::{BatteryCollector, DiscoverError, ParseError};
pub use traits::{FileSystem, RealFs};
