//! Collectors for the Linux power-supply sysfs class.

pub mod battery;
pub mod parser;

pub use battery::{BatteryCollector, DiscoverError};
pub use parser::ParseError;
