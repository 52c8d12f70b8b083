//! Data model for sensor snapshots and per-tick log records.
//!
//! Unknown values are carried as typed `Option`s end to end. The `"NA"`
//! placeholder the log format uses exists only at the formatting edge in
//! [`crate::logfile`], so a missing value can never leak into arithmetic.

/// State of charge as reported by the battery driver.
///
/// Newer kernels expose a percentage; some legacy drivers only expose a
/// qualitative level string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateOfCharge {
    /// Percentage, 0-100.
    Percent(i64),
    /// Qualitative level, e.g. "High" or "Full".
    Level(String),
}

impl std::fmt::Display for StateOfCharge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StateOfCharge::Percent(p) => write!(f, "{}", p),
            StateOfCharge::Level(l) => write!(f, "{}", l),
        }
    }
}

/// One fresh read of every battery attribute.
///
/// Each field is an independent read; any subset may be unavailable on a
/// given hardware revision or during a transient driver glitch.
#[derive(Debug, Clone, Default)]
pub struct SensorSnapshot {
    /// State of charge, percent or qualitative level.
    pub soc: Option<StateOfCharge>,
    /// Battery voltage in microvolts.
    pub voltage_uv: Option<i64>,
    /// Battery current in microamps, negative while discharging.
    pub current_ua: Option<i64>,
    /// Battery temperature in tenths of a degree Celsius.
    pub temp_decic: Option<i64>,
    /// Charge/discharge status, free text, may be multi-word.
    pub status: Option<String>,
    /// Raw charge counter, uncorrected.
    pub charge_counter: Option<i64>,
}

/// Battery manufacturing metadata, recorded once in the log header.
#[derive(Debug, Clone, Default)]
pub struct BatteryMetadata {
    pub manufacturer: Option<String>,
    pub technology: Option<String>,
    pub serial_number: Option<String>,
}

/// One complete log record, derived from a [`SensorSnapshot`], the
/// accumulator state, and one EC channel query. Immutable once built.
#[derive(Debug, Clone)]
pub struct Reading {
    /// Tick time, seconds since the epoch.
    pub timestamp: i64,
    pub soc: Option<StateOfCharge>,
    pub voltage_uv: Option<i64>,
    pub current_ua: Option<i64>,
    pub temp_decic: Option<i64>,
    pub status: Option<String>,
    /// Charge counter after sign correction.
    pub charge_counter: Option<i64>,
    /// Net milliamp-hours since session start. `None` until the
    /// accumulator has a baseline.
    pub net_mah: Option<i64>,
    /// Whole minutes since session start.
    pub elapsed_minutes: Option<i64>,
    /// Estimated input voltage in millivolts, from the EC.
    pub input_voltage_mv: Option<i64>,
    /// Coarse instantaneous watt estimate for this tick.
    pub watt_sample: Option<i64>,
}
