//! pwrlog — battery/power telemetry sampler for the XO laptop family.
//!
//! Provides:
//! - `platform` — hardware revision + kernel API generation probe
//! - `collector` — battery sysfs collection (with mock for testing)
//! - `ec` — embedded-controller channel for the input-voltage estimate
//! - `accumulator` — session charge state and per-tick power arithmetic
//! - `record` — sensor snapshot and log record models
//! - `sampler` — the tick loop and record sinks
//! - `logfile` — session log header and CSV record writer

pub mod accumulator;
pub mod collector;
pub mod ec;
pub mod logfile;
pub mod platform;
pub mod record;
pub mod sampler;
