//! Session log writer: one-time header, `<StartData>` marker, and
//! fixed-order CSV records.
//!
//! The record layout is consumed by long-standing external tooling and
//! must stay byte-stable:
//!
//! ```text
//! <header lines, one "KEY: value" pair per line>
//! <StartData>
//! <epoch>,<soc>,<voltage>,<current>,<temp>,<counter>,<status>,<net_mah>,<minutes>,<vin>,<watt>
//! ```
//!
//! Unknown fields are written as `NA`. The status field may contain
//! spaces but never commas, so no escaping is performed.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use chrono::Local;

use crate::platform::PlatformProfile;
use crate::record::{BatteryMetadata, Reading};
use crate::sampler::RecordSink;

/// Log format version, recorded in the header.
pub const LOG_FORMAT_VERSION: u32 = 2;

/// Marker separating the header block from the record lines.
pub const START_DATA_MARKER: &str = "<StartData>";

/// Placeholder for unknown field values.
const NA: &str = "NA";

// ---------------------------------------------------------------------------
// Header metadata
// ---------------------------------------------------------------------------

/// Session metadata written once into the log header.
#[derive(Debug, Clone)]
pub struct LogMeta {
    pub profile: PlatformProfile,
    /// OS build identifier, e.g. `os883`.
    pub build_id: Option<String>,
    pub battery: BatteryMetadata,
    /// Free-text operator comment.
    pub comment: String,
}

// ---------------------------------------------------------------------------
// Record formatting
// ---------------------------------------------------------------------------

fn opt_i64(v: Option<i64>) -> String {
    v.map_or_else(|| NA.to_string(), |v| v.to_string())
}

/// Formats one record line, without the trailing newline.
///
/// Field order is fixed; every consumer of historical logs indexes by
/// position.
pub fn format_record(r: &Reading) -> String {
    format!(
        "{},{},{},{},{},{},{},{},{},{},{}",
        r.timestamp,
        r.soc
            .as_ref()
            .map_or_else(|| NA.to_string(), |s| s.to_string()),
        opt_i64(r.voltage_uv),
        opt_i64(r.current_ua),
        opt_i64(r.temp_decic),
        opt_i64(r.charge_counter),
        r.status.as_deref().unwrap_or(NA),
        opt_i64(r.net_mah),
        opt_i64(r.elapsed_minutes),
        opt_i64(r.input_voltage_mv),
        opt_i64(r.watt_sample),
    )
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Appends records to a session log file.
///
/// Whether a file gets a fresh header is strictly the caller's decision:
/// [`LogWriter::create`] starts a new session (header + marker),
/// [`LogWriter::append_to`] continues an existing one untouched. Nothing
/// is ever auto-detected from file contents.
pub struct LogWriter {
    file: File,
}

impl LogWriter {
    /// Starts a new session log at `path`, writing the header block and
    /// the `<StartData>` marker. An existing file is truncated; the
    /// caller asked for a new session.
    pub fn create(path: impl AsRef<Path>, meta: &LogMeta) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        let mut writer = Self { file };
        writer.write_header(meta)?;
        Ok(writer)
    }

    /// Opens an existing session log for appending. No header is written,
    /// even if the file is empty.
    pub fn append_to(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file })
    }

    fn write_header(&mut self, meta: &LogMeta) -> io::Result<()> {
        let f = &mut self.file;
        writeln!(f, "PWRLOG_VER: {}", LOG_FORMAT_VERSION)?;
        writeln!(f, "DATE: {}", Local::now().format("%Y-%m-%d %H:%M:%S %z"))?;
        writeln!(f, "HWVER: {}", meta.profile.hardware)?;
        writeln!(f, "KERNVER: {}", meta.profile.kernel_release)?;
        writeln!(f, "KERNAPI: {}", meta.profile.api_generation)?;
        writeln!(f, "BUILD: {}", meta.build_id.as_deref().unwrap_or(NA))?;
        writeln!(
            f,
            "BATMFG: {}",
            meta.battery.manufacturer.as_deref().unwrap_or(NA)
        )?;
        writeln!(
            f,
            "BATTECH: {}",
            meta.battery.technology.as_deref().unwrap_or(NA)
        )?;
        writeln!(
            f,
            "BATSER: {}",
            meta.battery.serial_number.as_deref().unwrap_or(NA)
        )?;
        writeln!(f, "COMMENT: {}", meta.comment)?;
        writeln!(f, "{}", START_DATA_MARKER)?;
        f.flush()
    }
}

impl RecordSink for LogWriter {
    /// Writes exactly one line per reading, flushed immediately so a
    /// cancelled session never leaves a partial record behind.
    fn append(&mut self, reading: &Reading) -> io::Result<()> {
        writeln!(self.file, "{}", format_record(reading))?;
        self.file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{ApiGeneration, HardwareVersion};
    use crate::record::StateOfCharge;
    use tempfile::TempDir;

    fn meta() -> LogMeta {
        LogMeta {
            profile: PlatformProfile {
                hardware: HardwareVersion::Xo15,
                api_generation: ApiGeneration::V2,
                kernel_release: "3.0.19_xo1.5".to_string(),
            },
            build_id: Some("os883".to_string()),
            battery: BatteryMetadata {
                manufacturer: Some("BYD".to_string()),
                technology: Some("LiFe".to_string()),
                serial_number: None,
            },
            comment: "overnight idle".to_string(),
        }
    }

    fn reading() -> Reading {
        Reading {
            timestamp: 1700000000,
            soc: Some(StateOfCharge::Percent(85)),
            voltage_uv: Some(6342400),
            current_ua: Some(-523000),
            temp_decic: Some(321),
            status: Some("Discharging".to_string()),
            charge_counter: Some(123456),
            net_mah: Some(-12),
            elapsed_minutes: Some(34),
            input_voltage_mv: Some(4000),
            watt_sample: Some(-3),
        }
    }

    #[test]
    fn format_record_fixed_order() {
        assert_eq!(
            format_record(&reading()),
            "1700000000,85,6342400,-523000,321,123456,Discharging,-12,34,4000,-3"
        );
    }

    #[test]
    fn format_record_sentinels() {
        let r = Reading {
            timestamp: 1700000000,
            soc: None,
            voltage_uv: None,
            current_ua: None,
            temp_decic: None,
            status: None,
            charge_counter: None,
            net_mah: None,
            elapsed_minutes: None,
            input_voltage_mv: None,
            watt_sample: None,
        };
        assert_eq!(format_record(&r), "1700000000,NA,NA,NA,NA,NA,NA,NA,NA,NA,NA");
    }

    #[test]
    fn format_record_qualitative_level_and_multiword_status() {
        let mut r = reading();
        r.soc = Some(StateOfCharge::Level("High".to_string()));
        r.status = Some("Not charging".to_string());
        let line = format_record(&r);
        assert!(line.contains(",High,"));
        assert!(line.contains(",Not charging,"));
    }

    #[test]
    fn new_session_writes_header_marker_then_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pwr.log");

        let mut writer = LogWriter::create(&path, &meta()).unwrap();
        writer.append(&reading()).unwrap();
        writer.append(&reading()).unwrap();
        writer.append(&reading()).unwrap();
        drop(writer);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();

        assert_eq!(lines[0], "PWRLOG_VER: 2");
        assert!(lines.iter().any(|l| l.starts_with("HWVER: 1.5")));
        assert!(lines.iter().any(|l| *l == "KERNAPI: 2"));
        assert!(lines.iter().any(|l| *l == "BATSER: NA"));
        assert!(lines.iter().any(|l| *l == "COMMENT: overnight idle"));

        let markers = lines.iter().filter(|l| **l == START_DATA_MARKER).count();
        assert_eq!(markers, 1);

        let marker_idx = lines.iter().position(|l| *l == START_DATA_MARKER).unwrap();
        // Exactly one record line per append, nothing after the last
        assert_eq!(lines.len() - marker_idx - 1, 3);
    }

    #[test]
    fn append_to_writes_no_second_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pwr.log");

        let mut writer = LogWriter::create(&path, &meta()).unwrap();
        writer.append(&reading()).unwrap();
        drop(writer);

        // Process restart, same file, caller chose append
        let mut writer = LogWriter::append_to(&path).unwrap();
        writer.append(&reading()).unwrap();
        drop(writer);

        let content = std::fs::read_to_string(&path).unwrap();
        let headers = content
            .lines()
            .filter(|l| l.starts_with("PWRLOG_VER:"))
            .count();
        let markers = content
            .lines()
            .filter(|l| *l == START_DATA_MARKER)
            .count();
        assert_eq!(headers, 1);
        assert_eq!(markers, 1);
        assert_eq!(content.lines().count(), 11 + 2); // 10 header lines + marker + 2 records
    }

    #[test]
    fn create_truncates_previous_session() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pwr.log");

        let mut writer = LogWriter::create(&path, &meta()).unwrap();
        writer.append(&reading()).unwrap();
        drop(writer);

        let writer = LogWriter::create(&path, &meta()).unwrap();
        drop(writer);

        let content = std::fs::read_to_string(&path).unwrap();
        let records = content
            .lines()
            .skip_while(|l| *l != START_DATA_MARKER)
            .skip(1)
            .count();
        assert_eq!(records, 0);
    }
}
