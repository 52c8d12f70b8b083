//! Battery collector reading power-supply attributes from sysfs.

use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::collector::sysfs::parser::{parse_scalar, parse_text};
use crate::collector::traits::FileSystem;
use crate::record::{BatteryMetadata, SensorSnapshot, StateOfCharge};

/// Error type for battery discovery failures.
#[derive(Debug)]
pub enum DiscoverError {
    /// No power-supply entry of type `Battery` under the given base path.
    NoBattery(PathBuf),
    /// I/O error scanning the power-supply class directory.
    Io(io::Error),
}

impl std::fmt::Display for DiscoverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscoverError::NoBattery(base) => {
                write!(f, "no battery supply found under {}", base.display())
            }
            DiscoverError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for DiscoverError {}

impl From<io::Error> for DiscoverError {
    fn from(e: io::Error) -> Self {
        DiscoverError::Io(e)
    }
}

/// Reads battery telemetry from a power-supply sysfs directory.
///
/// Every attribute is an independent read. A missing or malformed attribute
/// yields `None` for that field only; a tick is never aborted because one
/// sensor misbehaved.
#[derive(Debug)]
pub struct BatteryCollector<F: FileSystem> {
    fs: F,
    path: PathBuf,
}

impl<F: FileSystem> BatteryCollector<F> {
    /// Creates a collector for a known power-supply directory.
    pub fn new(fs: F, path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            path: path.into(),
        }
    }

    /// Scans `base` (usually `/sys/class/power_supply`) for an entry whose
    /// `type` attribute is `Battery`.
    pub fn discover(fs: F, base: impl AsRef<Path>) -> Result<Self, DiscoverError> {
        let base = base.as_ref();
        for entry in fs.read_dir(base)? {
            let type_file = entry.join("type");
            let Ok(content) = fs.read_to_string(&type_file) else {
                continue;
            };
            if content.trim() == "Battery" {
                return Ok(Self::new(fs, entry));
            }
        }
        Err(DiscoverError::NoBattery(base.to_path_buf()))
    }

    /// The power-supply directory this collector reads from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_scalar(&self, name: &str) -> Option<i64> {
        let path = self.path.join(name);
        match self.fs.read_to_string(&path) {
            Ok(content) => match parse_scalar(&content) {
                Ok(v) => Some(v),
                Err(e) => {
                    debug!("{}: {}", path.display(), e);
                    None
                }
            },
            Err(_) => None,
        }
    }

    fn read_text(&self, name: &str) -> Option<String> {
        let path = self.path.join(name);
        match self.fs.read_to_string(&path) {
            Ok(content) => match parse_text(&content) {
                Ok(v) => Some(v),
                Err(e) => {
                    debug!("{}: {}", path.display(), e);
                    None
                }
            },
            Err(_) => None,
        }
    }

    /// First readable attribute out of a preference-ordered list.
    ///
    /// Drivers differ on which of `_avg`/`_now` variants they expose.
    fn read_first_scalar(&self, names: &[&str]) -> Option<i64> {
        names.iter().find_map(|n| self.read_scalar(n))
    }

    /// State of charge: percentage when available, qualitative level as a
    /// fallback for legacy drivers.
    fn read_soc(&self) -> Option<StateOfCharge> {
        if let Some(p) = self.read_scalar("capacity") {
            return Some(StateOfCharge::Percent(p));
        }
        self.read_text("capacity_level").map(StateOfCharge::Level)
    }

    /// Takes one fresh snapshot of all battery attributes.
    pub fn snapshot(&self) -> SensorSnapshot {
        SensorSnapshot {
            soc: self.read_soc(),
            voltage_uv: self.read_first_scalar(&["voltage_avg", "voltage_now"]),
            current_ua: self.read_first_scalar(&["current_avg", "current_now"]),
            temp_decic: self.read_scalar("temp"),
            status: self.read_text("status"),
            charge_counter: self.read_scalar("charge_counter"),
        }
    }

    /// Reads the manufacturing metadata recorded in the log header.
    pub fn metadata(&self) -> BatteryMetadata {
        BatteryMetadata {
            manufacturer: self.read_text("manufacturer"),
            technology: self.read_text("technology"),
            serial_number: self.read_text("serial_number"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;

    const BAT: &str = "/sys/class/power_supply/olpc-battery";

    #[test]
    fn test_snapshot_healthy() {
        let fs = MockFs::xo15_discharging();
        let collector = BatteryCollector::new(fs, BAT);
        let snap = collector.snapshot();

        assert_eq!(snap.soc, Some(StateOfCharge::Percent(85)));
        assert_eq!(snap.voltage_uv, Some(6342400));
        assert_eq!(snap.current_ua, Some(-523000));
        assert_eq!(snap.temp_decic, Some(321));
        assert_eq!(snap.status.as_deref(), Some("Discharging"));
        assert_eq!(snap.charge_counter, Some(123456));
    }

    #[test]
    fn test_snapshot_capacity_level_fallback() {
        let fs = MockFs::xo1_legacy();
        let collector = BatteryCollector::new(fs, BAT);
        let snap = collector.snapshot();

        assert_eq!(snap.soc, Some(StateOfCharge::Level("High".to_string())));
    }

    #[test]
    fn test_snapshot_degraded_yields_sentinels() {
        let fs = MockFs::degraded_battery();
        let collector = BatteryCollector::new(fs, BAT);
        let snap = collector.snapshot();

        assert_eq!(snap.soc, None);
        assert_eq!(snap.voltage_uv, None);
        assert_eq!(snap.current_ua, None);
        assert_eq!(snap.temp_decic, None);
        assert_eq!(snap.charge_counter, None);
        // Only status survived
        assert_eq!(snap.status.as_deref(), Some("Not charging"));
    }

    #[test]
    fn test_discover_skips_mains() {
        let fs = MockFs::xo15_discharging();
        let collector = BatteryCollector::discover(fs, "/sys/class/power_supply").unwrap();
        assert!(collector.path().ends_with("olpc-battery"));
    }

    #[test]
    fn test_discover_no_battery() {
        let fs = MockFs::new();
        fs.add_file("/sys/class/power_supply/olpc-ac/type", "Mains\n");
        let err = BatteryCollector::discover(fs, "/sys/class/power_supply").unwrap_err();
        assert!(matches!(err, DiscoverError::NoBattery(_)));
    }

    #[test]
    fn test_voltage_now_fallback() {
        let fs = MockFs::xo15_discharging();
        fs.remove_file(format!("{}/voltage_avg", BAT));
        fs.add_file(format!("{}/voltage_now", BAT), "6400000\n");
        let collector = BatteryCollector::new(fs, BAT);
        assert_eq!(collector.snapshot().voltage_uv, Some(6400000));
    }

    #[test]
    fn test_metadata() {
        let fs = MockFs::xo15_discharging();
        let collector = BatteryCollector::new(fs, BAT);
        let meta = collector.metadata();
        assert_eq!(meta.manufacturer.as_deref(), Some("BYD"));
        assert_eq!(meta.technology.as_deref(), Some("LiFe"));
        assert_eq!(meta.serial_number.as_deref(), Some("001661AD"));
    }
}
