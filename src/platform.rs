//! Platform probe: hardware revision and kernel telemetry API generation.
//!
//! Runs once at startup. The resulting [`PlatformProfile`] is immutable for
//! the process lifetime and carries every hardware-conditional value the
//! sampler consults (charge-counter scaling, EC opcodes, capability flags),
//! so revision branching lives here and nowhere else.

use std::path::Path;

use tracing::warn;

use crate::collector::sysfs::parser::parse_text;
use crate::collector::traits::FileSystem;

/// Default location of the OS build identifier.
pub const BUILD_ID_PATH: &str = "/boot/olpc_build";

// ---------------------------------------------------------------------------
// Hardware revision
// ---------------------------------------------------------------------------

/// Laptop hardware revision, parsed from the firmware device tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareVersion {
    Xo1,
    Xo15,
    Xo175,
    Xo4,
}

/// How raw charge-counter units convert to milliamp-hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeScale {
    /// XO-1 accumulated-current register: one count is 625/1500 mAh.
    Xo1Lsb,
    /// Counter already in microamp-hours; divide by 1000.
    MicroAmpHours,
}

impl HardwareVersion {
    /// Parses a device-tree model or banner string, e.g. `"XO-1.5"`.
    pub fn from_model(model: &str) -> Option<Self> {
        // Longest tags first: "XO-1.75" also contains "1".
        if model.contains("1.75") {
            Some(HardwareVersion::Xo175)
        } else if model.contains("1.5") {
            Some(HardwareVersion::Xo15)
        } else if model.contains('4') {
            Some(HardwareVersion::Xo4)
        } else if model.contains('1') {
            Some(HardwareVersion::Xo1)
        } else {
            None
        }
    }

    /// Charge-counter unit conversion for this revision.
    pub fn charge_scale(self) -> ChargeScale {
        match self {
            HardwareVersion::Xo1 => ChargeScale::Xo1Lsb,
            _ => ChargeScale::MicroAmpHours,
        }
    }

    /// EC command opcode for the input-voltage estimate.
    ///
    /// The XO-1 EC has no such command; the field stays unknown for the
    /// whole session there.
    pub fn ec_vin_opcode(self) -> Option<u8> {
        match self {
            HardwareVersion::Xo1 => None,
            HardwareVersion::Xo15 => Some(0x42),
            HardwareVersion::Xo175 | HardwareVersion::Xo4 => Some(0x44),
        }
    }
}

impl std::fmt::Display for HardwareVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            HardwareVersion::Xo1 => "1",
            HardwareVersion::Xo15 => "1.5",
            HardwareVersion::Xo175 => "1.75",
            HardwareVersion::Xo4 => "4",
        };
        write!(f, "{}", tag)
    }
}

// ---------------------------------------------------------------------------
// Telemetry API generation
// ---------------------------------------------------------------------------

/// Kernel charge-counter encoding generation.
///
/// Generation 1 kernels report the counter as a raw 16-bit value with
/// two's-complement wraparound; generation 2 kernels report a pre-signed
/// wide value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiGeneration {
    V1,
    V2,
}

/// Encodes a kernel version triple the way `KERNEL_VERSION()` does.
const fn kernel_version(major: u32, minor: u32, patch: u32) -> u32 {
    (major << 16) | (minor << 8) | patch
}

/// First kernel that reports the charge counter pre-signed (2.6.25).
/// This boundary controls downstream sign correction and must not drift.
const SIGNED_COUNTER_KERNEL: u32 = kernel_version(2, 6, 25);

/// Encodes the leading `major.minor[.patch]` of a release string.
///
/// Accepts vendor suffixes like `"3.0.19_xo1.5"` or `"2.6.22-20080316"`.
pub fn encode_kernel_release(release: &str) -> Option<u32> {
    let numeric: String = release
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    let mut parts = numeric.split('.');
    let major: u32 = parts.next()?.parse().ok()?;
    let minor: u32 = parts.next()?.parse().ok()?;
    let patch: u32 = parts
        .next()
        .and_then(|p| p.parse().ok())
        .unwrap_or(0)
        .min(255);

    Some(kernel_version(major, minor.min(255), patch))
}

impl ApiGeneration {
    /// Classifies a kernel release string.
    pub fn from_kernel_release(release: &str) -> Option<Self> {
        let encoded = encode_kernel_release(release)?;
        if encoded >= SIGNED_COUNTER_KERNEL {
            Some(ApiGeneration::V2)
        } else {
            Some(ApiGeneration::V1)
        }
    }
}

impl std::fmt::Display for ApiGeneration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            ApiGeneration::V1 => "1",
            ApiGeneration::V2 => "2",
        };
        write!(f, "{}", tag)
    }
}

// ---------------------------------------------------------------------------
// Probe
// ---------------------------------------------------------------------------

/// Immutable platform identity, computed once at startup.
#[derive(Debug, Clone)]
pub struct PlatformProfile {
    pub hardware: HardwareVersion,
    pub api_generation: ApiGeneration,
    /// Verbatim kernel release, recorded in the log header.
    pub kernel_release: String,
}

/// Error type for probe failures. All variants are fatal at startup: no
/// meaningful telemetry is possible without the kernel identity.
#[derive(Debug)]
pub enum ProbeError {
    /// The kernel release node could not be read.
    KernelRelease(std::io::Error),
    /// The kernel release string had no parsable version.
    BadKernelRelease(String),
}

impl std::fmt::Display for ProbeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeError::KernelRelease(e) => write!(f, "cannot read kernel release: {}", e),
            ProbeError::BadKernelRelease(s) => write!(f, "unparsable kernel release {:?}", s),
        }
    }
}

impl std::error::Error for ProbeError {}

/// Probes the platform identity from procfs/device-tree nodes.
///
/// `proc_path` is usually `/proc`; tests point it at a mock tree. The
/// hardware-model node falls back to the baseline XO-1 revision when
/// unreadable; the kernel release node is mandatory.
pub fn probe<F: FileSystem>(fs: &F, proc_path: &str) -> Result<PlatformProfile, ProbeError> {
    let release_path = format!("{}/sys/kernel/osrelease", proc_path);
    let raw = fs
        .read_to_string(Path::new(&release_path))
        .map_err(ProbeError::KernelRelease)?;
    let kernel_release = raw.trim().to_string();

    let api_generation = ApiGeneration::from_kernel_release(&kernel_release)
        .ok_or_else(|| ProbeError::BadKernelRelease(kernel_release.clone()))?;

    let hardware = read_hardware_version(fs, proc_path).unwrap_or_else(|| {
        warn!("hardware model node unreadable, assuming XO-1");
        HardwareVersion::Xo1
    });

    Ok(PlatformProfile {
        hardware,
        api_generation,
        kernel_release,
    })
}

fn read_hardware_version<F: FileSystem>(fs: &F, proc_path: &str) -> Option<HardwareVersion> {
    for node in ["device-tree/model", "device-tree/banner-name"] {
        let path = format!("{}/{}", proc_path, node);
        if let Ok(content) = fs.read_to_string(Path::new(&path))
            && let Ok(model) = parse_text(&content)
        {
            return HardwareVersion::from_model(&model);
        }
    }
    None
}

/// Reads the OS build identifier for the log header, if present.
pub fn read_build_id<F: FileSystem>(fs: &F, path: &str) -> Option<String> {
    let content = fs.read_to_string(Path::new(path)).ok()?;
    parse_text(&content).ok()
}
