//! pwrlogd - battery/power telemetry logging daemon.
//!
//! Samples battery state from sysfs at a fixed cadence and appends CSV
//! records to a session log file, in the format long used by battery
//! runtime test tooling.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

use pwrlog::collector::{BatteryCollector, RealFs};
use pwrlog::ec::{DEFAULT_EC_CMD_PATH, DebugfsEc};
use pwrlog::logfile::{LogMeta, LogWriter, format_record};
use pwrlog::platform::{BUILD_ID_PATH, PlatformProfile, probe, read_build_id};
use pwrlog::record::Reading;
use pwrlog::sampler::{RecordSink, Session};

/// Battery/power telemetry logging daemon.
#[derive(Parser)]
#[command(name = "pwrlogd", about = "Battery/power telemetry logger", version)]
struct Args {
    /// Sampling interval in seconds.
    #[arg(short, long, default_value = "20")]
    interval: u64,

    /// Session log file.
    #[arg(short, long, default_value = "./pwr.log")]
    output: String,

    /// Free-text comment recorded in the log header.
    #[arg(short = 'm', long, default_value = "")]
    comment: String,

    /// Append to an existing session log instead of starting a new one.
    /// No header is written in this mode.
    #[arg(long)]
    append: bool,

    /// Stop after this many records (bounded test mode).
    #[arg(long)]
    ticks: Option<u64>,

    /// Path to the power-supply sysfs class (for testing/mocking).
    #[arg(long, default_value = "/sys/class/power_supply")]
    sysfs_path: String,

    /// Path to the olpc-ec command node.
    #[arg(long, default_value = DEFAULT_EC_CMD_PATH)]
    ec_path: String,

    /// Path to the proc filesystem (for testing/mocking).
    #[arg(long, default_value = "/proc")]
    proc_path: String,

    /// Skip the EC entirely; input voltage is logged as unknown.
    #[arg(long)]
    no_ec: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Initializes the tracing subscriber with the appropriate log level.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("pwrlogd={}", level).parse().unwrap())
        .add_directive(format!("pwrlog={}", level).parse().unwrap());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// One-line platform summary for the startup banner.
fn describe_profile(profile: &PlatformProfile) -> String {
    format!(
        "platform: XO-{}, kernel {} (telemetry api generation {})",
        profile.hardware, profile.kernel_release, profile.api_generation
    )
}

/// Fans each record out to the terminal and the session log.
struct TeeSink {
    log: LogWriter,
}

impl RecordSink for TeeSink {
    fn append(&mut self, reading: &Reading) -> io::Result<()> {
        info!("{}", format_record(reading));
        self.log.append(reading)
    }
}

fn main() {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    info!("pwrlogd {} starting", env!("CARGO_PKG_VERSION"));

    let fs = RealFs::new();

    let profile = match probe(&fs, &args.proc_path) {
        Ok(p) => p,
        Err(e) => {
            error!("platform identity unreadable: {}", e);
            std::process::exit(1);
        }
    };
    info!("{}", describe_profile(&profile));

    let battery = match BatteryCollector::discover(fs, &args.sysfs_path) {
        Ok(b) => b,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };
    info!("battery: {}", battery.path().display());

    let meta = LogMeta {
        profile: profile.clone(),
        build_id: read_build_id(&fs, BUILD_ID_PATH),
        battery: battery.metadata(),
        comment: args.comment.clone(),
    };

    let writer = if args.append {
        LogWriter::append_to(&args.output)
    } else {
        LogWriter::create(&args.output, &meta)
    };
    let writer = match writer {
        Ok(w) => w,
        Err(e) => {
            error!("cannot open log {}: {}", args.output, e);
            std::process::exit(1);
        }
    };
    info!(
        "logging to {} every {}s{}",
        args.output,
        args.interval,
        if args.append { " (append)" } else { "" }
    );

    let ec = if args.no_ec {
        None
    } else {
        let ec = DebugfsEc::new(&args.ec_path);
        ec.available().then_some(ec)
    };

    // Setup graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    let mut session = Session::new(profile, battery, ec);
    let mut sink = TeeSink { log: writer };

    info!("Starting sampling loop");
    session.run(
        &mut sink,
        Duration::from_secs(args.interval),
        &running,
        args.ticks,
    );

    info!("Shutdown complete");
}

#[cfg(test)]
mod tests {
    use super::describe_profile;
    use pwrlog::platform::{ApiGeneration, HardwareVersion, PlatformProfile};

    #[test]
    fn describe_profile_names_all_parts() {
        let profile = PlatformProfile {
            hardware: HardwareVersion::Xo175,
            api_generation: ApiGeneration::V2,
            kernel_release: "3.0.19_xo1.75".to_string(),
        };
        let desc = describe_profile(&profile);
        assert!(desc.contains("XO-1.75"));
        assert!(desc.contains("3.0.19_xo1.75"));
        assert!(desc.contains("generation 2"));
    }
}
