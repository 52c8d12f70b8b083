//! The sampling tick loop.
//!
//! One logical thread of control per session: each tick is a sequence of
//! blocking reads (battery attributes, one EC round-trip) followed by one
//! append to the sink. The cadence sleep is the sole suspension point and
//! is cancellation-aware, so a session terminates after the current tick
//! completes and never leaves a partial record.
//!
//! A log file is owned exclusively by the single running instance for its
//! lifetime. Running two instances against the same hardware would race on
//! the EC channel; callers wanting that kind of protection must arrange a
//! lock of their own before starting a session.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{debug, error, info};

use crate::accumulator::{Accumulator, sign_correct};
use crate::collector::sysfs::BatteryCollector;
use crate::collector::traits::FileSystem;
use crate::ec::{EcChannel, parse_vin_response};
use crate::platform::PlatformProfile;
use crate::record::Reading;

/// EC response length for the input-voltage estimate.
const VIN_RESPONSE_BYTES: usize = 2;

/// Receives one record per tick.
pub trait RecordSink {
    fn append(&mut self, reading: &Reading) -> io::Result<()>;
}

/// One logging session: platform profile, sensor sources, and the
/// accumulator they feed.
pub struct Session<F: FileSystem, E: EcChannel> {
    profile: PlatformProfile,
    battery: BatteryCollector<F>,
    /// EC channel and opcode, present only when both the hardware and the
    /// running system support the input-voltage command.
    vin: Option<(E, u8)>,
    /// Baselined lazily from the first successful counter reading.
    accumulator: Option<Accumulator>,
}

impl<F: FileSystem, E: EcChannel> Session<F, E> {
    /// Builds a session. `channel` may be `None` when the EC node is
    /// absent; the input-voltage field then stays unknown for the whole
    /// session, noted once here rather than per tick.
    pub fn new(profile: PlatformProfile, battery: BatteryCollector<F>, channel: Option<E>) -> Self {
        let vin = match (profile.hardware.ec_vin_opcode(), channel) {
            (Some(opcode), Some(channel)) => Some((channel, opcode)),
            (None, _) => {
                info!(
                    "XO-{} has no input-voltage command, field will be unknown",
                    profile.hardware
                );
                None
            }
            (Some(_), None) => {
                info!("EC channel unavailable, input voltage will be unknown");
                None
            }
        };

        Self {
            profile,
            battery,
            vin,
            accumulator: None,
        }
    }

    fn read_vin(&self) -> Option<i64> {
        let (channel, opcode) = self.vin.as_ref()?;
        match channel.command(*opcode, VIN_RESPONSE_BYTES) {
            Ok(response) => {
                let vin = parse_vin_response(&response);
                if vin.is_none() {
                    debug!("malformed EC response: {:?}", response);
                }
                vin
            }
            Err(e) => {
                debug!("EC command failed: {}", e);
                None
            }
        }
    }

    /// Performs one sampling tick at `now` (epoch seconds).
    ///
    /// Infallible: every sensor failure is absorbed into a sentinel field.
    pub fn tick(&mut self, now: i64) -> Reading {
        let snap = self.battery.snapshot();
        let input_voltage_mv = self.read_vin();

        let corrected = snap
            .charge_counter
            .map(|raw| sign_correct(raw, self.profile.api_generation));
        let voltage_mv = snap.voltage_uv.map(|uv| uv / 1000);

        let deltas = corrected.map(|counter| {
            let scale = self.profile.hardware.charge_scale();
            let acc = self
                .accumulator
                .get_or_insert_with(|| Accumulator::new(scale, counter, now));
            acc.advance(counter, now, voltage_mv)
        });

        let (net_mah, elapsed_minutes, watt_sample) = match (deltas, self.accumulator.as_ref()) {
            (Some(d), _) => (Some(d.net_mah), Some(d.elapsed_minutes), d.watt_sample),
            // Counter unreadable this tick: the session clock still runs,
            // charge-derived fields stay unknown and the baseline is
            // untouched.
            (None, Some(acc)) => (None, Some(acc.elapsed_minutes(now)), None),
            (None, None) => (None, None, None),
        };

        Reading {
            timestamp: now,
            soc: snap.soc,
            voltage_uv: snap.voltage_uv,
            current_ua: snap.current_ua,
            temp_decic: snap.temp_decic,
            status: snap.status,
            charge_counter: corrected,
            net_mah,
            elapsed_minutes,
            input_voltage_mv,
            watt_sample,
        }
    }

    /// Runs the tick loop until cancelled via `running`, or until
    /// `max_ticks` records have been emitted (bounded test mode).
    ///
    /// Sink failures are logged and do not end the session; only the
    /// caller decides when a session is over. A suspend/resume gap simply
    /// becomes one tick with however much time actually passed, with no
    /// catch-up burst for skipped intervals.
    pub fn run(
        &mut self,
        sink: &mut dyn RecordSink,
        interval: Duration,
        running: &AtomicBool,
        max_ticks: Option<u64>,
    ) {
        let mut ticks: u64 = 0;

        while running.load(Ordering::SeqCst) {
            let reading = self.tick(epoch_now());
            if let Err(e) = sink.append(&reading) {
                error!("failed to append record: {}", e);
            }

            ticks += 1;
            if max_ticks.is_some_and(|m| ticks >= m) {
                break;
            }

            // Sleep in short slices so a shutdown signal is honored
            // promptly, always after the record above is complete.
            let slice = Duration::from_millis(100);
            let mut remaining = interval;
            while remaining > Duration::ZERO && running.load(Ordering::SeqCst) {
                let nap = remaining.min(slice);
                std::thread::sleep(nap);
                remaining = remaining.saturating_sub(nap);
            }
        }

        debug!("session finished after {} ticks", ticks);
    }
}

fn epoch_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;
    use crate::ec::MockEc;
    use crate::platform::probe;
    use crate::record::StateOfCharge;

    const BAT: &str = "/sys/class/power_supply/olpc-battery";

    /// Sink that collects readings in memory.
    #[derive(Default)]
    struct VecSink {
        readings: Vec<Reading>,
    }

    impl RecordSink for VecSink {
        fn append(&mut self, reading: &Reading) -> io::Result<()> {
            self.readings.push(reading.clone());
            Ok(())
        }
    }

    fn mock_session<'a>(fs: &MockFs, ec: &'a MockEc) -> Session<MockFs, &'a MockEc> {
        let profile = probe(fs, "/proc").unwrap();
        let battery = BatteryCollector::new(fs.clone(), BAT);
        Session::new(profile, battery, Some(ec))
    }

    #[test]
    fn charging_session_matches_historical_values() {
        let fs = MockFs::xo15_discharging();
        fs.add_file(format!("{}/voltage_avg", BAT), "12000000\n");
        fs.add_file(format!("{}/charge_counter", BAT), "1000\n");
        let ec = MockEc::with_response("a0 0f");
        let mut session = mock_session(&fs, &ec);

        let r = session.tick(100);
        assert_eq!(r.charge_counter, Some(1000));
        assert_eq!(r.net_mah, Some(0));
        assert_eq!(r.elapsed_minutes, Some(0));
        assert_eq!(r.watt_sample, Some(0));
        assert_eq!(r.input_voltage_mv, Some(4000));

        fs.add_file(format!("{}/charge_counter", BAT), "4000\n");
        let r = session.tick(160);
        assert_eq!(r.net_mah, Some(3));
        assert_eq!(r.elapsed_minutes, Some(1));
        assert_eq!(r.watt_sample, Some(2));

        fs.add_file(format!("{}/charge_counter", BAT), "9000\n");
        let r = session.tick(220);
        assert_eq!(r.net_mah, Some(8));
        assert_eq!(r.elapsed_minutes, Some(2));
        assert_eq!(r.watt_sample, Some(3));
    }

    #[test]
    fn xo1_never_touches_the_ec() {
        let fs = MockFs::xo1_legacy();
        let ec = MockEc::with_response("a0 0f");
        let mut session = mock_session(&fs, &ec);

        let r = session.tick(100);
        assert_eq!(r.input_voltage_mv, None);
        session.tick(120);
        session.tick(140);
        assert_eq!(ec.calls(), 0);
    }

    #[test]
    fn gen1_counter_is_sign_corrected() {
        let fs = MockFs::xo1_legacy();
        fs.add_file(format!("{}/charge_counter", BAT), "40000\n");
        let ec = MockEc::failing();
        let mut session = mock_session(&fs, &ec);

        let r = session.tick(100);
        assert_eq!(r.charge_counter, Some(40000 - 65536));
    }

    #[test]
    fn ec_failure_degrades_to_unknown() {
        let fs = MockFs::xo15_discharging();
        let ec = MockEc::failing();
        let mut session = mock_session(&fs, &ec);

        let r = session.tick(100);
        assert_eq!(r.input_voltage_mv, None);
        // The rest of the record is unaffected
        assert_eq!(r.soc, Some(StateOfCharge::Percent(85)));
        assert!(r.charge_counter.is_some());
    }

    #[test]
    fn malformed_ec_response_degrades_to_unknown() {
        let fs = MockFs::xo15_discharging();
        let ec = MockEc::with_response("a0");
        let mut session = mock_session(&fs, &ec);
        assert_eq!(session.tick(100).input_voltage_mv, None);
    }

    #[test]
    fn missing_counter_defers_baseline() {
        let fs = MockFs::xo15_discharging();
        fs.remove_file(format!("{}/charge_counter", BAT));
        let ec = MockEc::failing();
        let mut session = mock_session(&fs, &ec);

        let r = session.tick(100);
        assert_eq!(r.charge_counter, None);
        assert_eq!(r.net_mah, None);
        assert_eq!(r.elapsed_minutes, None);

        // Counter appears: session baselines here, not at tick 1
        fs.add_file(format!("{}/charge_counter", BAT), "5000\n");
        let r = session.tick(160);
        assert_eq!(r.net_mah, Some(0));
        assert_eq!(r.elapsed_minutes, Some(0));
    }

    #[test]
    fn counter_glitch_mid_session_keeps_clock_running() {
        let fs = MockFs::xo15_discharging();
        fs.add_file(format!("{}/charge_counter", BAT), "5000\n");
        let ec = MockEc::failing();
        let mut session = mock_session(&fs, &ec);

        session.tick(100);
        fs.remove_file(format!("{}/charge_counter", BAT));
        let r = session.tick(160);
        assert_eq!(r.net_mah, None);
        assert_eq!(r.elapsed_minutes, Some(1));

        // Recovery: elapsed time spans the glitch, no catch-up burst
        fs.add_file(format!("{}/charge_counter", BAT), "8000\n");
        let r = session.tick(220);
        assert_eq!(r.net_mah, Some(3));
        assert_eq!(r.elapsed_minutes, Some(2));
    }

    #[test]
    fn run_bounded_emits_one_record_per_tick() {
        let fs = MockFs::xo15_discharging();
        let ec = MockEc::with_response("a0 0f");
        let mut session = mock_session(&fs, &ec);
        let mut sink = VecSink::default();
        let running = AtomicBool::new(true);

        session.run(&mut sink, Duration::from_millis(10), &running, Some(3));
        assert_eq!(sink.readings.len(), 3);
    }

    #[test]
    fn run_stops_when_cancelled() {
        let fs = MockFs::xo15_discharging();
        let ec = MockEc::failing();
        let mut session = mock_session(&fs, &ec);
        let mut sink = VecSink::default();
        let running = AtomicBool::new(false);

        session.run(&mut sink, Duration::from_millis(10), &running, None);
        assert!(sink.readings.is_empty());
    }
}
