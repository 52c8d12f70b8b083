//! Session charge accumulation and per-tick power arithmetic.
//!
//! This module is the single source of truth for charge-counter sign
//! correction, unit conversion, and the instantaneous watt estimate. The
//! arithmetic is deliberately coarse integer math: the order and rounding
//! of operations matches the values historical log consumers expect, so
//! neither may be "improved".

use crate::platform::{ApiGeneration, ChargeScale};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Largest raw counter value generation-1 kernels report as positive.
const RAW_COUNTER_SIGN_LIMIT: i64 = 32767;

/// Wraparound modulus of the generation-1 16-bit counter encoding.
const RAW_COUNTER_MODULUS: i64 = 65536;

// ---------------------------------------------------------------------------
// Sign correction
// ---------------------------------------------------------------------------

/// Reinterprets a generation-1 raw counter reading as a signed value.
///
/// Generation-1 kernels report the counter as a raw 16-bit register, so a
/// value above 32767 is a two's-complement negative. Values already
/// negative pass through unchanged, which protects against double
/// correction. Generation-2 kernels pre-sign the value; it is returned
/// as-is.
///
/// The 16-bit wraparound assumption is reproduced exactly as historically
/// documented, even though the kernel's behavior around it changed over
/// time.
pub fn sign_correct(raw: i64, generation: ApiGeneration) -> i64 {
    match generation {
        ApiGeneration::V1 if raw > RAW_COUNTER_SIGN_LIMIT => raw - RAW_COUNTER_MODULUS,
        _ => raw,
    }
}

// ---------------------------------------------------------------------------
// Accumulator
// ---------------------------------------------------------------------------

/// Values derived from one accumulator advance, consumed by record
/// construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeDeltas {
    /// Net milliamp-hours since session start.
    pub net_mah: i64,
    /// Milliamp-hours moved during this tick.
    pub tick_mah: i64,
    /// Seconds charged to this tick, never less than 1.
    pub elapsed_secs: i64,
    /// Whole minutes since session start.
    pub elapsed_minutes: i64,
    /// Coarse instantaneous watt estimate; `None` when voltage is unknown.
    pub watt_sample: Option<i64>,
}

/// Session charge/time state, owned by the sampler, one per logging
/// session.
///
/// Created from the first successful charge-counter reading and advanced
/// once per tick. Not persisted: a process restart starts a new baseline.
#[derive(Debug)]
pub struct Accumulator {
    scale: ChargeScale,
    start_counter: i64,
    start_time: i64,
    prev_counter: i64,
    prev_time: i64,
}

impl Accumulator {
    /// Baselines a new session at `now` from the first sign-corrected
    /// counter reading.
    pub fn new(scale: ChargeScale, first_counter: i64, now: i64) -> Self {
        Self {
            scale,
            start_counter: first_counter,
            start_time: now,
            prev_counter: first_counter,
            prev_time: now,
        }
    }

    /// Whole minutes since session start, truncating.
    ///
    /// Available without advancing, for ticks where the counter read
    /// failed.
    pub fn elapsed_minutes(&self, now: i64) -> i64 {
        (now - self.start_time) / 60
    }

    /// Advances the session by one tick.
    ///
    /// `counter` must already be sign-corrected. `voltage_mv` feeds the
    /// watt estimate; when unknown the estimate is skipped, but counters
    /// and times still advance.
    pub fn advance(&mut self, counter: i64, now: i64, voltage_mv: Option<i64>) -> ChargeDeltas {
        let net_delta = counter - self.start_counter;
        let tick_delta = counter - self.prev_counter;

        let (net_mah, tick_mah) = match self.scale {
            // XO-1 ACR LSB weight: 625/1500 mAh per count, multiply first.
            ChargeScale::Xo1Lsb => (net_delta * 625 / 1500, tick_delta * 625 / 1500),
            // Counter in uAh. The per-tick delta is rounded to nearest to
            // avoid systematic truncation bias on small deltas; the net
            // value truncates so it stays a pure function of endpoints.
            ChargeScale::MicroAmpHours => (net_delta / 1000, (tick_delta + 500) / 1000),
        };

        // Clock can report the same second twice at startup, or jump
        // backwards across a resume. Floor to 1 so the rate division
        // below is always defined.
        let mut elapsed_secs = now - self.prev_time;
        if elapsed_secs < 1 {
            elapsed_secs = 1;
        }

        let elapsed_minutes = self.elapsed_minutes(now);

        // mAh -> mA-seconds, to a milliamp rate, times rounded whole
        // volts, down to watts. Integer truncation at every step.
        let watt_sample =
            voltage_mv.map(|mv| ((tick_mah * 3600) / elapsed_secs) * ((mv + 500) / 1000) / 1000);

        self.prev_counter = counter;
        self.prev_time = now;

        ChargeDeltas {
            net_mah,
            tick_mah,
            elapsed_secs,
            elapsed_minutes,
            watt_sample,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
