//! IRQ pacer
//!
//! Accumulates host time and reports how many interrupt periods elapsed.

use std::time::Duration;

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

/// Fixed-rate interrupt pacer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrqPacer {
    /// Period length in nanoseconds
    period: u64,
    /// Time accumulated into the current period
    phase: u64,
    /// Total periods elapsed since creation or reset
    pulses: u64,
}

impl IrqPacer {
    /// Create a pacer firing `frequency_hz` times per second.
    ///
    /// Non-finite or non-positive frequencies clamp to one pulse per second.
    pub fn new(frequency_hz: f64) -> Self {
        let frequency = if frequency_hz.is_finite() && frequency_hz > 0.0 {
            frequency_hz
        } else {
            1.0
        };
        let period = (NANOS_PER_SECOND / frequency).round().max(1.0) as u64;
        IrqPacer {
            period,
            phase: 0,
            pulses: 0,
        }
    }

    /// Reset the phase and pulse count.
    pub fn reset(&mut self) {
        self.phase = 0;
        self.pulses = 0;
    }

    /// Advance by `elapsed` host time; returns the number of periods completed.
    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        let elapsed = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        let total = self.phase.saturating_add(elapsed);
        let fired = total / self.period;
        self.phase = total % self.period;
        self.pulses = self.pulses.saturating_add(fired);
        u32::try_from(fired).unwrap_or(u32::MAX)
    }

    /// Advance by `frames` output frames at `sample_rate`.
    pub fn advance_frames(&mut self, frames: usize, sample_rate: u32) -> u32 {
        if sample_rate == 0 {
            return 0;
        }
        let nanos = frames as u128 * 1_000_000_000 / u128::from(sample_rate);
        self.advance(Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX)))
    }

    /// Period length.
    pub fn period(&self) -> Duration {
        Duration::from_nanos(self.period)
    }

    /// Time accumulated into the current period.
    pub fn phase(&self) -> Duration {
        Duration::from_nanos(self.phase)
    }

    pub(crate) fn set_phase(&mut self, phase: Duration) {
        let phase = u64::try_from(phase.as_nanos()).unwrap_or(u64::MAX);
        self.phase = phase % self.period;
    }

    /// Periods elapsed since creation or the last reset.
    pub fn pulse_count(&self) -> u64 {
        self.pulses
    }
}
