//! Periodic interrupt generation
//!
//! The chip raises its IRQ line at a fixed real-time rate whenever the
//! IRQ-enable control bit is set. The hardware period is undocumented;
//! 500 Hz is the customary approximation and hosts may override it.

pub mod pacer;

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

pub use pacer::IrqPacer;

use crate::host::IrqLine;

/// Default interrupt rate in Hz.
pub const DEFAULT_IRQ_FREQUENCY: f64 = 500.0;

/// IRQ line bound to a chip, shareable with pulses handed out of a lock.
pub(crate) type SharedIrqLine = Arc<Mutex<Box<dyn IrqLine>>>;

/// IRQ pulses counted by a pacer but not yet delivered.
///
/// Locked hosts collect these while holding the chip set and deliver them
/// with [`raise`](Self::raise) after releasing it, so the IRQ handler may
/// access the chip again.
#[must_use = "pending IRQ pulses are lost unless raised"]
pub struct PendingIrq {
    line: SharedIrqLine,
    pulses: u32,
}

impl PendingIrq {
    pub(crate) fn new(line: &SharedIrqLine, pulses: u32) -> Self {
        Self {
            line: Arc::clone(line),
            pulses,
        }
    }

    /// Number of pulses waiting.
    pub fn pulses(&self) -> u32 {
        self.pulses
    }

    /// Deliver every pulse to the IRQ line; returns the number raised.
    pub fn raise(self) -> u32 {
        let mut line = self.line.lock();
        for _ in 0..self.pulses {
            line.raise();
        }
        self.pulses
    }
}

impl fmt::Debug for PendingIrq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingIrq")
            .field("pulses", &self.pulses)
            .finish()
    }
}

/// Deliver a batch of pending pulses; returns the total raised.
pub fn raise_all(pending: impl IntoIterator<Item = PendingIrq>) -> u32 {
    pending
        .into_iter()
        .map(PendingIrq::raise)
        .fold(0u32, u32::saturating_add)
}
