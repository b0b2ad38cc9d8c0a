//! Chip set behind one exclusive lock
//!
//! Every register access and every render pass holds the same lock, so a bus
//! write can never land in the middle of a channel's render and tear a 24-bit
//! address. Host callbacks that may re-enter the set (the IRQ line) run after
//! the lock is released.

use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use std::time::Duration;

use crate::chipset::K054539Set;
use crate::irq;
use crate::Result;

/// Cloneable handle to a locked chip set.
#[derive(Debug, Clone)]
pub struct SharedChipSet {
    inner: Arc<Mutex<K054539Set>>,
}

impl SharedChipSet {
    /// Move a chip set behind the lock.
    pub fn new(set: K054539Set) -> Self {
        Self {
            inner: Arc::new(Mutex::new(set)),
        }
    }

    /// Lock the set for a batch of operations.
    pub fn lock(&self) -> MutexGuard<'_, K054539Set> {
        self.inner.lock()
    }

    /// Run `f` with the set locked.
    pub fn with<R>(&self, f: impl FnOnce(&mut K054539Set) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Write a register on one chip.
    pub fn write_register(&self, index: usize, offset: u16, value: u8) -> Result<()> {
        self.inner.lock().write_register(index, offset, value)
    }

    /// Read a register on one chip.
    pub fn read_register(&self, index: usize, offset: u16) -> Result<u8> {
        self.inner.lock().read_register(index, offset)
    }

    /// Render a block from one chip.
    pub fn render(&self, index: usize, left: &mut [f32], right: &mut [f32]) -> Result<()> {
        self.inner.lock().render(index, left, right)
    }

    /// Run every chip's IRQ pacer.
    ///
    /// Pulses are counted under the lock and raised after it is released, so
    /// IRQ handlers may access the set. Returns the number raised.
    pub fn advance_time(&self, elapsed: Duration) -> u32 {
        let pending = self.inner.lock().pace_time(elapsed);
        irq::raise_all(pending)
    }

    /// Take the set back if this is the last handle.
    pub fn try_unwrap(self) -> std::result::Result<K054539Set, Self> {
        Arc::try_unwrap(self.inner)
            .map(|mutex| mutex.into_inner())
            .map_err(|inner| Self { inner })
    }
}

impl From<K054539Set> for SharedChipSet {
    fn from(set: K054539Set) -> Self {
        Self::new(set)
    }
}
