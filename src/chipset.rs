//! Chip set: several K054539s sharing one pair of gain tables
//!
//! Boards carry a small fixed number of chips (two is common). The set builds
//! the attenuation and pan tables once and addresses chips by index.
//!
//! # Examples
//!
//! ```
//! use k054539::{ChipBindings, ChipConfig, ChipSetConfig, K054539Set};
//!
//! let config = ChipSetConfig::uniform(2, ChipConfig::with_clocks(18_432_000, 44_100));
//! let rom = vec![0u8; 0x1000];
//! let mut set = K054539Set::new(
//!     &config,
//!     vec![ChipBindings::new(rom.clone()), ChipBindings::new(rom)],
//! )
//! .unwrap();
//!
//! set.write_register(1, 0x22F, 0x01).unwrap();
//! let mut left = vec![0.0f32; 512];
//! let mut right = vec![0.0f32; 512];
//! set.render(1, &mut left, &mut right).unwrap();
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::config::ChipSetConfig;
use crate::host::ChipBindings;
use crate::irq::{self, PendingIrq};
use crate::k054539::{GainTables, K054539};
use crate::snapshot::ChipSnapshot;
use crate::{K054539Error, Result};

/// A fixed set of chips with shared gain tables.
#[derive(Debug)]
pub struct K054539Set {
    chips: Vec<K054539>,
    tables: Arc<GainTables>,
}

impl K054539Set {
    /// Initialize every chip of `config`.
    ///
    /// `bindings` supplies each chip's collaborators in order; chips without
    /// an entry get an empty ROM and no IRQ line.
    pub fn new(config: &ChipSetConfig, bindings: Vec<ChipBindings>) -> Result<Self> {
        config.validate()?;
        if bindings.len() > config.chip_count() {
            return Err(K054539Error::ConfigError(format!(
                "{} bindings supplied for {} chips",
                bindings.len(),
                config.chip_count()
            )));
        }

        let tables = Arc::new(GainTables::new());
        let mut bindings = bindings.into_iter();
        let mut chips = Vec::with_capacity(config.chip_count());
        for chip_config in &config.chips {
            let binding = bindings.next().unwrap_or_default();
            chips.push(K054539::with_tables(
                chip_config,
                binding,
                Arc::clone(&tables),
            )?);
        }

        log::debug!("K054539 chip set initialized with {} chips", chips.len());
        Ok(Self { chips, tables })
    }

    /// Number of chips.
    #[inline]
    pub fn chip_count(&self) -> usize {
        self.chips.len()
    }

    /// Shared gain tables.
    pub fn tables(&self) -> &Arc<GainTables> {
        &self.tables
    }

    /// Chip at `index`.
    pub fn chip(&self, index: usize) -> Result<&K054539> {
        let count = self.chips.len();
        self.chips
            .get(index)
            .ok_or(K054539Error::InvalidChip { index, count })
    }

    /// Mutable chip at `index`.
    pub fn chip_mut(&mut self, index: usize) -> Result<&mut K054539> {
        let count = self.chips.len();
        self.chips
            .get_mut(index)
            .ok_or(K054539Error::InvalidChip { index, count })
    }

    /// All chips.
    pub fn chips(&self) -> &[K054539] {
        &self.chips
    }

    /// Write a register on one chip.
    #[inline]
    pub fn write_register(&mut self, index: usize, offset: u16, value: u8) -> Result<()> {
        self.chip_mut(index)?.write_register(offset, value);
        Ok(())
    }

    /// Read a register on one chip (with data-port side effects).
    #[inline]
    pub fn read_register(&mut self, index: usize, offset: u16) -> Result<u8> {
        Ok(self.chip_mut(index)?.read_register(offset))
    }

    /// Render a block from one chip.
    pub fn render(&mut self, index: usize, left: &mut [f32], right: &mut [f32]) -> Result<()> {
        self.chip_mut(index)?.render(left, right);
        Ok(())
    }

    /// Run every chip's IRQ pacer; returns the total number of pulses raised.
    pub fn advance_time(&mut self, elapsed: Duration) -> u32 {
        irq::raise_all(self.pace_time(elapsed))
    }

    /// Run every chip's IRQ pacer and return the pulses undelivered, in chip
    /// order.
    pub fn pace_time(&mut self, elapsed: Duration) -> Vec<PendingIrq> {
        self.chips
            .iter_mut()
            .filter_map(|chip| chip.pace_time(elapsed))
            .collect()
    }

    /// Reset every chip.
    pub fn reset_all(&mut self) {
        for chip in &mut self.chips {
            chip.reset();
        }
    }

    /// Capture every chip's state, in index order.
    pub fn snapshot_all(&self) -> Vec<ChipSnapshot> {
        self.chips.iter().map(K054539::snapshot).collect()
    }

    /// Restore states captured by [`snapshot_all`](Self::snapshot_all).
    pub fn restore_all(&mut self, snapshots: &[ChipSnapshot]) -> Result<()> {
        if snapshots.len() != self.chips.len() {
            return Err(K054539Error::SnapshotMismatch(format!(
                "{} snapshots for {} chips",
                snapshots.len(),
                self.chips.len()
            )));
        }
        for (chip, snapshot) in self.chips.iter_mut().zip(snapshots) {
            chip.restore(snapshot)?;
        }
        Ok(())
    }

    /// Release every chip.
    pub fn shutdown(self) {
        for chip in self.chips {
            chip.shutdown();
        }
        log::debug!("K054539 chip set shut down");
    }
}
