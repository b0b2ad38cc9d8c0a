//! Chip and chip-set configuration
//!
//! Plain serializable settings supplied once at initialization. Host
//! collaborators (ROM, IRQ line, pan sink) are bound separately through
//! [`ChipBindings`](crate::host::ChipBindings).

use serde::{Deserialize, Serialize};

use crate::irq::DEFAULT_IRQ_FREQUENCY;
use crate::k054539::bank::RAM_WINDOW;
use crate::{K054539Error, Result};

/// Maximum number of chips in one chip set.
pub const MAX_CHIPS: usize = 8;

/// Default pitch clock (the chip's native 48 kHz rate).
pub const DEFAULT_CLOCK: u32 = 48_000;

/// Default output sample rate.
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

/// Largest accepted `clock / sample_rate`.
///
/// Covers the 18.432 MHz board clock down to a 4.5 kHz output rate. The
/// decoder steps once per source sample, so a frame costs at most
/// `256 * MAX_CLOCK_RATIO` steps per channel.
pub const MAX_CLOCK_RATIO: f64 = 4096.0;

/// Configuration of one chip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChipConfig {
    /// Pitch clock in Hz; the per-frame phase increment is `pitch * clock / sample_rate`.
    pub clock: u32,
    /// Output sample rate in Hz; 0 means no audio sink (clock ratio 1.0).
    pub sample_rate: u32,
    /// Private RAM size in bytes (power of two, at least 16 KiB).
    pub ram_size: usize,
    /// Interrupt pacer frequency in Hz.
    pub irq_frequency_hz: f64,
}

impl ChipConfig {
    /// Default configuration with the given clocks.
    pub fn with_clocks(clock: u32, sample_rate: u32) -> Self {
        Self {
            clock,
            sample_rate,
            ..Self::default()
        }
    }

    /// Set the private RAM size.
    pub fn ram_size(mut self, bytes: usize) -> Self {
        self.ram_size = bytes;
        self
    }

    /// Set the interrupt pacer frequency.
    pub fn irq_frequency(mut self, hz: f64) -> Self {
        self.irq_frequency_hz = hz;
        self
    }

    /// Phase-increment scale: `clock / sample_rate`, or 1.0 without a sink.
    pub fn clock_ratio(&self) -> f64 {
        if self.sample_rate == 0 {
            1.0
        } else {
            f64::from(self.clock) / f64::from(self.sample_rate)
        }
    }

    /// Check the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.clock == 0 {
            return Err(K054539Error::ConfigError("clock must be non-zero".into()));
        }
        if self.clock_ratio() > MAX_CLOCK_RATIO {
            return Err(K054539Error::ConfigError(format!(
                "clock ratio {} / {} exceeds {MAX_CLOCK_RATIO}",
                self.clock, self.sample_rate
            )));
        }
        if !self.irq_frequency_hz.is_finite() || self.irq_frequency_hz <= 0.0 {
            return Err(K054539Error::ConfigError(format!(
                "IRQ frequency must be positive, got {}",
                self.irq_frequency_hz
            )));
        }
        if self.ram_size < RAM_WINDOW || !self.ram_size.is_power_of_two() {
            return Err(K054539Error::ConfigError(format!(
                "RAM size must be a power of two of at least {RAM_WINDOW:#x} bytes, got {:#x}",
                self.ram_size
            )));
        }
        Ok(())
    }
}

impl Default for ChipConfig {
    fn default() -> Self {
        Self {
            clock: DEFAULT_CLOCK,
            sample_rate: DEFAULT_SAMPLE_RATE,
            ram_size: RAM_WINDOW,
            irq_frequency_hz: DEFAULT_IRQ_FREQUENCY,
        }
    }
}

/// Configuration of a chip set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChipSetConfig {
    /// One entry per chip.
    pub chips: Vec<ChipConfig>,
}

impl ChipSetConfig {
    /// `count` chips sharing one configuration.
    pub fn uniform(count: usize, chip: ChipConfig) -> Self {
        Self {
            chips: vec![chip; count],
        }
    }

    /// Number of chips.
    pub fn chip_count(&self) -> usize {
        self.chips.len()
    }

    /// Check the set and every chip.
    pub fn validate(&self) -> Result<()> {
        if self.chips.is_empty() {
            return Err(K054539Error::ConfigError(
                "chip set must have at least one chip".into(),
            ));
        }
        if self.chips.len() > MAX_CHIPS {
            return Err(K054539Error::ConfigError(format!(
                "chip set supports at most {MAX_CHIPS} chips, got {}",
                self.chips.len()
            )));
        }
        for (index, chip) in self.chips.iter().enumerate() {
            chip.validate().map_err(|e| match e {
                K054539Error::ConfigError(msg) => {
                    K054539Error::ConfigError(format!("chip {index}: {msg}"))
                }
                other => other,
            })?;
        }
        Ok(())
    }
}

impl Default for ChipSetConfig {
    fn default() -> Self {
        Self::uniform(1, ChipConfig::default())
    }
}
