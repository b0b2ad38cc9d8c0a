//! Save-state capture for one chip
//!
//! A snapshot holds everything a chip needs to resume bit-exactly. The data
//! port target is not stored: it is re-derived from the bank-select register
//! on restore.

use serde::{Deserialize, Serialize};

use crate::k054539::channel::ChannelState;
use crate::k054539::registers::{BANK_SELECT, CHANNEL_COUNT};

/// Persistent state of one chip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChipSnapshot {
    /// Full register image (0x230 bytes).
    pub registers: Vec<u8>,
    /// Private RAM.
    pub ram: Vec<u8>,
    /// Decode state per channel.
    pub channels: [ChannelState; CHANNEL_COUNT],
    /// Data port cursor.
    pub bank_cursor: usize,
    /// Host-side channel mute mask.
    pub muted: u8,
    /// Time accumulated into the current IRQ period.
    pub irq_phase_nanos: u64,
}

impl ChipSnapshot {
    /// Bank-select value the data port target is derived from.
    pub fn bank_select(&self) -> u8 {
        self.registers
            .get(BANK_SELECT as usize)
            .copied()
            .unwrap_or(0)
    }
}
