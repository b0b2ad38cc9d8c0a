//! Sequential-access data port window.
//!
//! The host reaches the chip's private RAM, or any 128 KiB ROM bank, one byte
//! at a time through the data port. The window target is always re-derivable
//! from the bank-select register, so only the cursor carries state.

/// Bank-select value that maps the private RAM.
pub const RAM_BANK: u8 = 0x80;

/// Size of the RAM window.
pub const RAM_WINDOW: usize = 0x4000;

/// Size of one ROM bank.
pub const ROM_BANK_SIZE: usize = 0x20000;

/// Buffer currently mapped behind the data port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BankTarget {
    /// Private RAM window.
    Ram,
    /// ROM, starting at byte `base`.
    Rom {
        /// Byte offset of the bank in the ROM image.
        base: usize,
    },
}

/// Data port cursor and target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankWindow {
    cursor: usize,
    limit: usize,
    target: BankTarget,
}

impl BankWindow {
    /// Window for bank-select value 0 (ROM bank 0).
    pub fn new() -> Self {
        Self::for_bank(0)
    }

    /// Window for a bank-select value, cursor at 0.
    pub fn for_bank(value: u8) -> Self {
        if value == RAM_BANK {
            Self {
                cursor: 0,
                limit: RAM_WINDOW,
                target: BankTarget::Ram,
            }
        } else {
            Self {
                cursor: 0,
                limit: ROM_BANK_SIZE,
                target: BankTarget::Rom {
                    base: value as usize * ROM_BANK_SIZE,
                },
            }
        }
    }

    /// Select a bank and reset the cursor.
    pub fn select(&mut self, value: u8) {
        *self = Self::for_bank(value);
    }

    /// Store a byte at the cursor and advance. Writes to ROM are discarded.
    pub fn write(&mut self, ram: &mut [u8], value: u8) {
        if self.target == BankTarget::Ram {
            if let Some(slot) = ram.get_mut(self.cursor) {
                *slot = value;
            }
        }
        self.advance();
    }

    /// Fetch the byte at the cursor and advance.
    ///
    /// ROM banks past the end of the image read as 0.
    pub fn read(&mut self, ram: &[u8], rom: &[u8]) -> u8 {
        let value = match self.target {
            BankTarget::Ram => ram.get(self.cursor).copied().unwrap_or(0),
            BankTarget::Rom { base } => rom.get(base + self.cursor).copied().unwrap_or(0),
        };
        self.advance();
        value
    }

    #[inline]
    fn advance(&mut self) {
        self.cursor += 1;
        if self.cursor >= self.limit {
            self.cursor = 0;
        }
    }

    /// Current cursor.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Wrap limit of the current target.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Current target.
    pub fn target(&self) -> BankTarget {
        self.target
    }

    pub(crate) fn set_cursor(&mut self, cursor: usize) {
        self.cursor = cursor % self.limit;
    }
}

impl Default for BankWindow {
    fn default() -> Self {
        Self::new()
    }
}
