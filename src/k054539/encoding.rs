//! Sample fetch for the three hardware encodings.
//!
//! Positions are expressed in encoding units: bytes for 8-bit PCM, bytes
//! (stepping by two) for 16-bit PCM and nibbles for DPCM. Each encoding
//! reserves one in-band value as its end-of-data sentinel.

use super::constants::DPCM_DELTAS;
use super::registers::SampleEncoding;

/// Raw 8-bit value that decodes to 0x8000 (end of data).
pub const PCM8_END: u8 = 0x80;

/// 16-bit end-of-data value.
pub const PCM16_END: i16 = i16::MIN;

/// Raw DPCM byte marking end of data.
pub const DPCM_END: u8 = 0x88;

/// Result of fetching one source sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fetch {
    /// Decoded signed 16-bit sample.
    Sample(i32),
    /// The encoding's end sentinel was read.
    End,
}

/// Read-only view of the sample ROM with its address mask.
#[derive(Debug, Clone, Copy)]
pub struct SampleSource<'a> {
    rom: &'a [u8],
    mask: u32,
}

impl<'a> SampleSource<'a> {
    /// Wrap a ROM image and its power-of-two address mask.
    pub fn new(rom: &'a [u8], mask: u32) -> Self {
        Self { rom, mask }
    }

    /// Byte at a masked address; addresses past the image read as 0.
    #[inline]
    pub fn byte(&self, addr: u32) -> u8 {
        self.rom
            .get((addr & self.mask) as usize)
            .copied()
            .unwrap_or(0)
    }

    /// Mask for positions expressed in `encoding` units.
    #[inline]
    pub fn unit_mask(&self, encoding: SampleEncoding) -> u32 {
        match encoding {
            SampleEncoding::Dpcm4 => (self.mask << 1) | 1,
            _ => self.mask,
        }
    }

    /// Fetch the sample at `pos` (in encoding units).
    ///
    /// `previous` is the last decoded value; DPCM adds its delta to it.
    #[inline]
    pub fn fetch(&self, encoding: SampleEncoding, pos: u32, previous: i32) -> Fetch {
        match encoding {
            SampleEncoding::Pcm8 => {
                let raw = self.byte(pos);
                if raw == PCM8_END {
                    Fetch::End
                } else {
                    Fetch::Sample(i32::from((raw as i8 as i16) << 8))
                }
            }
            SampleEncoding::Pcm16 => {
                let value = i16::from_le_bytes([self.byte(pos), self.byte(pos.wrapping_add(1))]);
                if value == PCM16_END {
                    Fetch::End
                } else {
                    Fetch::Sample(i32::from(value))
                }
            }
            SampleEncoding::Dpcm4 => {
                let raw = self.byte(pos >> 1);
                if raw == DPCM_END {
                    return Fetch::End;
                }
                let nibble = if pos & 1 != 0 { raw >> 4 } else { raw & 0x0F };
                let value = previous + DPCM_DELTAS[nibble as usize];
                Fetch::Sample(value.clamp(i16::MIN as i32, i16::MAX as i32))
            }
            SampleEncoding::Reserved => Fetch::End,
        }
    }
}
