//! K054539 Register Definitions
//!
//! The chip exposes a flat 0x230-byte register space:
//!
//! - `0x000-0x0FF`: eight 32-byte channel blocks (pitch, volume, pan, loop, start)
//! - `0x100-0x1FF`: effects region; only the analog-input pan byte at `0x13F` is modeled
//! - `0x200-0x20F`: two format bytes per channel
//! - `0x214`/`0x215`: key-on / key-off bitmaps
//! - `0x22C-0x22F`: active bitmap, data port, bank select, control
//!
//! Writes are routed through [`WRITE_DISPATCH`], a table built at compile time
//! that maps every offset to the side effect it triggers.

use bitflags::bitflags;

/// Size of the register address space in bytes.
pub const REGISTER_SPACE: usize = 0x230;

/// Number of playback channels.
pub const CHANNEL_COUNT: usize = 8;

/// Bytes per channel block.
pub const CHANNEL_STRIDE: usize = 0x20;

/// Offsets inside a channel block.
pub mod channel_offset {
    /// Pitch delta, 3 bytes little-endian.
    pub const PITCH: usize = 0x00;
    /// Attenuation index.
    pub const VOLUME: usize = 0x03;
    /// Pan (0x11-0x1F).
    pub const PAN: usize = 0x05;
    /// Loop-start address, 3 bytes little-endian.
    pub const LOOP_START: usize = 0x08;
    /// Start / current address, 3 bytes little-endian.
    pub const START: usize = 0x0C;
}

/// Analog-input pan byte.
pub const ANALOG_PAN: u16 = 0x13F;
/// First per-channel format byte.
pub const FORMAT_BASE: u16 = 0x200;
/// Key-on bitmap.
pub const KEY_ON: u16 = 0x214;
/// Key-off bitmap.
pub const KEY_OFF: u16 = 0x215;
/// Channel-active bitmap.
pub const ACTIVE: u16 = 0x22C;
/// Sequential data port.
pub const DATA_PORT: u16 = 0x22D;
/// Bank select for the data port.
pub const BANK_SELECT: u16 = 0x22E;
/// Control byte.
pub const CONTROL: u16 = 0x22F;

const FORMAT_ENCODING_SHIFT: u8 = 2;
const FORMAT_ENCODING_MASK: u8 = 0x03;
const FORMAT_REVERSE: u8 = 0x20;
const FORMAT_LOOP: u8 = 0x01;

bitflags! {
    /// Control register (`0x22F`) bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ControlFlags: u8 {
        /// Enable PCM output.
        const PCM_ENABLE = 0x01;
        /// Allow reads through the data port.
        const PORT_READ = 0x10;
        /// Enable the periodic interrupt.
        const IRQ_ENABLE = 0x20;
        /// Ignore key-on/off and suspend position write-back.
        const FREEZE = 0x80;
    }
}

/// Sample encoding selected by format byte 0, bits 2-3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleEncoding {
    /// 8-bit signed PCM, one byte per sample.
    Pcm8,
    /// 16-bit signed PCM, little-endian.
    Pcm16,
    /// 4-bit squared-step DPCM, two samples per byte.
    Dpcm4,
    /// Encoding 3; not implemented by the hardware.
    Reserved,
}

impl SampleEncoding {
    /// Decode format byte 0.
    pub fn from_format(format: u8) -> Self {
        match (format >> FORMAT_ENCODING_SHIFT) & FORMAT_ENCODING_MASK {
            0 => SampleEncoding::Pcm8,
            1 => SampleEncoding::Pcm16,
            2 => SampleEncoding::Dpcm4,
            _ => SampleEncoding::Reserved,
        }
    }
}

/// What a register write does beyond storing the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAction {
    /// Known register with no side effect.
    Store,
    /// Not modeled; stored for read-back and reported.
    Unrecognized,
    /// Analog-input pan; forwards gains to the host.
    AnalogPan,
    /// Key-on bitmap.
    KeyOn,
    /// Key-off bitmap.
    KeyOff,
    /// Data port byte transfer.
    DataPort,
    /// Data port bank select.
    BankSelect,
    /// Control byte.
    Control,
}

const fn classify(offset: usize) -> WriteAction {
    if offset < CHANNEL_COUNT * CHANNEL_STRIDE {
        return match offset % CHANNEL_STRIDE {
            0x00..=0x03 | 0x05 | 0x08..=0x0A | 0x0C..=0x0E => WriteAction::Store,
            _ => WriteAction::Unrecognized,
        };
    }
    if offset >= FORMAT_BASE as usize && offset < FORMAT_BASE as usize + CHANNEL_COUNT * 2 {
        return WriteAction::Store;
    }
    match offset as u16 {
        ANALOG_PAN => WriteAction::AnalogPan,
        KEY_ON => WriteAction::KeyOn,
        KEY_OFF => WriteAction::KeyOff,
        ACTIVE => WriteAction::Store,
        DATA_PORT => WriteAction::DataPort,
        BANK_SELECT => WriteAction::BankSelect,
        CONTROL => WriteAction::Control,
        _ => WriteAction::Unrecognized,
    }
}

const fn build_dispatch() -> [WriteAction; REGISTER_SPACE] {
    let mut table = [WriteAction::Unrecognized; REGISTER_SPACE];
    let mut offset = 0;
    while offset < REGISTER_SPACE {
        table[offset] = classify(offset);
        offset += 1;
    }
    table
}

/// Offset → write action, one entry per register byte.
pub static WRITE_DISPATCH: [WriteAction; REGISTER_SPACE] = build_dispatch();

/// Look up the write action for an offset, `None` outside the register space.
#[inline]
pub fn write_action(offset: u16) -> Option<WriteAction> {
    WRITE_DISPATCH.get(offset as usize).copied()
}

/// Raw register storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterFile {
    bytes: [u8; REGISTER_SPACE],
}

impl RegisterFile {
    /// All registers zeroed.
    pub fn new() -> Self {
        Self {
            bytes: [0; REGISTER_SPACE],
        }
    }

    /// Read a register byte; 0 outside the register space.
    #[inline]
    pub fn get(&self, offset: u16) -> u8 {
        self.bytes.get(offset as usize).copied().unwrap_or(0)
    }

    /// Store a register byte; ignored outside the register space.
    #[inline]
    pub fn set(&mut self, offset: u16, value: u8) {
        if let Some(slot) = self.bytes.get_mut(offset as usize) {
            *slot = value;
        }
    }

    /// Read a 24-bit little-endian value.
    pub fn read_u24(&self, offset: usize) -> u32 {
        u32::from(self.bytes[offset])
            | u32::from(self.bytes[offset + 1]) << 8
            | u32::from(self.bytes[offset + 2]) << 16
    }

    /// Write a 24-bit little-endian value.
    pub fn write_u24(&mut self, offset: usize, value: u32) {
        self.bytes[offset] = value as u8;
        self.bytes[offset + 1] = (value >> 8) as u8;
        self.bytes[offset + 2] = (value >> 16) as u8;
    }

    /// Typed view of the control byte.
    #[inline]
    pub fn control(&self) -> ControlFlags {
        ControlFlags::from_bits_retain(self.get(CONTROL))
    }

    /// Channel-active bitmap.
    #[inline]
    pub fn active(&self) -> u8 {
        self.get(ACTIVE)
    }

    pub(crate) fn set_active(&mut self, bitmap: u8) {
        self.set(ACTIVE, bitmap);
    }

    /// Write the playback position back into a channel's start registers.
    pub fn store_position(&mut self, channel: usize, position: u32) {
        self.write_u24(channel * CHANNEL_STRIDE + channel_offset::START, position);
    }

    /// Raw bytes, for snapshots.
    pub fn as_bytes(&self) -> &[u8; REGISTER_SPACE] {
        &self.bytes
    }

    pub(crate) fn load(&mut self, bytes: &[u8]) {
        self.bytes.copy_from_slice(bytes);
    }

    /// Zero every register.
    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-channel registers, captured once at the start of a channel's render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelRegisters {
    /// 24-bit pitch delta.
    pub pitch: u32,
    /// Attenuation index (masked to 7 bits).
    pub volume: u8,
    /// Raw pan register value.
    pub pan: u8,
    /// 24-bit loop-start address.
    pub loop_start: u32,
    /// 24-bit start / current address.
    pub start: u32,
    /// Sample encoding.
    pub encoding: SampleEncoding,
    /// Play backwards.
    pub reverse: bool,
    /// Jump to `loop_start` at end of data.
    pub loop_enabled: bool,
}

impl ChannelRegisters {
    /// Snapshot the registers of `channel`.
    pub fn capture(regs: &RegisterFile, channel: usize) -> Self {
        let base = channel * CHANNEL_STRIDE;
        let format = FORMAT_BASE as usize + channel * 2;
        let format0 = regs.bytes[format];
        let format1 = regs.bytes[format + 1];

        Self {
            pitch: regs.read_u24(base + channel_offset::PITCH),
            volume: regs.bytes[base + channel_offset::VOLUME] & 0x7F,
            pan: regs.bytes[base + channel_offset::PAN],
            loop_start: regs.read_u24(base + channel_offset::LOOP_START),
            start: regs.read_u24(base + channel_offset::START),
            encoding: SampleEncoding::from_format(format0),
            reverse: format0 & FORMAT_REVERSE != 0,
            loop_enabled: format1 & FORMAT_LOOP != 0,
        }
    }
}

/// Offset of a channel-block register.
#[inline]
pub const fn channel_register(channel: usize, offset: usize) -> u16 {
    (channel * CHANNEL_STRIDE + offset) as u16
}

/// Offset of a channel's format byte (0 or 1).
#[inline]
pub const fn format_register(channel: usize, byte: usize) -> u16 {
    FORMAT_BASE + (channel * 2 + byte) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_control_addresses() {
        assert_eq!(write_action(ANALOG_PAN), Some(WriteAction::AnalogPan));
        assert_eq!(write_action(KEY_ON), Some(WriteAction::KeyOn));
        assert_eq!(write_action(KEY_OFF), Some(WriteAction::KeyOff));
        assert_eq!(write_action(ACTIVE), Some(WriteAction::Store));
        assert_eq!(write_action(DATA_PORT), Some(WriteAction::DataPort));
        assert_eq!(write_action(BANK_SELECT), Some(WriteAction::BankSelect));
        assert_eq!(write_action(CONTROL), Some(WriteAction::Control));
        assert_eq!(write_action(REGISTER_SPACE as u16), None);
    }

    #[test]
    fn test_dispatch_channel_blocks() {
        for ch in 0..CHANNEL_COUNT {
            for offset in [0x00, 0x01, 0x02, 0x03, 0x05, 0x08, 0x09, 0x0A, 0x0C, 0x0D, 0x0E] {
                assert_eq!(
                    write_action(channel_register(ch, offset)),
                    Some(WriteAction::Store)
                );
            }
            // Reverb send and delay bytes are not modeled
            assert_eq!(
                write_action(channel_register(ch, 0x04)),
                Some(WriteAction::Unrecognized)
            );
            assert_eq!(
                write_action(channel_register(ch, 0x1F)),
                Some(WriteAction::Unrecognized)
            );
            assert_eq!(write_action(format_register(ch, 0)), Some(WriteAction::Store));
            assert_eq!(write_action(format_register(ch, 1)), Some(WriteAction::Store));
        }
        assert_eq!(write_action(0x100), Some(WriteAction::Unrecognized));
        assert_eq!(write_action(0x210), Some(WriteAction::Unrecognized));
    }

    #[test]
    fn test_encoding_from_format() {
        assert_eq!(SampleEncoding::from_format(0x00), SampleEncoding::Pcm8);
        assert_eq!(SampleEncoding::from_format(0x04), SampleEncoding::Pcm16);
        assert_eq!(SampleEncoding::from_format(0x08), SampleEncoding::Dpcm4);
        assert_eq!(SampleEncoding::from_format(0x0C), SampleEncoding::Reserved);
        assert_eq!(SampleEncoding::from_format(0x24), SampleEncoding::Pcm16);
    }

    #[test]
    fn test_u24_little_endian() {
        let mut regs = RegisterFile::new();
        regs.write_u24(0x0C, 0x12_3456);
        assert_eq!(regs.get(0x0C), 0x56);
        assert_eq!(regs.get(0x0D), 0x34);
        assert_eq!(regs.get(0x0E), 0x12);
        assert_eq!(regs.read_u24(0x0C), 0x12_3456);
    }

    #[test]
    fn test_capture_channel_registers() {
        let mut regs = RegisterFile::new();
        let ch = 3;
        regs.write_u24(ch * CHANNEL_STRIDE, 0x01_0000);
        regs.set(channel_register(ch, channel_offset::VOLUME), 0xC0);
        regs.set(channel_register(ch, channel_offset::PAN), 0x11);
        regs.write_u24(ch * CHANNEL_STRIDE + channel_offset::LOOP_START, 0x100);
        regs.write_u24(ch * CHANNEL_STRIDE + channel_offset::START, 0x200);
        regs.set(format_register(ch, 0), 0x28);
        regs.set(format_register(ch, 1), 0x01);

        let params = ChannelRegisters::capture(&regs, ch);
        assert_eq!(params.pitch, 0x01_0000);
        assert_eq!(params.volume, 0x40);
        assert_eq!(params.pan, 0x11);
        assert_eq!(params.loop_start, 0x100);
        assert_eq!(params.start, 0x200);
        assert_eq!(params.encoding, SampleEncoding::Dpcm4);
        assert!(params.reverse);
        assert!(params.loop_enabled);
    }

    #[test]
    fn test_out_of_range_access() {
        let mut regs = RegisterFile::new();
        regs.set(0x230, 0xAA);
        assert_eq!(regs.get(0x230), 0);
        assert_eq!(regs.get(0xFFFF), 0);
    }
}
