//! K054539 chip instance
//!
//! Register I/O, key-on/off, the data port, the render pass and the IRQ
//! pacer for one chip. Channels are decoded by [`ChannelState`]; this module
//! owns the register file, private RAM and bank window around them.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::bank::BankWindow;
use super::channel::{ChannelState, RenderOutcome, StereoGain, PHASE_ONE};
use super::constants::{pan_index, GainTables, SAMPLE_SCALE};
use super::encoding::SampleSource;
use super::registers::{
    write_action, ChannelRegisters, ControlFlags, RegisterFile, WriteAction, BANK_SELECT,
    CHANNEL_COUNT, DATA_PORT, KEY_OFF, KEY_ON, REGISTER_SPACE,
};
use crate::config::ChipConfig;
use crate::host::{AnalogPanSink, ChipBindings, RomRegion};
use crate::irq::{IrqPacer, PendingIrq, SharedIrqLine};
use crate::snapshot::ChipSnapshot;
use crate::{K054539Error, Result};

/// One emulated K054539.
pub struct K054539 {
    registers: RegisterFile,
    ram: Vec<u8>,
    rom: RomRegion,
    rom_mask: u32,
    bank: BankWindow,
    channels: [ChannelState; CHANNEL_COUNT],
    tables: Arc<GainTables>,
    clock_ratio: f64,
    sample_rate: u32,
    pacer: Option<IrqPacer>,
    irq: Option<SharedIrqLine>,
    analog_pan: Option<Box<dyn AnalogPanSink>>,
    // Host-side debug mute, one bit per channel
    muted: u8,
    // Channels already reported for a reserved encoding since their last key-on
    unsupported_reported: u8,
}

impl K054539 {
    /// Create a chip with its own gain tables.
    pub fn new(config: &ChipConfig, bindings: ChipBindings) -> Result<Self> {
        Self::with_tables(config, bindings, Arc::new(GainTables::new()))
    }

    /// Create a chip sharing pre-built gain tables.
    ///
    /// Fails with [`K054539Error::ConfigError`] on an invalid configuration and
    /// with [`K054539Error::Initialization`] when the private RAM cannot be
    /// allocated.
    pub fn with_tables(
        config: &ChipConfig,
        bindings: ChipBindings,
        tables: Arc<GainTables>,
    ) -> Result<Self> {
        config.validate()?;

        let mut ram = Vec::new();
        ram.try_reserve_exact(config.ram_size).map_err(|e| {
            K054539Error::Initialization(format!(
                "cannot allocate {:#x} bytes of private RAM: {e}",
                config.ram_size
            ))
        })?;
        ram.resize(config.ram_size, 0);

        let ChipBindings {
            rom,
            irq,
            analog_pan,
        } = bindings;
        let rom_mask = rom.address_mask();
        let pacer = irq
            .as_ref()
            .map(|_| IrqPacer::new(config.irq_frequency_hz));
        let irq = irq.map(|line| Arc::new(parking_lot::Mutex::new(line)));
        let clock_ratio = config.clock_ratio();

        log::debug!(
            "K054539 init: clock ratio {clock_ratio:.4}, ROM {} bytes (mask {rom_mask:#x}), RAM {:#x} bytes, IRQ {}",
            rom.len(),
            config.ram_size,
            if pacer.is_some() { "wired" } else { "none" }
        );

        Ok(Self {
            registers: RegisterFile::new(),
            ram,
            rom,
            rom_mask,
            bank: BankWindow::new(),
            channels: [ChannelState::default(); CHANNEL_COUNT],
            tables,
            clock_ratio,
            sample_rate: config.sample_rate,
            pacer,
            irq,
            analog_pan,
            muted: 0,
            unsupported_reported: 0,
        })
    }

    /// Zero registers, RAM and channel state; reselect bank 0.
    pub fn reset(&mut self) {
        self.registers.clear();
        self.ram.fill(0);
        self.channels = [ChannelState::default(); CHANNEL_COUNT];
        self.bank = BankWindow::new();
        self.unsupported_reported = 0;
        if let Some(pacer) = self.pacer.as_mut() {
            pacer.reset();
        }
    }

    /// Release the chip. Dropping it has the same effect.
    pub fn shutdown(self) {
        log::debug!("K054539 shutdown");
    }

    /// Write a register byte.
    ///
    /// Every in-range write is stored for read-back; offsets past the register
    /// space are ignored.
    pub fn write_register(&mut self, offset: u16, value: u8) {
        let Some(action) = write_action(offset) else {
            log::debug!("K054539 write outside register space: {offset:#05x} = {value:#04x}");
            return;
        };

        match action {
            WriteAction::Store => {}
            WriteAction::Unrecognized => {
                log::debug!("K054539 unrecognized register {offset:#05x} = {value:#04x}");
            }
            WriteAction::AnalogPan => {
                let (left, right) = self.tables.pan_pair(pan_index(value));
                if let Some(sink) = self.analog_pan.as_mut() {
                    sink.set_gains(left, right);
                }
            }
            WriteAction::KeyOn => self.key_on(value),
            WriteAction::KeyOff => self.key_off(value),
            WriteAction::DataPort => self.bank.write(&mut self.ram, value),
            WriteAction::BankSelect => {
                log::trace!("K054539 bank select {value:#04x}");
                self.bank.select(value);
            }
            WriteAction::Control => {
                let old = self.registers.control();
                let new = ControlFlags::from_bits_retain(value);
                if old.contains(ControlFlags::FREEZE) != new.contains(ControlFlags::FREEZE) {
                    log::trace!(
                        "K054539 freeze {}",
                        if new.contains(ControlFlags::FREEZE) { "on" } else { "off" }
                    );
                }
            }
        }

        self.registers.set(offset, value);
    }

    /// Read a register byte.
    ///
    /// The data port (`0x22D`) transfers a byte and advances the cursor when
    /// reads are enabled, and returns 0 without side effects otherwise.
    pub fn read_register(&mut self, offset: u16) -> u8 {
        if offset == DATA_PORT {
            return self.read_data_port();
        }
        self.registers.get(offset)
    }

    /// Register value without data-port side effects.
    pub fn peek_register(&self, offset: u16) -> u8 {
        self.registers.get(offset)
    }

    /// Key on every channel whose bit is set. Ignored while frozen.
    fn key_on(&mut self, mask: u8) {
        if self.is_frozen() {
            return;
        }
        log::trace!("K054539 key on {mask:#010b}");
        self.registers.set_active(self.registers.active() | mask);
        self.unsupported_reported &= !mask;
    }

    /// Key off every channel whose bit is set. Ignored while frozen.
    fn key_off(&mut self, mask: u8) {
        if self.is_frozen() {
            return;
        }
        log::trace!("K054539 key off {mask:#010b}");
        self.registers.set_active(self.registers.active() & !mask);
    }

    /// Key on channels through the key-on register.
    pub fn write_key_on(&mut self, mask: u8) {
        self.write_register(KEY_ON, mask);
    }

    /// Key off channels through the key-off register.
    pub fn write_key_off(&mut self, mask: u8) {
        self.write_register(KEY_OFF, mask);
    }

    /// Select the data port target (`0x80` = RAM, else ROM bank).
    pub fn select_bank(&mut self, value: u8) {
        self.write_register(BANK_SELECT, value);
    }

    /// Push one byte through the data port.
    pub fn write_data_port(&mut self, value: u8) {
        self.write_register(DATA_PORT, value);
    }

    /// Pull one byte through the data port; 0 when port reads are disabled.
    pub fn read_data_port(&mut self) -> u8 {
        if !self.registers.control().contains(ControlFlags::PORT_READ) {
            return 0;
        }
        self.bank.read(&self.ram, self.rom.as_slice())
    }

    /// Render `min(left.len(), right.len())` frames.
    ///
    /// Both buffers are cleared first. With PCM output disabled they stay
    /// silent; otherwise every active channel is mixed in additively.
    pub fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
        let frames = left.len().min(right.len());
        let (left, right) = (&mut left[..frames], &mut right[..frames]);
        left.fill(0.0);
        right.fill(0.0);

        let control = self.registers.control();
        if !control.contains(ControlFlags::PCM_ENABLE) {
            return;
        }
        let frozen = control.contains(ControlFlags::FREEZE);
        let source = SampleSource::new(self.rom.as_slice(), self.rom_mask);

        for ch in 0..CHANNEL_COUNT {
            let bit = 1u8 << ch;
            if self.registers.active() & bit == 0 {
                continue;
            }

            let params = ChannelRegisters::capture(&self.registers, ch);
            let state = &mut self.channels[ch];
            if state.sync(params.start & self.rom_mask) {
                self.unsupported_reported &= !bit;
            }

            let delta = (f64::from(params.pitch) * self.clock_ratio) as i64;
            let gain = if self.muted & bit != 0 {
                StereoGain::SILENT
            } else {
                let volume = self.tables.attenuation(params.volume);
                let (pan_left, pan_right) = self.tables.pan_pair(pan_index(params.pan));
                StereoGain {
                    left: (volume * pan_left) as f32 * SAMPLE_SCALE,
                    right: (volume * pan_right) as f32 * SAMPLE_SCALE,
                }
            };

            match state.render(&params, &source, delta, gain, left, right) {
                RenderOutcome::Playing => {}
                RenderOutcome::Ended => {
                    log::trace!("K054539 channel {ch} reached end of sample");
                    self.registers.set_active(self.registers.active() & !bit);
                }
                RenderOutcome::Unsupported => {
                    if self.unsupported_reported & bit == 0 {
                        log::warn!("K054539 channel {ch}: reserved sample encoding, channel skipped");
                        self.unsupported_reported |= bit;
                    }
                    continue;
                }
            }

            if !frozen {
                self.registers.store_position(ch, self.channels[ch].position);
            }
        }
    }

    /// Run the IRQ pacer for `elapsed` host time.
    ///
    /// Returns the number of IRQ pulses raised. Periods elapsed with the IRQ
    /// control bit clear are consumed silently.
    pub fn advance_time(&mut self, elapsed: Duration) -> u32 {
        self.pace_time(elapsed).map_or(0, PendingIrq::raise)
    }

    /// Run the IRQ pacer for `frames` output frames at the configured rate.
    pub fn advance_frames(&mut self, frames: usize) -> u32 {
        self.pace_frames(frames).map_or(0, PendingIrq::raise)
    }

    /// Like [`advance_time`](Self::advance_time), but hands the pulses back
    /// undelivered. Used by hosts that hold the chip behind a lock.
    pub fn pace_time(&mut self, elapsed: Duration) -> Option<PendingIrq> {
        let fired = self.pacer.as_mut()?.advance(elapsed);
        self.pending_irq(fired)
    }

    /// Like [`advance_frames`](Self::advance_frames), but hands the pulses
    /// back undelivered.
    pub fn pace_frames(&mut self, frames: usize) -> Option<PendingIrq> {
        let fired = self.pacer.as_mut()?.advance_frames(frames, self.sample_rate);
        self.pending_irq(fired)
    }

    fn pending_irq(&self, fired: u32) -> Option<PendingIrq> {
        if fired == 0 || !self.registers.control().contains(ControlFlags::IRQ_ENABLE) {
            return None;
        }
        self.irq.as_ref().map(|line| PendingIrq::new(line, fired))
    }

    /// Bind a new sample ROM.
    ///
    /// The address mask is re-derived and the data port cursor restarts on the
    /// currently selected bank.
    pub fn set_rom(&mut self, rom: impl Into<RomRegion>) {
        self.rom = rom.into();
        self.rom_mask = self.rom.address_mask();
        self.bank = BankWindow::for_bank(self.registers.get(BANK_SELECT));
        log::debug!(
            "K054539 ROM rebound: {} bytes (mask {:#x})",
            self.rom.len(),
            self.rom_mask
        );
    }

    /// Mute or unmute a channel in the mix. Muted channels keep decoding.
    pub fn set_channel_mute(&mut self, channel: usize, mute: bool) {
        if channel >= CHANNEL_COUNT {
            return;
        }
        let bit = 1u8 << channel;
        if mute {
            self.muted |= bit;
        } else {
            self.muted &= !bit;
        }
    }

    /// Whether a channel is muted in the mix.
    pub fn is_channel_muted(&self, channel: usize) -> bool {
        channel < CHANNEL_COUNT && self.muted & (1 << channel) != 0
    }

    /// Freeze bit of the control register.
    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.registers.control().contains(ControlFlags::FREEZE)
    }

    /// Whether a channel's active bit is set.
    pub fn is_channel_active(&self, channel: usize) -> bool {
        channel < CHANNEL_COUNT && self.registers.active() & (1 << channel) != 0
    }

    /// Channel-active bitmap.
    pub fn active_channels(&self) -> u8 {
        self.registers.active()
    }

    /// Typed control register.
    pub fn control(&self) -> ControlFlags {
        self.registers.control()
    }

    /// Phase-increment scale applied to pitch registers.
    pub fn clock_ratio(&self) -> f64 {
        self.clock_ratio
    }

    /// Output sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// ROM address mask.
    pub fn rom_mask(&self) -> u32 {
        self.rom_mask
    }

    /// Bound ROM.
    pub fn rom(&self) -> &RomRegion {
        &self.rom
    }

    /// Decode state of a channel.
    pub fn channel_state(&self, channel: usize) -> Option<&ChannelState> {
        self.channels.get(channel)
    }

    /// Data port window.
    pub fn bank_window(&self) -> &BankWindow {
        &self.bank
    }

    /// IRQ pacer, present when an IRQ line is bound.
    pub fn irq_pacer(&self) -> Option<&IrqPacer> {
        self.pacer.as_ref()
    }

    /// Private RAM.
    pub fn ram(&self) -> &[u8] {
        &self.ram
    }

    /// Private RAM, for hosts preloading sample data directly.
    pub fn ram_mut(&mut self) -> &mut [u8] {
        &mut self.ram
    }

    /// Capture the chip's persistent state.
    pub fn snapshot(&self) -> ChipSnapshot {
        ChipSnapshot {
            registers: self.registers.as_bytes().to_vec(),
            ram: self.ram.clone(),
            channels: self.channels,
            bank_cursor: self.bank.cursor(),
            muted: self.muted,
            irq_phase_nanos: self
                .pacer
                .as_ref()
                .map_or(0, |p| u64::try_from(p.phase().as_nanos()).unwrap_or(u64::MAX)),
        }
    }

    /// Restore state captured by [`snapshot`](Self::snapshot).
    ///
    /// The bank target is re-derived from the bank-select register and cached
    /// channel positions are masked to the bound ROM. A phase fraction outside
    /// `0..0x10000` is rejected with [`K054539Error::SnapshotMismatch`].
    pub fn restore(&mut self, snapshot: &ChipSnapshot) -> Result<()> {
        if snapshot.registers.len() != REGISTER_SPACE {
            return Err(K054539Error::SnapshotMismatch(format!(
                "register image is {} bytes, expected {REGISTER_SPACE}",
                snapshot.registers.len()
            )));
        }
        if snapshot.ram.len() != self.ram.len() {
            return Err(K054539Error::SnapshotMismatch(format!(
                "RAM image is {:#x} bytes, expected {:#x}",
                snapshot.ram.len(),
                self.ram.len()
            )));
        }

        if let Some((ch, state)) = snapshot
            .channels
            .iter()
            .enumerate()
            .find(|(_, state)| !(0..PHASE_ONE).contains(&i64::from(state.fraction)))
        {
            return Err(K054539Error::SnapshotMismatch(format!(
                "channel {ch} phase fraction {:#x} outside 0..0x10000",
                state.fraction
            )));
        }

        self.registers.load(&snapshot.registers);
        self.ram.copy_from_slice(&snapshot.ram);
        self.channels = snapshot.channels;
        for state in &mut self.channels {
            state.position &= self.rom_mask;
        }
        self.bank = BankWindow::for_bank(self.registers.get(BANK_SELECT));
        self.bank.set_cursor(snapshot.bank_cursor);
        self.muted = snapshot.muted;
        self.unsupported_reported = 0;
        if let Some(pacer) = self.pacer.as_mut() {
            pacer.set_phase(Duration::from_nanos(snapshot.irq_phase_nanos));
        }
        Ok(())
    }
}

impl fmt::Debug for K054539 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("K054539")
            .field("control", &self.registers.control())
            .field("active", &format_args!("{:#010b}", self.registers.active()))
            .field("rom", &self.rom)
            .field("ram_size", &self.ram.len())
            .field("bank", &self.bank)
            .field("clock_ratio", &self.clock_ratio)
            .field("irq", &self.irq.is_some())
            .finish()
    }
}
