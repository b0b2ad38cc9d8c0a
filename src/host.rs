//! Host collaborator interfaces
//!
//! Capabilities the chip consumes from its host: the sample ROM, the IRQ line
//! and the optional analog-input pan sink. They are injected per chip at
//! initialization through [`ChipBindings`].

use std::fmt;
use std::sync::Arc;

/// Sample address space reachable through the 24-bit address registers.
pub const ADDRESS_SPACE: usize = 1 << 24;

/// IRQ output line of one chip.
///
/// Closures implement this trait, so `Box::new(|| cpu.assert_irq())` style
/// bindings work without a dedicated type.
///
/// `SharedChipSet` and `ChipStream` raise the line after releasing the chip
/// set lock, so a handler may read or write chip registers. A handler must
/// not advance the pacer of its own chip.
pub trait IrqLine: Send {
    /// The chip's IRQ line goes active.
    fn raise(&mut self);
}

impl<F: FnMut() + Send> IrqLine for F {
    fn raise(&mut self) {
        self()
    }
}

/// Receiver for the analog-input pan gains (register `0x13F`).
///
/// Called from inside the register write, with the chip borrowed; it must
/// not call back into the chip or a lock guarding it.
pub trait AnalogPanSink: Send {
    /// Called with the constant-power left/right gains on every pan write.
    fn set_gains(&mut self, left: f64, right: f64);
}

impl<F: FnMut(f64, f64) + Send> AnalogPanSink for F {
    fn set_gains(&mut self, left: f64, right: f64) {
        self(left, right)
    }
}

/// Shared, read-only sample ROM.
///
/// Owned by the ROM loader; chips hold a cheap reference-counted handle and
/// never copy or mutate the image, so one ROM can back several chips and
/// threads.
#[derive(Clone, PartialEq, Eq)]
pub struct RomRegion {
    data: Arc<[u8]>,
}

impl RomRegion {
    /// Empty ROM (every read returns 0).
    pub fn empty() -> Self {
        Self {
            data: Arc::from(Vec::new()),
        }
    }

    /// Wrap an already shared image.
    pub fn new(data: Arc<[u8]>) -> Self {
        Self { data }
    }

    /// ROM bytes.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True for an empty image.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Address mask: next power of two at or above the size, minus one.
    ///
    /// Capped at [`ADDRESS_SPACE`]; bytes past the first 16 MiB of a larger
    /// image are unreachable.
    pub fn address_mask(&self) -> u32 {
        let size = self.data.len().clamp(1, ADDRESS_SPACE);
        (size.next_power_of_two() - 1) as u32
    }
}

impl Default for RomRegion {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Vec<u8>> for RomRegion {
    fn from(data: Vec<u8>) -> Self {
        Self { data: data.into() }
    }
}

impl From<&[u8]> for RomRegion {
    fn from(data: &[u8]) -> Self {
        Self { data: data.into() }
    }
}

impl From<Arc<[u8]>> for RomRegion {
    fn from(data: Arc<[u8]>) -> Self {
        Self { data }
    }
}

impl fmt::Debug for RomRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RomRegion")
            .field("len", &self.data.len())
            .finish()
    }
}

/// Collaborators bound to one chip at initialization.
#[derive(Default)]
pub struct ChipBindings {
    /// Sample ROM.
    pub rom: RomRegion,
    /// IRQ line; without it no pacer is registered.
    pub irq: Option<Box<dyn IrqLine>>,
    /// Analog-input pan sink.
    pub analog_pan: Option<Box<dyn AnalogPanSink>>,
}

impl ChipBindings {
    /// Bindings with only a ROM.
    pub fn new(rom: impl Into<RomRegion>) -> Self {
        Self {
            rom: rom.into(),
            ..Self::default()
        }
    }

    /// Attach an IRQ line.
    pub fn with_irq(mut self, irq: impl IrqLine + 'static) -> Self {
        self.irq = Some(Box::new(irq));
        self
    }

    /// Attach an analog pan sink.
    pub fn with_analog_pan(mut self, sink: impl AnalogPanSink + 'static) -> Self {
        self.analog_pan = Some(Box::new(sink));
        self
    }
}

impl fmt::Debug for ChipBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChipBindings")
            .field("rom", &self.rom)
            .field("irq", &self.irq.is_some())
            .field("analog_pan", &self.analog_pan.is_some())
            .finish()
    }
}
