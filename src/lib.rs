//! K054539 PCM Sound Chip Emulator
//!
//! An emulator of the Konami K054539, the eight-channel sample playback chip
//! found on Konami arcade boards of the 1990s. Each channel streams 8-bit
//! PCM, 16-bit PCM or 4-bit DPCM data out of a sample ROM, resamples it with
//! linear interpolation and mixes it into a stereo bus.
//!
//! # Features
//! - Full 0x230-byte register file with key-on/off, freeze and control bits
//! - Data port window into private RAM or any 128 KiB ROM bank
//! - 8-bit, 16-bit and DPCM decoding with end-of-data and loop handling
//! - Logarithmic attenuation and constant-power pan tables shared per chip set
//! - Periodic IRQ pacer driven by host time or rendered frames
//! - Save states (serde)
//! - Lock-guarded chip set and ring-buffered stereo streaming
//!
//! # Crate feature flags
//! - `streaming` (default): `SharedChipSet`, `RingBuffer` and `ChipStream`
//! - `export-wav` (opt-in): render a chip to a WAV file (enables `hound`)
//!
//! # Quick start
//! ```
//! use k054539::{ChipBindings, ChipConfig, K054539};
//!
//! let rom = vec![0x00, 0x10, 0x20, 0x30, 0x80];
//! let mut chip = K054539::new(&ChipConfig::default(), ChipBindings::new(rom)).unwrap();
//! chip.write_register(0x02, 0x01); // pitch 0x010000: one source sample per frame
//! chip.write_register(0x05, 0x18); // pan center
//! chip.write_register(0x22F, 0x01); // PCM enable
//! chip.write_register(0x214, 0x01); // key on channel 0
//!
//! let mut left = [0.0f32; 4];
//! let mut right = [0.0f32; 4];
//! chip.render(&mut left, &mut right);
//! assert!(left[0] > 0.0);
//! ```

#![warn(missing_docs)]

// Domain modules
pub mod k054539; // K054539 chip emulation (core)

pub mod chipset; // Multi-chip set with shared tables
pub mod config; // Chip configuration
pub mod export; // Offline rendering / WAV export
pub mod host; // Host collaborator interfaces
pub mod irq; // Interrupt pacer
pub mod snapshot; // Save states
#[cfg(feature = "streaming")]
pub mod streaming; // Concurrent host port

/// Error types for K054539 emulator operations
#[derive(thiserror::Error, Debug)]
pub enum K054539Error {
    /// Chip could not be brought up (e.g. private RAM allocation failed)
    #[error("Initialization error: {0}")]
    Initialization(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Chip index outside the chip set
    #[error("Invalid chip index {index} (chip set has {count} chips)")]
    InvalidChip {
        /// Requested index
        index: usize,
        /// Number of chips in the set
        count: usize,
    },

    /// Save state does not fit this chip
    #[error("Snapshot mismatch: {0}")]
    SnapshotMismatch(String),

    /// IO error from filesystem
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error writing audio file
    #[error("Audio file write error: {0}")]
    AudioFileError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for K054539Error {
    /// Converts a String into `K054539Error::Other`.
    ///
    /// Prefer the specific variants (`ConfigError`, `Initialization`, ...)
    /// where the failure has a known category.
    fn from(msg: String) -> Self {
        K054539Error::Other(msg)
    }
}

impl From<&str> for K054539Error {
    /// Converts a string slice into `K054539Error::Other`.
    fn from(msg: &str) -> Self {
        K054539Error::Other(msg.to_string())
    }
}

/// Result type for emulator operations
pub type Result<T> = std::result::Result<T, K054539Error>;

// Public API exports
pub use chipset::K054539Set;
pub use config::{ChipConfig, ChipSetConfig, MAX_CHIPS};
pub use host::{AnalogPanSink, ChipBindings, IrqLine, RomRegion, ADDRESS_SPACE};
pub use irq::{IrqPacer, PendingIrq};
pub use k054539::{ChannelState, ControlFlags, GainTables, SampleEncoding, K054539};
pub use snapshot::ChipSnapshot;
#[cfg(feature = "streaming")]
pub use streaming::{ChipStream, RingBuffer, SharedChipSet, StreamConfig};
