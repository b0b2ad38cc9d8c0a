//! K054539 PCM Emulation Domain
//!
//! Konami K054539 eight-channel sample playback chip: register file, data
//! port window, sample decoding and the stereo mixer.
//!
//! Implementation:
//! - `chip` - chip instance, register I/O and render entry point
//! - `channel` - per-channel phase accumulator and interpolation

// Internal modules
pub mod bank;
pub mod channel;
pub mod chip;
pub mod constants;
pub mod encoding;
pub mod registers;

// Re-export public API
pub use bank::{BankTarget, BankWindow};
pub use channel::ChannelState;
pub use chip::K054539;
pub use constants::GainTables;
pub use registers::{ControlFlags, RegisterFile, SampleEncoding};
