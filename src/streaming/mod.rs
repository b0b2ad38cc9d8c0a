//! Streaming output for concurrent hosts
//!
//! When the CPU-bus thread and the audio thread run in parallel, the chip set
//! lives behind one exclusive lock ([`SharedChipSet`]) and a [`ChipStream`]
//! renders blocks from it into a [`RingBuffer`] the audio thread drains.

pub mod ring_buffer;
pub mod shared;
pub mod stream;

pub use ring_buffer::RingBuffer;
pub use shared::SharedChipSet;
pub use stream::{ChipStream, StreamStats};

/// Interleaved samples per output frame (left, right).
pub const STEREO: usize = 2;

/// Configuration for a chip output stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    /// Frames rendered per chip render call
    pub block_frames: usize,

    /// Ring buffer size in frames
    /// Larger buffers = more latency but less chance of underrun
    pub ring_buffer_frames: usize,
}

impl StreamConfig {
    /// Small blocks and a 4096-frame ring (~85ms at 48 kHz)
    pub fn low_latency() -> Self {
        StreamConfig {
            block_frames: 256,
            ring_buffer_frames: 4096,
        }
    }

    /// Larger blocks and a 16384-frame ring (~341ms at 48 kHz)
    pub fn stable() -> Self {
        StreamConfig {
            block_frames: 1024,
            ring_buffer_frames: 16384,
        }
    }

    /// Ring buffer latency in milliseconds at `sample_rate`
    pub fn latency_ms(&self, sample_rate: u32) -> f32 {
        if sample_rate == 0 {
            return 0.0;
        }
        ((self.ring_buffer_frames as f32) / (sample_rate as f32)) * 1000.0
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self::stable()
    }
}
