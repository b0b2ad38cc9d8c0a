//! Stereo output stream for one chip
//!
//! The producer side calls [`ChipStream::pump`] to render whole blocks into
//! the ring while there is room; the audio callback drains interleaved L/R
//! frames with [`ChipStream::read`] or through a cloned [`RingBuffer`] handle.
//! IRQ pulses counted while rendering are raised after the chip set lock is
//! released.

use parking_lot::Mutex;
use std::sync::Arc;

use super::{RingBuffer, SharedChipSet, StreamConfig, STEREO};
use crate::{K054539Error, Result};

/// Counters for monitoring buffer health
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StreamStats {
    /// Blocks rendered into the ring
    pub blocks_rendered: u64,
    /// Frames rendered into the ring
    pub frames_rendered: u64,
    /// Reads that found fewer frames than requested
    pub underrun_count: u64,
    /// IRQ pulses raised while rendering
    pub irq_pulses: u64,
    /// Ring fill level after the last operation
    pub fill_percentage: f32,
}

/// Two-channel output stream bound to one chip of a shared set.
#[derive(Debug)]
pub struct ChipStream {
    set: SharedChipSet,
    chip_index: usize,
    config: StreamConfig,
    buffer: Arc<RingBuffer>,
    left: Vec<f32>,
    right: Vec<f32>,
    stats: Arc<Mutex<StreamStats>>,
}

impl ChipStream {
    /// Register a stereo stream for chip `chip_index`.
    pub fn new(set: SharedChipSet, chip_index: usize, config: StreamConfig) -> Result<Self> {
        if config.block_frames == 0 {
            return Err(K054539Error::ConfigError(
                "stream block size must be greater than 0".into(),
            ));
        }
        if config.ring_buffer_frames <= config.block_frames {
            return Err(K054539Error::ConfigError(format!(
                "ring buffer ({} frames) must be larger than one block ({} frames)",
                config.ring_buffer_frames, config.block_frames
            )));
        }
        let sample_rate = set.with(|s| s.chip(chip_index).map(|chip| chip.sample_rate()))?;

        let buffer = Arc::new(RingBuffer::new(config.ring_buffer_frames)?);
        log::debug!(
            "K054539 stream for chip {chip_index}: {} frame blocks, {:.1}ms ring",
            config.block_frames,
            config.latency_ms(sample_rate)
        );

        Ok(Self {
            set,
            chip_index,
            config,
            buffer,
            left: vec![0.0; config.block_frames],
            right: vec![0.0; config.block_frames],
            stats: Arc::new(Mutex::new(StreamStats::default())),
        })
    }

    /// Render whole blocks until the ring cannot take another one.
    ///
    /// Each block also advances the chip's IRQ pacer by the block's duration;
    /// its pulses are raised once the set lock is released. Returns the
    /// number of frames rendered.
    pub fn pump(&mut self) -> Result<usize> {
        let block = self.config.block_frames;
        let mut blocks = 0u64;
        let mut pulses = 0u64;

        while self.buffer.available_write() >= block {
            let pending = {
                let mut set = self.set.lock();
                let chip = set.chip_mut(self.chip_index)?;
                chip.render(&mut self.left, &mut self.right);
                chip.pace_frames(block)
            };
            if let Some(irq) = pending {
                pulses += u64::from(irq.raise());
            }

            let written = self.buffer.write(&self.left, &self.right);
            debug_assert_eq!(written, block);
            blocks += 1;
        }

        let frames = blocks as usize * block;
        if blocks > 0 {
            let mut stats = self.stats.lock();
            stats.blocks_rendered += blocks;
            stats.frames_rendered += frames as u64;
            stats.irq_pulses += pulses;
            stats.fill_percentage = self.buffer.fill_percentage();
        }
        Ok(frames)
    }

    /// Read interleaved L/R samples; returns the number of whole frames read.
    ///
    /// A trailing odd sample in `dest` is left untouched.
    pub fn read(&self, dest: &mut [f32]) -> usize {
        let read = self.buffer.read(dest);

        let mut stats = self.stats.lock();
        if read < dest.len() / STEREO {
            stats.underrun_count += 1;
        }
        stats.fill_percentage = self.buffer.fill_percentage();
        read
    }

    /// Frames waiting in the ring.
    pub fn available_frames(&self) -> usize {
        self.buffer.available_read()
    }

    /// Ring buffer handle for an audio callback on another thread.
    pub fn buffer(&self) -> Arc<RingBuffer> {
        Arc::clone(&self.buffer)
    }

    /// Discard pending frames.
    pub fn flush(&self) {
        self.buffer.flush();
    }

    /// Current counters.
    pub fn stats(&self) -> StreamStats {
        *self.stats.lock()
    }

    /// Chip this stream renders.
    pub fn chip_index(&self) -> usize {
        self.chip_index
    }

    /// Stream configuration.
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }
}
