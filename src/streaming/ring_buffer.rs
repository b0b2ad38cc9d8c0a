//! Stereo frame ring between the chip render thread and the audio thread
//!
//! One producer (the [`ChipStream`](super::ChipStream) pump) and one consumer
//! (the host audio callback). The ring stores whole L/R frames, so a reader
//! never sees half a frame and the channels cannot drift out of step.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::STEREO;
use crate::{K054539Error, Result};

/// One output frame: left, right.
pub type Frame = [f32; STEREO];

/// 512 MB worth of frames
const MAX_FRAMES: usize = 512 * 1024 * 1024 / std::mem::size_of::<Frame>();

/// Fixed-capacity ring of stereo frames
///
/// Positions count frames, grow monotonically (wrapping) and are masked on
/// access. One slot stays free so a full ring is distinguishable from an
/// empty one.
#[derive(Debug)]
pub struct RingBuffer {
    frames: Mutex<Box<[Frame]>>,
    /// Frames produced so far
    head: AtomicUsize,
    /// Frames consumed so far
    tail: AtomicUsize,
    mask: usize,
}

impl RingBuffer {
    /// Create a ring holding at least `requested_frames` frames.
    ///
    /// The size is rounded up to the next power of two; zero or more than
    /// 512 MB of frames is a [`K054539Error::ConfigError`].
    pub fn new(requested_frames: usize) -> Result<Self> {
        if requested_frames == 0 {
            return Err(K054539Error::ConfigError(
                "ring buffer capacity must be greater than 0".into(),
            ));
        }
        let slots = requested_frames
            .checked_next_power_of_two()
            .filter(|&slots| slots <= MAX_FRAMES)
            .ok_or_else(|| {
                K054539Error::ConfigError(format!(
                    "ring buffer of {requested_frames} frames exceeds maximum safe size {MAX_FRAMES}"
                ))
            })?;

        Ok(RingBuffer {
            frames: Mutex::new(vec![[0.0; STEREO]; slots].into_boxed_slice()),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            mask: slots - 1,
        })
    }

    /// Number of frame slots (one is always kept free).
    pub fn capacity(&self) -> usize {
        self.mask + 1
    }

    /// Frames waiting to be read
    pub fn available_read(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        head.wrapping_sub(self.tail.load(Ordering::Acquire))
    }

    /// Frames that can be written without overrunning the reader
    pub fn available_write(&self) -> usize {
        self.mask - self.available_read()
    }

    /// Push frames from planar left/right buffers (producer).
    ///
    /// Takes `min(left.len(), right.len())` frames, or fewer when the ring is
    /// short of room; returns the number accepted.
    pub fn write(&self, left: &[f32], right: &[f32]) -> usize {
        let mut frames = self.frames.lock();
        let head = self.head.load(Ordering::Acquire);
        let room = self.mask - head.wrapping_sub(self.tail.load(Ordering::Acquire));

        let mut written = 0;
        for (&l, &r) in left.iter().zip(right).take(room) {
            frames[head.wrapping_add(written) & self.mask] = [l, r];
            written += 1;
        }
        drop(frames);

        self.head
            .store(head.wrapping_add(written), Ordering::Release);
        written
    }

    /// Pop frames into an interleaved L/R buffer (consumer).
    ///
    /// Only whole frames are copied; a trailing odd sample in `dest` is left
    /// untouched. Returns the number of frames read.
    pub fn read(&self, dest: &mut [f32]) -> usize {
        let frames = self.frames.lock();
        let tail = self.tail.load(Ordering::Acquire);
        let pending = self.head.load(Ordering::Acquire).wrapping_sub(tail);

        let mut read = 0;
        for out in dest.chunks_exact_mut(STEREO).take(pending) {
            out.copy_from_slice(&frames[tail.wrapping_add(read) & self.mask]);
            read += 1;
        }
        drop(frames);

        self.tail.store(tail.wrapping_add(read), Ordering::Release);
        read
    }

    /// Discard every pending frame.
    pub fn flush(&self) {
        self.tail
            .store(self.head.load(Ordering::Acquire), Ordering::Release);
    }

    /// True when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.available_read() == 0
    }

    /// Fill level (0.0 to 1.0)
    pub fn fill_percentage(&self) -> f32 {
        self.available_read() as f32 / self.capacity() as f32
    }
}
