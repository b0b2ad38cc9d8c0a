//! Per-channel decode and resampling.
//!
//! Each active channel walks its sample data with a 16.16 phase accumulator,
//! decodes one source sample per phase overflow and linearly interpolates
//! between the last two decoded samples for every output frame.

use serde::{Deserialize, Serialize};

use super::encoding::{Fetch, SampleSource};
use super::registers::{ChannelRegisters, SampleEncoding};

/// One whole source sample in phase units.
pub const PHASE_ONE: i64 = 0x1_0000;

const PHASE_MASK: i64 = PHASE_ONE - 1;

/// Decode state of one channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelState {
    /// Current sample address (bytes), masked by the ROM mask.
    pub position: u32,
    /// Sub-sample phase, always in `0..0x10000` between renders.
    pub fraction: i32,
    /// Most recently decoded sample.
    pub current: i32,
    /// Sample decoded before `current`.
    pub previous: i32,
}

/// Left/right output gains for one channel, already normalized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StereoGain {
    /// Left gain.
    pub left: f32,
    /// Right gain.
    pub right: f32,
}

impl StereoGain {
    /// No output.
    pub const SILENT: StereoGain = StereoGain {
        left: 0.0,
        right: 0.0,
    };
}

/// How a channel's render pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Still playing at the end of the block.
    Playing,
    /// Reached end of data (and the loop target, if any, was also exhausted).
    Ended,
    /// Reserved encoding; nothing was decoded.
    Unsupported,
}

impl ChannelState {
    /// Adopt the position implied by the start registers.
    ///
    /// Returns `true` when it differs from the cached position, in which case
    /// the phase and sample history are cleared (key-on or restart).
    pub fn sync(&mut self, start: u32) -> bool {
        if start == self.position {
            return false;
        }
        *self = ChannelState {
            position: start,
            ..ChannelState::default()
        };
        true
    }

    /// Render `frames` output frames, mixing into `left`/`right`.
    ///
    /// `delta` is the per-frame phase increment (pitch times clock ratio).
    pub fn render(
        &mut self,
        params: &ChannelRegisters,
        source: &SampleSource<'_>,
        delta: i64,
        gain: StereoGain,
        left: &mut [f32],
        right: &mut [f32],
    ) -> RenderOutcome {
        let encoding = params.encoding;
        if encoding == SampleEncoding::Reserved {
            return RenderOutcome::Unsupported;
        }

        let unit_mask = source.unit_mask(encoding);
        let unit: u32 = match encoding {
            SampleEncoding::Pcm16 => 2,
            _ => 1,
        };
        let (delta, phase_step, pos_step) = if params.reverse {
            (-delta, PHASE_ONE, unit.wrapping_neg())
        } else {
            (delta, -PHASE_ONE, unit)
        };

        let (mut pos, mut frac) = self.to_units(encoding);
        let loop_pos = self.loop_units(encoding, params.loop_start, source);
        let mut current = self.current;
        let mut previous = self.previous;
        let mut outcome = RenderOutcome::Playing;

        'frames: for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            frac += delta;
            while frac & !PHASE_MASK != 0 {
                frac += phase_step;
                pos = pos.wrapping_add(pos_step) & unit_mask;

                let mut fetched = source.fetch(encoding, pos, current);
                if fetched == Fetch::End && params.loop_enabled {
                    log::trace!("loop to {:#08x}", params.loop_start);
                    pos = loop_pos;
                    fetched = source.fetch(encoding, pos, current);
                }
                match fetched {
                    Fetch::Sample(value) => {
                        previous = current;
                        current = value;
                    }
                    Fetch::End => {
                        previous = 0;
                        current = 0;
                        outcome = RenderOutcome::Ended;
                        break 'frames;
                    }
                }
            }

            let out = (i64::from(previous) * frac + i64::from(current) * (PHASE_ONE - frac)) >> 16;
            let out = out as f32;
            *l += out * gain.left;
            *r += out * gain.right;
        }

        if outcome == RenderOutcome::Ended {
            frac = 0;
        }
        self.store_units(encoding, pos, frac);
        self.current = current;
        self.previous = previous;
        outcome
    }

    /// Expand (position, fraction) into encoding units.
    fn to_units(&self, encoding: SampleEncoding) -> (u32, i64) {
        let frac = i64::from(self.fraction);
        match encoding {
            SampleEncoding::Dpcm4 => {
                let mut pos = self.position << 1;
                let mut frac = frac << 1;
                if frac & PHASE_ONE != 0 {
                    frac &= PHASE_MASK;
                    pos |= 1;
                }
                (pos, frac)
            }
            _ => (self.position, frac),
        }
    }

    /// Fold encoding-unit position and phase back into byte position and fraction.
    fn store_units(&mut self, encoding: SampleEncoding, pos: u32, frac: i64) {
        match encoding {
            SampleEncoding::Dpcm4 => {
                let mut frac = frac >> 1;
                if pos & 1 != 0 {
                    frac |= 0x8000;
                }
                self.position = pos >> 1;
                self.fraction = frac as i32;
            }
            _ => {
                self.position = pos;
                self.fraction = frac as i32;
            }
        }
    }

    fn loop_units(&self, encoding: SampleEncoding, loop_start: u32, source: &SampleSource<'_>) -> u32 {
        let unit_mask = source.unit_mask(encoding);
        match encoding {
            SampleEncoding::Dpcm4 => (loop_start << 1) & unit_mask,
            _ => loop_start & unit_mask,
        }
    }
}
