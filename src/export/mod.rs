//! Offline rendering and audio export
//!
//! Renders a chip for a fixed number of frames into interleaved stereo
//! samples, with optional normalization and fade-out. With the `export-wav`
//! feature the result can be written to a 16-bit WAV file.
//!
//! # Examples
//!
//! ```no_run
//! # #[cfg(feature = "export-wav")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use k054539::export::{export_to_wav, ExportConfig};
//! use k054539::{ChipBindings, ChipConfig, K054539};
//!
//! let rom = std::fs::read("samples.rom")?;
//! let mut chip = K054539::new(&ChipConfig::default(), ChipBindings::new(rom))?;
//! // ... program registers ...
//! export_to_wav(&mut chip, "output.wav", 48_000, ExportConfig::default())?;
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "export-wav"))]
//! # fn main() {}
//! ```

#[cfg(feature = "export-wav")]
mod wav;
#[cfg(feature = "export-wav")]
pub use wav::*;

use crate::k054539::K054539;

/// Export configuration options
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Frames rendered per chip render call
    pub block_frames: usize,
    /// Whether to normalize audio to prevent clipping
    pub normalize: bool,
    /// Fade out duration in seconds (0 = no fade)
    pub fade_out_duration: f32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            block_frames: 1024,
            normalize: true,
            fade_out_duration: 0.0,
        }
    }
}

impl ExportConfig {
    /// Enable normalization to prevent clipping
    pub fn normalize(mut self, enable: bool) -> Self {
        self.normalize = enable;
        self
    }

    /// Add fade out at the end
    pub fn fade_out(mut self, duration_seconds: f32) -> Self {
        self.fade_out_duration = duration_seconds;
        self
    }

    /// Set the render block size
    pub fn block_frames(mut self, frames: usize) -> Self {
        self.block_frames = frames;
        self
    }
}

/// Render `frames` frames as interleaved L/R samples.
///
/// The IRQ pacer advances with the rendered audio.
pub fn render_interleaved(chip: &mut K054539, frames: usize, config: &ExportConfig) -> Vec<f32> {
    let block = config.block_frames.max(1);
    let mut left = vec![0.0f32; block];
    let mut right = vec![0.0f32; block];
    let mut out = Vec::with_capacity(frames * 2);

    let mut remaining = frames;
    while remaining > 0 {
        let n = remaining.min(block);
        chip.render(&mut left[..n], &mut right[..n]);
        chip.advance_frames(n);
        for (&l, &r) in left[..n].iter().zip(&right[..n]) {
            out.push(l);
            out.push(r);
        }
        remaining -= n;
    }

    if config.normalize {
        normalize_samples(&mut out);
    }
    if config.fade_out_duration > 0.0 {
        apply_fade_out(&mut out, config.fade_out_duration, chip.sample_rate());
    }
    out
}

/// Scale down to a 0.95 peak if the signal would clip
fn normalize_samples(samples: &mut [f32]) {
    let peak = samples.iter().fold(0.0f32, |peak, s| peak.max(s.abs()));
    if peak > 0.95 {
        let scale = 0.95 / peak;
        for sample in samples.iter_mut() {
            *sample *= scale;
        }
    }
}

/// Linear fade over the last `fade_duration` seconds of interleaved stereo
fn apply_fade_out(samples: &mut [f32], fade_duration: f32, sample_rate: u32) {
    let fade_frames = (fade_duration * sample_rate as f32) as usize;
    if fade_frames == 0 {
        return;
    }
    let frames = samples.len() / 2;
    let start_fade = frames.saturating_sub(fade_frames);

    for (i, frame) in samples.chunks_exact_mut(2).enumerate().skip(start_fade) {
        let progress = (i - start_fade) as f32 / fade_frames as f32;
        let fade_factor = 1.0 - progress;
        frame[0] *= fade_factor;
        frame[1] *= fade_factor;
    }
}
