//! WAV file export functionality

use super::{render_interleaved, ExportConfig};
use crate::k054539::K054539;
use crate::{K054539Error, Result};
use std::path::Path;

/// Render `frames` frames from `chip` into a 16-bit stereo WAV file.
///
/// # Examples
///
/// ```no_run
/// use k054539::export::{export_to_wav, ExportConfig};
/// use k054539::{ChipBindings, ChipConfig, K054539};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut chip = K054539::new(&ChipConfig::default(), ChipBindings::default())?;
/// export_to_wav(&mut chip, "output.wav", 48_000, ExportConfig::default().fade_out(1.0))?;
/// # Ok(())
/// # }
/// ```
pub fn export_to_wav<P: AsRef<Path>>(
    chip: &mut K054539,
    output_path: P,
    frames: usize,
    config: ExportConfig,
) -> Result<()> {
    if chip.sample_rate() == 0 {
        return Err(K054539Error::AudioFileError(
            "cannot export a chip configured without an output sample rate".into(),
        ));
    }

    log::debug!(
        "Rendering {frames} frames ({:.1}s) to {}",
        frames as f32 / chip.sample_rate() as f32,
        output_path.as_ref().display()
    );
    let samples = render_interleaved(chip, frames, &config);
    write_wav_file(output_path.as_ref(), &samples, chip.sample_rate())
}

/// Write interleaved stereo samples to a WAV file
fn write_wav_file(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)
        .map_err(|e| K054539Error::AudioFileError(format!("Failed to create WAV file: {e}")))?;

    for &sample in samples {
        let sample_i16 = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer
            .write_sample(sample_i16)
            .map_err(|e| K054539Error::AudioFileError(format!("Failed to write sample: {e}")))?;
    }

    writer
        .finalize()
        .map_err(|e| K054539Error::AudioFileError(format!("Failed to finalize WAV file: {e}")))?;

    Ok(())
}
