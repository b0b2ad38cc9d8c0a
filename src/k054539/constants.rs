//! K054539 Hardware Constants
//!
//! Attenuation and pan lookup tables plus the DPCM step table shared by all
//! chips of a chip set.

/// Number of entries in the attenuation table.
pub const ATTENUATION_STEPS: usize = 256;

/// Number of pan positions (register values 0x11..=0x1F).
pub const PAN_STEPS: usize = 15;

/// Pan index used when the pan register is outside 0x11..=0x1F.
pub const PAN_CENTER: usize = 0x18 - 0x11;

/// Attenuation per volume step, in dB (36 dB every 64 steps).
pub const DB_PER_STEP: f64 = 36.0 / 64.0;

/// Scale factor that maps signed 16-bit samples to normalized floats.
pub const SAMPLE_SCALE: f32 = 1.0 / 32768.0;

/// Squared-step delta table for 4-bit DPCM, indexed by nibble.
pub const DPCM_DELTAS: [i32; 16] = [
    0 << 8,
    1 << 8,
    4 << 8,
    9 << 8,
    16 << 8,
    25 << 8,
    36 << 8,
    49 << 8,
    -64 << 8,
    -49 << 8,
    -36 << 8,
    -25 << 8,
    -16 << 8,
    -9 << 8,
    -4 << 8,
    -1 << 8,
];

/// Volume and pan gain tables.
///
/// Built once per chip set and shared by every chip in it. Volume index 0 is
/// full gain (1/4, leaving headroom for the eight-voice mix); every index
/// attenuates by a further [`DB_PER_STEP`]. The pan table is constant
/// power: `pan[i]^2 + pan[14 - i]^2 == 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct GainTables {
    attenuation: [f64; ATTENUATION_STEPS],
    pan: [f64; PAN_STEPS],
}

impl GainTables {
    /// Compute both tables.
    pub fn new() -> Self {
        let mut attenuation = [0.0; ATTENUATION_STEPS];
        for (i, gain) in attenuation.iter_mut().enumerate() {
            *gain = 10f64.powf(-DB_PER_STEP * i as f64 / 20.0) / 4.0;
        }

        let mut pan = [0.0; PAN_STEPS];
        let full = ((PAN_STEPS - 1) as f64).sqrt();
        for (i, gain) in pan.iter_mut().enumerate() {
            *gain = ((PAN_STEPS - 1 - i) as f64).sqrt() / full;
        }

        Self { attenuation, pan }
    }

    /// Gain for an attenuation index.
    #[inline]
    pub fn attenuation(&self, index: u8) -> f64 {
        self.attenuation[index as usize]
    }

    /// Gain for a pan index (0..=14). Indices past the end clamp to the last entry.
    #[inline]
    pub fn pan(&self, index: usize) -> f64 {
        self.pan[index.min(PAN_STEPS - 1)]
    }

    /// Left/right gains for a pan index: `(pan[i], pan[14 - i])`.
    #[inline]
    pub fn pan_pair(&self, index: usize) -> (f64, f64) {
        let index = index.min(PAN_STEPS - 1);
        (self.pan[index], self.pan[PAN_STEPS - 1 - index])
    }

    /// The full attenuation table.
    pub fn attenuation_table(&self) -> &[f64; ATTENUATION_STEPS] {
        &self.attenuation
    }

    /// The full pan table.
    pub fn pan_table(&self) -> &[f64; PAN_STEPS] {
        &self.pan
    }
}

impl Default for GainTables {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a raw pan register value to a pan index.
///
/// `0x11..=0x1F` maps to `0..=14`; anything else is centered.
#[inline]
pub fn pan_index(value: u8) -> usize {
    match value {
        0x11..=0x1F => (value - 0x11) as usize,
        _ => PAN_CENTER,
    }
}
