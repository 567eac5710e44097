// Chroma: spectral energy folded onto the 12 pitch classes.

use crate::error::FeatureError;
use crate::fft::Spectrogram;
use crate::frames::mean;

/// Pitch classes per octave.
pub const PITCH_CLASSES: usize = 12;

/// Gaussian spread around each pitch class, in semitones.
const CLASS_SIGMA: f32 = 0.5;
/// Octave weighting: centre (octaves above A0) and width.
const OCTAVE_CENTER: f32 = 5.0;
const OCTAVE_WIDTH: f32 = 2.0;

/// Mean chroma energy over every frame and pitch class.
///
/// Each frame is normalized so its strongest class is 1; silent frames stay
/// at zero. Result lies in `[0, 1]`.
///
/// # Errors
/// [`FeatureError::NoFrames`] for an empty spectrogram.
///
/// # Example
/// ```
/// use vs_audio::chroma::chroma_mean;
/// use vs_audio::fft::Spectrogram;
/// let spec = Spectrogram::compute(&vec![0.0; 4096], 22050, 2048, 512).unwrap();
/// assert_eq!(chroma_mean(&spec).unwrap(), 0.0);
/// ```
pub fn chroma_mean(spec: &Spectrogram) -> Result<f32, FeatureError> {
    let weights = class_weights(spec);
    let num_bins = spec.num_bins();
    let mut cells = Vec::with_capacity(spec.num_frames() * PITCH_CLASSES);

    for frame in spec.frames() {
        let mut chroma = [0.0f32; PITCH_CLASSES];
        for (class, row) in chroma.iter_mut().zip(weights.chunks_exact(num_bins)) {
            *class = row.iter().zip(frame).map(|(w, m)| w * m * m).sum();
        }
        let peak = chroma.iter().copied().fold(0.0f32, f32::max);
        if peak > f32::MIN_POSITIVE {
            for c in &mut chroma {
                *c /= peak;
            }
        }
        cells.extend_from_slice(&chroma);
    }

    mean(cells.into_iter()).ok_or(FeatureError::NoFrames)
}

/// `[12][num_bins]` weights mapping FFT bins to pitch classes (C = 0, A440).
fn class_weights(spec: &Spectrogram) -> Vec<f32> {
    let num_bins = spec.num_bins();
    let mut weights = vec![0.0f32; PITCH_CLASSES * num_bins];

    // DC carries no pitch.
    for k in 1..num_bins {
        let f = spec.bin_hz(k);
        let midi = 69.0 + 12.0 * (f / 440.0).log2();
        let class_pos = midi.rem_euclid(PITCH_CLASSES as f32);
        let octave = ((f / 27.5).log2() - OCTAVE_CENTER) / OCTAVE_WIDTH;
        let octave_weight = (-0.5 * octave * octave).exp();

        for class in 0..PITCH_CLASSES {
            let d = (class_pos - class as f32).abs();
            let d = d.min(PITCH_CLASSES as f32 - d) / CLASS_SIGMA;
            weights[class * num_bins + k] = (-0.5 * d * d).exp() * octave_weight;
        }
    }
    weights
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f32) -> Spectrogram {
        let signal: Vec<f32> = (0..22050)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * freq * i as f32 / 22050.0).sin())
            .collect();
        Spectrogram::compute(&signal, 22050, 2048, 512).unwrap()
    }

    #[test]
    fn pure_tone_concentrates_on_one_class() {
        let c = chroma_mean(&tone(440.0)).unwrap();
        assert!(c > 0.05 && c < 0.3, "chroma = {c}");
    }

    #[test]
    fn noise_spreads_across_classes() {
        // Deterministic LCG noise.
        let mut state = 12345u32;
        let signal: Vec<f32> = (0..22050)
            .map(|_| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (state >> 8) as f32 / (1u32 << 24) as f32 - 0.5
            })
            .collect();
        let spec = Spectrogram::compute(&signal, 22050, 2048, 512).unwrap();
        let noisy = chroma_mean(&spec).unwrap();
        let tonal = chroma_mean(&tone(440.0)).unwrap();
        assert!(noisy > tonal, "noise {noisy} vs tone {tonal}");
        assert!(noisy <= 1.0);
    }

    #[test]
    fn a440_lands_on_class_a() {
        let spec = tone(440.0);
        let weights = class_weights(&spec);
        let k = (440.0 * 2048.0 / 22050.0_f32).round() as usize;
        let nb = spec.num_bins();
        let best = (0..PITCH_CLASSES)
            .max_by(|&a, &b| weights[a * nb + k].total_cmp(&weights[b * nb + k]))
            .unwrap();
        assert_eq!(best, 9);
    }
}
