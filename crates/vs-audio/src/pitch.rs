// Pitch tracking by spectral peak picking.

use vs_core::config::AnalysisConfig;

use crate::error::FeatureError;
use crate::fft::Spectrogram;

/// Summary of every pitch candidate found in a buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PitchStats {
    /// Mean of the candidate frequencies, Hz.
    pub mean: f32,
    /// Population standard deviation of the candidates, Hz.
    pub std: f32,
}

/// Collect pitch candidates from every frame and summarise them.
///
/// In each frame, a bin inside `[pitch_fmin, pitch_fmax)` is a candidate when
/// it is a local maximum (strictly above its lower neighbour, at least its
/// upper one) and exceeds `pitch_threshold × frame max`. Its frequency is
/// refined by parabolic interpolation over the three bins.
///
/// # Errors
/// [`FeatureError::NoPitch`] when no frame yields a positive candidate
/// (silence, or energy only outside the search range).
pub fn track(spec: &Spectrogram, config: &AnalysisConfig) -> Result<PitchStats, FeatureError> {
    let num_bins = spec.num_bins();
    let bin_hz = spec.bin_hz(1);
    if num_bins < 3 || bin_hz <= 0.0 {
        return Err(FeatureError::InvalidParameter("spectre trop court pour la hauteur"));
    }

    // Candidate bins must have both neighbours.
    let lo = ((config.pitch_fmin / bin_hz).ceil() as usize).max(1);
    let hi = (num_bins - 1).min((config.pitch_fmax / bin_hz).ceil() as usize);
    if lo >= hi {
        return Err(FeatureError::InvalidParameter("plage de hauteur vide"));
    }

    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    let mut count = 0usize;

    for frame in spec.frames() {
        let peak = frame.iter().copied().fold(0.0f32, f32::max);
        let floor = config.pitch_threshold * peak;
        for k in lo..hi {
            let f = spec.bin_hz(k);
            if f < config.pitch_fmin || f >= config.pitch_fmax {
                continue;
            }
            let (prev, cur, next) = (frame[k - 1], frame[k], frame[k + 1]);
            if cur > prev && cur >= next && cur > floor {
                let hz = (k as f32 + parabolic_shift(prev, cur, next)) * bin_hz;
                if hz > 0.0 {
                    let hz = f64::from(hz);
                    sum += hz;
                    sum_sq += hz * hz;
                    count += 1;
                }
            }
        }
    }

    if count == 0 {
        return Err(FeatureError::NoPitch);
    }
    let n = count as f64;
    let mean = sum / n;
    let var = (sum_sq / n - mean * mean).max(0.0);
    Ok(PitchStats {
        mean: mean as f32,
        std: var.sqrt() as f32,
    })
}

/// Offset of the vertex of the parabola through three neighbouring bins, in bins.
#[inline]
fn parabolic_shift(prev: f32, cur: f32, next: f32) -> f32 {
    let curvature = 2.0 * cur - prev - next;
    if curvature.abs() < f32::EPSILON {
        0.0
    } else {
        0.5 * (next - prev) / curvature
    }
}
