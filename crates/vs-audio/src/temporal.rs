// Time-domain measures: loudness (RMS) and articulation (zero-crossing rate).

use crate::error::FeatureError;
use crate::frames::{PadMode, frames, mean, pad_center};

/// Mean of the per-frame root-mean-square energy.
///
/// # Errors
/// [`FeatureError::EmptySignal`] for an empty signal.
///
/// # Example
/// ```
/// use vs_audio::temporal::rms_mean;
/// let rms = rms_mean(&vec![0.0; 4096], 2048, 512).unwrap();
/// assert_eq!(rms, 0.0);
/// ```
pub fn rms_mean(signal: &[f32], frame_length: usize, hop: usize) -> Result<f32, FeatureError> {
    if signal.is_empty() {
        return Err(FeatureError::EmptySignal);
    }
    let padded = pad_center(signal, frame_length, PadMode::Zero);
    mean(frames(&padded, frame_length, hop).map(frame_rms)).ok_or(FeatureError::NoFrames)
}

/// Mean of the per-frame zero-crossing rate, in crossings per sample.
///
/// A sample equal to 0 counts as positive.
///
/// # Errors
/// [`FeatureError::EmptySignal`] for an empty signal.
///
/// # Example
/// ```
/// use vs_audio::temporal::zcr_mean;
/// let alternating: Vec<f32> = (0..22050).map(|i| if i % 2 == 0 { 0.5 } else { -0.5 }).collect();
/// let zcr = zcr_mean(&alternating, 2048, 512).unwrap();
/// assert!(zcr > 0.9);
/// ```
pub fn zcr_mean(signal: &[f32], frame_length: usize, hop: usize) -> Result<f32, FeatureError> {
    if signal.is_empty() {
        return Err(FeatureError::EmptySignal);
    }
    let padded = pad_center(signal, frame_length, PadMode::Edge);
    mean(frames(&padded, frame_length, hop).map(frame_zcr)).ok_or(FeatureError::NoFrames)
}

#[inline]
fn frame_rms(frame: &[f32]) -> f32 {
    let sum_sq: f32 = frame.iter().map(|s| s * s).sum();
    (sum_sq / frame.len() as f32).sqrt()
}

#[inline]
fn frame_zcr(frame: &[f32]) -> f32 {
    let crossings = frame
        .windows(2)
        .filter(|w| (w[0] < 0.0) != (w[1] < 0.0))
        .count();
    crossings as f32 / frame.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_signal_rms() {
        // Zero padding lowers the two edge frames only.
        let rms = rms_mean(&vec![0.5; 22050], 2048, 512).unwrap();
        assert!((rms - 0.5).abs() < 0.02, "rms = {rms}");
    }

    #[test]
    fn dc_signal_has_no_crossings() {
        assert_eq!(zcr_mean(&vec![-0.3; 8192], 2048, 512).unwrap(), 0.0);
    }

    #[test]
    fn empty_signal_is_an_error() {
        assert_eq!(rms_mean(&[], 2048, 512), Err(FeatureError::EmptySignal));
        assert_eq!(zcr_mean(&[], 2048, 512), Err(FeatureError::EmptySignal));
    }

    #[test]
    fn zero_counts_as_positive() {
        assert!((frame_zcr(&[0.0, 0.0, 1.0, 0.0]) - 0.0).abs() < f32::EPSILON);
        assert!((frame_zcr(&[0.0, -1.0, 0.0, -1.0]) - 0.75).abs() < f32::EPSILON);
    }
}
