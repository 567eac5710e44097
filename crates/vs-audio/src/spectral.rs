// Spectral shape: centroid ("brightness") and bandwidth (spread), in Hz.

use crate::error::FeatureError;
use crate::fft::Spectrogram;
use crate::frames::mean;

/// Below this total magnitude a frame is treated as silent.
const SILENT_FRAME: f32 = 1e-10;

/// Mean spectral centroid over all frames. Silent frames count as 0 Hz.
///
/// # Errors
/// [`FeatureError::NoFrames`] if the spectrogram is empty.
pub fn centroid_mean(spec: &Spectrogram) -> Result<f32, FeatureError> {
    let freqs = spec.frequencies();
    mean(spec.frames().map(|frame| frame_centroid(frame, &freqs))).ok_or(FeatureError::NoFrames)
}

/// Mean spectral bandwidth (second central moment, p = 2) over all frames.
///
/// # Errors
/// [`FeatureError::NoFrames`] if the spectrogram is empty.
pub fn bandwidth_mean(spec: &Spectrogram) -> Result<f32, FeatureError> {
    let freqs = spec.frequencies();
    mean(spec.frames().map(|frame| {
        let total: f32 = frame.iter().sum();
        if total < SILENT_FRAME {
            return 0.0;
        }
        let centroid = frame_centroid(frame, &freqs);
        let spread: f32 = frame
            .iter()
            .zip(&freqs)
            .map(|(&mag, &f)| (mag / total) * (f - centroid).powi(2))
            .sum();
        spread.sqrt()
    }))
    .ok_or(FeatureError::NoFrames)
}

/// Formula: centroid = Σ(f_i × |X[i]|) / Σ|X[i]|
fn frame_centroid(frame: &[f32], freqs: &[f32]) -> f32 {
    let total: f32 = frame.iter().sum();
    if total < SILENT_FRAME {
        return 0.0;
    }
    let weighted: f32 = frame.iter().zip(freqs).map(|(&mag, &f)| mag * f).sum();
    weighted / total
}
